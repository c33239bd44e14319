use channel_physics::{write_csv, HarnessConfig, MonteCarlo, StreamSimulation, SweepResult};
use clap::{Parser, ValueEnum};
use cpfsk_phy::{ChainVariant, DetectorKind, DEFAULT_RATIO_THRESHOLD};
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

#[derive(Copy, Clone, Debug, ValueEnum, PartialEq, Eq)]
enum Variant {
    Basic,
    Optimized,
}

impl From<Variant> for ChainVariant {
    fn from(v: Variant) -> Self {
        match v {
            Variant::Basic => ChainVariant::Basic,
            Variant::Optimized => ChainVariant::Optimized,
        }
    }
}

#[derive(Copy, Clone, Debug, ValueEnum, PartialEq, Eq)]
enum Detector {
    Threshold,
    Ratio,
}

#[derive(Parser, Debug)]
#[command(name = "fsk-sweep")]
#[command(about = "Monte-Carlo BER/PER sweep of the CPFSK receive chain")]
struct Cli {
    /// JSON configuration; missing fields take their defaults
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Packets per SNR point
    #[arg(short = 'n', long)]
    packets: Option<usize>,

    /// Es/N0 points in dB, comma separated
    #[arg(short = 's', long, value_delimiter = ',', allow_negative_numbers = true)]
    snr: Option<Vec<f64>>,

    /// Master seed
    #[arg(long)]
    seed: Option<u64>,

    /// Chain variant
    #[arg(long, value_enum)]
    variant: Option<Variant>,

    /// Preamble detector
    #[arg(long, value_enum)]
    detector: Option<Detector>,

    /// Ratio detector threshold; implies the ratio detector
    #[arg(long)]
    ratio_threshold: Option<f64>,

    /// CSV output file (stdout when absent)
    #[arg(short = 'o', long)]
    csv: Option<PathBuf>,

    /// JSON output file
    #[arg(long)]
    json: Option<PathBuf>,

    /// Run the streaming receiver over this many back-to-back packets
    /// at the first SNR point instead of the sweep
    #[arg(long)]
    stream: Option<usize>,
}

fn load_config(cli: &Cli) -> SweepResult<HarnessConfig> {
    let mut cfg = match &cli.config {
        Some(path) => HarnessConfig::from_json(&std::fs::read_to_string(path)?)?,
        None => HarnessConfig::default(),
    };
    if let Some(n) = cli.packets {
        cfg.chain.n_packets = n;
    }
    if let Some(snr) = &cli.snr {
        cfg.snr_points_db = snr.clone();
    }
    if let Some(seed) = cli.seed {
        cfg.seed = seed;
    }
    if let Some(variant) = cli.variant {
        cfg.chain.variant = variant.into();
    }

    let configured = match cfg.chain.detector {
        DetectorKind::Ratio { threshold } => threshold,
        DetectorKind::Threshold => DEFAULT_RATIO_THRESHOLD,
    };
    match (cli.detector, cli.ratio_threshold) {
        (Some(Detector::Threshold), _) => cfg.chain.detector = DetectorKind::Threshold,
        (Some(Detector::Ratio), t) | (None, t @ Some(_)) => {
            cfg.chain.detector = DetectorKind::Ratio {
                threshold: t.unwrap_or(configured),
            }
        }
        (None, None) => {}
    }
    Ok(cfg)
}

fn run(cli: &Cli, cfg: HarnessConfig) -> SweepResult<()> {
    if let Some(n_packets) = cli.stream {
        let snr = cfg.snr_points_db.first().copied().unwrap_or(f64::INFINITY);
        let outcome = StreamSimulation::new(cfg)?.run(n_packets, snr)?;
        for r in &outcome.reports {
            println!(
                "packet at {}: cfo {:.1} Hz, sto {}, snr {}",
                r.start,
                r.cfo.hz,
                r.sto,
                r.snr_db.map_or("-".to_string(), |s| format!("{:.1} dB", s))
            );
        }
        println!(
            "{} sent, {} detected, {} false, {} missed, {} recovered, {} bit errors",
            outcome.packets_sent,
            outcome.packets_detected,
            outcome.false_detections,
            outcome.misses,
            outcome.packets_recovered,
            outcome.bit_errors
        );
        return Ok(());
    }

    let rows = MonteCarlo::new(cfg)?.run();

    match &cli.csv {
        Some(path) => write_csv(&rows, BufWriter::new(File::create(path)?))?,
        None => write_csv(&rows, std::io::stdout().lock())?,
    }
    if let Some(path) = &cli.json {
        serde_json::to_writer_pretty(BufWriter::new(File::create(path)?), &rows)?;
    }
    Ok(())
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let cfg = match load_config(&cli) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("error: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = run(&cli, cfg) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load(args: &[&str]) -> HarnessConfig {
        let cli = Cli::parse_from(std::iter::once("fsk-sweep").chain(args.iter().copied()));
        load_config(&cli).unwrap()
    }

    #[test]
    fn test_defaults_without_flags() {
        assert_eq!(load(&[]), HarnessConfig::default());
    }

    #[test]
    fn test_flag_overrides() {
        let cfg = load(&[
            "--packets", "12", "--snr=-2,4.5", "--seed", "9", "--variant", "basic",
        ]);
        assert_eq!(cfg.chain.n_packets, 12);
        assert_eq!(cfg.snr_points_db, vec![-2.0, 4.5]);
        assert_eq!(cfg.seed, 9);
        assert_eq!(cfg.chain.variant, ChainVariant::Basic);
        assert_eq!(cfg.chain.detector, DetectorKind::Threshold);
    }

    #[test]
    fn test_detector_selection() {
        assert_eq!(
            load(&["--detector", "ratio"]).chain.detector,
            DetectorKind::Ratio {
                threshold: DEFAULT_RATIO_THRESHOLD
            }
        );
        assert_eq!(
            load(&["--ratio-threshold", "3.5"]).chain.detector,
            DetectorKind::Ratio { threshold: 3.5 }
        );
        assert_eq!(
            load(&["--detector", "threshold", "--ratio-threshold", "3.5"]).chain.detector,
            DetectorKind::Threshold
        );
    }

    #[test]
    fn test_unknown_variant_rejected() {
        let args = ["fsk-sweep", "--variant", "fastest"];
        assert!(Cli::try_parse_from(args).is_err());
    }
}
