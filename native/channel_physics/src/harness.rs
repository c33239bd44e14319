//! Monte-Carlo evaluation of the receive chain
//!
//! Each packet draws its payload and channel offsets from its own ChaCha
//! stream, is propagated once without noise, and is then received at every
//! SNR point with fresh noise. Packets run in parallel; their outcomes are
//! reduced in packet order so results depend only on the seed.

use cpfsk_phy::sync::windowed_variance_snr_db;
use cpfsk_phy::{
    wrap_centered, ChainConfig, Complex64, Stage, StageOverrides, SyncEngine, SyncResult,
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::channel::Channel;
use crate::error::{SweepError, SweepResult};
use crate::metrics::{DetectionClass, MetricsAccumulator, MetricsRow, PacketOutcome};
use crate::transmitter::{frame_waveform, PacketDraw};

/// Chain plus sweep parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    pub chain: ChainConfig,
    /// Es/N0 operating points in dB
    pub snr_points_db: Vec<f64>,
    pub seed: u64,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            chain: ChainConfig::default(),
            snr_points_db: vec![0.0, 4.0, 8.0, 12.0, 16.0, 20.0],
            seed: 1,
        }
    }
}

impl HarnessConfig {
    /// Parse a possibly partial JSON config, missing fields defaulted
    pub fn from_json(text: &str) -> SweepResult<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

/// Where the preamble really is in a received buffer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroundTruth {
    /// Fractional RX index of the first preamble sample
    pub boundary: f64,
    pub cfo_hz: f64,
    osr_rx: usize,
    preamble_samples: usize,
}

impl GroundTruth {
    pub fn new(cfg: &ChainConfig, channel: &Channel, draw: &PacketDraw) -> Self {
        let shift = channel.tx_shift(draw.delay_rx) as f64 / cfg.decimation() as f64;
        Self {
            boundary: (cfg.lead_silence_symbols * cfg.osr_rx) as f64 + shift,
            cfo_hz: draw.cfo_hz,
            osr_rx: cfg.osr_rx,
            preamble_samples: cfg.preamble.len() * cfg.osr_rx,
        }
    }

    /// Same packet placed `samples` into a longer stream
    pub fn offset_by(mut self, samples: usize) -> Self {
        self.boundary += samples as f64;
        self
    }

    /// Nearest sample to the preamble start
    pub fn detection(&self) -> usize {
        self.boundary.round().max(0.0) as usize
    }

    /// Boundary offset from `detection`, in `[0, osr_rx)`
    pub fn sto_from(&self, detection: usize) -> usize {
        (self.detection() as i64 - detection as i64).rem_euclid(self.osr_rx as i64) as usize
    }

    /// Timing error of `detection + sto` in symbol periods, wrapped to half a
    /// symbol either side
    pub fn sto_error(&self, detection: usize, sto: usize) -> f64 {
        let r = self.osr_rx as f64;
        wrap_centered((detection + sto) as f64 - self.boundary, r) / r
    }

    pub fn classify(&self, detection: usize, window: usize) -> DetectionClass {
        let d = detection as f64;
        if d + window as f64 <= self.boundary {
            DetectionClass::Early
        } else if d >= self.boundary + self.preamble_samples as f64 {
            DetectionClass::Late
        } else {
            DetectionClass::OnTime
        }
    }
}

/// Monte-Carlo sweep over SNR points
pub struct MonteCarlo {
    cfg: HarnessConfig,
    engine: SyncEngine,
    channel: Channel,
}

impl MonteCarlo {
    pub fn new(cfg: HarnessConfig) -> SweepResult<Self> {
        if cfg.snr_points_db.is_empty() {
            return Err(SweepError::NoSnrPoints);
        }
        let engine = SyncEngine::new(cfg.chain.clone())?;
        let channel = Channel::new(&cfg.chain)?;
        Ok(Self {
            cfg,
            engine,
            channel,
        })
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.cfg
    }

    pub fn channel(&self) -> &Channel {
        &self.channel
    }

    pub fn engine(&self) -> &SyncEngine {
        &self.engine
    }

    /// One row per SNR point, in configuration order
    pub fn run(&self) -> Vec<MetricsRow> {
        let chain = &self.cfg.chain;
        log::info!(
            "{} chain, {} packets x {} SNR points",
            self.engine.chain().name(),
            chain.n_packets,
            self.cfg.snr_points_db.len()
        );

        let per_packet: Vec<Vec<PacketOutcome>> = (0..chain.n_packets)
            .into_par_iter()
            .map(|p| self.run_packet(p as u64))
            .collect();

        let mut accs = vec![MetricsAccumulator::default(); self.cfg.snr_points_db.len()];
        for outcomes in &per_packet {
            for (acc, outcome) in accs.iter_mut().zip(outcomes) {
                acc.add(outcome, chain.payload_len);
            }
        }

        accs.into_iter()
            .zip(&self.cfg.snr_points_db)
            .map(|(acc, &snr)| {
                let row = acc.finish(snr, self.channel.effective_snr_db(snr));
                log::info!(
                    "{:5.1} dB: BER {:.3e} PER {:.3} miss {:.3} false {:.3}",
                    snr,
                    row.ber,
                    row.per,
                    row.miss_rate,
                    row.false_detection_rate
                );
                row
            })
            .collect()
    }

    /// Packet `packet` received at every SNR point
    pub fn run_packet(&self, packet: u64) -> Vec<PacketOutcome> {
        let chain = &self.cfg.chain;
        let mut rng = ChaCha8Rng::seed_from_u64(self.cfg.seed);
        rng.set_stream(packet);

        let draw = PacketDraw::draw(chain, &mut rng);
        let tx = frame_waveform(chain, &draw.payload);
        let clean = self.channel.propagate(&tx, draw.delay_rx, draw.cfo_hz);
        let truth = GroundTruth::new(chain, &self.channel, &draw);

        self.cfg
            .snr_points_db
            .iter()
            .map(|&snr| {
                let rx = self.channel.add_noise_and_filter(&clean, snr, &mut rng);
                self.evaluate(&rx, &draw, &truth)
            })
            .collect()
    }

    /// Ground-truth substitutions the configuration asks for
    pub fn overrides(&self, rx: &[Complex64], truth: &GroundTruth) -> StageOverrides {
        let ideal = self.cfg.chain.ideal;
        let detection = ideal.detection.then(|| truth.detection());

        let sto = if ideal.sto {
            // Truth is relative to wherever detection lands
            detection
                .or_else(|| self.engine.chain().preamble_detect(rx))
                .map_or(Stage::Estimate, |d| Stage::UseGroundTruth(truth.sto_from(d)))
        } else {
            Stage::Estimate
        };

        StageOverrides {
            detection: detection.map_or(Stage::Estimate, Stage::UseGroundTruth),
            cfo: if ideal.cfo {
                Stage::UseGroundTruth(truth.cfo_hz)
            } else {
                Stage::Estimate
            },
            sto,
        }
    }

    pub fn receive(&self, rx: &[Complex64], truth: &GroundTruth) -> SyncResult {
        self.engine.receive(rx, &self.overrides(rx, truth))
    }

    fn evaluate(&self, rx: &[Complex64], draw: &PacketDraw, truth: &GroundTruth) -> PacketOutcome {
        let chain = &self.cfg.chain;
        let window = chain.detection_window();
        let result = self.receive(rx, truth);

        let bit_errors = result.bit_errors(&draw.payload);
        let detection = result.detection.map(|d| truth.classify(d, window));
        if let (Some(d), Some(class)) = (result.detection, detection) {
            if class != DetectionClass::OnTime {
                log::debug!("{:?} detection at {}, preamble at {:.2}", class, d, truth.boundary);
            }
        }

        PacketOutcome {
            bit_errors,
            packet_error: result.bits.is_err() || bit_errors > 0,
            detection,
            cfo_error: result.cfo.map(|c| (c.hz - truth.cfo_hz) / chain.bit_rate),
            sto_error: result
                .detection
                .zip(result.sto)
                .map(|(d, s)| truth.sto_error(d, s)),
            ambiguous_cfo: result.cfo.map_or(false, |c| c.ambiguous),
            snr_estimate: windowed_variance_snr_db(rx, window),
        }
    }
}
