//! Receive chain: estimator variants and the per-packet engine
//!
//! The engine walks one buffer through
//! `Searching → Detected → CfoCorrected → StoCorrected → FrameAligned →
//! Demodulated`, asking the selected [`SyncChain`] for each estimate unless
//! the caller supplied ground truth for that stage.

use crate::codec::NoncoherentDemodulator;
use crate::config::{ChainConfig, ChainVariant};
use crate::error::{ConfigResult, SyncFailure};
use crate::sync::{
    correct_cfo, estimate_sto, extract_payload, find_frame_start, moose_estimate,
    multiscale_estimate, preamble_snr_db, CfoEstimate, PreambleDetector, StoMethod,
};
use crate::timing::FixedTiming;
use crate::traits::SyncChain;
use num_complex::Complex64;

/// Estimate a stage or substitute a known value
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Stage<T> {
    Estimate,
    UseGroundTruth(T),
}

impl<T> Default for Stage<T> {
    fn default() -> Self {
        Stage::Estimate
    }
}

impl<T: Copy> Stage<T> {
    /// The ground truth if set, otherwise whatever `estimate` produces
    pub fn resolve(&self, estimate: impl FnOnce() -> Option<T>) -> Option<T> {
        match self {
            Stage::Estimate => estimate(),
            Stage::UseGroundTruth(value) => Some(*value),
        }
    }

    pub fn is_ground_truth(&self) -> bool {
        matches!(self, Stage::UseGroundTruth(_))
    }
}

/// Per-stage substitutions for one packet
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StageOverrides {
    /// Preamble start index in the buffer
    pub detection: Stage<usize>,
    /// Carrier offset in Hz
    pub cfo: Stage<f64>,
    /// Boundary offset from the detection point, in `[0, osr_rx)`
    pub sto: Stage<usize>,
}

/// Furthest point a packet reached
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SyncState {
    Searching,
    Detected,
    CfoCorrected,
    StoCorrected,
    FrameAligned,
    Demodulated,
}

/// Outcome of one packet through the engine
#[derive(Debug, Clone, PartialEq)]
pub struct SyncResult {
    pub state: SyncState,
    pub detection: Option<usize>,
    pub cfo: Option<CfoEstimate>,
    pub sto: Option<usize>,
    pub snr_db: Option<f64>,
    /// Index of the first payload bit in the demodulated stream
    pub frame_start: Option<usize>,
    pub bits: Result<Vec<u8>, SyncFailure>,
}

impl SyncResult {
    fn failed(state: SyncState, failure: SyncFailure) -> Self {
        Self {
            state,
            detection: None,
            cfo: None,
            sto: None,
            snr_db: None,
            frame_start: None,
            bits: Err(failure),
        }
    }

    /// Bit errors against the transmitted payload; a failed packet counts
    /// every bit
    pub fn bit_errors(&self, truth: &[u8]) -> usize {
        match &self.bits {
            Ok(bits) => {
                let mismatched = bits.iter().zip(truth).filter(|(a, b)| a != b).count();
                mismatched + truth.len().abs_diff(bits.len())
            }
            Err(_) => truth.len(),
        }
    }
}

/// Parameters shared by both chain variants
struct ChainParams {
    detector: PreambleDetector,
    demod: NoncoherentDemodulator<FixedTiming>,
    sps: usize,
    sample_rate: f64,
    guard: usize,
    sto_symbols: usize,
    scales: Vec<usize>,
    tolerance: f64,
    span: usize,
}

impl ChainParams {
    fn new(cfg: &ChainConfig) -> Self {
        Self {
            detector: PreambleDetector::from_config(cfg),
            demod: NoncoherentDemodulator::new(cfg.modulation_index(), FixedTiming::rx(cfg)),
            sps: cfg.osr_rx,
            sample_rate: cfg.rx_sample_rate(),
            guard: cfg.cfo_guard_symbols,
            sto_symbols: cfg.sto_symbols,
            scales: cfg.cfo_scales.clone(),
            tolerance: cfg.cfo_ambiguity_tolerance,
            span: cfg.estimation_span(),
        }
    }

    /// Search every position whose estimation span fits the buffer
    fn search(&self, samples: &[Complex64]) -> Option<usize> {
        let until = (samples.len() + 1).saturating_sub(self.detector.required_after(self.span));
        self.detector.detect(samples, 0, until)
    }

    fn cfo_start(&self, detection: usize) -> usize {
        detection + self.guard * self.sps
    }
}

/// Single-scale Moose at the coarsest scale, raw-phase STO
pub struct BasicChain {
    params: ChainParams,
}

impl BasicChain {
    pub fn new(cfg: &ChainConfig) -> Self {
        Self {
            params: ChainParams::new(cfg),
        }
    }
}

impl SyncChain for BasicChain {
    fn name(&self) -> &'static str {
        "basic"
    }

    fn detector(&self) -> &PreambleDetector {
        &self.params.detector
    }

    fn preamble_detect(&self, samples: &[Complex64]) -> Option<usize> {
        self.params.search(samples)
    }

    fn cfo_estimation(&self, samples: &[Complex64], detection: usize) -> Option<CfoEstimate> {
        let p = &self.params;
        let scale = *p.scales.first()?;
        let hz = moose_estimate(samples, p.cfo_start(detection), scale * p.sps, p.sample_rate)?;
        Some(CfoEstimate {
            hz,
            ambiguous: false,
            scale,
        })
    }

    fn sto_estimation(&self, corrected: &[Complex64]) -> Option<usize> {
        let p = &self.params;
        estimate_sto(corrected, p.sps, p.guard, p.sto_symbols, StoMethod::Raw)
    }

    fn demodulate(&self, samples: &[Complex64]) -> Vec<u8> {
        self.params.demod.demodulate(samples)
    }
}

/// Multi-scale Moose, Savitzky–Golay smoothed STO
pub struct OptimizedChain {
    params: ChainParams,
}

impl OptimizedChain {
    pub fn new(cfg: &ChainConfig) -> Self {
        Self {
            params: ChainParams::new(cfg),
        }
    }
}

impl SyncChain for OptimizedChain {
    fn name(&self) -> &'static str {
        "optimized"
    }

    fn detector(&self) -> &PreambleDetector {
        &self.params.detector
    }

    fn preamble_detect(&self, samples: &[Complex64]) -> Option<usize> {
        self.params.search(samples)
    }

    fn cfo_estimation(&self, samples: &[Complex64], detection: usize) -> Option<CfoEstimate> {
        let p = &self.params;
        multiscale_estimate(
            samples,
            p.cfo_start(detection),
            &p.scales,
            p.sps,
            p.sample_rate,
            p.tolerance,
        )
    }

    fn sto_estimation(&self, corrected: &[Complex64]) -> Option<usize> {
        let p = &self.params;
        estimate_sto(corrected, p.sps, p.guard, p.sto_symbols, StoMethod::Smoothed)
    }

    fn demodulate(&self, samples: &[Complex64]) -> Vec<u8> {
        self.params.demod.demodulate(samples)
    }
}

/// Chain for the configured variant
pub fn build_chain(cfg: &ChainConfig) -> Box<dyn SyncChain> {
    match cfg.variant {
        ChainVariant::Basic => Box::new(BasicChain::new(cfg)),
        ChainVariant::Optimized => Box::new(OptimizedChain::new(cfg)),
    }
}

/// Whole-buffer receiver
pub struct SyncEngine {
    cfg: ChainConfig,
    chain: Box<dyn SyncChain>,
}

impl SyncEngine {
    /// Validate the configuration and build its chain variant
    pub fn new(cfg: ChainConfig) -> ConfigResult<Self> {
        cfg.validate()?;
        let chain = build_chain(&cfg);
        Ok(Self { cfg, chain })
    }

    pub fn config(&self) -> &ChainConfig {
        &self.cfg
    }

    pub fn chain(&self) -> &dyn SyncChain {
        self.chain.as_ref()
    }

    /// Run one received buffer through every stage
    pub fn receive(&self, samples: &[Complex64], overrides: &StageOverrides) -> SyncResult {
        let cfg = &self.cfg;
        let chain = self.chain.as_ref();

        let detection = overrides
            .detection
            .resolve(|| chain.preamble_detect(samples))
            .filter(|&d| d < samples.len());
        let Some(det) = detection else {
            log::debug!("{}: no preamble in {} samples", chain.name(), samples.len());
            return SyncResult::failed(SyncState::Searching, SyncFailure::PreambleMiss);
        };

        let snr_db = preamble_snr_db(
            samples,
            det,
            cfg.preamble.len() * cfg.osr_rx,
            chain.detector().window(),
        );

        let cfo = match overrides.cfo {
            Stage::UseGroundTruth(hz) => Some(CfoEstimate::exact(hz)),
            Stage::Estimate => chain.cfo_estimation(samples, det),
        };
        let cfo_hz = cfo.map_or(0.0, |c| c.hz);
        let corrected = correct_cfo(&samples[det..], cfo_hz, cfg.rx_sample_rate(), 0);

        let sto = overrides
            .sto
            .resolve(|| chain.sto_estimation(&corrected))
            .map(|s| s % cfg.osr_rx);
        log::debug!(
            "{}: detection {} cfo {:.1} Hz sto {:?}",
            chain.name(),
            det,
            cfo_hz,
            sto
        );

        // A stage without an estimate holds the state where it was
        let mut state = SyncState::Detected;
        if cfo.is_some() {
            state = SyncState::CfoCorrected;
        }
        if state == SyncState::CfoCorrected && sto.is_some() {
            state = SyncState::StoCorrected;
        }

        let mut result = SyncResult {
            state,
            detection: Some(det),
            cfo,
            sto,
            snr_db,
            frame_start: None,
            bits: Err(SyncFailure::FrameLengthMismatch {
                expected: cfg.payload_len,
                actual: 0,
            }),
        };

        let aligned = &corrected[sto.unwrap_or(0).min(corrected.len())..];
        let bits = chain.demodulate(aligned);

        let fixed_start =
            overrides.detection.is_ground_truth() && overrides.sto.is_ground_truth();
        let frame_start = if fixed_start {
            Some(cfg.preamble.len() + cfg.sync_word.len())
        } else {
            find_frame_start(&bits, &cfg.sync_word)
        };
        let Some(start) = frame_start else {
            log::debug!("{}: {} bits, too few for the sync word", chain.name(), bits.len());
            return result;
        };
        result.frame_start = Some(start);
        if result.state == SyncState::StoCorrected {
            result.state = SyncState::FrameAligned;
        }

        result.bits = extract_payload(&bits, start, cfg.payload_len);
        if result.bits.is_ok() && result.state == SyncState::FrameAligned {
            result.state = SyncState::Demodulated;
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::modulate_at;
    use crate::config::DetectorKind;
    use crate::carriers::Nco;
    use crate::traits::Carrier;

    fn payload(n: usize) -> Vec<u8> {
        (0..n).map(|i| ((i * 7 + i / 3) % 5 < 2) as u8).collect()
    }

    /// Silence, frame at the RX rate, silence, with the given boundary shift
    fn packet(cfg: &ChainConfig, lead: usize, cfo_hz: f64) -> (Vec<Complex64>, Vec<u8>) {
        let data = payload(cfg.payload_len);
        let mut rx = vec![Complex64::new(0.0, 0.0); lead];
        rx.extend(modulate_at(&cfg.frame_bits(&data), cfg, cfg.osr_rx));
        rx.extend(vec![Complex64::new(0.0, 0.0); cfg.tail_silence_symbols * cfg.osr_rx]);
        let rx = Nco::new(cfo_hz, cfg.rx_sample_rate()).mix(&rx);
        (rx, data)
    }

    #[test]
    fn test_stage_resolve() {
        assert_eq!(Stage::UseGroundTruth(5).resolve(|| Some(9)), Some(5));
        assert_eq!(Stage::<usize>::Estimate.resolve(|| Some(9)), Some(9));
        assert_eq!(Stage::<usize>::Estimate.resolve(|| None), None);
    }

    #[test]
    fn test_engine_rejects_bad_config() {
        let cfg = ChainConfig {
            osr_tx: 60,
            ..ChainConfig::default()
        };
        assert!(SyncEngine::new(cfg).is_err());
    }

    #[test]
    fn test_build_chain_variant() {
        let mut cfg = ChainConfig::default();
        assert_eq!(build_chain(&cfg).name(), "optimized");
        cfg.variant = ChainVariant::Basic;
        assert_eq!(build_chain(&cfg).name(), "basic");
    }

    #[test]
    fn test_clean_packet_both_variants() {
        for variant in [ChainVariant::Basic, ChainVariant::Optimized] {
            let cfg = ChainConfig {
                variant,
                ..ChainConfig::default()
            };
            let engine = SyncEngine::new(cfg.clone()).unwrap();
            let (rx, data) = packet(&cfg, 203, 0.0);
            let result = engine.receive(&rx, &StageOverrides::default());

            assert_eq!(result.state, SyncState::Demodulated);
            assert_eq!(result.detection, Some(203));
            assert_eq!(result.sto, Some(0));
            assert_eq!(result.frame_start, Some(64));
            assert_eq!(result.bits, Ok(data));
        }
    }

    #[test]
    fn test_packet_with_cfo() {
        let cfg = ChainConfig::default();
        let engine = SyncEngine::new(cfg.clone()).unwrap();
        let (rx, data) = packet(&cfg, 320, -7300.0);
        let result = engine.receive(&rx, &StageOverrides::default());

        let cfo = result.cfo.unwrap();
        assert!((cfo.hz + 7300.0).abs() < 1.0, "cfo {:?}", cfo);
        assert_eq!(result.bits, Ok(data));
    }

    #[test]
    fn test_ratio_detector_packet() {
        let cfg = ChainConfig {
            detector: DetectorKind::Ratio { threshold: 2.0 },
            ..ChainConfig::default()
        };
        let engine = SyncEngine::new(cfg.clone()).unwrap();
        let (rx, data) = packet(&cfg, 320, 0.0);
        let result = engine.receive(&rx, &StageOverrides::default());
        assert_eq!(result.detection, Some(320));
        assert_eq!(result.bits, Ok(data));
    }

    #[test]
    fn test_all_zero_input_is_miss() {
        let engine = SyncEngine::new(ChainConfig::default()).unwrap();
        let rx = vec![Complex64::new(0.0, 0.0); 2000];
        let result = engine.receive(&rx, &StageOverrides::default());
        assert_eq!(result.state, SyncState::Searching);
        assert_eq!(result.bits, Err(SyncFailure::PreambleMiss));
        assert_eq!(result.bit_errors(&payload(50)), 50);
    }

    #[test]
    fn test_ground_truth_stages() {
        let cfg = ChainConfig::default();
        let engine = SyncEngine::new(cfg.clone()).unwrap();
        let (rx, data) = packet(&cfg, 320, 1500.0);
        let overrides = StageOverrides {
            detection: Stage::UseGroundTruth(320),
            cfo: Stage::UseGroundTruth(1500.0),
            sto: Stage::UseGroundTruth(0),
        };
        let result = engine.receive(&rx, &overrides);
        assert_eq!(result.cfo, Some(CfoEstimate::exact(1500.0)));
        assert_eq!(result.frame_start, Some(64));
        assert_eq!(result.bits, Ok(data));
    }

    #[test]
    fn test_truncated_packet_is_length_mismatch() {
        let cfg = ChainConfig::default();
        let engine = SyncEngine::new(cfg.clone()).unwrap();
        let (rx, _) = packet(&cfg, 320, 0.0);
        // Cut 20 payload bits off the end
        let cut = 320 + (cfg.frame_len_bits() - 20) * cfg.osr_rx;
        let result = engine.receive(&rx[..cut], &StageOverrides::default());
        assert_eq!(result.state, SyncState::FrameAligned);
        assert_eq!(
            result.bits,
            Err(SyncFailure::FrameLengthMismatch {
                expected: 50,
                actual: 30
            })
        );
    }

    #[test]
    fn test_state_stops_without_cfo() {
        let cfg = ChainConfig::default();
        let engine = SyncEngine::new(cfg.clone()).unwrap();
        let (rx, _) = packet(&cfg, 320, 0.0);
        // Too close to the end for any Moose block
        let overrides = StageOverrides {
            detection: Stage::UseGroundTruth(rx.len() - 20),
            ..StageOverrides::default()
        };
        let result = engine.receive(&rx, &overrides);
        assert_eq!(result.detection, Some(rx.len() - 20));
        assert_eq!(result.cfo, None);
        assert_eq!(result.state, SyncState::Detected);
        assert!(result.bits.is_err());
    }

    #[test]
    fn test_state_with_supplied_cfo_and_no_sto() {
        let cfg = ChainConfig::default();
        let engine = SyncEngine::new(cfg.clone()).unwrap();
        let (rx, _) = packet(&cfg, 320, 0.0);
        let overrides = StageOverrides {
            detection: Stage::UseGroundTruth(rx.len() - 20),
            cfo: Stage::UseGroundTruth(0.0),
            ..StageOverrides::default()
        };
        let result = engine.receive(&rx, &overrides);
        assert_eq!(result.sto, None);
        assert_eq!(result.state, SyncState::CfoCorrected);
    }

    #[test]
    fn test_bit_errors_counts_mismatches() {
        let result = SyncResult {
            state: SyncState::Demodulated,
            detection: Some(0),
            cfo: None,
            sto: None,
            snr_db: None,
            frame_start: Some(0),
            bits: Ok(vec![1, 0, 1, 1]),
        };
        assert_eq!(result.bit_errors(&[1, 1, 1, 0]), 2);
    }
}
