//! SyncChain trait - Receiver estimator set
//!
//! One implementation per chain variant, selected when the chain is built.
//! The engine drives the stages in order and substitutes ground truth where
//! an evaluation asks for it; implementations only estimate.

use num_complex::Complex64;

use crate::sync::{CfoEstimate, PreambleDetector};

/// Receiver estimator set
pub trait SyncChain: Send + Sync {
    /// Short variant name for logs and reports
    fn name(&self) -> &'static str;

    /// Detector used for preamble search
    fn detector(&self) -> &PreambleDetector;

    /// Preamble start index, searching every window whose estimation span
    /// still fits inside `samples`
    fn preamble_detect(&self, samples: &[Complex64]) -> Option<usize>;

    /// CFO in Hz from the preamble following `detection`
    fn cfo_estimation(&self, samples: &[Complex64], detection: usize) -> Option<CfoEstimate>;

    /// Symbol boundary offset in `[0, osr_rx)` relative to the first sample
    /// of `corrected`, which starts at the detection point
    fn sto_estimation(&self, corrected: &[Complex64]) -> Option<usize>;

    /// Hard bit decisions, one per whole symbol of `samples`
    fn demodulate(&self, samples: &[Complex64]) -> Vec<u8>;
}
