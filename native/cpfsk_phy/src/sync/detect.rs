//! Preamble detection
//!
//! Two energy detectors behind one type. Both report the history they read
//! before a candidate position and the lookahead they read after it, so a
//! streaming caller can evaluate exactly the positions a whole-buffer pass
//! would.

use crate::config::{ChainConfig, DetectorKind};
use num_complex::Complex64;

/// Added to the long-window mean so silence never divides by zero
pub const RATIO_REGULARIZER: f64 = 1e-3;

/// Long window length in short windows for the ratio detector
const RATIO_LONG_WINDOWS: usize = 4;

/// Preamble energy detector
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PreambleDetector {
    /// First window whose energy `Σ|x|²` exceeds `threshold`
    Threshold { window: usize, threshold: f64 },
    /// Short-window mean over preceding long-window mean; the first crossing
    /// opens a peak search over the next `window` positions
    Ratio { window: usize, threshold: f64 },
}

impl PreambleDetector {
    pub fn from_config(cfg: &ChainConfig) -> Self {
        let window = cfg.detection_window();
        match cfg.detector {
            // Unit-amplitude signal fills a window with energy L
            DetectorKind::Threshold => Self::Threshold {
                window,
                threshold: window as f64 - 1.0,
            },
            DetectorKind::Ratio { threshold } => Self::Ratio { window, threshold },
        }
    }

    pub fn window(&self) -> usize {
        match *self {
            Self::Threshold { window, .. } | Self::Ratio { window, .. } => window,
        }
    }

    /// Samples read before a candidate position
    pub fn history(&self) -> usize {
        match *self {
            Self::Threshold { .. } => 0,
            Self::Ratio { window, .. } => RATIO_LONG_WINDOWS * window,
        }
    }

    /// Samples read from a candidate position onward, peak search included
    pub fn lookahead(&self) -> usize {
        match *self {
            Self::Threshold { window, .. } => window,
            Self::Ratio { window, .. } => 2 * window - 1,
        }
    }

    /// Largest distance between the triggering position and the reported
    /// detection
    pub fn max_offset(&self) -> usize {
        match *self {
            Self::Threshold { .. } => 0,
            Self::Ratio { window, .. } => window - 1,
        }
    }

    /// Samples that must follow a candidate position for it to be searched
    /// when `span` more samples are needed after the detection
    pub fn required_after(&self, span: usize) -> usize {
        self.lookahead().max(self.max_offset() + span)
    }

    /// Search candidate positions in `[from, until)`
    ///
    /// Positions without enough history or lookahead inside `samples` are
    /// skipped. Returns the detected preamble start.
    pub fn detect(&self, samples: &[Complex64], from: usize, until: usize) -> Option<usize> {
        let first = from.max(self.history());
        let last = until.min((samples.len() + 1).saturating_sub(self.lookahead()));
        (first..last).find_map(|n| self.evaluate(samples, n))
    }

    /// Detection triggered at exactly position `n`, if any
    fn evaluate(&self, samples: &[Complex64], n: usize) -> Option<usize> {
        match *self {
            Self::Threshold { window, threshold } => {
                (window_energy(samples, n, window) > threshold).then_some(n)
            }
            Self::Ratio { window, threshold } => {
                if self.ratio(samples, n, window) <= threshold {
                    return None;
                }
                let mut best = n;
                let mut best_ratio = f64::NEG_INFINITY;
                for m in n..n + window {
                    let r = self.ratio(samples, m, window);
                    if r > best_ratio {
                        best = m;
                        best_ratio = r;
                    }
                }
                Some(best)
            }
        }
    }

    fn ratio(&self, samples: &[Complex64], n: usize, window: usize) -> f64 {
        let long = RATIO_LONG_WINDOWS * window;
        let short_mean = window_energy(samples, n, window) / window as f64;
        let long_mean = window_energy(samples, n - long, long) / long as f64;
        short_mean / (long_mean + RATIO_REGULARIZER)
    }
}

/// `Σ|x|²` over `samples[start..start + len]`
///
/// Summed directly for every window so the value does not depend on where a
/// buffer happened to begin.
fn window_energy(samples: &[Complex64], start: usize, len: usize) -> f64 {
    samples[start..start + len].iter().map(|s| s.norm_sqr()).sum()
}
