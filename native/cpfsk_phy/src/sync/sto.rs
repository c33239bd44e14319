//! Symbol timing offset by phase curvature
//!
//! CPFSK phase is piecewise linear with a kink at every symbol boundary where
//! the bit flips. The magnitude of the second difference of the unwrapped
//! phase peaks at those kinks; folding it modulo the oversampling ratio and
//! taking the strongest bin gives the boundary offset.

use crate::utils::unwrapped_phase;
use num_complex::Complex64;

/// Quadratic 5-point Savitzky–Golay smoothing weights, scaled by 35
const SG5_WEIGHTS: [f64; 5] = [-3.0, 12.0, 17.0, 12.0, -3.0];
const SG5_NORM: f64 = 35.0;

/// Phase conditioning before differentiation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoMethod {
    Raw,
    Smoothed,
}

/// 5-point quadratic Savitzky–Golay smoother
///
/// The two samples at each edge have no full neighbourhood and are copied
/// unchanged.
pub fn savitzky_golay5(x: &[f64]) -> Vec<f64> {
    let mut out = x.to_vec();
    if x.len() < SG5_WEIGHTS.len() {
        return out;
    }
    for (i, w) in x.windows(SG5_WEIGHTS.len()).enumerate() {
        let acc: f64 = w.iter().zip(&SG5_WEIGHTS).map(|(a, b)| a * b).sum();
        out[i + 2] = acc / SG5_NORM;
    }
    out
}

/// Estimate the symbol boundary offset in `[0, samples_per_symbol)`
///
/// `corrected` starts at the detection point and should already be CFO
/// corrected. The phase is read over `span_symbols` symbols beginning
/// `guard_symbols` symbols in. Returns `None` if that range runs past the
/// buffer.
pub fn estimate_sto(
    corrected: &[Complex64],
    samples_per_symbol: usize,
    guard_symbols: usize,
    span_symbols: usize,
    method: StoMethod,
) -> Option<usize> {
    let sps = samples_per_symbol;
    let start = guard_symbols * sps;
    let end = start + span_symbols * sps;
    if sps == 0 || span_symbols < 2 || end > corrected.len() {
        return None;
    }

    let mut phase = unwrapped_phase(&corrected[start..end]);
    if method == StoMethod::Smoothed {
        phase = savitzky_golay5(&phase);
    }

    let d1: Vec<f64> = phase.windows(2).map(|w| w[1] - w[0]).collect();
    let mut bins = vec![0.0; sps];
    for (i, w) in d1.windows(2).enumerate() {
        bins[i % sps] += (w[1] - w[0]).abs();
    }

    // Second difference at index i is centred on sample i + 1
    let peak = bins
        .iter()
        .enumerate()
        .fold((0, f64::NEG_INFINITY), |best, (i, &v)| if v > best.1 { (i, v) } else { best })
        .0;
    Some((peak + 1) % sps)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::modulate_at;
    use crate::config::{ChainConfig, PREAMBLE_BITS};

    fn shifted_preamble(shift: usize) -> Vec<Complex64> {
        let cfg = ChainConfig::default();
        let clean = modulate_at(&PREAMBLE_BITS, &cfg, cfg.osr_rx);
        // Detection `shift` samples before the true boundary
        let mut rx = vec![clean[0]; shift];
        rx.extend(clean);
        rx
    }

    #[test]
    fn test_sto_aligned() {
        let rx = shifted_preamble(0);
        assert_eq!(estimate_sto(&rx, 8, 2, 16, StoMethod::Raw), Some(0));
        assert_eq!(estimate_sto(&rx, 8, 2, 16, StoMethod::Smoothed), Some(0));
    }

    #[test]
    fn test_sto_every_shift() {
        for shift in 0..8 {
            let rx = shifted_preamble(shift);
            for method in [StoMethod::Raw, StoMethod::Smoothed] {
                assert_eq!(
                    estimate_sto(&rx, 8, 2, 16, method),
                    Some(shift),
                    "shift {} {:?}",
                    shift,
                    method
                );
            }
        }
    }

    #[test]
    fn test_sto_span_past_end() {
        let rx = shifted_preamble(0);
        assert_eq!(estimate_sto(&rx[..100], 8, 2, 16, StoMethod::Raw), None);
    }

    #[test]
    fn test_savitzky_golay_preserves_quadratic() {
        let x: Vec<f64> = (0..12).map(|i| 0.5 * (i * i) as f64 - 2.0 * i as f64).collect();
        let y = savitzky_golay5(&x);
        for (a, b) in x.iter().zip(&y) {
            assert!((a - b).abs() < 1e-9);
        }
    }

    #[test]
    fn test_savitzky_golay_short_input_unchanged() {
        assert_eq!(savitzky_golay5(&[1.0, 2.0, 3.0]), vec![1.0, 2.0, 3.0]);
    }
}
