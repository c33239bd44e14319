//! SNR estimates from received samples
//!
//! Two independent views: the in-packet estimate compares preamble power
//! against the quiet stretch before detection, the windowed-variance estimate
//! needs no timing at all and is used as a cross-check and as the noise-floor
//! source for the streaming side channel.

use crate::utils::{mean_power, power_to_db};
use num_complex::Complex64;

/// Smallest noise power used in a ratio
pub const NOISE_FLOOR: f64 = 1e-12;

fn ratio_db(signal: f64, noise: f64) -> f64 {
    power_to_db(signal.max(NOISE_FLOOR) / noise.max(NOISE_FLOOR))
}

/// Preamble SNR in dB
///
/// Signal-plus-noise power over `preamble_len` samples from `detection`,
/// noise power over the `noise_window` samples before it.
pub fn preamble_snr_db(
    samples: &[Complex64],
    detection: usize,
    preamble_len: usize,
    noise_window: usize,
) -> Option<f64> {
    if noise_window == 0 || detection < noise_window || detection + preamble_len > samples.len() {
        return None;
    }
    let noise = mean_power(&samples[detection - noise_window..detection]);
    let total = mean_power(&samples[detection..detection + preamble_len]);
    Some(ratio_db(total - noise, noise))
}

/// Variance of each non-overlapping `window`-sample block
pub fn window_variances(samples: &[Complex64], window: usize) -> Vec<f64> {
    if window == 0 {
        return Vec::new();
    }
    samples
        .chunks_exact(window)
        .map(|w| {
            let mean = w.iter().sum::<Complex64>() / window as f64;
            w.iter().map(|s| (s - mean).norm_sqr()).sum::<f64>() / window as f64
        })
        .collect()
}

/// Blind SNR in dB from the spread of block variances
///
/// The quietest block is taken as noise, the loudest as signal plus noise.
/// Needs at least two blocks.
pub fn windowed_variance_snr_db(samples: &[Complex64], window: usize) -> Option<f64> {
    let vars = window_variances(samples, window);
    if vars.len() < 2 {
        return None;
    }
    let noise = vars.iter().copied().fold(f64::INFINITY, f64::min);
    let loudest = vars.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    Some(ratio_db(loudest - noise, noise))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn burst(lead: usize, body: usize, noise: f64) -> Vec<Complex64> {
        // Deterministic pseudo-noise of the requested power
        let n = |k: usize| {
            let a = (k as f64 * 1.618_033_988).fract() * std::f64::consts::TAU;
            Complex64::from_polar(noise.sqrt(), a)
        };
        let mut v: Vec<Complex64> = (0..lead).map(n).collect();
        v.extend((0..body).map(|k| Complex64::from_polar(1.0, 0.4 * k as f64) + n(lead + k)));
        v
    }

    #[test]
    fn test_preamble_snr_tracks_noise() {
        let rx = burst(64, 256, 0.01);
        let snr = preamble_snr_db(&rx, 64, 256, 32).unwrap();
        assert!((snr - 20.0).abs() < 1.5, "snr {}", snr);
    }

    #[test]
    fn test_preamble_snr_needs_noise_window() {
        let rx = burst(16, 256, 0.01);
        assert_eq!(preamble_snr_db(&rx, 16, 256, 32), None);
    }

    #[test]
    fn test_noiseless_snr_is_large_and_finite() {
        let rx = burst(64, 256, 0.0);
        let snr = preamble_snr_db(&rx, 64, 256, 32).unwrap();
        assert!(snr.is_finite() && snr > 100.0);
    }

    #[test]
    fn test_window_variances_constant_block() {
        let rx = vec![Complex64::new(2.0, -1.0); 64];
        for v in window_variances(&rx, 32) {
            assert!(v.abs() < 1e-12);
        }
    }

    #[test]
    fn test_windowed_variance_snr() {
        let rx = burst(128, 512, 0.1);
        let snr = windowed_variance_snr_db(&rx, 32).unwrap();
        assert!((snr - 10.0).abs() < 2.0, "snr {}", snr);
        assert_eq!(windowed_variance_snr_db(&rx[..40], 32), None);
    }
}
