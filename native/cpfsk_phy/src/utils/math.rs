//! Small DSP math helpers

use num_complex::Complex64;
use std::f64::consts::{PI, TAU};

/// Convert a power ratio in dB to linear scale
#[inline]
pub fn db_to_power(db: f64) -> f64 {
    10.0_f64.powf(db / 10.0)
}

/// Convert a linear power ratio to dB
#[inline]
pub fn power_to_db(linear: f64) -> f64 {
    10.0 * linear.log10()
}

/// Mean of |x|² over a block, 0 for an empty block
#[inline]
pub fn mean_power(samples: &[Complex64]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    samples.iter().map(|s| s.norm_sqr()).sum::<f64>() / samples.len() as f64
}

/// Wrap an angle into [-π, π)
#[inline]
pub fn wrap_phase(angle: f64) -> f64 {
    (angle + PI).rem_euclid(TAU) - PI
}

/// Wrap `value` into [-period/2, period/2)
#[inline]
pub fn wrap_centered(value: f64, period: f64) -> f64 {
    (value + period / 2.0).rem_euclid(period) - period / 2.0
}

/// Instantaneous phase of each sample, unwrapped so consecutive values never
/// differ by more than π
pub fn unwrapped_phase(samples: &[Complex64]) -> Vec<f64> {
    let mut out = Vec::with_capacity(samples.len());
    let mut prev = 0.0;
    for (i, s) in samples.iter().enumerate() {
        let raw = s.arg();
        let value = if i == 0 {
            raw
        } else {
            prev + wrap_phase(raw - prev)
        };
        out.push(value);
        prev = value;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_conversion() {
        assert!((db_to_power(0.0) - 1.0).abs() < 1e-10);
        assert!((db_to_power(20.0) - 100.0).abs() < 1e-10);
        assert!((power_to_db(0.1) + 10.0).abs() < 1e-10);
    }

    #[test]
    fn test_wrap_phase() {
        assert!(wrap_phase(0.0).abs() < 1e-12);
        assert!((wrap_phase(3.0 * PI / 2.0) + PI / 2.0).abs() < 1e-12);
        assert!((wrap_phase(-3.0 * PI / 2.0) - PI / 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_wrap_centered() {
        assert_eq!(wrap_centered(7.0, 8.0), -1.0);
        assert_eq!(wrap_centered(-4.0, 8.0), -4.0);
        assert_eq!(wrap_centered(4.0, 8.0), -4.0);
        assert_eq!(wrap_centered(3.5, 8.0), 3.5);
    }

    #[test]
    fn test_unwrapped_phase_ramp() {
        let step = 2.5;
        let samples: Vec<Complex64> = (0..40)
            .map(|k| Complex64::from_polar(1.0, step * k as f64))
            .collect();
        let phase = unwrapped_phase(&samples);
        for w in phase.windows(2) {
            assert!((w[1] - w[0] - step).abs() < 1e-9);
        }
    }

    #[test]
    fn test_mean_power() {
        assert_eq!(mean_power(&[]), 0.0);
        let s = [Complex64::new(3.0, 4.0), Complex64::new(0.0, 1.0)];
        assert!((mean_power(&s) - 13.0).abs() < 1e-12);
    }
}
