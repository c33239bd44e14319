//! Non-coherent CPFSK demodulator
//!
//! Correlates each symbol against the two reference tones and keeps the
//! larger magnitude. Insensitive to carrier phase, so it needs symbol timing
//! but no phase recovery.

use crate::traits::SymbolTiming;
use num_complex::Complex64;
use std::f64::consts::PI;

/// Correlator outputs for one symbol
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToneMagnitudes {
    /// |correlation| against the `+Δf` tone
    pub mark: f64,
    /// |correlation| against the `-Δf` tone
    pub space: f64,
}

impl ToneMagnitudes {
    pub fn bit(&self) -> u8 {
        (self.mark > self.space) as u8
    }
}

/// Two-tone correlator bank
pub struct NoncoherentDemodulator<T: SymbolTiming> {
    timing: T,
    /// Conjugated `+Δf` reference over one symbol
    mark_ref: Vec<Complex64>,
    /// Conjugated `-Δf` reference over one symbol
    space_ref: Vec<Complex64>,
}

impl<T: SymbolTiming> NoncoherentDemodulator<T> {
    /// Create a new demodulator
    ///
    /// # Arguments
    /// * `modulation_index` - `h = 2·Δf/B`
    /// * `timing` - Receiver symbol timing
    pub fn new(modulation_index: f64, timing: T) -> Self {
        let sps = timing.samples_per_symbol();
        let step = modulation_index * PI / sps as f64;
        let mark_ref = (0..sps)
            .map(|k| Complex64::from_polar(1.0, -step * k as f64))
            .collect();
        let space_ref = (0..sps)
            .map(|k| Complex64::from_polar(1.0, step * k as f64))
            .collect();

        Self {
            timing,
            mark_ref,
            space_ref,
        }
    }

    /// Correlator magnitudes for every whole symbol
    pub fn correlate(&self, samples: &[Complex64]) -> Vec<ToneMagnitudes> {
        let sps = self.timing.samples_per_symbol();
        samples
            .chunks_exact(sps)
            .map(|row| {
                let mark: Complex64 = row.iter().zip(&self.mark_ref).map(|(x, r)| x * r).sum();
                let space: Complex64 = row.iter().zip(&self.space_ref).map(|(x, r)| x * r).sum();
                ToneMagnitudes {
                    mark: mark.norm(),
                    space: space.norm(),
                }
            })
            .collect()
    }

    /// Hard decisions, `|r1| > |r0| → 1`
    pub fn demodulate(&self, samples: &[Complex64]) -> Vec<u8> {
        self.correlate(samples).iter().map(ToneMagnitudes::bit).collect()
    }

    /// Get reference to timing
    pub fn timing(&self) -> &T {
        &self.timing
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::CpfskModulator;
    use crate::timing::FixedTiming;

    #[test]
    fn test_orthogonal_tones_at_unity_index() {
        let timing = FixedTiming::new(50_000.0, 8);
        let samples = CpfskModulator::new(1.0, timing).modulate(&[1, 0]);
        let demod = NoncoherentDemodulator::new(1.0, timing);
        let mags = demod.correlate(&samples);

        assert!((mags[0].mark - 8.0).abs() < 1e-9);
        assert!(mags[0].space < 1e-9);
        assert!(mags[1].mark < 1e-9);
        assert!((mags[1].space - 8.0).abs() < 1e-9);
    }

    #[test]
    fn test_phase_insensitive() {
        let timing = FixedTiming::new(50_000.0, 8);
        let bits = [0, 1, 1, 0, 1];
        let rotated: Vec<Complex64> = CpfskModulator::new(1.0, timing)
            .modulate(&bits)
            .into_iter()
            .map(|s| s * Complex64::from_polar(1.0, 2.1))
            .collect();
        let demod = NoncoherentDemodulator::new(1.0, timing);
        assert_eq!(demod.demodulate(&rotated), bits.to_vec());
    }

    #[test]
    fn test_short_input_yields_no_bits() {
        let demod = NoncoherentDemodulator::new(1.0, FixedTiming::new(50_000.0, 8));
        let samples = vec![Complex64::new(1.0, 0.0); 7];
        assert!(demod.demodulate(&samples).is_empty());
    }
}
