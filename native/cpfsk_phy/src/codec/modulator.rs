//! CPFSK Modulator
//!
//! Phase-continuous binary FSK. Each symbol sweeps the phase linearly by
//! `±h·π`, so the instantaneous frequency is `±Δf` with no phase jump at
//! symbol boundaries.

use crate::traits::SymbolTiming;
use crate::utils::wrap_phase;
use num_complex::Complex64;
use std::f64::consts::PI;

/// CPFSK modulator with a running phase accumulator
///
/// # Type Parameters
/// * `T` - Symbol timing (samples per symbol)
pub struct CpfskModulator<T: SymbolTiming> {
    timing: T,
    /// Phase swept over one symbol, `h·π`
    symbol_phase: f64,
    phase: f64,
}

impl<T: SymbolTiming> CpfskModulator<T> {
    /// Create a new modulator
    ///
    /// # Arguments
    /// * `modulation_index` - `h = 2·Δf/B`
    /// * `timing` - Symbol timing
    pub fn new(modulation_index: f64, timing: T) -> Self {
        Self {
            timing,
            symbol_phase: modulation_index * PI,
            phase: 0.0,
        }
    }

    /// Modulate bits to unit-amplitude complex samples
    ///
    /// Sample 0 of each symbol carries the phase reached at the end of the
    /// previous symbol.
    pub fn modulate(&mut self, bits: &[u8]) -> Vec<Complex64> {
        let sps = self.timing.samples_per_symbol();
        let step = self.symbol_phase / sps as f64;
        let mut output = Vec::with_capacity(bits.len() * sps);

        for &bit in bits {
            let dir = if bit != 0 { 1.0 } else { -1.0 };
            for k in 0..sps {
                output.push(Complex64::from_polar(1.0, self.phase + dir * step * k as f64));
            }
            self.phase = wrap_phase(self.phase + dir * self.symbol_phase);
        }

        output
    }

    /// Return the phase accumulator to zero
    pub fn reset(&mut self) {
        self.phase = 0.0;
    }

    /// Phase at the start of the next symbol
    pub fn phase(&self) -> f64 {
        self.phase
    }

    /// Get reference to timing
    pub fn timing(&self) -> &T {
        &self.timing
    }
}
