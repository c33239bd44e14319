//! Numerically Controlled Oscillator (NCO)
//!
//! Complex rotator for frequency shifting baseband samples.
//! Phase is derived from an absolute elapsed-sample counter, so a stream
//! processed in arbitrary chunks sees exactly the rotation an offline pass
//! over the concatenated samples would.

use crate::traits::Carrier;
use num_complex::Complex64;
use std::f64::consts::TAU;

/// Numerically Controlled Oscillator
#[derive(Debug, Clone)]
pub struct Nco {
    freq_hz: f64,
    sample_rate: f64,
    elapsed: u64,
}

impl Nco {
    /// Create a new NCO
    ///
    /// # Arguments
    /// * `freq_hz` - Rotation frequency in Hz, negative to rotate clockwise
    /// * `sample_rate` - Sample rate in Hz
    pub fn new(freq_hz: f64, sample_rate: f64) -> Self {
        Self::starting_at(freq_hz, sample_rate, 0)
    }

    /// Create an NCO whose elapsed counter already reads `elapsed`
    pub fn starting_at(freq_hz: f64, sample_rate: f64, elapsed: u64) -> Self {
        Self {
            freq_hz,
            sample_rate,
            elapsed,
        }
    }

    /// Rotator value at an absolute sample index
    #[inline]
    pub fn rotator_at(&self, n: u64) -> Complex64 {
        // Cycles are reduced before scaling by 2π to keep precision at large n
        let cycles = (self.freq_hz * n as f64 / self.sample_rate).fract();
        Complex64::from_polar(1.0, TAU * cycles)
    }
}

impl Carrier for Nco {
    fn next(&mut self) -> Complex64 {
        let out = self.rotator_at(self.elapsed);
        self.elapsed += 1;
        out
    }

    fn reset(&mut self) {
        self.elapsed = 0;
    }

    fn skip(&mut self, samples: u64) {
        self.elapsed += samples;
    }

    fn elapsed(&self) -> u64 {
        self.elapsed
    }

    fn phase(&self) -> f64 {
        TAU * (self.freq_hz * self.elapsed as f64 / self.sample_rate).fract()
    }

    fn frequency(&self) -> f64 {
        self.freq_hz
    }
}
