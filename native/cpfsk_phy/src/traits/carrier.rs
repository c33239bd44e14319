//! Carrier trait - Complex oscillator for frequency shifting
//!
//! Used both to inject a carrier frequency offset in the channel model and to
//! counter-rotate it at the receiver. Phase is a function of the number of
//! samples elapsed since the reference point, never of per-call state.

use num_complex::Complex64;

/// Complex oscillator trait
///
/// Implementations generate `exp(j·2π·f·n/fs)` for an absolute sample count `n`.
pub trait Carrier: Send + Sync {
    /// Get the next rotator sample and advance the elapsed counter
    fn next(&mut self) -> Complex64;

    /// Rewind the elapsed counter to the reference point
    fn reset(&mut self);

    /// Advance the elapsed counter without producing samples
    fn skip(&mut self, samples: u64);

    /// Samples elapsed since the reference point
    fn elapsed(&self) -> u64;

    /// Current phase in radians, in (-2π, 2π)
    fn phase(&self) -> f64;

    /// Get the oscillator frequency in Hz
    fn frequency(&self) -> f64;

    /// Multiply a block of samples by consecutive rotator values
    fn mix(&mut self, samples: &[Complex64]) -> Vec<Complex64> {
        samples.iter().map(|&s| s * self.next()).collect()
    }
}
