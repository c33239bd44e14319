//! CPFSK waveform codec
//!
//! Bits to complex baseband and back. The modulator keeps a running phase so
//! consecutive calls splice without discontinuity; the demodulator is a bank
//! of two tone correlators with no carrier phase reference.

mod demodulator;
mod modulator;

pub use demodulator::{NoncoherentDemodulator, ToneMagnitudes};
pub use modulator::CpfskModulator;

use crate::config::ChainConfig;
use crate::timing::FixedTiming;
use num_complex::Complex64;

/// Modulate a bit sequence at the transmitter oversampling ratio
///
/// Output length is exactly `bits.len() * osr_tx`, unit amplitude, phase
/// starting at zero.
pub fn modulate(bits: &[u8], cfg: &ChainConfig) -> Vec<Complex64> {
    modulate_at(bits, cfg, cfg.osr_tx)
}

/// Modulate at an arbitrary oversampling ratio
pub fn modulate_at(bits: &[u8], cfg: &ChainConfig, samples_per_symbol: usize) -> Vec<Complex64> {
    let timing = FixedTiming::new(cfg.bit_rate, samples_per_symbol);
    CpfskModulator::new(cfg.modulation_index(), timing).modulate(bits)
}

/// Demodulate receiver-rate samples, one bit per whole symbol
///
/// A trailing partial symbol is dropped.
pub fn demodulate(samples: &[Complex64], cfg: &ChainConfig) -> Vec<u8> {
    NoncoherentDemodulator::new(cfg.modulation_index(), FixedTiming::rx(cfg)).demodulate(samples)
}
