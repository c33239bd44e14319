//! Fixed symbol timing
//!
//! Integer oversampling of a known bit rate. No timing recovery: symbol
//! boundaries come from the preamble-based STO estimate.

use crate::config::ChainConfig;
use crate::traits::SymbolTiming;

/// Fixed symbol timing (integer samples per symbol)
#[derive(Debug, Clone, Copy)]
pub struct FixedTiming {
    symbol_rate: f64,
    samples_per_symbol: usize,
}

impl FixedTiming {
    /// Create fixed timing from a symbol rate and an oversampling ratio
    ///
    /// # Arguments
    /// * `symbol_rate` - Symbol rate in baud
    /// * `samples_per_symbol` - Oversampling ratio, at least 1
    pub fn new(symbol_rate: f64, samples_per_symbol: usize) -> Self {
        Self {
            symbol_rate,
            samples_per_symbol: samples_per_symbol.max(1),
        }
    }

    /// Transmitter-side timing for a chain configuration
    pub fn tx(cfg: &ChainConfig) -> Self {
        Self::new(cfg.bit_rate, cfg.osr_tx)
    }

    /// Receiver-side timing for a chain configuration
    pub fn rx(cfg: &ChainConfig) -> Self {
        Self::new(cfg.bit_rate, cfg.osr_rx)
    }
}

impl SymbolTiming for FixedTiming {
    fn samples_per_symbol(&self) -> usize {
        self.samples_per_symbol
    }

    fn symbol_rate(&self) -> f64 {
        self.symbol_rate
    }
}
