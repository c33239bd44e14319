//! SymbolTiming trait - Sample/symbol rate relationship
//!
//! Defines how many samples per symbol period. The TX and RX sides of the
//! link each carry their own timing; the ratio between them drives resampling.

/// Symbol timing trait
pub trait SymbolTiming: Send + Sync {
    /// Samples per symbol period
    fn samples_per_symbol(&self) -> usize;

    /// Symbol rate in baud
    fn symbol_rate(&self) -> f64;

    /// Sample rate in Hz
    fn sample_rate(&self) -> f64 {
        self.symbol_rate() * self.samples_per_symbol() as f64
    }

    /// Symbol period in seconds
    fn symbol_period(&self) -> f64 {
        1.0 / self.symbol_rate()
    }
}
