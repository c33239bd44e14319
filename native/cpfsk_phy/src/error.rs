//! Error taxonomy for the link chain
//!
//! Configuration problems are fatal and surface once, when a chain is built.
//! Per-packet failures are statistics: they travel inside `SyncResult` and
//! the harness counts them instead of aborting a sweep.

use thiserror::Error;

/// Result type for configuration-time operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Invalid chain configuration, rejected before any simulation starts
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Bit rate must be strictly positive
    #[error("bit rate must be positive, got {0}")]
    NonPositiveBitRate(f64),

    /// Frequency deviation must be strictly positive
    #[error("frequency deviation must be positive, got {0}")]
    NonPositiveDeviation(f64),

    /// Oversampling ratios must be at least one sample per symbol
    #[error("oversampling ratios must be positive (tx={tx}, rx={rx})")]
    ZeroOversampling { tx: usize, rx: usize },

    /// Resampling picks every (tx/rx)-th sample, so tx must divide evenly
    #[error("TX oversampling {tx} must be an integer multiple of RX oversampling {rx}")]
    NonIntegerDecimation { tx: usize, rx: usize },

    /// Lowpass cutoff must sit below the RX Nyquist frequency
    #[error("filter cutoff {cutoff_hz} Hz exceeds Nyquist {nyquist_hz} Hz")]
    CutoffAboveNyquist { cutoff_hz: f64, nyquist_hz: f64 },

    /// Lowpass cutoff must be positive
    #[error("filter cutoff must be positive, got {0}")]
    NonPositiveCutoff(f64),

    /// Lowpass filter needs taps
    #[error("filter needs at least one tap")]
    EmptyFilter,

    /// Moose blocks must repeat whole preamble periods, coarse to fine
    #[error("CFO scales must be non-empty, strictly increasing multiples of the preamble period: {0:?}")]
    InvalidCfoScales(Vec<usize>),

    /// Ambiguity tolerance is a fraction of one cycle
    #[error("CFO ambiguity tolerance must lie in (0, 0.5], got {0}")]
    InvalidAmbiguityTolerance(f64),

    /// STO search needs at least two symbols of curvature
    #[error("STO estimation needs at least 2 symbols, got {0}")]
    StoSpanTooShort(usize),

    /// Preamble must cover the guard plus both Moose blocks
    #[error("preamble of {len} bits is shorter than the {needed} bits needed for estimation")]
    PreambleTooShort { len: usize, needed: usize },

    /// Sync word must not be empty
    #[error("sync word must not be empty")]
    EmptySyncWord,

    /// Bit patterns must only contain 0 and 1
    #[error("{0} contains values other than 0 and 1")]
    NonBinaryPattern(&'static str),

    /// Payload must carry at least one bit
    #[error("payload length must be positive")]
    EmptyPayload,

    /// Random CFO range must be finite and non-negative
    #[error("CFO range must be finite and non-negative, got {0}")]
    InvalidCfoRange(f64),

    /// Ratio detector threshold must exceed unity
    #[error("ratio detector threshold must be greater than 1, got {0}")]
    InvalidRatioThreshold(f64),
}

/// Per-packet failure, counted as a fully errored packet
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncFailure {
    /// No preamble found before the search budget ran out
    #[error("no preamble detected within the search budget")]
    PreambleMiss,

    /// Frame alignment left too few bits for the payload
    #[error("recovered {actual} payload bits, expected {expected}")]
    FrameLengthMismatch { expected: usize, actual: usize },
}
