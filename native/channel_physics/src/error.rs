//! Harness error types

use cpfsk_phy::ConfigError;
use thiserror::Error;

/// Errors that stop a sweep before or while it writes results
#[derive(Error, Debug)]
pub enum SweepError {
    #[error("invalid chain configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("sweep has no SNR points")]
    NoSnrPoints,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type SweepResult<T> = Result<T, SweepError>;
