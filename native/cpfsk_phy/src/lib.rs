//! CPFSK PHY - Link chain for continuous-phase FSK packets
//!
//! Complex baseband only: bits ↔ CPFSK waveform, preamble detection, Moose
//! CFO estimation, STO recovery from phase curvature, sync-word alignment.
//! The same estimators back a whole-buffer engine and a streaming block.
//! Channel simulation and Monte-Carlo evaluation live in `channel_physics`.

pub mod carriers;
pub mod chain;
pub mod codec;
pub mod config;
pub mod error;
pub mod streaming;
pub mod sync;
pub mod timing;
pub mod traits;
mod utils;

// Re-export core types for convenience
pub use carriers::Nco;
pub use chain::{
    build_chain, BasicChain, OptimizedChain, Stage, StageOverrides, SyncEngine, SyncResult,
    SyncState,
};
pub use codec::{demodulate, modulate, modulate_at, CpfskModulator, NoncoherentDemodulator};
pub use config::{
    ChainConfig, ChainVariant, DetectorKind, IdealStages, OffsetSetting, DEFAULT_RATIO_THRESHOLD,
};
pub use error::{ConfigError, ConfigResult, SyncFailure};
pub use num_complex::Complex64;
pub use streaming::{PacketReport, StreamPhase, StreamingSync, StreamingSyncState};
pub use sync::{CfoEstimate, PreambleDetector};
pub use timing::FixedTiming;
pub use traits::{Carrier, SymbolTiming, SyncChain};
pub use utils::{db_to_power, mean_power, power_to_db, wrap_centered};
