//! Core DSP traits for the link chain
//!
//! One trait per axis of the receiver: the oscillator, symbol timing and
//! the estimator set behind a chain variant.

mod carrier;
mod sync_chain;
mod timing;

pub use carrier::Carrier;
pub use sync_chain::SyncChain;
pub use timing::SymbolTiming;
