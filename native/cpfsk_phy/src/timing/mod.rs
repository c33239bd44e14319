//! Symbol timing implementations
//!
//! Currently only fixed timing (integer oversampling, no recovery loop).

mod fixed;

pub use fixed::FixedTiming;
