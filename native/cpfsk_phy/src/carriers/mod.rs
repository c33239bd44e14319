//! Carrier oscillator implementations
//!
//! Currently only the complex NCO used for CFO injection and correction.

mod nco;

pub use nco::Nco;
