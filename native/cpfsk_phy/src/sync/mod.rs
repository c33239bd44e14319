//! Receiver synchronization estimators
//!
//! Pure functions over complex sample slices: preamble detection, Moose CFO
//! estimation and correction, STO by phase curvature, sync-word alignment
//! and SNR estimates. The chain variants and the streaming adapter compose
//! these; none of them keep state between calls.

mod cfo;
mod detect;
mod frame;
mod snr;
mod sto;

pub use cfo::{correct_cfo, moose_estimate, multiscale_estimate, resolve_cycles, CfoEstimate};
pub use detect::{PreambleDetector, RATIO_REGULARIZER};
pub use frame::{correlate_sync, extract_payload, find_frame_start};
pub use snr::{preamble_snr_db, windowed_variance_snr_db, window_variances};
pub use sto::{estimate_sto, savitzky_golay5, StoMethod};
