//! Sync-word frame alignment

use crate::error::SyncFailure;

#[inline]
fn bipolar(bit: u8) -> i32 {
    if bit != 0 {
        1
    } else {
        -1
    }
}

/// Valid-mode cross-correlation of ±1-mapped bits against the sync word
///
/// Entry `k` compares `bits[k..k + sync.len()]`; empty when the bits are
/// shorter than the sync word.
pub fn correlate_sync(bits: &[u8], sync: &[u8]) -> Vec<i32> {
    if sync.is_empty() || bits.len() < sync.len() {
        return Vec::new();
    }
    bits.windows(sync.len())
        .map(|w| w.iter().zip(sync).map(|(&a, &b)| bipolar(a) * bipolar(b)).sum())
        .collect()
}

/// Index of the first payload bit, just past the best sync-word match
///
/// Ranked by `|correlation|`; ties resolve to the earliest position.
pub fn find_frame_start(bits: &[u8], sync: &[u8]) -> Option<usize> {
    let corr = correlate_sync(bits, sync);
    let (pos, _) = corr
        .iter()
        .enumerate()
        .fold(None, |best: Option<(usize, i32)>, (k, &c)| match best {
            Some((_, b)) if c.abs() <= b => best,
            _ => Some((k, c.abs())),
        })?;
    Some(pos + sync.len())
}

/// `payload_len` bits starting at `start`
pub fn extract_payload(
    bits: &[u8],
    start: usize,
    payload_len: usize,
) -> Result<Vec<u8>, SyncFailure> {
    let available = bits.len().saturating_sub(start);
    if available < payload_len {
        return Err(SyncFailure::FrameLengthMismatch {
            expected: payload_len,
            actual: available,
        });
    }
    Ok(bits[start..start + payload_len].to_vec())
}
