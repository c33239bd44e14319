//! Carrier frequency offset estimation and correction
//!
//! Moose estimator: two adjacent identical blocks of a periodic preamble
//! differ only by the rotation the offset accumulates over one block. Short
//! blocks give a wide unambiguous range, long blocks give precision; the
//! multi-scale estimator walks from short to long, resolving each finer
//! estimate's cycle ambiguity against the previous one.

use crate::carriers::Nco;
use crate::traits::Carrier;
use num_complex::Complex64;
use serde::Serialize;
use std::f64::consts::TAU;

/// CFO estimate with the scale it was last refined at
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CfoEstimate {
    pub hz: f64,
    /// A finer scale disagreed with this estimate by more than the tolerance
    pub ambiguous: bool,
    /// Block length in symbols of the last accepted scale, 0 for ground truth
    pub scale: usize,
}

impl CfoEstimate {
    pub fn exact(hz: f64) -> Self {
        Self {
            hz,
            ambiguous: false,
            scale: 0,
        }
    }
}

/// Single-scale Moose estimate
///
/// Correlates `samples[start..start+block]` with the block that follows it.
/// Unambiguous for offsets within `±sample_rate / (2·block)`.
pub fn moose_estimate(
    samples: &[Complex64],
    start: usize,
    block: usize,
    sample_rate: f64,
) -> Option<f64> {
    if block == 0 || start + 2 * block > samples.len() {
        return None;
    }
    let first = &samples[start..start + block];
    let second = &samples[start + block..start + 2 * block];
    let acc: Complex64 = second.iter().zip(first).map(|(b2, b1)| b2 * b1.conj()).sum();
    Some(acc.arg() * sample_rate / (TAU * block as f64))
}

/// Shift `fine` by whole multiples of `cycle` to land nearest `coarse`
///
/// Returns the shifted estimate and its remaining distance from `coarse`.
pub fn resolve_cycles(fine: f64, coarse: f64, cycle: f64) -> (f64, f64) {
    let k = ((coarse - fine) / cycle).round();
    let resolved = fine + k * cycle;
    (resolved, resolved - coarse)
}

/// Multi-scale Moose estimate over increasing block lengths
///
/// `scales` are block lengths in symbols of `samples_per_symbol` samples.
/// Refinement stops at the first scale whose blocks run past the buffer, or
/// whose resolved estimate still sits more than `tolerance` cycles from the
/// previous one; the latter keeps the previous estimate flagged ambiguous.
pub fn multiscale_estimate(
    samples: &[Complex64],
    start: usize,
    scales: &[usize],
    samples_per_symbol: usize,
    sample_rate: f64,
    tolerance: f64,
) -> Option<CfoEstimate> {
    let mut estimate: Option<CfoEstimate> = None;

    for &scale in scales {
        let block = scale * samples_per_symbol;
        let Some(raw) = moose_estimate(samples, start, block, sample_rate) else {
            break;
        };

        let Some(prev) = estimate else {
            estimate = Some(CfoEstimate {
                hz: raw,
                ambiguous: false,
                scale,
            });
            continue;
        };

        let cycle = sample_rate / block as f64;
        let (resolved, residual) = resolve_cycles(raw, prev.hz, cycle);
        if residual.abs() > tolerance * cycle {
            log::warn!(
                "ambiguous CFO at scale {}: {:.1} Hz vs {:.1} Hz at scale {}",
                scale,
                resolved,
                prev.hz,
                prev.scale
            );
            estimate = Some(CfoEstimate {
                ambiguous: true,
                ..prev
            });
            break;
        }

        estimate = Some(CfoEstimate {
            hz: resolved,
            ambiguous: false,
            scale,
        });
    }

    estimate
}

/// Counter-rotate by `cfo_hz`, sample 0 being `elapsed_start` samples after
/// the phase reference
pub fn correct_cfo(
    samples: &[Complex64],
    cfo_hz: f64,
    sample_rate: f64,
    elapsed_start: u64,
) -> Vec<Complex64> {
    Nco::starting_at(-cfo_hz, sample_rate, elapsed_start).mix(samples)
}
