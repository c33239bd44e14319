//! Per-SNR-point statistics
//!
//! Packets are reduced into a [`MetricsAccumulator`] in packet order, then
//! finished into one [`MetricsRow`] per SNR point.

use serde::{Deserialize, Serialize};
use std::io::Write;

/// Where a detection landed relative to the true preamble
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectionClass {
    OnTime,
    /// Whole detection window before the preamble start
    Early,
    /// At or past the end of the preamble
    Late,
}

/// Result of one packet at one SNR point
#[derive(Debug, Clone, PartialEq)]
pub struct PacketOutcome {
    pub bit_errors: usize,
    pub packet_error: bool,
    /// `None` when the preamble was missed
    pub detection: Option<DetectionClass>,
    /// CFO error normalized by the bit rate
    pub cfo_error: Option<f64>,
    /// STO error normalized by the symbol period
    pub sto_error: Option<f64>,
    pub ambiguous_cfo: bool,
    /// Windowed-variance SNR of the received buffer, dB
    pub snr_estimate: Option<f64>,
}

/// One row of the sweep output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsRow {
    pub snr_db: f64,
    pub effective_snr_db: f64,
    pub ber: f64,
    pub per: f64,
    pub cfo_rmse: Option<f64>,
    pub sto_rmse: Option<f64>,
    pub miss_rate: f64,
    pub false_detection_rate: f64,
    pub late_detection_rate: f64,
    pub ambiguous_cfo_rate: f64,
    pub snr_estimates: Vec<f64>,
}

/// Running sums for one SNR point
#[derive(Debug, Clone, Default)]
pub struct MetricsAccumulator {
    packets: usize,
    bits: usize,
    bit_errors: usize,
    packet_errors: usize,
    cfo_sq: f64,
    cfo_count: usize,
    sto_sq: f64,
    sto_count: usize,
    misses: usize,
    early: usize,
    late: usize,
    ambiguous: usize,
    snr_estimates: Vec<f64>,
}

impl MetricsAccumulator {
    pub fn add(&mut self, outcome: &PacketOutcome, payload_len: usize) {
        self.packets += 1;
        self.bits += payload_len;
        self.bit_errors += outcome.bit_errors;
        self.packet_errors += outcome.packet_error as usize;

        match outcome.detection {
            None => self.misses += 1,
            Some(DetectionClass::Early) => self.early += 1,
            Some(DetectionClass::Late) => self.late += 1,
            Some(DetectionClass::OnTime) => {}
        }
        if let Some(e) = outcome.cfo_error {
            self.cfo_sq += e * e;
            self.cfo_count += 1;
        }
        if let Some(e) = outcome.sto_error {
            self.sto_sq += e * e;
            self.sto_count += 1;
        }
        self.ambiguous += outcome.ambiguous_cfo as usize;
        if let Some(snr) = outcome.snr_estimate {
            self.snr_estimates.push(snr);
        }
    }

    pub fn finish(self, snr_db: f64, effective_snr_db: f64) -> MetricsRow {
        let rate = |count: usize| {
            if self.packets == 0 {
                0.0
            } else {
                count as f64 / self.packets as f64
            }
        };
        let rmse = |sq: f64, n: usize| (n > 0).then(|| (sq / n as f64).sqrt());

        MetricsRow {
            snr_db,
            effective_snr_db,
            ber: if self.bits == 0 {
                0.0
            } else {
                self.bit_errors as f64 / self.bits as f64
            },
            per: rate(self.packet_errors),
            cfo_rmse: rmse(self.cfo_sq, self.cfo_count),
            sto_rmse: rmse(self.sto_sq, self.sto_count),
            miss_rate: rate(self.misses),
            false_detection_rate: rate(self.early),
            late_detection_rate: rate(self.late),
            ambiguous_cfo_rate: rate(self.ambiguous),
            snr_estimates: self.snr_estimates,
        }
    }
}

const CSV_HEADER: &str = "snr_db,effective_snr_db,ber,per,cfo_rmse,sto_rmse,miss_rate,\
false_detection_rate,late_detection_rate,ambiguous_cfo_rate,snr_estimates";

fn opt(v: Option<f64>) -> String {
    v.map(|x| x.to_string()).unwrap_or_default()
}

/// One header line, then one line per row; SNR estimates are `;`-joined in
/// the last column
pub fn write_csv<W: Write>(rows: &[MetricsRow], mut out: W) -> std::io::Result<()> {
    writeln!(out, "{}", CSV_HEADER)?;
    for r in rows {
        let estimates: Vec<String> = r.snr_estimates.iter().map(|s| format!("{:.3}", s)).collect();
        writeln!(
            out,
            "{},{},{},{},{},{},{},{},{},{},{}",
            r.snr_db,
            r.effective_snr_db,
            r.ber,
            r.per,
            opt(r.cfo_rmse),
            opt(r.sto_rmse),
            r.miss_rate,
            r.false_detection_rate,
            r.late_detection_rate,
            r.ambiguous_cfo_rate,
            estimates.join(";")
        )?;
    }
    Ok(())
}
