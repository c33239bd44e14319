//! Link chain configuration
//!
//! `ChainConfig` is plain data: every stage reads the parameters it needs
//! from it and nothing mutates it after construction. The fixed bit patterns
//! live here as named constants; the config carries explicit override fields.

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

/// Preamble word, transmitted MSB first (alternating 1010...)
pub const PREAMBLE_WORD: u32 = 0xAAAA_AAAA;

/// Sync word, transmitted MSB first
pub const SYNC_WORD: u32 = 0x3E2A_54B7;

/// Preamble bits expanded from `PREAMBLE_WORD`
pub const PREAMBLE_BITS: [u8; 32] = word_to_bits(PREAMBLE_WORD);

/// Sync-word bits expanded from `SYNC_WORD`
pub const SYNC_WORD_BITS: [u8; 32] = word_to_bits(SYNC_WORD);

/// Default lowpass length (odd, type I linear phase)
pub const DEFAULT_FILTER_TAPS: usize = 31;

/// Default lowpass cutoff in Hz
pub const DEFAULT_FILTER_CUTOFF_HZ: f64 = 100_000.0;

/// Default Moose block lengths in symbols, coarse to fine
pub const DEFAULT_CFO_SCALES: [usize; 3] = [2, 4, 8];

/// Detection window length in symbols
pub const DETECTION_WINDOW_SYMBOLS: usize = 4;

/// Ratio detector threshold used when none is given
pub const DEFAULT_RATIO_THRESHOLD: f64 = 2.0;

/// Expand a 32-bit word into bits, MSB first
pub const fn word_to_bits(word: u32) -> [u8; 32] {
    let mut bits = [0u8; 32];
    let mut i = 0;
    while i < 32 {
        bits[i] = ((word >> (31 - i)) & 1) as u8;
        i += 1;
    }
    bits
}

/// Nominal value or "draw uniformly at random" for a channel offset
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OffsetSetting {
    Fixed(f64),
    Random,
}

/// Which preamble detector to run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectorKind {
    /// Fixed energy threshold `window - 1` on a sliding window
    Threshold,
    /// Short-window against long-window mean power ratio
    ///
    /// On noise alone the ratio does not depend on the noise level, so the
    /// lead silence crosses the threshold at a fixed rate however high the
    /// SNR. At [`DEFAULT_RATIO_THRESHOLD`] that floor is a small fraction of
    /// packets detected early; most of them still recover once the sync
    /// word is found. Raising the threshold lowers the floor at the cost of
    /// misses near 6 dB Es/N0, where the preamble ratio itself is about 2.
    Ratio { threshold: f64 },
}

/// Estimator set used by the receiver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChainVariant {
    /// Single-scale Moose, raw phase curvature
    Basic,
    /// Multi-scale Moose, smoothed phase curvature
    Optimized,
}

/// Stages replaced by ground truth during evaluation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdealStages {
    pub detection: bool,
    pub cfo: bool,
    pub sto: bool,
}

/// Complete description of one link chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainConfig {
    /// Bit (symbol) rate in bits/s
    pub bit_rate: f64,
    /// Peak frequency deviation in Hz
    pub freq_dev: f64,
    /// Samples per symbol at the transmitter
    pub osr_tx: usize,
    /// Samples per symbol at the receiver
    pub osr_rx: usize,
    pub preamble: Vec<u8>,
    pub sync_word: Vec<u8>,
    pub payload_len: usize,
    pub n_packets: usize,
    /// Silence before the preamble, in symbols
    pub lead_silence_symbols: usize,
    /// Silence after the payload, in symbols
    pub tail_silence_symbols: usize,
    /// Channel delay in RX samples (fractional allowed)
    pub sto: OffsetSetting,
    /// Channel frequency offset in Hz
    pub cfo: OffsetSetting,
    /// Random CFO is drawn from `[-cfo_range, cfo_range]`
    pub cfo_range: f64,
    pub filter_taps: usize,
    pub filter_cutoff: f64,
    pub ideal: IdealStages,
    pub variant: ChainVariant,
    pub detector: DetectorKind,
    /// Moose block lengths in symbols, coarse to fine
    pub cfo_scales: Vec<usize>,
    /// Symbols skipped after detection before estimating
    pub cfo_guard_symbols: usize,
    /// Symbols of phase curvature summed by the STO search
    pub sto_symbols: usize,
    /// Largest residual disagreement between scales, in cycles of the finer scale
    pub cfo_ambiguity_tolerance: f64,
    /// Input requested per call while the streaming adapter searches
    pub stream_search_chunk: usize,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            bit_rate: 50_000.0,
            freq_dev: 25_000.0,
            osr_tx: 64,
            osr_rx: 8,
            preamble: PREAMBLE_BITS.to_vec(),
            sync_word: SYNC_WORD_BITS.to_vec(),
            payload_len: 50,
            n_packets: 100,
            lead_silence_symbols: 40,
            tail_silence_symbols: 16,
            sto: OffsetSetting::Fixed(0.0),
            cfo: OffsetSetting::Fixed(0.0),
            cfo_range: 10_000.0,
            filter_taps: DEFAULT_FILTER_TAPS,
            filter_cutoff: DEFAULT_FILTER_CUTOFF_HZ,
            ideal: IdealStages::default(),
            variant: ChainVariant::Optimized,
            detector: DetectorKind::Threshold,
            cfo_scales: DEFAULT_CFO_SCALES.to_vec(),
            cfo_guard_symbols: 2,
            sto_symbols: 16,
            cfo_ambiguity_tolerance: 0.25,
            stream_search_chunk: 4096,
        }
    }
}

impl ChainConfig {
    /// Check every invariant the chain relies on
    pub fn validate(&self) -> ConfigResult<()> {
        if !(self.bit_rate > 0.0) || !self.bit_rate.is_finite() {
            return Err(ConfigError::NonPositiveBitRate(self.bit_rate));
        }
        if !(self.freq_dev > 0.0) || !self.freq_dev.is_finite() {
            return Err(ConfigError::NonPositiveDeviation(self.freq_dev));
        }
        if self.osr_tx == 0 || self.osr_rx == 0 {
            return Err(ConfigError::ZeroOversampling {
                tx: self.osr_tx,
                rx: self.osr_rx,
            });
        }
        if self.osr_tx % self.osr_rx != 0 {
            return Err(ConfigError::NonIntegerDecimation {
                tx: self.osr_tx,
                rx: self.osr_rx,
            });
        }
        if self.filter_taps == 0 {
            return Err(ConfigError::EmptyFilter);
        }
        if !(self.filter_cutoff > 0.0) {
            return Err(ConfigError::NonPositiveCutoff(self.filter_cutoff));
        }
        let nyquist = self.rx_sample_rate() / 2.0;
        if self.filter_cutoff >= nyquist {
            return Err(ConfigError::CutoffAboveNyquist {
                cutoff_hz: self.filter_cutoff,
                nyquist_hz: nyquist,
            });
        }
        if !is_binary(&self.preamble) {
            return Err(ConfigError::NonBinaryPattern("preamble"));
        }
        if !is_binary(&self.sync_word) {
            return Err(ConfigError::NonBinaryPattern("sync word"));
        }
        if self.sync_word.is_empty() {
            return Err(ConfigError::EmptySyncWord);
        }
        if self.payload_len == 0 {
            return Err(ConfigError::EmptyPayload);
        }
        if !self.cfo_range.is_finite() || self.cfo_range < 0.0 {
            return Err(ConfigError::InvalidCfoRange(self.cfo_range));
        }
        if let DetectorKind::Ratio { threshold } = self.detector {
            if !(threshold > 1.0) {
                return Err(ConfigError::InvalidRatioThreshold(threshold));
            }
        }
        if !(self.cfo_ambiguity_tolerance > 0.0 && self.cfo_ambiguity_tolerance <= 0.5) {
            return Err(ConfigError::InvalidAmbiguityTolerance(
                self.cfo_ambiguity_tolerance,
            ));
        }
        if self.sto_symbols < 2 {
            return Err(ConfigError::StoSpanTooShort(self.sto_symbols));
        }

        let needed = self.cfo_guard_symbols + 2 * self.max_cfo_scale();
        if self.preamble.len() < needed {
            return Err(ConfigError::PreambleTooShort {
                len: self.preamble.len(),
                needed,
            });
        }

        // Moose blocks are only identical when each block spans whole preamble periods
        let period = pattern_period(&self.preamble);
        let increasing = self.cfo_scales.windows(2).all(|w| w[0] < w[1]);
        let aligned = self.cfo_scales.iter().all(|&n| n > 0 && n % period == 0);
        if self.cfo_scales.is_empty() || !increasing || !aligned {
            return Err(ConfigError::InvalidCfoScales(self.cfo_scales.clone()));
        }

        Ok(())
    }

    /// CPFSK modulation index `h = 2·Δf/B`
    pub fn modulation_index(&self) -> f64 {
        2.0 * self.freq_dev / self.bit_rate
    }

    /// Symbol period in seconds
    pub fn symbol_period(&self) -> f64 {
        1.0 / self.bit_rate
    }

    pub fn rx_sample_rate(&self) -> f64 {
        self.bit_rate * self.osr_rx as f64
    }

    pub fn tx_sample_rate(&self) -> f64 {
        self.bit_rate * self.osr_tx as f64
    }

    /// TX samples per RX sample
    pub fn decimation(&self) -> usize {
        self.osr_tx / self.osr_rx
    }

    /// Detector window length in RX samples
    pub fn detection_window(&self) -> usize {
        DETECTION_WINDOW_SYMBOLS * self.osr_rx
    }

    pub fn max_cfo_scale(&self) -> usize {
        self.cfo_scales.iter().copied().max().unwrap_or(0)
    }

    /// Symbols after detection consumed by CFO and STO estimation
    pub fn estimation_symbols(&self) -> usize {
        self.cfo_guard_symbols + (2 * self.max_cfo_scale()).max(self.sto_symbols)
    }

    /// RX samples after detection consumed by CFO and STO estimation
    pub fn estimation_span(&self) -> usize {
        self.estimation_symbols() * self.osr_rx
    }

    /// Bits between the start of the preamble and the end of the payload
    pub fn frame_len_bits(&self) -> usize {
        self.preamble.len() + self.sync_word.len() + self.payload_len
    }

    /// RX samples the streaming receiver emits per packet: the frame plus
    /// one detection window, the furthest a detector fires ahead of the
    /// preamble
    pub fn stream_packet_samples(&self) -> usize {
        self.frame_len_bits() * self.osr_rx + self.detection_window()
    }

    /// Preamble, sync word and payload, in transmission order
    pub fn frame_bits(&self, payload: &[u8]) -> Vec<u8> {
        let mut bits = Vec::with_capacity(self.preamble.len() + self.sync_word.len() + payload.len());
        bits.extend_from_slice(&self.preamble);
        bits.extend_from_slice(&self.sync_word);
        bits.extend_from_slice(payload);
        bits
    }
}

fn is_binary(bits: &[u8]) -> bool {
    bits.iter().all(|&b| b <= 1)
}

/// Smallest repetition period of a bit pattern (its length if aperiodic)
pub fn pattern_period(bits: &[u8]) -> usize {
    (1..bits.len())
        .find(|&p| bits.iter().zip(&bits[p..]).all(|(a, b)| a == b))
        .unwrap_or(bits.len().max(1))
}
