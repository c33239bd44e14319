//! Streaming receiver
//!
//! Stateful block for a continuous sample stream arriving in arbitrary
//! chunks. While searching it buffers just enough history and lookahead to
//! evaluate each candidate position exactly as a whole-buffer pass would.
//! On a detection it estimates CFO and STO once, drops the STO offset, and
//! emits CFO-corrected samples for one frame plus a detection window of
//! margin, the correction phase following the absolute sample count since
//! the detection point. A detector can fire up to a window ahead of the
//! preamble, so the frame sits somewhere inside the emitted segment and the
//! sync word locates it.
//!
//! An external noise-power estimate can be pushed in through a channel at any
//! time; the latest value is used to report per-packet SNR.

use crate::carriers::Nco;
use crate::chain::build_chain;
use crate::config::ChainConfig;
use crate::error::ConfigResult;
use crate::sync::{correct_cfo, CfoEstimate};
use crate::traits::{Carrier, SyncChain};
use crate::utils::{mean_power, power_to_db};
use crossbeam::channel::{unbounded, Receiver, Sender};
use num_complex::Complex64;
use serde::Serialize;

/// Where the block is in the packet cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamPhase {
    Searching,
    InPacket,
    Slack,
}

/// Mutable state carried between calls
#[derive(Debug, Clone)]
pub struct StreamingSyncState {
    pub phase: StreamPhase,
    /// Corrected samples still owed to the current packet
    pub rem_samples: usize,
    /// STO offset still to discard before output resumes
    pub sto_pending: usize,
    /// Samples still to drop after a packet before searching again
    pub slack_pending: usize,
    /// Counter-rotator for the current packet, its elapsed count referenced
    /// to the detection point
    pub carrier: Nco,
    /// Mean power over the detection window of the last packet
    pub window_power: Option<f64>,
    /// Latest external noise-power estimate
    pub noise_power: Option<f64>,
}

impl StreamingSyncState {
    fn new(sample_rate: f64) -> Self {
        Self {
            phase: StreamPhase::Searching,
            rem_samples: 0,
            sto_pending: 0,
            slack_pending: 0,
            carrier: Nco::new(0.0, sample_rate),
            window_power: None,
            noise_power: None,
        }
    }

    /// Current CFO estimate in Hz
    pub fn cfo_hz(&self) -> f64 {
        -self.carrier.frequency()
    }
}

/// One detected packet
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PacketReport {
    /// Absolute stream index of the detection
    pub start: u64,
    pub cfo: CfoEstimate,
    pub sto: usize,
    pub window_power: f64,
    pub noise_power: Option<f64>,
    pub snr_db: Option<f64>,
}

/// Streaming synchronizer
pub struct StreamingSync {
    cfg: ChainConfig,
    chain: Box<dyn SyncChain>,
    state: StreamingSyncState,
    /// Unconsumed input, `buffer[0]` at absolute index `base`
    buffer: Vec<Complex64>,
    base: u64,
    /// Next candidate detection position, absolute
    scan: u64,
    span: usize,
    reports: Vec<PacketReport>,
    noise_tx: Sender<f64>,
    noise_rx: Receiver<f64>,
}

impl StreamingSync {
    pub fn new(cfg: ChainConfig) -> ConfigResult<Self> {
        cfg.validate()?;
        let chain = build_chain(&cfg);
        let (noise_tx, noise_rx) = unbounded();
        let scan = chain.detector().history() as u64;
        Ok(Self {
            state: StreamingSyncState::new(cfg.rx_sample_rate()),
            span: cfg.estimation_span(),
            chain,
            cfg,
            buffer: Vec::new(),
            base: 0,
            scan,
            reports: Vec::new(),
            noise_tx,
            noise_rx,
        })
    }

    /// Handle for pushing noise-power estimates from another thread
    pub fn noise_power_sender(&self) -> Sender<f64> {
        self.noise_tx.clone()
    }

    pub fn state(&self) -> &StreamingSyncState {
        &self.state
    }

    /// Input samples wanted by the next call when `noutput` outputs fit
    pub fn forecast(&self, noutput: usize) -> usize {
        match self.state.phase {
            StreamPhase::Searching => self.cfg.stream_search_chunk,
            StreamPhase::InPacket => {
                self.state.sto_pending + noutput.min(self.state.rem_samples)
            }
            StreamPhase::Slack => self.state.slack_pending,
        }
    }

    /// Consume `input`, appending corrected in-packet samples to `output`
    ///
    /// Returns the number of samples produced. All input is taken; anything
    /// not yet decidable stays buffered for the next call.
    pub fn work(&mut self, input: &[Complex64], output: &mut Vec<Complex64>) -> usize {
        self.poll_noise();
        self.buffer.extend_from_slice(input);

        let before = output.len();
        loop {
            let advanced = match self.state.phase {
                StreamPhase::Searching => self.search(),
                StreamPhase::InPacket => self.emit(output),
                StreamPhase::Slack => self.drop_slack(),
            };
            if !advanced {
                break;
            }
        }
        output.len() - before
    }

    /// Reports for packets detected since the last call
    pub fn take_reports(&mut self) -> Vec<PacketReport> {
        std::mem::take(&mut self.reports)
    }

    /// Return to the initial state, dropping buffered input
    pub fn reset(&mut self) {
        self.state = StreamingSyncState::new(self.cfg.rx_sample_rate());
        self.buffer.clear();
        self.base = 0;
        self.scan = self.chain.detector().history() as u64;
        self.reports.clear();
    }

    fn poll_noise(&mut self) {
        while let Ok(power) = self.noise_rx.try_recv() {
            self.state.noise_power = Some(power);
        }
    }

    fn consume(&mut self, n: usize) {
        self.buffer.drain(..n);
        self.base += n as u64;
    }

    /// Scan every newly decidable position; true on detection
    fn search(&mut self) -> bool {
        let detector = *self.chain.detector();
        let from = (self.scan - self.base) as usize;
        let until = (self.buffer.len() + 1).saturating_sub(detector.required_after(self.span));
        if until <= from {
            return false;
        }

        match detector.detect(&self.buffer, from, until) {
            Some(det) => {
                self.start_packet(det);
                true
            }
            None => {
                self.scan = self.base + until as u64;
                // Keep only the history the next candidate reads
                let keep_from = self.scan - detector.history() as u64;
                self.consume((keep_from - self.base) as usize);
                false
            }
        }
    }

    fn start_packet(&mut self, det: usize) {
        let sps = self.cfg.osr_rx;
        let fs = self.cfg.rx_sample_rate();
        let window = self.chain.detector().window();

        let cfo = self
            .chain
            .cfo_estimation(&self.buffer, det)
            .unwrap_or_else(|| CfoEstimate::exact(0.0));
        let corrected = correct_cfo(&self.buffer[det..det + self.span], cfo.hz, fs, 0);
        let sto = self.chain.sto_estimation(&corrected).unwrap_or(0) % sps;

        let window_power = mean_power(&self.buffer[det..det + window]);
        let noise_power = self.state.noise_power;
        let snr_db = noise_power
            .filter(|&n| n > 0.0)
            .map(|n| power_to_db((window_power - n).max(f64::MIN_POSITIVE) / n));

        let start = self.base + det as u64;
        log::info!(
            "packet at {}: cfo {:.1} Hz{} sto {} snr {}",
            start,
            cfo.hz,
            if cfo.ambiguous { " (ambiguous)" } else { "" },
            sto,
            snr_db.map_or_else(|| "n/a".to_string(), |s| format!("{:.1} dB", s))
        );
        self.reports.push(PacketReport {
            start,
            cfo,
            sto,
            window_power,
            noise_power,
            snr_db,
        });

        self.consume(det);
        self.state.phase = StreamPhase::InPacket;
        self.state.carrier = Nco::new(-cfo.hz, fs);
        self.state.sto_pending = sto;
        self.state.rem_samples = self.cfg.stream_packet_samples();
        self.state.window_power = Some(window_power);
    }

    /// Discard the STO offset then emit corrected samples; true once the
    /// packet is complete
    fn emit(&mut self, output: &mut Vec<Complex64>) -> bool {
        if self.state.sto_pending > 0 {
            let n = self.state.sto_pending.min(self.buffer.len());
            self.state.carrier.skip(n as u64);
            self.state.sto_pending -= n;
            self.consume(n);
            if self.state.sto_pending > 0 {
                return false;
            }
        }

        let n = self.state.rem_samples.min(self.buffer.len());
        output.extend(self.state.carrier.mix(&self.buffer[..n]));
        self.state.rem_samples -= n;
        self.consume(n);

        if self.state.rem_samples > 0 {
            return false;
        }
        self.state.phase = StreamPhase::Slack;
        self.state.slack_pending = self.cfg.osr_rx;
        true
    }

    /// Drop post-packet slack; true once searching again
    fn drop_slack(&mut self) -> bool {
        let n = self.state.slack_pending.min(self.buffer.len());
        self.state.slack_pending -= n;
        self.consume(n);
        if self.state.slack_pending > 0 {
            return false;
        }
        self.state.phase = StreamPhase::Searching;
        self.scan = self.base + self.chain.detector().history() as u64;
        true
    }
}
