//! Streaming receiver driven by a simulated multi-packet stream
//!
//! Packets are framed, delayed individually and concatenated, then the whole
//! stream shares one carrier offset and one noise realization. The stream is
//! fed to [`StreamingSync`] in the chunk sizes its forecast asks for, while a
//! running noise-floor estimate is pushed through its side channel. Each
//! report is scored against the packet whose preamble it lands on, so a
//! spurious or missed detection costs only that packet.

use cpfsk_phy::sync::{extract_payload, find_frame_start, window_variances};
use cpfsk_phy::{demodulate, ChainConfig, Complex64, PacketReport, StreamingSync};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::channel::Channel;
use crate::error::SweepResult;
use crate::harness::{GroundTruth, HarnessConfig};
use crate::metrics::DetectionClass;
use crate::transmitter::{frame_waveform, PacketDraw};

/// Output samples offered to the streaming block per call
const OUTPUT_CHUNK: usize = 1024;

/// One transmitted packet inside the stream
#[derive(Debug, Clone)]
pub struct StreamPacket {
    pub payload: Vec<u8>,
    /// Preamble position, stream-absolute
    pub truth: GroundTruth,
}

/// What the streaming receiver made of the stream
#[derive(Debug, Clone)]
pub struct StreamOutcome {
    pub reports: Vec<PacketReport>,
    pub packets_sent: usize,
    /// Packets claimed by an on-time report
    pub packets_detected: usize,
    /// Reports that fall on no packet, or on one already claimed
    pub false_detections: usize,
    /// Packets no report landed on
    pub misses: usize,
    /// Packets whose payload came back without a bit error
    pub packets_recovered: usize,
    /// Over every packet sent; a missed or unrecoverable packet counts all
    /// of its bits
    pub bit_errors: usize,
}

/// Simulated stream of `n_packets` packets at one Es/N0
pub struct StreamSimulation {
    cfg: HarnessConfig,
    channel: Channel,
}

impl StreamSimulation {
    pub fn new(cfg: HarnessConfig) -> SweepResult<Self> {
        let channel = Channel::new(&cfg.chain)?;
        Ok(Self { cfg, channel })
    }

    /// Received stream and the packets it carries
    pub fn build_stream(&self, n_packets: usize, es_n0_db: f64) -> (Vec<Complex64>, Vec<StreamPacket>) {
        let chain = &self.cfg.chain;
        let mut rng = ChaCha8Rng::seed_from_u64(self.cfg.seed);

        let mut clean = Vec::new();
        let mut packets = Vec::with_capacity(n_packets);
        let mut stream_cfo = 0.0;
        for k in 0..n_packets {
            let draw = PacketDraw::draw(chain, &mut rng);
            if k == 0 {
                stream_cfo = draw.cfo_hz;
            }
            let truth = GroundTruth::new(chain, &self.channel, &draw).offset_by(clean.len());
            let tx = frame_waveform(chain, &draw.payload);
            clean.extend(self.channel.resample(&tx, draw.delay_rx));
            packets.push(StreamPacket {
                payload: draw.payload,
                truth,
            });
        }

        let clean = self.channel.apply_cfo(&clean, stream_cfo);
        let rx = self.channel.add_noise_and_filter(&clean, es_n0_db, &mut rng);
        (rx, packets)
    }

    pub fn run(&self, n_packets: usize, es_n0_db: f64) -> SweepResult<StreamOutcome> {
        let chain = &self.cfg.chain;
        let (rx, packets) = self.build_stream(n_packets, es_n0_db);

        let mut sync = StreamingSync::new(chain.clone())?;
        let noise_tx = sync.noise_power_sender();
        let window = chain.detection_window();

        let mut floor: Option<f64> = None;
        let mut out = Vec::new();
        let mut pos = 0;
        while pos < rx.len() {
            let want = sync.forecast(OUTPUT_CHUNK).max(1);
            let chunk = &rx[pos..(pos + want).min(rx.len())];

            // Quietest block seen so far stands in for the noise power
            if let Some(v) = window_variances(chunk, window).into_iter().reduce(f64::min) {
                let f = floor.map_or(v, |f| f.min(v));
                floor = Some(f);
                // The receiving end lives in `sync`, so the send cannot fail
                let _ = noise_tx.send(f);
            }

            sync.work(chunk, &mut out);
            pos += chunk.len();
        }

        let reports = sync.take_reports();
        let outcome = score(chain, &packets, &reports, &out);
        log::info!(
            "stream: {} packets sent, {} detected, {} false, {} recovered",
            outcome.packets_sent,
            outcome.packets_detected,
            outcome.false_detections,
            outcome.packets_recovered
        );
        Ok(outcome)
    }
}

/// Pair each report with the packet it detected and check its payload
///
/// Report `k` owns output segment `k`; the last one may be cut short when the
/// stream ended mid-packet.
fn score(
    chain: &ChainConfig,
    packets: &[StreamPacket],
    reports: &[PacketReport],
    out: &[Complex64],
) -> StreamOutcome {
    let segment = chain.stream_packet_samples();
    let window = chain.detection_window();

    let mut errors: Vec<Option<usize>> = vec![None; packets.len()];
    let mut false_detections = 0;
    for (k, report) in reports.iter().enumerate() {
        let start = report.start as usize;
        let owner = packets
            .iter()
            .position(|p| p.truth.classify(start, window) == DetectionClass::OnTime);
        let Some(i) = owner.filter(|&i| errors[i].is_none()) else {
            false_detections += 1;
            continue;
        };

        let seg = out.get(k * segment..((k + 1) * segment).min(out.len()));
        let payload = &packets[i].payload;
        let recovered = seg.map(|seg| demodulate(seg, chain)).and_then(|bits| {
            let start = find_frame_start(&bits, &chain.sync_word)?;
            extract_payload(&bits, start, chain.payload_len).ok()
        });
        errors[i] = Some(match recovered {
            Some(bits) => bits.iter().zip(payload).filter(|(a, b)| a != b).count(),
            None => payload.len(),
        });
    }

    let packets_detected = errors.iter().flatten().count();
    StreamOutcome {
        reports: reports.to_vec(),
        packets_sent: packets.len(),
        packets_detected,
        false_detections,
        misses: packets.len() - packets_detected,
        packets_recovered: errors.iter().filter(|e| **e == Some(0)).count(),
        bit_errors: errors
            .iter()
            .zip(packets)
            .map(|(e, p)| e.unwrap_or(p.payload.len()))
            .sum(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cpfsk_phy::{modulate_at, CfoEstimate};

    fn report(start: u64) -> PacketReport {
        PacketReport {
            start,
            cfo: CfoEstimate::exact(0.0),
            sto: 0,
            window_power: 1.0,
            noise_power: None,
            snr_db: None,
        }
    }

    /// Two packets, the second 2000 samples into the stream
    fn packets(cfg: &ChainConfig) -> Vec<StreamPacket> {
        let channel = Channel::new(cfg).unwrap();
        [(0usize, 1u8), (2000, 0)]
            .into_iter()
            .map(|(offset, fill)| {
                let draw = PacketDraw {
                    payload: (0..cfg.payload_len).map(|i| (i % 3 == 0) as u8 ^ fill).collect(),
                    delay_rx: 0.0,
                    cfo_hz: 0.0,
                };
                StreamPacket {
                    truth: GroundTruth::new(cfg, &channel, &draw).offset_by(offset),
                    payload: draw.payload,
                }
            })
            .collect()
    }

    fn segment(cfg: &ChainConfig, payload: Option<&[u8]>) -> Vec<Complex64> {
        let mut seg = match payload {
            Some(p) => modulate_at(&cfg.frame_bits(p), cfg, cfg.osr_rx),
            None => Vec::new(),
        };
        seg.resize(cfg.stream_packet_samples(), Complex64::new(0.0, 0.0));
        seg
    }

    #[test]
    fn test_false_report_does_not_shift_later_packets() {
        let cfg = ChainConfig::default();
        let packets = packets(&cfg);
        // An early report during the lead silence, then both packets
        let reports = [report(100), report(320), report(2320)];
        let mut out = segment(&cfg, None);
        out.extend(segment(&cfg, Some(&packets[0].payload[..])));
        out.extend(segment(&cfg, Some(&packets[1].payload[..])));

        let outcome = score(&cfg, &packets, &reports, &out);
        assert_eq!(outcome.packets_detected, 2);
        assert_eq!(outcome.false_detections, 1);
        assert_eq!(outcome.misses, 0);
        assert_eq!(outcome.packets_recovered, 2);
        assert_eq!(outcome.bit_errors, 0);
    }

    #[test]
    fn test_missed_packet_and_duplicate_report() {
        let cfg = ChainConfig::default();
        let packets = packets(&cfg);
        let reports = [report(320), report(330)];
        let mut out = segment(&cfg, Some(&packets[0].payload[..]));
        out.extend(segment(&cfg, None));

        let outcome = score(&cfg, &packets, &reports, &out);
        assert_eq!(outcome.packets_detected, 1);
        assert_eq!(outcome.false_detections, 1);
        assert_eq!(outcome.misses, 1);
        assert_eq!(outcome.packets_recovered, 1);
        assert_eq!(outcome.bit_errors, cfg.payload_len);
    }

    #[test]
    fn test_truncated_last_segment() {
        let cfg = ChainConfig::default();
        let packets = packets(&cfg);
        let reports = [report(320), report(2320)];
        let mut out = segment(&cfg, Some(&packets[0].payload[..]));
        out.extend_from_slice(&segment(&cfg, Some(&packets[1].payload[..]))[..400]);

        let outcome = score(&cfg, &packets, &reports, &out);
        assert_eq!(outcome.packets_detected, 2);
        assert_eq!(outcome.packets_recovered, 1);
        assert_eq!(outcome.bit_errors, cfg.payload_len);
    }
}
