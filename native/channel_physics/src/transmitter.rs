//! Packet framing at the transmitter
//!
//! `silence + preamble + sync word + payload + silence`, modulated at the
//! TX oversampling ratio, plus the random draws that describe one trial.

use cpfsk_phy::{modulate, ChainConfig, Complex64, OffsetSetting};
use rand::Rng;
use rand_chacha::ChaCha8Rng;

/// Everything drawn at random for one Monte-Carlo trial
#[derive(Debug, Clone, PartialEq)]
pub struct PacketDraw {
    pub payload: Vec<u8>,
    /// Channel delay in RX samples
    pub delay_rx: f64,
    /// Channel frequency offset in Hz
    pub cfo_hz: f64,
}

impl PacketDraw {
    /// Draw payload bits, then delay, then CFO, in that order
    pub fn draw(cfg: &ChainConfig, rng: &mut ChaCha8Rng) -> Self {
        let payload = (0..cfg.payload_len).map(|_| rng.gen_range(0..2u8)).collect();
        let delay_rx = match cfg.sto {
            OffsetSetting::Fixed(v) => v,
            OffsetSetting::Random => rng.gen_range(0.0..cfg.osr_rx as f64),
        };
        let cfo_hz = match cfg.cfo {
            OffsetSetting::Fixed(v) => v,
            OffsetSetting::Random if cfg.cfo_range > 0.0 => {
                rng.gen_range(-cfg.cfo_range..=cfg.cfo_range)
            }
            OffsetSetting::Random => 0.0,
        };
        Self {
            payload,
            delay_rx,
            cfo_hz,
        }
    }
}

/// Modulated frame with leading and trailing silence, at the TX rate
pub fn frame_waveform(cfg: &ChainConfig, payload: &[u8]) -> Vec<Complex64> {
    let zero = Complex64::new(0.0, 0.0);
    let lead = cfg.lead_silence_symbols * cfg.osr_tx;
    let tail = cfg.tail_silence_symbols * cfg.osr_tx;

    let mut out = Vec::with_capacity(lead + cfg.frame_len_bits() * cfg.osr_tx + tail);
    out.resize(lead, zero);
    out.extend(modulate(&cfg.frame_bits(payload), cfg));
    out.resize(out.len() + tail, zero);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_frame_layout() {
        let cfg = ChainConfig::default();
        let payload = vec![1u8; cfg.payload_len];
        let wave = frame_waveform(&cfg, &payload);

        let lead = 40 * 64;
        let body = 114 * 64;
        assert_eq!(wave.len(), lead + body + 16 * 64);
        assert!(wave[..lead].iter().all(|s| s.norm() == 0.0));
        assert!(wave[lead..lead + body].iter().all(|s| (s.norm() - 1.0).abs() < 1e-12));
        assert!(wave[lead + body..].iter().all(|s| s.norm() == 0.0));
    }

    #[test]
    fn test_fixed_draw() {
        let cfg = ChainConfig {
            sto: OffsetSetting::Fixed(2.5),
            cfo: OffsetSetting::Fixed(-120.0),
            ..ChainConfig::default()
        };
        let draw = PacketDraw::draw(&cfg, &mut ChaCha8Rng::seed_from_u64(1));
        assert_eq!(draw.payload.len(), 50);
        assert!(draw.payload.iter().all(|&b| b <= 1));
        assert_eq!(draw.delay_rx, 2.5);
        assert_eq!(draw.cfo_hz, -120.0);
    }

    #[test]
    fn test_random_draw_in_range() {
        let cfg = ChainConfig {
            sto: OffsetSetting::Random,
            cfo: OffsetSetting::Random,
            ..ChainConfig::default()
        };
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        for _ in 0..200 {
            let draw = PacketDraw::draw(&cfg, &mut rng);
            assert!((0.0..8.0).contains(&draw.delay_rx));
            assert!(draw.cfo_hz.abs() <= 10_000.0);
        }
    }
}
