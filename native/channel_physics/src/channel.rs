//! Link channel model
//!
//! Applied in order:
//! 1. Integer+fractional delay by decimating the TX-rate waveform to the RX
//!    rate after shifting it by whole TX samples
//! 2. Carrier frequency offset from a complex NCO
//! 3. Complex AWGN at the requested Es/N0
//! 4. Linear-phase FIR lowpass, output aligned with its input (group delay
//!    compensated)

use cpfsk_phy::{Carrier, ChainConfig, Complex64, ConfigResult, Nco};
use rand_chacha::ChaCha8Rng;
use std::f64::consts::PI;

use super::noise::NoiseGenerator;

/// Linear-phase FIR low-pass filter
/// Uses windowed-sinc design for constant group delay
#[derive(Debug, Clone)]
pub struct FirLowPassFilter {
    coeffs: Vec<f64>,
    delay: usize, // Group delay in samples = (len-1)/2
}

impl FirLowPassFilter {
    /// Create a FIR LPF using windowed-sinc design
    /// cutoff_hz: cutoff frequency
    /// sample_rate: sample rate in Hz
    /// num_taps: filter length (odd number for symmetric filter)
    pub fn new(cutoff_hz: f64, sample_rate: f64, num_taps: usize) -> Self {
        // Ensure odd number of taps for type 1 linear phase
        let num_taps = if num_taps % 2 == 0 { num_taps + 1 } else { num_taps };
        let center = (num_taps - 1) / 2;

        // Normalized cutoff frequency (0 to 0.5)
        let fc = cutoff_hz / sample_rate;

        let mut coeffs: Vec<f64> = (0..num_taps)
            .map(|i| {
                let n = i as f64 - center as f64;
                let sinc = if n.abs() < 1e-10 {
                    2.0 * fc
                } else {
                    (2.0 * PI * fc * n).sin() / (PI * n)
                };
                // Hamming window, degenerate for a single tap
                let window = if num_taps > 1 {
                    0.54 - 0.46 * (2.0 * PI * i as f64 / (num_taps - 1) as f64).cos()
                } else {
                    1.0
                };
                sinc * window
            })
            .collect();

        // Normalize for unity DC gain
        let sum: f64 = coeffs.iter().sum();
        for c in &mut coeffs {
            *c /= sum;
        }

        Self {
            coeffs,
            delay: center,
        }
    }

    pub fn coeffs(&self) -> &[f64] {
        &self.coeffs
    }

    /// Get the group delay in samples
    pub fn group_delay(&self) -> usize {
        self.delay
    }

    /// White-noise power gain `Σh²`
    pub fn noise_gain(&self) -> f64 {
        self.coeffs.iter().map(|c| c * c).sum()
    }

    /// Filter a block, output sample `n` centred on input sample `n`
    ///
    /// Samples outside the block are taken as zero.
    pub fn filter_same(&self, input: &[Complex64]) -> Vec<Complex64> {
        let len = input.len() as isize;
        let c = self.delay as isize;
        (0..len)
            .map(|n| {
                self.coeffs
                    .iter()
                    .enumerate()
                    .filter_map(|(k, &h)| {
                        let m = n + c - k as isize;
                        (0..len).contains(&m).then(|| input[m as usize] * h)
                    })
                    .sum::<Complex64>()
            })
            .collect()
    }
}

/// Delay, CFO, noise and receive filter for one chain configuration
#[derive(Debug, Clone)]
pub struct Channel {
    osr_rx: usize,
    decimation: usize,
    rx_sample_rate: f64,
    filter: FirLowPassFilter,
}

impl Channel {
    pub fn new(cfg: &ChainConfig) -> ConfigResult<Self> {
        cfg.validate()?;
        Ok(Self {
            osr_rx: cfg.osr_rx,
            decimation: cfg.decimation(),
            rx_sample_rate: cfg.rx_sample_rate(),
            filter: FirLowPassFilter::new(cfg.filter_cutoff, cfg.rx_sample_rate(), cfg.filter_taps),
        })
    }

    pub fn filter(&self) -> &FirLowPassFilter {
        &self.filter
    }

    /// Whole TX samples a delay of `delay_rx` RX samples shifts by
    pub fn tx_shift(&self, delay_rx: f64) -> i64 {
        (delay_rx * self.decimation as f64).round() as i64
    }

    /// Delay then decimate to the RX rate
    ///
    /// `rx[n] = tx[n·D - shift]`, zero where that index falls outside `tx`.
    pub fn resample(&self, tx: &[Complex64], delay_rx: f64) -> Vec<Complex64> {
        let d = self.decimation as i64;
        let shift = self.tx_shift(delay_rx);
        let n_out = ((tx.len() as i64 + shift).max(0) / d) as usize;
        (0..n_out)
            .map(|n| {
                let m = n as i64 * d - shift;
                if (0..tx.len() as i64).contains(&m) {
                    tx[m as usize]
                } else {
                    Complex64::new(0.0, 0.0)
                }
            })
            .collect()
    }

    /// Rotate by `cfo_hz`, phase zero at sample 0
    pub fn apply_cfo(&self, samples: &[Complex64], cfo_hz: f64) -> Vec<Complex64> {
        if cfo_hz == 0.0 {
            return samples.to_vec();
        }
        Nco::new(cfo_hz, self.rx_sample_rate).mix(samples)
    }

    /// Noiseless part of the channel
    pub fn propagate(&self, tx: &[Complex64], delay_rx: f64, cfo_hz: f64) -> Vec<Complex64> {
        self.apply_cfo(&self.resample(tx, delay_rx), cfo_hz)
    }

    /// Complex noise variance per RX sample for a unit-amplitude signal,
    /// `Es = osr_rx`; zero for infinite Es/N0
    pub fn noise_variance(&self, es_n0_db: f64) -> f64 {
        if es_n0_db == f64::INFINITY {
            return 0.0;
        }
        self.osr_rx as f64 / 10.0_f64.powf(es_n0_db / 10.0)
    }

    /// Per-sample SNR after the receive filter, in dB
    pub fn effective_snr_db(&self, es_n0_db: f64) -> f64 {
        let noise = self.noise_variance(es_n0_db) * self.filter.noise_gain();
        if noise == 0.0 {
            return f64::INFINITY;
        }
        -10.0 * noise.log10()
    }

    /// Add independent noise and apply the receive filter
    ///
    /// The noise generator's seed is drawn from `rng`.
    pub fn add_noise_and_filter(
        &self,
        clean: &[Complex64],
        es_n0_db: f64,
        rng: &mut ChaCha8Rng,
    ) -> Vec<Complex64> {
        let mut noisy = clean.to_vec();
        NoiseGenerator::new(self.noise_variance(es_n0_db), rng).add_to(&mut noisy);
        self.filter.filter_same(&noisy)
    }
}
