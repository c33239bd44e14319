//! Complex Additive White Gaussian Noise generator
//!
//! Box-Muller transform: each uniform pair yields one circular complex
//! Gaussian sample, the two outputs landing on I and Q.

use cpfsk_phy::Complex64;
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::f64::consts::TAU;

/// Circular complex AWGN with configurable total power `E|n|²`
pub struct NoiseGenerator {
    /// Per-component standard deviation, `sqrt(power / 2)`
    component_std: f64,

    /// Internal RNG
    rng: ChaCha8Rng,
}

impl NoiseGenerator {
    /// Create a generator whose seed is drawn from `seed_rng`
    pub fn new(noise_power: f64, seed_rng: &mut ChaCha8Rng) -> Self {
        // Derived seed keeps independent generators reproducible
        let seed: u64 = seed_rng.gen();

        Self {
            component_std: (noise_power.max(0.0) / 2.0).sqrt(),
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Total complex noise power
    pub fn power(&self) -> f64 {
        2.0 * self.component_std * self.component_std
    }

    /// Next complex Gaussian sample
    pub fn next_complex(&mut self) -> Complex64 {
        let u1: f64 = self.rng.gen();
        let u2: f64 = self.rng.gen();

        // Avoid log(0)
        let u1 = u1.max(1e-300);

        let r = (-2.0 * u1.ln()).sqrt() * self.component_std;
        Complex64::from_polar(r, TAU * u2)
    }

    /// Add noise to every sample in place
    pub fn add_to(&mut self, samples: &mut [Complex64]) {
        if self.component_std == 0.0 {
            return;
        }
        for s in samples.iter_mut() {
            *s += self.next_complex();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draw(power: f64, seed: u64, n: usize) -> Vec<Complex64> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut noise = NoiseGenerator::new(power, &mut rng);
        (0..n).map(|_| noise.next_complex()).collect()
    }

    #[test]
    fn test_noise_creation() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let noise = NoiseGenerator::new(0.1, &mut rng);

        assert!((noise.component_std - 0.05_f64.sqrt()).abs() < 1e-12);
        assert!((noise.power() - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_noise_statistics() {
        let n = 20000;
        let samples = draw(2.0, 42, n);

        let mean: Complex64 = samples.iter().sum::<Complex64>() / n as f64;
        assert!(mean.norm() < 0.05, "Mean {} should be close to 0", mean);

        let power = samples.iter().map(|s| s.norm_sqr()).sum::<f64>() / n as f64;
        assert!((power - 2.0).abs() < 0.1, "Power {} should be close to 2", power);

        // Circular: I and Q carry half the power each, uncorrelated
        let i_var = samples.iter().map(|s| s.re * s.re).sum::<f64>() / n as f64;
        let iq = samples.iter().map(|s| s.re * s.im).sum::<f64>() / n as f64;
        assert!((i_var - 1.0).abs() < 0.06, "I variance {}", i_var);
        assert!(iq.abs() < 0.05, "I/Q correlation {}", iq);
    }

    #[test]
    fn test_noise_deterministic() {
        assert_eq!(draw(0.5, 42, 100), draw(0.5, 42, 100));
        assert_ne!(draw(0.5, 42, 100), draw(0.5, 43, 100));
    }

    #[test]
    fn test_noise_is_gaussian() {
        let num_samples = 100_000usize;
        let samples: Vec<f64> = draw(2.0, 42, num_samples).iter().map(|s| s.re).collect();

        // I component has unit variance: ~68% within 1σ, ~95% within 2σ, ~99.7% within 3σ
        let coverage = |k: f64| {
            samples.iter().filter(|x| x.abs() < k).count() as f64 / num_samples as f64
        };

        assert!((coverage(1.0) - 0.683).abs() < 0.02, "1σ coverage {}", coverage(1.0));
        assert!((coverage(2.0) - 0.954).abs() < 0.01, "2σ coverage {}", coverage(2.0));
        assert!((coverage(3.0) - 0.997).abs() < 0.01, "3σ coverage {}", coverage(3.0));
    }

    #[test]
    fn test_noise_power_scaling() {
        for &power in &[0.1, 1.0, 10.0] {
            let num_samples = 50_000usize;
            let samples = draw(power, 42, num_samples);
            let measured = samples.iter().map(|s| s.norm_sqr()).sum::<f64>() / num_samples as f64;

            assert!(
                (measured - power).abs() / power < 0.05,
                "For power={}, measured power={}",
                power,
                measured
            );
        }
    }

    #[test]
    fn test_zero_power_adds_nothing() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut noise = NoiseGenerator::new(0.0, &mut rng);
        let mut samples = vec![Complex64::new(1.0, -1.0); 16];
        noise.add_to(&mut samples);
        assert!(samples.iter().all(|&s| s == Complex64::new(1.0, -1.0)));
    }

    #[test]
    fn test_noise_numerical_stability() {
        let samples = draw(1.0, 42, 1_000_000);
        assert!(samples.iter().all(|s| s.re.is_finite() && s.im.is_finite()));
    }
}
