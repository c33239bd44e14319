//! Modulation benchmarks

use cpfsk_phy::*;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

fn random_bits(n: usize) -> Vec<u8> {
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    (0..n).map(|_| rng.gen_range(0..2u8)).collect()
}

fn benchmark_modulate_tx_rate(c: &mut Criterion) {
    let cfg = ChainConfig::default();
    let bits = random_bits(1000);

    c.bench_function("cpfsk_modulate_1000_bits_osr64", |b| {
        b.iter(|| black_box(modulate(&bits, &cfg)))
    });
}

fn benchmark_modulate_rx_rate(c: &mut Criterion) {
    let cfg = ChainConfig::default();
    let bits = random_bits(1000);

    c.bench_function("cpfsk_modulate_1000_bits_osr8", |b| {
        b.iter(|| black_box(modulate_at(&bits, &cfg, cfg.osr_rx)))
    });
}

criterion_group!(benches, benchmark_modulate_tx_rate, benchmark_modulate_rx_rate);
criterion_main!(benches);
