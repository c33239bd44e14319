//! Demodulation and receive-chain benchmarks

use cpfsk_phy::*;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

fn benchmark_demodulate(c: &mut Criterion) {
    let cfg = ChainConfig::default();
    let mut rng = ChaCha8Rng::seed_from_u64(11);
    let bits: Vec<u8> = (0..1000).map(|_| rng.gen_range(0..2u8)).collect();
    let samples = modulate_at(&bits, &cfg, cfg.osr_rx);

    c.bench_function("cpfsk_demodulate_1000_bits", |b| {
        b.iter(|| black_box(demodulate(&samples, &cfg)))
    });
}

fn benchmark_receive_packet(c: &mut Criterion) {
    let cfg = ChainConfig::default();
    let mut rng = ChaCha8Rng::seed_from_u64(13);
    let payload: Vec<u8> = (0..cfg.payload_len).map(|_| rng.gen_range(0..2u8)).collect();

    let mut rx = vec![Complex64::new(0.0, 0.0); cfg.lead_silence_symbols * cfg.osr_rx];
    rx.extend(modulate_at(&cfg.frame_bits(&payload), &cfg, cfg.osr_rx));
    rx.extend(vec![Complex64::new(0.0, 0.0); cfg.tail_silence_symbols * cfg.osr_rx]);
    let rx = Nco::new(3000.0, cfg.rx_sample_rate()).mix(&rx);

    let engine = SyncEngine::new(cfg).expect("default config is valid");
    let overrides = StageOverrides::default();

    c.bench_function("sync_engine_receive_packet", |b| {
        b.iter(|| black_box(engine.receive(&rx, &overrides)))
    });
}

criterion_group!(benches, benchmark_demodulate, benchmark_receive_packet);
criterion_main!(benches);
