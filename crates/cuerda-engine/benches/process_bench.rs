//! Benchmarks for the full per-block processing path.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use cuerda_engine::{Engine, EngineConfig, ParamId};

fn build_engine(arp: bool) -> Engine {
    let mut config = EngineConfig::default();
    config.block_size = 512;
    config.arp_enabled = arp;
    let mut engine = Engine::new(config).unwrap();
    engine.start().unwrap();
    let handle = engine.handle();
    handle.set(ParamId::LeftDelayS, 0.25).unwrap();
    handle.set(ParamId::RightDelayS, 0.5).unwrap();
    handle.set(ParamId::Feedback, 0.5).unwrap();
    handle.set_bool(ParamId::PingPong, true).unwrap();
    engine
}

fn guitar_block(frames: usize) -> Vec<f32> {
    (0..frames * 2)
        .map(|i| ((i / 2) as f32 * 0.021).sin() * 0.4)
        .collect()
}

fn bench_process(c: &mut Criterion) {
    let mut group = c.benchmark_group("engine_process");

    let input = guitar_block(512);
    let mut output = vec![0.0f32; 1024];

    let mut delay_only = build_engine(false);
    group.bench_function("block_512_delay_only", |b| {
        b.iter(|| {
            delay_only.process(black_box(&input), &mut output);
            black_box(output[0])
        })
    });

    let mut full = build_engine(true);
    group.bench_function("block_512_with_arp_and_detector", |b| {
        b.iter(|| {
            full.process(black_box(&input), &mut output);
            black_box(output[0])
        })
    });

    group.finish();
}

criterion_group!(benches, bench_process);
criterion_main!(benches);
