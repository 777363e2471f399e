//! Benchmarks for whole engine blocks: voices, sends, effects, master.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use silence_dsp::{
    config::OrchestraConfig, engine::Engine, io::BufferSink, synth::message::SynthMessage,
};

use crate::{BLOCK_SIZES, SAMPLE_RATE};

fn engine_with_chord(block_size: usize, notes: usize) -> Engine {
    let config = OrchestraConfig {
        sample_rate: SAMPLE_RATE,
        block_size,
        ..OrchestraConfig::default()
    };
    let mut engine = match Engine::new(&config) {
        Ok(engine) => engine,
        Err(error) => panic!("benchmark config rejected: {error}"),
    };
    let instruments = [2, 5, 7, 11, 13, 16, 20, 23];
    for i in 0..notes {
        engine.handle(SynthMessage::NoteOn {
            instrument: instruments[i % instruments.len()],
            key: 48.0 + (i * 5 % 24) as f32,
            velocity: 80.0,
            pan: (i as f32 / notes as f32) * 2.0 - 1.0,
            duration: 0.0,
        });
    }
    engine
}

pub fn bench_engine(c: &mut Criterion) {
    let mut group = c.benchmark_group("scenarios/engine");

    for &size in BLOCK_SIZES {
        let mut sink = BufferSink::with_capacity(size);

        let mut empty = engine_with_chord(size, 0);
        group.bench_with_input(BenchmarkId::new("effects_only", size), &size, |b, _| {
            b.iter(|| {
                sink.clear();
                black_box(empty.process_block(&mut sink).is_ok())
            })
        });

        let mut full = engine_with_chord(size, 16);
        group.bench_with_input(BenchmarkId::new("16_voices", size), &size, |b, _| {
            b.iter(|| {
                sink.clear();
                black_box(full.process_block(&mut sink).is_ok())
            })
        });
    }

    group.finish();
}
