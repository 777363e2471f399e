//! Benchmarks for the orchestra's instruments.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use silence_dsp::{
    graph::node::{GraphNode, RenderCtx},
    voices,
};

use crate::{BLOCK_SIZES, SAMPLE_RATE};

pub fn bench_voices(c: &mut Criterion) {
    let mut group = c.benchmark_group("scenarios/voices");
    let ctx = RenderCtx::from_note(SAMPLE_RATE, 57.0, 1.0).with_duration(4.0);

    for &size in BLOCK_SIZES {
        let mut buffer = vec![0.0f32; size];

        for def in voices::all() {
            let mut graph = def.create_graph();
            graph.note_on(&ctx);

            group.bench_with_input(BenchmarkId::new(def.name, size), &size, |b, _| {
                b.iter(|| {
                    graph.render_block(black_box(&mut buffer), black_box(&ctx));
                })
            });
        }
    }

    group.finish();
}
