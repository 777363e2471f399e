//! Benchmarks for the master stage's filters.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use silence_dsp::dsp::filter::{DcBlocker, OnePole, SVFilter};

use crate::{BLOCK_SIZES, SAMPLE_RATE};

pub fn bench_filter(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/filter");

    for &size in BLOCK_SIZES {
        // sawtooth-like ramp
        let input: Vec<f32> = (0..size)
            .map(|i| (i as f32 / size as f32) * 2.0 - 1.0)
            .collect();

        let mut filter = SVFilter::butterworth_lowpass(100.0);
        let mut buffer = input.clone();
        group.bench_with_input(BenchmarkId::new("butterworth_lowpass", size), &size, |b, _| {
            b.iter(|| {
                buffer.copy_from_slice(&input);
                filter.render(black_box(&mut buffer), black_box(SAMPLE_RATE));
            })
        });

        let mut tone = OnePole::new(16_000.0, SAMPLE_RATE);
        let mut buffer = input.clone();
        group.bench_with_input(BenchmarkId::new("one_pole", size), &size, |b, _| {
            b.iter(|| {
                buffer.copy_from_slice(&input);
                tone.render(black_box(&mut buffer));
            })
        });

        let mut dc = DcBlocker::default();
        let mut buffer = input.clone();
        group.bench_with_input(BenchmarkId::new("dc_blocker", size), &size, |b, _| {
            b.iter(|| {
                buffer.copy_from_slice(&input);
                dc.render(black_box(&mut buffer));
            })
        });
    }

    group.finish();
}
