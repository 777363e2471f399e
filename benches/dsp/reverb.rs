//! Benchmarks for the feedback delay network.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use silence_dsp::dsp::reverb::{FdnParams, FeedbackDelayNetwork};

use crate::{BLOCK_SIZES, SAMPLE_RATE};

pub fn bench_reverb(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/reverb");

    for &size in BLOCK_SIZES {
        let input: Vec<f32> = (0..size)
            .map(|i| {
                if i < 10 {
                    1.0 - (i as f32 / 10.0) // initial impulse
                } else {
                    (i as f32 * 0.05).sin() * 0.1 // quiet tail
                }
            })
            .collect();
        let mut left = vec![0.0f32; size];
        let mut right = vec![0.0f32; size];

        // static lengths, no random numbers drawn
        let mut still = FeedbackDelayNetwork::new(
            FdnParams {
                pitch_mod: 0.0,
                ..FdnParams::default()
            },
            SAMPLE_RATE,
        );
        group.bench_with_input(BenchmarkId::new("still", size), &size, |b, _| {
            b.iter(|| {
                still.process_block(black_box(&input), &mut left, &mut right);
                left[0] + right[0]
            })
        });

        // the orchestra's own settings
        let mut modulated = FeedbackDelayNetwork::new(FdnParams::default(), SAMPLE_RATE);
        group.bench_with_input(BenchmarkId::new("modulated", size), &size, |b, _| {
            b.iter(|| {
                modulated.process_block(black_box(&input), &mut left, &mut right);
                left[0] + right[0]
            })
        });
    }

    group.finish();
}
