//! Benchmarks for delay line operations.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use silence_dsp::dsp::delay::DelayLine;

use crate::{BLOCK_SIZES, SAMPLE_RATE};

pub fn bench_delay(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/delay");

    for &size in BLOCK_SIZES {
        let input: Vec<f32> = (0..size).map(|i| (i as f32 * 0.1).sin()).collect();

        // integer tap, the cheapest read
        let mut delay = DelayLine::with_max_seconds(0.1, SAMPLE_RATE);
        let mut buffer = input.clone();
        group.bench_with_input(BenchmarkId::new("render_10ms", size), &size, |b, _| {
            b.iter(|| {
                buffer.copy_from_slice(&input);
                delay.render(black_box(&mut buffer), black_box(441));
            })
        });

        // swept cubic read, as the chorus does it
        let mut delay = DelayLine::with_max_seconds(0.9, SAMPLE_RATE);
        group.bench_with_input(
            BenchmarkId::new("write_read_interpolated", size),
            &size,
            |b, _| {
                b.iter(|| {
                    let mut sum = 0.0f32;
                    for (i, &x) in input.iter().enumerate() {
                        delay.write(x);
                        let tap = 88.2 + (i as f32 * 0.01).sin() * 14.7;
                        sum += delay.read_interpolated(black_box(tap));
                    }
                    sum
                })
            },
        );
    }

    group.finish();
}
