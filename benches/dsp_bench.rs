//! Benchmarks for DSP primitives, bus effects and whole engine blocks.
//!
//! Run with: cargo bench
//!
//! Reference timing at 44.1kHz sample rate:
//!   - 15 samples  = 0.34ms deadline (the orchestra's own block)
//!   - 64 samples  = 1.45ms deadline
//!   - 256 samples = 5.80ms deadline
//!   - 1024 samples = 23.2ms deadline
//!
//! Benchmark groups:
//!   - dsp/*        Delay lines, filters, the FDN core
//!   - scenarios/*  Instruments, bus effects through the mixer, engine blocks

use criterion::{criterion_group, criterion_main};

mod dsp;
mod scenarios;

/// Block sizes worth measuring; the first is the orchestra default.
pub const BLOCK_SIZES: &[usize] = &[15, 64, 256, 1024];

pub const SAMPLE_RATE: f32 = 44_100.0;

criterion_group!(
    benches,
    // Low-level DSP primitives
    dsp::bench_delay,
    dsp::bench_filter,
    dsp::bench_reverb,
    // Real-world scenarios
    scenarios::bench_voices,
    scenarios::bench_effects,
    scenarios::bench_engine,
);
criterion_main!(benches);
