//! Benchmarks for low-level DSP primitives.

mod delay;
mod filter;
mod reverb;

pub use delay::bench_delay;
pub use filter::bench_filter;
pub use reverb::bench_reverb;
