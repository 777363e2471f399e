//! Real-world scenario benchmarks.
//!
//! Instruments as the engine plays them, the bus effects reading and
//! writing through the mixer, and complete engine blocks.

mod effects;
mod engine;
mod voices;

pub use effects::bench_effects;
pub use engine::bench_engine;
pub use voices::bench_voices;
