//! Low-level DSP primitives used by the graph nodes and the bus effects.
//!
//! Everything here allocates only at construction and is realtime-safe
//! afterwards, so these components can be embedded directly inside voices and
//! effects. They stay focused on the signal-processing math; routing and
//! scheduling live in `mixer`, `effects` and `engine`.

/// Circular delay line with cubic fractional reads.
pub mod delay;
/// Stereo-linked peak compressor.
pub mod dynamics;
/// Declick ADSR and breakpoint envelopes.
pub mod envelope;
/// State-variable, one-pole and DC-blocking filters.
pub mod filter;
/// Sine LFO and interpolating random modulation.
pub mod lfo;
/// Summing, crossfading and constant-power panning.
pub mod mix;
/// Oscillator waveforms and harmonic wavetables.
pub mod oscillator;
/// Eight-line feedback delay network.
pub mod reverb;
/// Waveguide plucked string.
pub mod string;

pub use envelope::EnvelopeState;
