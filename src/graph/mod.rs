//! Composable building blocks for constructing voice graphs.
//!
//! Graph nodes wrap the low-level DSP primitives with what instrument design
//! needs: note events, block rendering and per-note configuration. Every
//! node is mono; the voice that owns a graph pans it into the busses. The
//! `extensions` module adds fluent helpers so instruments read as a chain.

/// Bank of table oscillators at fixed partial ratios.
pub mod additive;
/// Multiply a signal by a modulator, or by a fixed gain.
pub mod amplify;
/// Fixed and gliding echoes of a source.
pub mod delay;
/// Envelope generator node (ADSR or per-note breakpoints).
pub mod envelope;
/// Fluent combinators (`.amplify()`, `.sum()`, etc.).
pub mod extensions;
/// Swept filter chains and level matching.
pub mod filter;
/// Carrier/modulator FM pair and modified FM.
pub mod fm;
/// Weighted parallel mixing.
pub mod mix;
/// Core traits shared by all graph nodes.
pub mod node;
/// Audio-band oscillators following the note pitch.
pub mod oscillator;
/// Plucked strings: waveguides and recirculating tables.
pub mod pluck;
