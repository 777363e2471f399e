pub mod config; // Orchestra settings and validation
pub mod diagnostics;
pub mod dsp;
pub mod effects; // Bus effects: chorus, reverb, master
pub mod engine; // Block-synchronous scheduling of voices and effects
pub mod graph; // Composable audio graph nodes
pub mod io;
pub mod mixer; // Numbered busses and send levels
pub mod patch; // Stage/send topology
pub mod render;
pub mod score;
pub mod synth; // Voice lifecycle and control messages
pub mod voices; // Ready-made instruments

/// Largest block any stage will be asked to process.
///
/// The reverb reads a whole block of taps before writing, so this must stay
/// below its shortest line length.
pub const MAX_BLOCK_SIZE: usize = 1024;
pub(crate) const MIN_TIME: f32 = 1.0 / 48_000.0;
