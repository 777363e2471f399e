use crate::dsp::oscillator::{OscillatorBlock, WaveTable};
use crate::graph::node::{GraphNode, RenderCtx};

/*
Audio Oscillator
================

An oscillator node turns the note pitch in `RenderCtx` into a periodic
signal at unit peak. The note amplitude is NOT applied here; the voice owning
the graph scales the finished signal once, so layered oscillators keep their
relative balance.

Pitch is derived from the note in two ways that can be combined:

  ratio       multiply the note frequency (organ drawbars: 0.5, 1.4983, 2 ...)
  offset_hz   add a fixed number of Hz after the ratio (pad chorus: ±0.1 Hz)

An offset in Hz rather than cents keeps the beat rate the same on every note,
which is what gives the string pad its slow, even shimmer.

  frequency = ctx.frequency · ratio + offset_hz

A fixed frequency ignores the note entirely.

Example usage:
  let osc = OscNode::table(wave.clone());                 // follows the note
  let flat = OscNode::table(wave.clone()).with_offset(-0.1);
  let sub = OscNode::table(wave).with_ratio(0.5);         // one octave down
*/

pub struct OscNode {
    osc: OscillatorBlock,
    /// If Some, ignores ctx.frequency and uses this instead.
    fixed_frequency: Option<f32>,
    ratio: f32,
    offset_hz: f32,
}

impl OscNode {
    fn new(osc: OscillatorBlock) -> Self {
        Self {
            osc,
            fixed_frequency: None,
            ratio: 1.0,
            offset_hz: 0.0,
        }
    }

    pub fn sine() -> Self {
        Self::new(OscillatorBlock::sine())
    }

    pub fn sawtooth() -> Self {
        Self::new(OscillatorBlock::sawtooth())
    }

    pub fn square() -> Self {
        Self::new(OscillatorBlock::square())
    }

    pub fn triangle() -> Self {
        Self::new(OscillatorBlock::triangle())
    }

    pub fn table(table: WaveTable) -> Self {
        Self::new(OscillatorBlock::table(table))
    }

    /// White noise; pitch settings have no effect.
    pub fn noise() -> Self {
        Self::new(OscillatorBlock::noise())
    }

    pub fn with_frequency(mut self, freq: f32) -> Self {
        self.fixed_frequency = Some(freq);
        self
    }

    pub fn with_ratio(mut self, ratio: f32) -> Self {
        self.ratio = ratio;
        self
    }

    pub fn with_offset(mut self, hz: f32) -> Self {
        self.offset_hz = hz;
        self
    }

    /// Frequency this node renders for a note at `note_hz`.
    #[inline]
    pub fn frequency_for(&self, note_hz: f32) -> f32 {
        self.fixed_frequency
            .unwrap_or(note_hz * self.ratio + self.offset_hz)
    }
}

impl GraphNode for OscNode {
    fn render_block(&mut self, out: &mut [f32], ctx: &RenderCtx) {
        let modified_ctx = RenderCtx {
            frequency: self.frequency_for(ctx.frequency),
            ..*ctx
        };
        self.osc.render(out, &modified_ctx);
    }

    fn note_on(&mut self, _ctx: &RenderCtx) {
        self.osc.reset();
    }
}
