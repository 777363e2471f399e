use crate::{
    dsp::{
        lfo::Lfo,
        string::{Excitation, KarplusString, PluckedString},
    },
    graph::node::{GraphNode, RenderCtx},
};

/// How one string of a [`PluckNode`] is excited and heard.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StringSpec {
    pub pluck_point: f32,
    pub amplitude: f32,
    /// Multiplier on the note frequency.
    pub detune: f32,
    pub pickup: f32,
    pub reflection: f32,
}

/// Several waveguide strings plucked together and summed.
///
/// The strings are built (and their loops filled) at note-on; before the
/// first note the node is silent.
pub struct PluckNode {
    specs: Vec<StringSpec>,
    strings: Vec<PluckedString>,
}

impl PluckNode {
    pub fn new(specs: &[StringSpec]) -> Self {
        Self {
            specs: specs.to_vec(),
            strings: Vec::with_capacity(specs.len()),
        }
    }
}

impl GraphNode for PluckNode {
    fn render_block(&mut self, out: &mut [f32], _ctx: &RenderCtx) {
        out.fill(0.0);
        for string in &mut self.strings {
            for sample in out.iter_mut() {
                *sample += string.next_sample();
            }
        }
    }

    fn note_on(&mut self, ctx: &RenderCtx) {
        self.strings.clear();
        for spec in &self.specs {
            self.strings.push(PluckedString::new(
                ctx.sample_rate,
                ctx.frequency * spec.detune,
                spec.amplitude,
                spec.pluck_point,
                spec.pickup,
                spec.reflection,
            ));
        }
    }
}

/// Pitch wobble of a [`KarplusNode`], in octaves.
///
/// The rate can be fixed, follow the note, or both:
/// `rate = rate_hz + note_hz × rate_ratio`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vibrato {
    pub depth_octaves: f32,
    pub rate_hz: f32,
    pub rate_ratio: f32,
}

/// A recirculating-table string.
///
/// The loop is sized for the note itself; `detune` and `vibrato` only
/// change how fast it is read, so a detuned string still decays like one
/// at the written pitch.
pub struct KarplusNode {
    string: KarplusString,
    excitation: Excitation,
    detune_octaves: f32,
    vibrato: Option<Vibrato>,
    lfo: Lfo,
}

impl KarplusNode {
    pub fn new(excitation: Excitation) -> Self {
        Self {
            string: KarplusString::new(),
            excitation,
            detune_octaves: 0.0,
            vibrato: None,
            lfo: Lfo::new(0.0, 0.0),
        }
    }

    pub fn with_detune(mut self, octaves: f32) -> Self {
        self.detune_octaves = octaves;
        self
    }

    pub fn with_vibrato(mut self, vibrato: Vibrato) -> Self {
        self.vibrato = Some(vibrato);
        self
    }
}

impl GraphNode for KarplusNode {
    fn render_block(&mut self, out: &mut [f32], ctx: &RenderCtx) {
        for sample in out.iter_mut() {
            let bend = self.detune_octaves + self.lfo.next_sample(ctx.sample_rate);
            let frequency = ctx.frequency * bend.exp2();
            *sample = self.string.next_sample(frequency, ctx.sample_rate);
        }
    }

    fn note_on(&mut self, ctx: &RenderCtx) {
        self.string
            .pluck(ctx.sample_rate, ctx.frequency, &self.excitation);
        self.lfo = match self.vibrato {
            Some(v) => Lfo::new(v.rate_hz + ctx.frequency * v.rate_ratio, v.depth_octaves),
            None => Lfo::new(0.0, 0.0),
        };
    }
}
