use crate::{
    dsp::oscillator::{OscillatorBlock, WaveTable},
    graph::{
        envelope::{EnvNode, SegmentBuilder},
        node::{GraphNode, RenderCtx},
    },
    MAX_BLOCK_SIZE,
};

/*
FM Operator Pair
================

A modulator oscillator drives the instantaneous frequency of a carrier:

  f       = note frequency × pitch
  mod     = table(phase_m),          phase_m advances by f · mod_ratio
  carrier = table(phase_c),          phase_c advances by
            f · carrier_ratio + index · f · mod_ratio · mod

`index` is the peak deviation in multiples of the modulator frequency; the
higher it is, the more sidebands (and the brighter the tone). Both
oscillators read the same wavetable, so a table that is itself rich in
harmonics gives a denser spectrum than sine-on-sine FM.

The index can follow a per-note envelope (a bell's brightness dies away
faster than its loudness), and white noise of a fixed number of Hz can be
added to the deviation for a rougher strike.
*/

pub struct FmNode {
    table: WaveTable,
    carrier: OscillatorBlock,
    modulator: OscillatorBlock,
    pitch: f32,
    carrier_ratio: f32,
    mod_ratio: f32,
    index: f32,
    index_envelope: Option<EnvNode>,
    depth: Vec<f32>,
    deviation_noise: f32,
    noise: OscillatorBlock,
}

impl FmNode {
    pub fn new(table: WaveTable, carrier_ratio: f32, mod_ratio: f32, index: f32) -> Self {
        Self {
            carrier: OscillatorBlock::table(table.clone()),
            modulator: OscillatorBlock::table(table.clone()),
            table,
            pitch: 1.0,
            carrier_ratio,
            mod_ratio,
            index,
            index_envelope: None,
            depth: Vec::new(),
            deviation_noise: 0.0,
            noise: OscillatorBlock::noise(),
        }
    }

    /// Scale the index by a per-note envelope.
    pub fn with_index_envelope(mut self, envelope: SegmentBuilder) -> Self {
        self.index_envelope = Some(EnvNode::per_note(envelope));
        self.depth = vec![1.0; MAX_BLOCK_SIZE];
        self
    }

    /// Add white noise of up to `hz` to the deviation.
    pub fn with_deviation_noise(mut self, hz: f32) -> Self {
        self.deviation_noise = hz;
        self
    }

    /// Play at `ratio` × the note frequency (unison detune).
    pub fn with_pitch(mut self, ratio: f32) -> Self {
        self.pitch = ratio;
        self
    }

    pub fn table(&self) -> &WaveTable {
        &self.table
    }
}

impl GraphNode for FmNode {
    fn render_block(&mut self, out: &mut [f32], ctx: &RenderCtx) {
        let f = ctx.frequency * self.pitch;
        let mod_freq = f * self.mod_ratio;
        let deviation = self.index * mod_freq;
        let carrier_freq = f * self.carrier_ratio;

        let depth = match &mut self.index_envelope {
            Some(envelope) => {
                let frames = &mut self.depth[..out.len()];
                envelope.render_block(frames, ctx);
                Some(&*frames)
            }
            None => None,
        };

        for (n, sample) in out.iter_mut().enumerate() {
            let mut swing = deviation * depth.map_or(1.0, |d| d[n]);
            if self.deviation_noise > 0.0 {
                swing += self.deviation_noise * self.noise.next_sample(0.0, ctx.sample_rate);
            }
            let m = self.modulator.next_sample(mod_freq, ctx.sample_rate);
            *sample = self
                .carrier
                .next_sample(carrier_freq + swing * m, ctx.sample_rate);
        }
    }

    fn note_on(&mut self, ctx: &RenderCtx) {
        self.carrier.reset();
        self.modulator.reset();
        self.noise.reset();
        if let Some(envelope) = &mut self.index_envelope {
            envelope.note_on(ctx);
        }
    }
}

/*
Modified FM
===========

Plain FM spreads energy into sidebands on both sides of the carrier in
equal measure. Modified FM (Schaefer's generalisation, as used in the
Xanadu and chorusing voices) adds an amplitude term driven by the same
modulator, which tilts the spectrum to one side. With index I and
sideband ratio r:

  a1  = I · (r - 1/r) / 2
  a2  = I · (r + 1/r) / 2
  c   = cos(2π f t)
  amp = exp(a1 · c - ln I0(2|a1|) / 2)
  out = amp · sin(2π ∫ (f · 2^±detune + a2 · f · c) dt)

`ln I0` is the log of the modified Bessel function of the first kind,
which keeps the loudness roughly constant as the index moves. Two carriers
a few cents apart are summed for a slow chorus. Both I and r follow
per-note breakpoint curves.
*/

pub struct ModifiedFmNode {
    index: EnvNode,
    ratio: EnvNode,
    detune_octaves: f32,
    modulator: OscillatorBlock,
    upper: OscillatorBlock,
    lower: OscillatorBlock,
    index_frames: Vec<f32>,
    ratio_frames: Vec<f32>,
}

impl ModifiedFmNode {
    pub fn new(index: SegmentBuilder, ratio: SegmentBuilder, detune_octaves: f32) -> Self {
        Self {
            index: EnvNode::per_note(index),
            ratio: EnvNode::per_note(ratio),
            detune_octaves,
            // a sine a quarter cycle in is the cosine modulator
            modulator: OscillatorBlock::sine().with_phase(0.25),
            upper: OscillatorBlock::sine(),
            lower: OscillatorBlock::sine(),
            index_frames: vec![0.0; MAX_BLOCK_SIZE],
            ratio_frames: vec![1.0; MAX_BLOCK_SIZE],
        }
    }
}

impl GraphNode for ModifiedFmNode {
    fn render_block(&mut self, out: &mut [f32], ctx: &RenderCtx) {
        let frames = out.len();
        self.index.render_block(&mut self.index_frames[..frames], ctx);
        self.ratio.render_block(&mut self.ratio_frames[..frames], ctx);

        let f = ctx.frequency;
        let spread = self.detune_octaves.exp2();
        let (upper_hz, lower_hz) = (f * spread, f / spread);

        for (n, sample) in out.iter_mut().enumerate() {
            let index = self.index_frames[n];
            let r = self.ratio_frames[n].max(1e-3);
            let a1 = index * (r - 1.0 / r) * 0.5;
            let a2 = index * (r + 1.0 / r) * 0.5;

            let c = self.modulator.next_sample(f, ctx.sample_rate);
            let amp = (a1 * c - 0.5 * ln_bessel_i0(2.0 * a1)).exp();
            let deviation = a2 * f * c;

            *sample = amp
                * (self.upper.next_sample(upper_hz + deviation, ctx.sample_rate)
                    + self.lower.next_sample(lower_hz + deviation, ctx.sample_rate));
        }
    }

    fn note_on(&mut self, ctx: &RenderCtx) {
        self.index.note_on(ctx);
        self.ratio.note_on(ctx);
        self.modulator.reset();
        self.upper.reset();
        self.lower.reset();
    }
}

/// `ln I0(x)`, polynomial fits from Abramowitz and Stegun 9.8.1 and 9.8.2.
fn ln_bessel_i0(x: f32) -> f32 {
    let x = x.abs();
    if x <= 3.75 {
        let t = (x / 3.75).powi(2);
        let i0 = 1.0
            + t * (3.515_623
                + t * (3.089_942_4
                    + t * (1.206_749_2 + t * (0.265_973_2 + t * (0.036_076_8 + t * 0.004_581_3)))));
        i0.ln()
    } else {
        let t = 3.75 / x;
        let scaled = 0.398_942_3
            + t * (0.013_285_92
                + t * (0.002_253_19
                    + t * (-0.001_575_65
                        + t * (0.009_162_81
                            + t * (-0.020_577_06
                                + t * (0.026_355_37 + t * (-0.016_476_33 + t * 0.003_923_77)))))));
        x - 0.5 * x.ln() + scaled.ln()
    }
}
