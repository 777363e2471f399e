use crate::{
    dsp::oscillator::{OscillatorBlock, WaveTable},
    graph::node::{GraphNode, RenderCtx},
};

/// One harmonic of an additive bank: frequency ratio to the note and level.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Partial {
    pub ratio: f32,
    pub gain: f32,
}

impl Partial {
    pub const fn new(ratio: f32, gain: f32) -> Self {
        Self { ratio, gain }
    }
}

/// Picks the wavetable of partial `index` for the note about to start.
pub type TableSelector = fn(index: usize, ctx: &RenderCtx) -> WaveTable;

/// Bank of table oscillators at fixed ratios of the note, summed with
/// per-partial gains.
///
/// Tables are chosen per note, so the timbre of a partial can depend on
/// where on the keyboard the note lies.
pub struct AdditiveNode {
    partials: Vec<Partial>,
    oscillators: Vec<OscillatorBlock>,
    select: TableSelector,
}

impl AdditiveNode {
    pub fn new(partials: &[Partial], select: TableSelector) -> Self {
        let reference = RenderCtx::from_freq(44_100.0, 440.0, 1.0);
        let oscillators = (0..partials.len())
            .map(|index| OscillatorBlock::table(select(index, &reference)))
            .collect();
        Self {
            partials: partials.to_vec(),
            oscillators,
            select,
        }
    }

    pub fn partials(&self) -> &[Partial] {
        &self.partials
    }
}

impl GraphNode for AdditiveNode {
    fn render_block(&mut self, out: &mut [f32], ctx: &RenderCtx) {
        out.fill(0.0);
        for (partial, osc) in self.partials.iter().zip(self.oscillators.iter_mut()) {
            let frequency = ctx.frequency * partial.ratio;
            if partial.gain == 0.0 || frequency >= ctx.sample_rate * 0.5 {
                continue;
            }
            for sample in out.iter_mut() {
                *sample += partial.gain * osc.next_sample(frequency, ctx.sample_rate);
            }
        }
    }

    fn note_on(&mut self, ctx: &RenderCtx) {
        for (index, osc) in self.oscillators.iter_mut().enumerate() {
            *osc = OscillatorBlock::table((self.select)(index, ctx));
        }
    }
}
