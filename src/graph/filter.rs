use crate::{
    dsp::{dynamics::Balancer, filter::SVFilter},
    graph::{
        envelope::{EnvNode, SegmentBuilder},
        node::{GraphNode, RenderCtx},
    },
    MAX_BLOCK_SIZE,
};

/*
Swept Filters
=============

A `FilterNode` runs its source through a series of state variable filters.
Each filter's cutoff (and a band-pass's width) is a per-note breakpoint
curve in Hz, built from the note's context like any other envelope. The
curves are sampled once per block, so a sweep moves in block-sized steps.

  FilterNode::new(source)
      .bandpass(centre, width)     // both curves in Hz
      .highpass(cutoff)
      .balanced()                  // match the level of the unfiltered source

`balanced()` follows the chain with a level match against the source, so a
narrow band keeps the loudness of the full signal.

`Balance` does the same for two independent graphs: the first is rescaled
to the level of the second, and may also be let through as it is.
*/

enum Band {
    LowPass(EnvNode),
    HighPass(EnvNode),
    BandPass { centre: EnvNode, width: EnvNode },
}

struct Stage {
    filter: SVFilter,
    band: Band,
}

/// Last value of a per-note curve over this block.
fn sample_curve(curve: &mut EnvNode, frames: &mut [f32], ctx: &RenderCtx) -> f32 {
    curve.render_block(frames, ctx);
    frames.last().copied().unwrap_or_else(|| curve.level())
}

impl Stage {
    fn render(&mut self, out: &mut [f32], curve: &mut [f32], ctx: &RenderCtx) {
        match &mut self.band {
            Band::LowPass(cutoff) | Band::HighPass(cutoff) => {
                let hz = sample_curve(cutoff, curve, ctx);
                self.filter.set_cutoff(hz);
            }
            Band::BandPass { centre, width } => {
                let centre = sample_curve(centre, curve, ctx);
                let width = sample_curve(width, curve, ctx);
                self.filter.set_bandwidth(centre, width);
            }
        }
        self.filter.render(out, ctx.sample_rate);
    }

    fn note_on(&mut self, ctx: &RenderCtx) {
        self.filter.reset();
        match &mut self.band {
            Band::LowPass(cutoff) | Band::HighPass(cutoff) => cutoff.note_on(ctx),
            Band::BandPass { centre, width } => {
                centre.note_on(ctx);
                width.note_on(ctx);
            }
        }
    }
}

pub struct FilterNode<N> {
    source: N,
    stages: Vec<Stage>,
    balancer: Option<Balancer>,
    dry: Vec<f32>,
    curve: Vec<f32>,
}

impl<N> FilterNode<N> {
    pub fn new(source: N) -> Self {
        Self {
            source,
            stages: Vec::new(),
            balancer: None,
            dry: Vec::new(),
            curve: vec![0.0; MAX_BLOCK_SIZE],
        }
    }

    pub fn lowpass(mut self, cutoff: SegmentBuilder) -> Self {
        self.stages.push(Stage {
            filter: SVFilter::butterworth_lowpass(1_000.0),
            band: Band::LowPass(EnvNode::per_note(cutoff)),
        });
        self
    }

    pub fn highpass(mut self, cutoff: SegmentBuilder) -> Self {
        self.stages.push(Stage {
            filter: SVFilter::butterworth_highpass(1_000.0),
            band: Band::HighPass(EnvNode::per_note(cutoff)),
        });
        self
    }

    pub fn bandpass(mut self, centre: SegmentBuilder, width: SegmentBuilder) -> Self {
        self.stages.push(Stage {
            filter: SVFilter::bandpass(1_000.0, 100.0),
            band: Band::BandPass {
                centre: EnvNode::per_note(centre),
                width: EnvNode::per_note(width),
            },
        });
        self
    }

    /// Rescale the filtered signal to the level of the unfiltered source.
    pub fn balanced(mut self) -> Self {
        self.balancer = Some(Balancer::new(44_100.0));
        self.dry = vec![0.0; MAX_BLOCK_SIZE];
        self
    }
}

impl<N: GraphNode> GraphNode for FilterNode<N> {
    fn render_block(&mut self, out: &mut [f32], ctx: &RenderCtx) {
        self.source.render_block(out, ctx);

        let frames = out.len();
        if self.balancer.is_some() {
            self.dry[..frames].copy_from_slice(out);
        }

        for stage in &mut self.stages {
            stage.render(out, &mut self.curve[..frames], ctx);
        }

        if let Some(balancer) = &mut self.balancer {
            for (sample, &dry) in out.iter_mut().zip(&self.dry[..frames]) {
                *sample *= balancer.gain(*sample, dry);
            }
        }
    }

    fn note_on(&mut self, ctx: &RenderCtx) {
        self.source.note_on(ctx);
        for stage in &mut self.stages {
            stage.note_on(ctx);
        }
        if let Some(balancer) = &mut self.balancer {
            *balancer = Balancer::new(ctx.sample_rate);
        }
    }

    fn note_off(&mut self, ctx: &RenderCtx) {
        self.source.note_off(ctx);
    }

    fn get_envelope_level(&self) -> Option<f32> {
        self.source.get_envelope_level()
    }

    fn is_active(&self) -> bool {
        self.source.is_active()
    }
}

/// `signal × (dry + level(comparator) / level(signal))`.
pub struct Balance<S, C> {
    signal: S,
    comparator: C,
    dry: f32,
    balancer: Balancer,
    scratch: Vec<f32>,
}

impl<S, C> Balance<S, C> {
    pub fn new(signal: S, comparator: C) -> Self {
        Self {
            signal,
            comparator,
            dry: 0.0,
            balancer: Balancer::new(44_100.0),
            scratch: vec![0.0; MAX_BLOCK_SIZE],
        }
    }

    /// Also pass the signal through unchanged at `gain`.
    pub fn with_dry(mut self, gain: f32) -> Self {
        self.dry = gain;
        self
    }
}

impl<S: GraphNode, C: GraphNode> GraphNode for Balance<S, C> {
    fn render_block(&mut self, out: &mut [f32], ctx: &RenderCtx) {
        self.signal.render_block(out, ctx);

        let frames = &mut self.scratch[..out.len()];
        frames.fill(0.0);
        self.comparator.render_block(frames, ctx);

        for (sample, &reference) in out.iter_mut().zip(frames.iter()) {
            let gain = self.balancer.gain(*sample, reference);
            *sample *= self.dry + gain;
        }
    }

    fn note_on(&mut self, ctx: &RenderCtx) {
        self.signal.note_on(ctx);
        self.comparator.note_on(ctx);
        self.balancer = Balancer::new(ctx.sample_rate);
    }

    fn note_off(&mut self, ctx: &RenderCtx) {
        self.signal.note_off(ctx);
        self.comparator.note_off(ctx);
    }

    fn is_active(&self) -> bool {
        self.signal.is_active()
    }
}
