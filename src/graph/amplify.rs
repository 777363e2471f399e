use crate::{
    graph::node::{GraphNode, RenderCtx},
    MAX_BLOCK_SIZE,
};

/// `signal × modulator`, sample by sample (envelope gating or ring modulation).
pub struct Amplify<N, M> {
    pub signal: N,
    pub modulator: M,
    scratch: Vec<f32>,
}

impl<N, M> Amplify<N, M> {
    pub fn new(signal: N, modulator: M) -> Self {
        Self {
            signal,
            modulator,
            scratch: vec![0.0; MAX_BLOCK_SIZE],
        }
    }
}

impl<N: GraphNode, M: GraphNode> GraphNode for Amplify<N, M> {
    fn render_block(&mut self, out: &mut [f32], ctx: &RenderCtx) {
        self.signal.render_block(out, ctx);

        let frames = &mut self.scratch[..out.len()];
        frames.fill(0.0);
        self.modulator.render_block(frames, ctx);

        for (o, m) in out.iter_mut().zip(frames.iter()) {
            *o *= *m;
        }
    }

    fn note_on(&mut self, ctx: &RenderCtx) {
        self.signal.note_on(ctx);
        self.modulator.note_on(ctx);
    }

    fn note_off(&mut self, ctx: &RenderCtx) {
        self.signal.note_off(ctx);
        self.modulator.note_off(ctx);
    }

    fn get_envelope_level(&self) -> Option<f32> {
        self.modulator.get_envelope_level()
    }

    fn is_active(&self) -> bool {
        self.modulator.is_active() && self.signal.is_active()
    }
}

/// Fixed linear gain (partial levels, drawbar settings).
pub struct Gain<N> {
    pub signal: N,
    pub gain: f32,
}

impl<N: GraphNode> GraphNode for Gain<N> {
    fn render_block(&mut self, out: &mut [f32], ctx: &RenderCtx) {
        self.signal.render_block(out, ctx);
        for o in out.iter_mut() {
            *o *= self.gain;
        }
    }

    fn note_on(&mut self, ctx: &RenderCtx) {
        self.signal.note_on(ctx);
    }

    fn note_off(&mut self, ctx: &RenderCtx) {
        self.signal.note_off(ctx);
    }

    fn get_envelope_level(&self) -> Option<f32> {
        self.signal.get_envelope_level()
    }

    fn is_active(&self) -> bool {
        self.signal.is_active()
    }
}
