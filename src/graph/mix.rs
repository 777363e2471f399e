use crate::{
    graph::node::{GraphNode, RenderCtx},
    MAX_BLOCK_SIZE,
};

/*
Parallel Signal Mixing
======================

Mix renders two sources in parallel and adds them with a weight each:

  output = A × weight_a + B × weight_b

Two ways to build one:

  .mix(b, balance)   linear crossfade, weight_a = 1 - balance, weight_b = balance
  .sum(b)            plain sum, both weights 1.0

Layering unison oscillators (the pad's three detuned tables, the FM pair)
wants `.sum()`: each layer keeps its full level and the instrument's
normalising measure accounts for the total. Crossfades are for blending two
timbres at a fixed overall level.

Both sources receive note_on/note_off. Apply a shared envelope AFTER mixing
so it gates every layer:

  a.sum(b).amplify(env)    // envelope gates both
*/

pub struct Mix<A, B> {
    pub source_a: A,
    pub source_b: B,
    pub weight_a: f32,
    pub weight_b: f32,
    scratch: Vec<f32>,
}

impl<A, B> Mix<A, B> {
    /// Linear crossfade: 0.0 = all A, 1.0 = all B.
    pub fn new(source_a: A, source_b: B, balance: f32) -> Self {
        let balance = balance.clamp(0.0, 1.0);
        Self::weighted(source_a, source_b, 1.0 - balance, balance)
    }

    pub fn weighted(source_a: A, source_b: B, weight_a: f32, weight_b: f32) -> Self {
        Mix {
            source_a,
            source_b,
            weight_a,
            weight_b,
            scratch: vec![0.0; MAX_BLOCK_SIZE],
        }
    }
}

impl<A: GraphNode, B: GraphNode> GraphNode for Mix<A, B> {
    fn render_block(&mut self, out: &mut [f32], ctx: &RenderCtx) {
        self.source_a.render_block(out, ctx);

        let frames = &mut self.scratch[..out.len()];
        frames.fill(0.0);
        self.source_b.render_block(frames, ctx);

        for (o, b) in out.iter_mut().zip(frames.iter()) {
            *o = *o * self.weight_a + *b * self.weight_b;
        }
    }

    fn note_on(&mut self, ctx: &RenderCtx) {
        self.source_a.note_on(ctx);
        self.source_b.note_on(ctx);
    }

    fn note_off(&mut self, ctx: &RenderCtx) {
        self.source_a.note_off(ctx);
        self.source_b.note_off(ctx);
    }

    fn is_active(&self) -> bool {
        self.source_a.is_active() || self.source_b.is_active()
    }

    fn get_envelope_level(&self) -> Option<f32> {
        match (
            self.source_a.get_envelope_level(),
            self.source_b.get_envelope_level(),
        ) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::graph::{
        extensions::NodeExt,
        node::{GraphNode, RenderCtx},
        oscillator::OscNode,
    };

    const SAMPLE_RATE: f32 = 48_000.0;

    #[test]
    fn test_sum_of_identical_sources_doubles() {
        let ctx = RenderCtx::from_freq(SAMPLE_RATE, 440.0, 1.0);
        let mut single = OscNode::sine();
        let mut layered = OscNode::sine().sum(OscNode::sine());
        let mut a = vec![0.0; 256];
        let mut b = vec![0.0; 256];

        single.render_block(&mut a, &ctx);
        layered.render_block(&mut b, &ctx);

        for (x, y) in a.iter().zip(&b) {
            assert!((2.0 * x - y).abs() < 1e-5, "expected {}, got {}", 2.0 * x, y);
        }
    }

    #[test]
    fn test_mix_balance_extremes() {
        let ctx = RenderCtx::from_freq(SAMPLE_RATE, 440.0, 1.0);
        let mut reference = vec![0.0; 128];
        OscNode::square().render_block(&mut reference, &ctx);

        let mut all_b = OscNode::sine().mix(OscNode::square(), 1.0);
        let mut buffer = vec![0.0; 128];
        all_b.render_block(&mut buffer, &ctx);
        assert_eq!(buffer, reference, "balance 1.0 is all B");

        let mut all_a = OscNode::square().mix(OscNode::sine(), 0.0);
        all_a.render_block(&mut buffer, &ctx);
        assert_eq!(buffer, reference, "balance 0.0 is all A");
    }

    #[test]
    fn test_detuned_layers_beat() {
        // 440 and 441 Hz summed: the envelope of the sum dips to near zero at 0.5 s
        let ctx = RenderCtx::from_freq(SAMPLE_RATE, 440.0, 1.0);
        let mut layered = OscNode::sine().sum(OscNode::sine().with_offset(1.0));
        let mut buffer = vec![0.0; 512];

        let mut peak_start = 0.0f32;
        let mut peak_middle = 0.0f32;
        for block in 0..(SAMPLE_RATE as usize / 512) {
            layered.render_block(&mut buffer, &ctx);
            let peak = buffer.iter().fold(0.0f32, |acc, &s| acc.max(s.abs()));
            if block == 0 {
                peak_start = peak;
            }
            if block == 46 {
                peak_middle = peak;
            }
        }

        assert!(peak_start > 1.9, "in phase at the start, got {peak_start}");
        assert!(peak_middle < 0.1, "cancelling half a beat later, got {peak_middle}");
    }
}
