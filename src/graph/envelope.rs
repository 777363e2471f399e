use crate::{
    dsp::envelope::{Envelope, Segment, Segments},
    graph::node::{GraphNode, RenderCtx},
};

/// Builds breakpoints for one note from its context (mostly its duration).
pub type SegmentBuilder = fn(&RenderCtx) -> (f32, Vec<Segment>);

enum Shape {
    /// Gate-driven ADSR.
    Adsr(Envelope),
    /// Breakpoints rebuilt at every note-on from the note's context.
    Breakpoints {
        segments: Segments,
        build: SegmentBuilder,
    },
}

/// Envelope generator exposed as a graph node, usually the modulator of an
/// `Amplify`.
pub struct EnvNode {
    shape: Shape,
}

impl EnvNode {
    pub fn adsr(attack: f32, decay: f32, sustain: f32, release: f32) -> Self {
        Self {
            shape: Shape::Adsr(Envelope::adsr(attack, decay, sustain, release)),
        }
    }

    /// Breakpoint envelope whose segments depend on the note being played.
    ///
    /// ```ignore
    /// // rise for the first half of the note, fall for the second
    /// EnvNode::per_note(|ctx| {
    ///     let half = ctx.duration * 0.5;
    ///     (0.0, vec![Segment::linear(1.0, half), Segment::linear(0.0, half)])
    /// })
    /// ```
    pub fn per_note(build: SegmentBuilder) -> Self {
        Self {
            shape: Shape::Breakpoints {
                segments: Segments::new(0.0, Vec::new()),
                build,
            },
        }
    }

    pub fn level(&self) -> f32 {
        match &self.shape {
            Shape::Adsr(env) => env.level(),
            Shape::Breakpoints { segments, .. } => segments.level(),
        }
    }
}

impl GraphNode for EnvNode {
    fn render_block(&mut self, out: &mut [f32], ctx: &RenderCtx) {
        match &mut self.shape {
            Shape::Adsr(env) => env.render(out, ctx),
            Shape::Breakpoints { segments, .. } => segments.render(out, ctx.sample_rate),
        }
    }

    fn note_on(&mut self, ctx: &RenderCtx) {
        match &mut self.shape {
            Shape::Adsr(env) => env.note_on(ctx),
            Shape::Breakpoints { segments, build } => {
                let (start, points) = build(ctx);
                segments.set_segments(start, points);
            }
        }
    }

    fn note_off(&mut self, ctx: &RenderCtx) {
        // Breakpoint shapes run their course; the voice's declick ends the note
        if let Shape::Adsr(env) = &mut self.shape {
            env.note_off(ctx);
        }
    }

    fn get_envelope_level(&self) -> Option<f32> {
        Some(self.level())
    }

    fn is_active(&self) -> bool {
        match &self.shape {
            Shape::Adsr(env) => env.is_active(),
            Shape::Breakpoints { .. } => true,
        }
    }
}
