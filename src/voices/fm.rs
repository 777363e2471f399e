//! FM voice - two detuned FM pairs.
//!
//! Each pair is a carrier and a modulator at 1.25 × the note with index 5.4,
//! both reading the bright harmonic table. The second pair is pitched 1.003
//! × higher with its carrier at 1.004, so the two drift against each other.
//! The shared envelope is exponential: a 2 ms rise, a fall to 1/8 over the
//! written note, and a 50 ms tail.

use crate::{
    dsp::envelope::Segment,
    graph::{
        envelope::EnvNode,
        extensions::NodeExt,
        fm::FmNode,
        node::{GraphNode, RenderCtx},
    },
    voices::{bright_wave, held_duration},
};

const MOD_RATIO: f32 = 1.25;
const INDEX: f32 = 5.4;
const FLOOR: f32 = 0.000_001;

fn index_envelope(ctx: &RenderCtx) -> (f32, Vec<Segment>) {
    (
        FLOOR,
        vec![
            Segment::exponential(1.0, 0.002),
            Segment::exponential(0.125, held_duration(ctx)),
            Segment::exponential(FLOOR, 0.05),
        ],
    )
}

/// Create the FM graph.
pub fn fm() -> Box<dyn GraphNode> {
    FmNode::new(bright_wave(), 1.0, MOD_RATIO, INDEX)
        .sum(FmNode::new(bright_wave(), 1.004, MOD_RATIO, INDEX).with_pitch(1.003))
        .amplify(EnvNode::per_note(index_envelope))
        .boxed()
}
