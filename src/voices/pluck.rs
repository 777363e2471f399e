//! Pluck voice - three plucked strings.
//!
//! Three waveguide strings plucked near the bridge, tuned to the note, a
//! little sharp and a little flat. Slightly different pickup positions and
//! reflection filters keep them from sounding like one string. An
//! exponential envelope takes the sum down to a tenth of its level over the
//! written note, on top of the strings' own decay.

use crate::{
    dsp::envelope::Segment,
    graph::{
        envelope::EnvNode,
        extensions::NodeExt,
        node::{GraphNode, RenderCtx},
        pluck::{PluckNode, StringSpec},
    },
    voices::held_duration,
};

const STRINGS: [StringSpec; 3] = [
    StringSpec {
        pluck_point: 0.1,
        amplitude: 1.0,
        detune: 1.0,
        pickup: 0.15,
        reflection: 0.2,
    },
    StringSpec {
        pluck_point: 0.1,
        amplitude: 1.0,
        detune: 1.003,
        pickup: 0.14,
        reflection: 0.1,
    },
    StringSpec {
        pluck_point: 0.1,
        amplitude: 1.0,
        detune: 0.997,
        pickup: 0.16,
        reflection: 0.1,
    },
];

fn decay(ctx: &RenderCtx) -> (f32, Vec<Segment>) {
    (1.0, vec![Segment::shaped(0.1, held_duration(ctx), -3.0)])
}

/// Create the pluck graph.
pub fn pluck() -> Box<dyn GraphNode> {
    PluckNode::new(&STRINGS)
        .amplify(EnvNode::per_note(decay))
        .boxed()
}
