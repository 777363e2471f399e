//! Harpsichord voice - a noise-plucked string with a triangle body.
//!
//! A recirculating-table string filled with noise gives the quill's
//! attack. A triangle at the note pitch, fading to nothing over ten seconds
//! on a steep curve, sets the level of a second copy of the string: the
//! string is heard once as it is and once rescaled to the triangle's
//! loudness, so the tone keeps its body while the pluck itself dies away.

use crate::{
    dsp::{envelope::Segment, oscillator::WaveTable, string::Excitation},
    graph::{
        envelope::EnvNode,
        extensions::NodeExt,
        filter::Balance,
        node::{GraphNode, RenderCtx},
        oscillator::OscNode,
        pluck::KarplusNode,
    },
};

const QUILL_SEED: u64 = 0x4b65_6c6c;

fn body_fade(_ctx: &RenderCtx) -> (f32, Vec<Segment>) {
    (1.0, vec![Segment::shaped(0.0, 10.0, -5.0)])
}

/// Create the harpsichord graph.
pub fn harpsichord() -> Box<dyn GraphNode> {
    let body = OscNode::table(WaveTable::triangle()).amplify(EnvNode::per_note(body_fade));
    Balance::new(KarplusNode::new(Excitation::Noise { seed: QUILL_SEED }), body)
        .with_dry(1.0)
        .boxed()
}
