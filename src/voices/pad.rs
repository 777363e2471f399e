//! Pad voice - string pad under a slow swell.
//!
//! Three copies of the same bright table, one on pitch and one each 0.1 Hz
//! flat and sharp. The offsets are in Hz, so every note beats at the same
//! slow rate. A triangular swell rises over the first half of the written
//! note and falls over the second half; the declick adds a soft edge at
//! both ends.

use crate::{
    dsp::envelope::Segment,
    graph::{
        envelope::EnvNode,
        extensions::NodeExt,
        node::{GraphNode, RenderCtx},
        oscillator::OscNode,
    },
    voices::{bright_wave, held_duration},
};

const DETUNE_HZ: f32 = 0.1;

fn swell(ctx: &RenderCtx) -> (f32, Vec<Segment>) {
    let half = held_duration(ctx) * 0.5;
    (
        0.0,
        vec![Segment::linear(1.0, half), Segment::linear(0.0, half)],
    )
}

/// Create the pad graph.
pub fn pad() -> Box<dyn GraphNode> {
    OscNode::table(bright_wave())
        .sum(OscNode::table(bright_wave()).with_offset(-DETUNE_HZ))
        .sum(OscNode::table(bright_wave()).with_offset(DETUNE_HZ))
        .amplify(EnvNode::per_note(swell))
        .boxed()
}
