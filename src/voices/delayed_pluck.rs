//! Delayed pluck voice - three sine-filled strings and a short double echo.
//!
//! The centre string wobbles at 7 Hz and is only heard through two echoes,
//! 200 and 210 ms late. Two strings 4 cents either side, one filled with a
//! sine and one with a cosine, play dry. Everything dies away exponentially
//! over the written note, then passes a 32 Hz high-pass that is level
//! matched back to its input.

use crate::{
    dsp::{envelope::Segment, oscillator::WaveTable, string::Excitation},
    graph::{
        delay::{DelayTapsNode, Tap},
        envelope::EnvNode,
        extensions::NodeExt,
        filter::FilterNode,
        node::{GraphNode, RenderCtx},
        pluck::{KarplusNode, Vibrato},
    },
    voices::held_duration,
};

const SHIFT_OCTAVES: f32 = 4.0 / 1_200.0;

const ECHOES: [Tap; 2] = [Tap::fixed(0.2), Tap::fixed(0.21)];

fn decay(ctx: &RenderCtx) -> (f32, Vec<Segment>) {
    (
        1.0,
        vec![Segment::exponential(0.000_1, held_duration(ctx) + 0.002)],
    )
}

fn rumble_cutoff(_ctx: &RenderCtx) -> (f32, Vec<Segment>) {
    (32.0, Vec::new())
}

/// Create the delayed pluck graph.
pub fn delayed_pluck() -> Box<dyn GraphNode> {
    let vibrato = Vibrato {
        depth_octaves: 1.0 / 120.0,
        rate_hz: 7.0,
        rate_ratio: 0.0,
    };
    let centre = KarplusNode::new(Excitation::Table(WaveTable::sine()))
        .with_vibrato(vibrato)
        .amplify(EnvNode::per_note(decay));
    let echoes = DelayTapsNode::new(centre, 0.3, &ECHOES);

    let sides = KarplusNode::new(Excitation::Table(WaveTable::sine()))
        .with_detune(SHIFT_OCTAVES)
        .sum(KarplusNode::new(Excitation::Table(WaveTable::cosine())).with_detune(-SHIFT_OCTAVES));

    FilterNode::new(sides.sum(echoes).amplify(EnvNode::per_note(decay)))
        .highpass(rumble_cutoff)
        .balanced()
        .boxed()
}
