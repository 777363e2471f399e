//! Filtered chorus voice - two swept band-pass choirs.
//!
//! # How It Works
//!
//! Each choir is three oscillators on a 21-partial table, at 1, 0.999 and
//! 1.001 times its pitch. The low choir sits a hundredth of an octave
//! flat, the high choir a hundredth sharp. Each goes through two band-pass
//! filters in series, then is brought back to its unfiltered loudness:
//!
//! | choir | first band            | second band                           |
//! |-------|-----------------------|---------------------------------------|
//! | low   | 40 → 800 Hz, 40 Hz    | 220 → 440 Hz, width 0.8 × (440 → 220) |
//! | high  | 800 → 40 Hz, 40 Hz    | 440 → 220 Hz, width 0.8 × (220 → 440) |
//!
//! All sweeps run over the written note, so the two choirs pass each other
//! in the middle. One swell, rising for the first quarter of the note and
//! falling for the rest, shapes both the choirs and the sum.

use std::sync::OnceLock;

use crate::{
    dsp::{envelope::Segment, oscillator::WaveTable},
    graph::{
        envelope::EnvNode,
        extensions::NodeExt,
        filter::FilterNode,
        node::{GraphNode, RenderCtx},
        oscillator::OscNode,
    },
    voices::held_duration,
};

const PARTIALS: [f32; 21] = [
    0.28, 1.0, 0.74, 0.66, 0.78, 0.48, 0.05, 0.33, 0.12, 0.08, 0.01, 0.54, 0.19, 0.08, 0.05,
    0.16, 0.01, 0.11, 0.3, 0.02, 0.2,
];

/// Level of each choir at the top of the swell.
const CHOIR_LEVEL: f32 = 0.5;

fn choir_wave() -> WaveTable {
    static TABLE: OnceLock<WaveTable> = OnceLock::new();
    TABLE.get_or_init(|| WaveTable::harmonics(&PARTIALS)).clone()
}

fn swell(ctx: &RenderCtx) -> (f32, Vec<Segment>) {
    let duration = held_duration(ctx);
    (
        0.0,
        vec![
            Segment::linear(1.0, duration * 0.25),
            Segment::linear(0.0, duration * 0.75),
        ],
    )
}

fn sweep(ctx: &RenderCtx, from: f32, to: f32) -> (f32, Vec<Segment>) {
    (from, vec![Segment::linear(to, held_duration(ctx))])
}

fn narrow(_ctx: &RenderCtx) -> (f32, Vec<Segment>) {
    (40.0, Vec::new())
}

fn up_from_40(ctx: &RenderCtx) -> (f32, Vec<Segment>) {
    sweep(ctx, 40.0, 800.0)
}

fn down_to_40(ctx: &RenderCtx) -> (f32, Vec<Segment>) {
    sweep(ctx, 800.0, 40.0)
}

fn up_from_220(ctx: &RenderCtx) -> (f32, Vec<Segment>) {
    sweep(ctx, 220.0, 440.0)
}

fn down_to_220(ctx: &RenderCtx) -> (f32, Vec<Segment>) {
    sweep(ctx, 440.0, 220.0)
}

fn widening(ctx: &RenderCtx) -> (f32, Vec<Segment>) {
    sweep(ctx, 0.8 * 220.0, 0.8 * 440.0)
}

fn narrowing(ctx: &RenderCtx) -> (f32, Vec<Segment>) {
    sweep(ctx, 0.8 * 440.0, 0.8 * 220.0)
}

fn choir(octaves: f32) -> impl GraphNode {
    let pitch = octaves.exp2();
    OscNode::table(choir_wave())
        .with_ratio(pitch)
        .sum(OscNode::table(choir_wave()).with_ratio(pitch * 0.999))
        .sum(OscNode::table(choir_wave()).with_ratio(pitch * 1.001))
        .gain(CHOIR_LEVEL)
        .amplify(EnvNode::per_note(swell))
}

/// Create the filtered chorus graph.
pub fn filtered_chorus() -> Box<dyn GraphNode> {
    let low = FilterNode::new(choir(-0.01))
        .bandpass(up_from_40, narrow)
        .bandpass(up_from_220, narrowing)
        .balanced();
    let high = FilterNode::new(choir(0.01))
        .bandpass(down_to_40, narrow)
        .bandpass(down_to_220, widening)
        .balanced();

    low.sum(high).amplify(EnvNode::per_note(swell)).boxed()
}
