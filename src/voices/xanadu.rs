//! Xanadu voices - detuned plucks with echoes, and a modified-FM tone.
//!
//! # How It Works
//!
//! The two plucked variants share a layout. One string on pitch with a slow
//! vibrato feeds a delay line, and two strings 8 cents sharp and flat play
//! dry. All three are recirculating tables filled from the bright harmonic
//! wave, so the attack has a definite tone instead of a noise burst.
//!
//! | voice          | vibrato              | echoes                                      |
//! |----------------|----------------------|---------------------------------------------|
//! | `xanadu_pluck` | 1/120 oct at f/50 Hz | two gliding out past 1 s, fixed 1.1 s, 2 s  |
//! | `xanadu_echo`  | 1/80 oct at 6.1 Hz   | fixed 70 ms and 105 ms                      |
//!
//! `xanadu_fm` is a modified-FM pair 8 cents apart. The index rises to 5
//! over the first third of the note, eases to 3 over the second and falls
//! away over the last, while the sideband ratio slides from 1.4 to 0.8.

use crate::{
    dsp::{envelope::Segment, string::Excitation},
    graph::{
        delay::{DelayTapsNode, Tap},
        extensions::NodeExt,
        fm::ModifiedFmNode,
        node::{GraphNode, RenderCtx},
        pluck::{KarplusNode, Vibrato},
    },
    voices::{bright_wave, held_duration},
};

const SHIFT_OCTAVES: f32 = 8.0 / 1_200.0;

fn string() -> KarplusNode {
    KarplusNode::new(Excitation::Table(bright_wave()))
}

const LONG_TAPS: [Tap; 4] = [
    Tap::glide(0.01, 1.0, 10.0),
    Tap::glide(0.015, 1.055, 15.0),
    Tap::fixed(2.0),
    Tap::fixed(1.1),
];

const SHORT_TAPS: [Tap; 2] = [Tap::fixed(0.07), Tap::fixed(0.105)];

fn plucked_with_echoes(vibrato: Vibrato, max_secs: f32, taps: &'static [Tap]) -> impl GraphNode {
    let centre = string().with_vibrato(vibrato);
    string()
        .with_detune(SHIFT_OCTAVES)
        .sum(string().with_detune(-SHIFT_OCTAVES))
        .sum(DelayTapsNode::new(centre, max_secs, taps))
}

/// Create the long-echo pluck graph.
pub fn xanadu_pluck() -> Box<dyn GraphNode> {
    let vibrato = Vibrato {
        depth_octaves: 1.0 / 120.0,
        rate_hz: 0.0,
        rate_ratio: 1.0 / 50.0,
    };
    plucked_with_echoes(vibrato, 2.0, &LONG_TAPS)
        .gain(2_000.0)
        .boxed()
}

/// Create the short-echo pluck graph.
pub fn xanadu_echo() -> Box<dyn GraphNode> {
    let vibrato = Vibrato {
        depth_octaves: 1.0 / 80.0,
        rate_hz: 6.1,
        rate_ratio: 0.0,
    };
    plucked_with_echoes(vibrato, 0.4, &SHORT_TAPS)
        .gain(1_000.0)
        .boxed()
}

fn index_in_thirds(ctx: &RenderCtx) -> (f32, Vec<Segment>) {
    let third = held_duration(ctx) / 3.0;
    (
        0.0,
        vec![
            Segment::linear(5.0, third),
            Segment::linear(3.0, third),
            Segment::linear(0.0, third),
        ],
    )
}

fn falling_ratio(ctx: &RenderCtx) -> (f32, Vec<Segment>) {
    (1.4, vec![Segment::linear(0.8, held_duration(ctx))])
}

/// Create the modified-FM graph.
pub fn xanadu_fm() -> Box<dyn GraphNode> {
    ModifiedFmNode::new(index_in_thirds, falling_ratio, SHIFT_OCTAVES)
        .gain(1_000.0)
        .boxed()
}
