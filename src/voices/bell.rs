//! Bell voice - inharmonic FM strike over a low thud.
//!
//! The carrier sits at 2.5 and the modulator at 3.5 times the note, index
//! 10, so the partials land off the harmonic series. The index dies away
//! over fifteen seconds, faster in its first moments than the loudness, and
//! 50 Hz of noise roughens the deviation. Under it, half a second of noise
//! through a 50 Hz low-pass gives the weight of the clapper.

use crate::{
    dsp::{envelope::Segment, oscillator::WaveTable},
    graph::{
        envelope::EnvNode,
        extensions::NodeExt,
        filter::FilterNode,
        fm::FmNode,
        node::{GraphNode, RenderCtx},
        oscillator::OscNode,
    },
};

fn brightness(_ctx: &RenderCtx) -> (f32, Vec<Segment>) {
    (1.0, vec![Segment::exponential(0.001, 15.0)])
}

fn ring(_ctx: &RenderCtx) -> (f32, Vec<Segment>) {
    (1.0, vec![Segment::exponential(0.01, 15.0)])
}

fn thud(_ctx: &RenderCtx) -> (f32, Vec<Segment>) {
    (0.0, vec![Segment::linear(1.0, 0.2), Segment::linear(0.0, 0.3)])
}

fn thud_cutoff(_ctx: &RenderCtx) -> (f32, Vec<Segment>) {
    (50.0, Vec::new())
}

/// Create the bell graph.
pub fn bell() -> Box<dyn GraphNode> {
    let strike = FmNode::new(WaveTable::sine(), 2.5, 3.5, 10.0)
        .with_index_envelope(brightness)
        .with_deviation_noise(50.0)
        .amplify(EnvNode::per_note(ring));
    let clapper = FilterNode::new(OscNode::noise().amplify(EnvNode::per_note(thud)))
        .lowpass(thud_cutoff)
        .balanced();

    strike.sum(clapper).boxed()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thud_is_gone_after_the_strike() {
        let ctx = RenderCtx::from_note(44_100.0, 72.0, 1.0).with_duration(2.0);
        let mut bell_only = FmNode::new(WaveTable::sine(), 2.5, 3.5, 10.0)
            .with_index_envelope(brightness)
            .with_deviation_noise(50.0)
            .amplify(EnvNode::per_note(ring));
        let mut graph = bell();
        let mut with_thud = vec![0.0; 441];
        let mut without = vec![0.0; 441];

        graph.note_on(&ctx);
        bell_only.note_on(&ctx);
        let mut early_difference = 0.0f32;
        for block in 0..80 {
            graph.render_block(&mut with_thud, &ctx);
            bell_only.render_block(&mut without, &ctx);
            let difference = with_thud
                .iter()
                .zip(&without)
                .fold(0.0f32, |acc, (a, b)| acc.max((a - b).abs()));
            if block < 40 {
                early_difference = early_difference.max(difference);
            } else if block >= 60 {
                assert!(difference < 1e-3, "block {block}: {difference}");
            }
        }
        assert!(early_difference > 0.05, "got {early_difference}");
    }
}
