//! FM chorus voice - modified FM, two carriers 4/1000 of a cent apart.
//!
//! The index opens to 5 over a quarter second, closes to 2 over the written
//! note and to 0 in a third of a second after it. Meanwhile the sideband
//! ratio climbs from 0.3 to 2.2, so the spectrum swings from leaning below
//! the carrier to leaning above it during the note.

use crate::{
    dsp::envelope::Segment,
    graph::{
        extensions::NodeExt,
        fm::ModifiedFmNode,
        node::{GraphNode, RenderCtx},
    },
    voices::held_duration,
};

const SHIFT_OCTAVES: f32 = 4.0 / 12_000.0;

fn index(ctx: &RenderCtx) -> (f32, Vec<Segment>) {
    (
        0.0,
        vec![
            Segment::linear(5.0, 0.25),
            Segment::linear(2.0, held_duration(ctx)),
            Segment::linear(0.0, 1.0 / 3.0),
        ],
    )
}

fn rising_ratio(ctx: &RenderCtx) -> (f32, Vec<Segment>) {
    (0.3, vec![Segment::linear(2.2, held_duration(ctx))])
}

/// Create the FM chorus graph.
pub fn fm_chorus() -> Box<dyn GraphNode> {
    ModifiedFmNode::new(index, rising_ratio, SHIFT_OCTAVES).boxed()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_shape() {
        let ctx = RenderCtx::from_freq(1_000.0, 100.0, 1.0).with_duration(2.0);
        let (start, segments) = index(&ctx);
        assert_eq!(start, 0.0);
        assert_eq!(segments.len(), 3);
        assert_eq!(segments[1].seconds, 2.0);
        assert_eq!(segments[2].target, 0.0);
    }
}
