//! Organ voice - tone-wheel additive organ.
//!
//! # How It Works
//!
//! Nine drawbars, each a table oscillator at a fixed ratio of the note:
//!
//! | drawbar  | ratio  | level |
//! |----------|--------|-------|
//! | sub-fund | 0.5    | 8     |
//! | sub-3rd  | 1.4983 | 8     |
//! | fund     | 1      | 8     |
//! | 2nd      | 2      | 8     |
//! | 3rd      | 2.9966 | 3     |
//! | 4th      | 4      | 2     |
//! | 5th      | 5.0397 | 1     |
//! | 6th      | 5.9932 | 0     |
//! | 8th      | 8      | 4     |
//!
//! The slightly flat and sharp ratios are the tone-wheel gearing, not equal
//! temperament. The three lowest drawbars use a tone-wheel table chosen per
//! note: wheels low on the keyboard carry extra odd harmonics, higher ones
//! are nearly pure. The upper drawbars share one bright harmonic table.

use std::sync::OnceLock;

use crate::{
    dsp::oscillator::WaveTable,
    graph::{
        additive::{AdditiveNode, Partial},
        extensions::NodeExt,
        node::{GraphNode, RenderCtx},
    },
    io::converter::frequency_to_key,
    voices::bright_wave,
};

const DRAWBARS: [Partial; 9] = [
    Partial::new(0.5, 8.0),
    Partial::new(1.4983, 8.0),
    Partial::new(1.0, 8.0),
    Partial::new(2.0, 8.0),
    Partial::new(2.9966, 3.0),
    Partial::new(4.0, 2.0),
    Partial::new(5.0397, 1.0),
    Partial::new(5.9932, 0.0),
    Partial::new(8.0, 4.0),
];

/// Key offset of each tone-wheel drawbar relative to the played wheel.
const WHEEL_OFFSETS: [f32; 3] = [-12.0, 7.0, 0.0];

fn pure_wheel() -> WaveTable {
    static TABLE: OnceLock<WaveTable> = OnceLock::new();
    TABLE
        .get_or_init(|| WaveTable::harmonics(&[1.0, 0.02, 0.01]))
        .clone()
}

fn odd_wheel() -> WaveTable {
    static TABLE: OnceLock<WaveTable> = OnceLock::new();
    TABLE
        .get_or_init(|| WaveTable::harmonics(&[1.0, 0.0, 0.2, 0.0, 0.1, 0.0, 0.05, 0.0, 0.02]))
        .clone()
}

/// Wheel number of a key, counted the way the manual is wired.
fn wheel_number(key: f32) -> f32 {
    12.0 * (key - 6.0).trunc() + 100.0 * (key - 6.0)
}

fn select_wheel(index: usize, ctx: &RenderCtx) -> WaveTable {
    match WHEEL_OFFSETS.get(index) {
        Some(offset) => {
            let wheel = wheel_number(frequency_to_key(ctx.frequency)) + offset;
            if wheel > 12.0 {
                pure_wheel()
            } else {
                odd_wheel()
            }
        }
        None => bright_wave(),
    }
}

/// Create the organ graph.
pub fn organ() -> Box<dyn GraphNode> {
    AdditiveNode::new(&DRAWBARS, select_wheel).boxed()
}
