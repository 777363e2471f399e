//! The orchestra's instruments.
//!
//! Each instrument is a mono node graph plus what the orchestra knows about
//! it: how loud its raw output is (its *measure*), how long its declick ramps
//! are, and how much of it goes to the chorus, reverb and master busses by
//! default.
//!
//! # Example
//!
//! ```ignore
//! use silence_dsp::voices;
//!
//! let organ = voices::lookup(5).unwrap();
//! let graph = organ.create_graph();
//! for def in voices::all() {
//!     println!("{:>3} {}", def.id, def.name);
//! }
//! ```

use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::{
    dsp::oscillator::WaveTable,
    graph::node::{GraphNode, RenderCtx},
    io::converter::note_amplitude,
    mixer::{BusId, SendId, CHORUS_BUS, MASTER_BUS, REVERB_BUS},
    synth::factory::VoiceFactory,
};

mod bell;
mod delayed_pluck;
mod filtered_chorus;
mod fm;
mod fm_chorus;
mod harpsichord;
mod organ;
mod pad;
mod pluck;
mod xanadu;

pub use bell::bell;
pub use delayed_pluck::delayed_pluck;
pub use filtered_chorus::filtered_chorus;
pub use fm::fm;
pub use fm_chorus::fm_chorus;
pub use harpsichord::harpsichord;
pub use organ::organ;
pub use pad::pad;
pub use pluck::pluck;
pub use xanadu::{xanadu_echo, xanadu_fm, xanadu_pluck};

/// Lowest and highest id a voice instrument may use (effects start at 200).
pub const VOICE_IDS: std::ops::RangeInclusive<u32> = 2..=199;

/// Default send gains of an instrument into the three effect busses.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SendLevels {
    pub chorus: f32,
    pub reverb: f32,
    pub master: f32,
}

impl SendLevels {
    pub const fn new(chorus: f32, reverb: f32, master: f32) -> Self {
        Self {
            chorus,
            reverb,
            master,
        }
    }

    pub fn routes(&self) -> [(BusId, f32); 3] {
        [
            (CHORUS_BUS, self.chorus),
            (REVERB_BUS, self.reverb),
            (MASTER_BUS, self.master),
        ]
    }
}

pub struct InstrumentDef {
    pub id: u32,
    pub name: &'static str,
    pub description: &'static str,
    /// Peak of the raw graph output at full velocity.
    pub measure: f32,
    pub attack: f32,
    pub release: f32,
    pub sends: SendLevels,
    build: fn() -> Box<dyn GraphNode>,
}

impl InstrumentDef {
    pub fn send_id(&self) -> SendId {
        SendId(self.id)
    }

    /// Linear amplitude of a note at `velocity` on this instrument.
    pub fn amplitude(&self, velocity: f32) -> f32 {
        note_amplitude(velocity, self.measure)
    }

    pub fn create_graph(&self) -> Box<dyn GraphNode> {
        self.build.create_voice()
    }
}

static INSTRUMENTS: [InstrumentDef; 12] = [
    InstrumentDef {
        id: 2,
        name: "xanadu-pluck",
        description: "Detuned table strings, gliding long echoes",
        measure: 1_500_000.0,
        attack: 0.003,
        release: 0.1,
        sends: SendLevels::new(0.0, 0.2, 1.0),
        build: xanadu_pluck,
    },
    InstrumentDef {
        id: 3,
        name: "xanadu-echo",
        description: "Detuned table strings, short double echo",
        measure: 1_500_000.0,
        attack: 0.01,
        release: 0.01,
        sends: SendLevels::new(0.0, 0.2, 1.0),
        build: xanadu_echo,
    },
    InstrumentDef {
        id: 4,
        name: "xanadu-fm",
        description: "Modified-FM pair, index rising and falling in thirds",
        measure: 1_500_000.0,
        attack: 0.01,
        release: 0.01,
        sends: SendLevels::new(0.0, 0.2, 1.0),
        build: xanadu_fm,
    },
    InstrumentDef {
        id: 5,
        name: "organ",
        description: "Tone-wheel organ, nine drawbar partials",
        measure: 20_000.0,
        attack: 0.005,
        release: 0.3,
        sends: SendLevels::new(0.0, 0.2, 1.0),
        build: organ,
    },
    InstrumentDef {
        id: 7,
        name: "harpsichord",
        description: "Noise-plucked table string balanced against a fading triangle",
        measure: 600.0,
        attack: 0.005,
        release: 0.3,
        sends: SendLevels::new(0.0, 0.2, 1.0),
        build: harpsichord,
    },
    InstrumentDef {
        id: 10,
        name: "fm-chorus",
        description: "Modified-FM pair, sideband ratio climbing through the note",
        measure: 1_000.0,
        attack: 0.25,
        release: 0.333,
        sends: SendLevels::new(0.0, 0.2, 1.0),
        build: fm_chorus,
    },
    InstrumentDef {
        id: 11,
        name: "pad",
        description: "String pad, three detuned oscillators under a swell",
        measure: 1_000.0,
        attack: 0.25,
        release: 0.5,
        sends: SendLevels::new(0.2, 0.2, 1.0),
        build: pad,
    },
    InstrumentDef {
        id: 12,
        name: "filtered-chorus",
        description: "Two detuned choirs through crossing band-pass sweeps",
        measure: 500.0,
        attack: 0.15,
        release: 0.25,
        sends: SendLevels::new(0.0, 0.2, 1.0),
        build: filtered_chorus,
    },
    InstrumentDef {
        id: 13,
        name: "pluck",
        description: "Three detuned waveguide strings with a decaying envelope",
        measure: 1_500.0,
        attack: 0.002,
        release: 0.05,
        sends: SendLevels::new(0.0, 0.2, 1.0),
        build: pluck,
    },
    InstrumentDef {
        id: 16,
        name: "fm",
        description: "Two detuned FM pairs, moderate index",
        measure: 1_500.0,
        attack: 0.002,
        release: 0.05,
        sends: SendLevels::new(0.0, 0.2, 1.0),
        build: fm,
    },
    InstrumentDef {
        id: 20,
        name: "delayed-pluck",
        description: "Sine-filled strings with a 200 ms double echo",
        measure: 1_200.0,
        attack: 0.003,
        release: 0.05,
        sends: SendLevels::new(0.0, 0.2, 1.0),
        build: delayed_pluck,
    },
    InstrumentDef {
        id: 23,
        name: "bell",
        description: "Inharmonic FM strike over a low-passed noise thud",
        measure: 500.0,
        attack: 0.003,
        release: 0.5,
        sends: SendLevels::new(0.0, 0.1, 1.0),
        build: bell,
    },
];

pub fn all() -> &'static [InstrumentDef] {
    &INSTRUMENTS
}

pub fn lookup(id: u32) -> Option<&'static InstrumentDef> {
    INSTRUMENTS.iter().find(|def| def.id == id)
}

pub fn lookup_name(name: &str) -> Option<&'static InstrumentDef> {
    INSTRUMENTS
        .iter()
        .find(|def| def.name.eq_ignore_ascii_case(name))
}

/// Length of a note with no written duration (the orchestra's default p3).
pub const HELD_SECS: f32 = 3_600.0;

/// Written duration of the note, or [`HELD_SECS`] when it is held.
pub(crate) fn held_duration(ctx: &RenderCtx) -> f32 {
    if ctx.duration > 0.0 {
        ctx.duration
    } else {
        HELD_SECS
    }
}

/// Harmonic table shared by the pad, the FM pairs, the Xanadu strings and
/// the organ's upper drawbars.
pub(crate) fn bright_wave() -> WaveTable {
    static TABLE: OnceLock<WaveTable> = OnceLock::new();
    TABLE
        .get_or_init(|| WaveTable::harmonics(&[1.0, 0.5, 0.33, 0.25, 0.0, 0.1, 0.1, 0.1]))
        .clone()
}
