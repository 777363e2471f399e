//! Numbered busses and the send gain table.
//!
//! Every stage talks to every other stage only through [`MixerState`]: voices
//! and effects `send` into bus accumulators, effects `receive` their input bus,
//! and the master stage `clear`s everything once per block after it has read.
//!
//! ```text
//!   send(signal, from, to, ch):   bus[to][ch][i] += signal[i] * level(from, to)
//!   receive(bus, ch):             &bus[bus][ch]          (not cleared)
//!   clear():                      every accumulator = 0  (master stage only)
//! ```
//!
//! Accumulation is plain addition, so the order in which sends arrive within a
//! block never changes the result. A send whose level was never set has gain
//! 0.0 and contributes silence. Sending into a bus that was not declared up
//! front allocates it on the spot; receiving from a bus that does not exist
//! reads silence.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::dsp::mix::sum_scaled_in_place;

/// Identifier of a bus (its owning effect's stage number).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BusId(pub u32);

/// Identifier of a sending stage (instrument or effect number).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SendId(pub u32);

impl fmt::Display for BusId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bus {}", self.0)
    }
}

impl fmt::Display for SendId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "send {}", self.0)
    }
}

impl From<BusId> for SendId {
    fn from(bus: BusId) -> Self {
        SendId(bus.0)
    }
}

pub const CHORUS_BUS: BusId = BusId(200);
pub const REVERB_BUS: BusId = BusId(210);
pub const MASTER_BUS: BusId = BusId(220);

/// Channels per bus (left, right).
pub const STEREO: usize = 2;
pub const LEFT: usize = 0;
pub const RIGHT: usize = 1;

/// One block of accumulators per channel.
#[derive(Debug, Clone)]
pub struct Bus {
    id: BusId,
    channels: Vec<Vec<f32>>,
}

impl Bus {
    fn new(id: BusId, channel_count: usize, block_size: usize) -> Self {
        Self {
            id,
            channels: vec![vec![0.0; block_size]; channel_count],
        }
    }

    pub fn id(&self) -> BusId {
        self.id
    }

    pub fn channel(&self, channel: usize) -> Option<&[f32]> {
        self.channels.get(channel).map(Vec::as_slice)
    }

    fn clear(&mut self) {
        for channel in &mut self.channels {
            channel.fill(0.0);
        }
    }
}

pub struct MixerState {
    block_size: usize,
    channel_count: usize,
    busses: BTreeMap<BusId, Bus>,
    levels: HashMap<(SendId, BusId), f32>,
    silence: Vec<f32>,
}

impl MixerState {
    pub fn new(block_size: usize, channel_count: usize) -> Self {
        Self {
            block_size,
            channel_count,
            busses: BTreeMap::new(),
            levels: HashMap::new(),
            silence: vec![0.0; block_size],
        }
    }

    /// Stereo mixer with `busses` allocated up front.
    pub fn with_busses(block_size: usize, busses: impl IntoIterator<Item = BusId>) -> Self {
        let mut mixer = Self::new(block_size, STEREO);
        for bus in busses {
            mixer.declare_bus(bus);
        }
        mixer
    }

    /// Allocate `bus` if it does not exist yet.
    pub fn declare_bus(&mut self, bus: BusId) {
        let (channels, block) = (self.channel_count, self.block_size);
        self.busses
            .entry(bus)
            .or_insert_with(|| Bus::new(bus, channels, block));
    }

    pub fn has_bus(&self, bus: BusId) -> bool {
        self.busses.contains_key(&bus)
    }

    pub fn bus_ids(&self) -> impl Iterator<Item = BusId> + '_ {
        self.busses.keys().copied()
    }

    pub fn bus(&self, bus: BusId) -> Option<&Bus> {
        self.busses.get(&bus)
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    pub fn channel_count(&self) -> usize {
        self.channel_count
    }

    /// Persistent gain of `send` into `bus`; last write wins.
    pub fn set_level(&mut self, send: SendId, bus: BusId, gain: f32) {
        self.levels.insert((send, bus), gain);
    }

    /// Forget every level, leaving all sends silent.
    pub fn reset_levels(&mut self) {
        self.levels.clear();
    }

    /// Gain of `send` into `bus`, 0.0 when never set.
    pub fn level(&self, send: SendId, bus: BusId) -> f32 {
        self.levels.get(&(send, bus)).copied().unwrap_or(0.0)
    }

    /// Every explicitly set level, in no particular order.
    pub fn levels(&self) -> impl Iterator<Item = (SendId, BusId, f32)> + '_ {
        self.levels.iter().map(|(&(s, b), &g)| (s, b, g))
    }

    /// Accumulate `signal × level(send, bus)` into `bus[channel]`.
    ///
    /// Frames beyond the block size and channels beyond the bus width are
    /// ignored.
    pub fn send(&mut self, signal: &[f32], send: SendId, bus: BusId, channel: usize) {
        if channel >= self.channel_count {
            return;
        }
        let gain = self.level(send, bus);
        if gain == 0.0 {
            return;
        }

        self.declare_bus(bus);
        if let Some(target) = self
            .busses
            .get_mut(&bus)
            .and_then(|b| b.channels.get_mut(channel))
        {
            let frames = signal.len().min(target.len());
            sum_scaled_in_place(&mut target[..frames], &signal[..frames], gain);
        }
    }

    /// Borrow the accumulator of `bus[channel]`; silence when it does not exist.
    pub fn receive(&self, bus: BusId, channel: usize) -> &[f32] {
        self.busses
            .get(&bus)
            .and_then(|b| b.channel(channel))
            .unwrap_or(&self.silence)
    }

    /// Zero every accumulator. Levels are kept.
    pub fn clear(&mut self) {
        for bus in self.busses.values_mut() {
            bus.clear();
        }
    }
}
