// Purpose: the bus effects that sit between the voices and the output
// Each effect reads its own bus and sends onwards; only the master clears

pub mod chorus;
pub mod master;
pub mod reverb;

use crate::mixer::{BusId, MixerState};

/// A processing stage that owns one bus.
///
/// `process` reads the stage's input bus through the mixer and sends its
/// output to downstream busses. It must not clear anything: other stages may
/// still be reading.
pub trait BusEffect: Send {
    fn id(&self) -> BusId;

    fn name(&self) -> &'static str;

    fn process(&mut self, mixer: &mut MixerState, frames: usize);

    /// Drop all internal state (delay memory, filters, LFO phase).
    fn reset(&mut self);
}

impl BusEffect for Box<dyn BusEffect> {
    fn id(&self) -> BusId {
        (**self).id()
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn process(&mut self, mixer: &mut MixerState, frames: usize) {
        (**self).process(mixer, frames)
    }

    fn reset(&mut self) {
        (**self).reset()
    }
}
