#[cfg(feature = "rtrb")]
use rtrb::Consumer;

use crate::mixer::{BusId, SendId};

/// Control events the engine applies at the start of a block.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum SynthMessage {
    NoteOn {
        instrument: u32,
        key: f32,
        velocity: f32,
        pan: f32,
        /// Written length in seconds; 0.0 holds until a matching `NoteOff`.
        duration: f32,
    },
    NoteOff {
        instrument: u32,
        key: f32,
    },
    SetLevel {
        send: SendId,
        bus: BusId,
        gain: f32,
    },
    AllNotesOff,
}

pub trait MessageReceiver {
    fn pop(&mut self) -> Option<SynthMessage>;
}

#[cfg(feature = "rtrb")]
impl MessageReceiver for Consumer<SynthMessage> {
    fn pop(&mut self) -> Option<SynthMessage> {
        Consumer::pop(self).ok()
    }
}

/// Receiver that never has anything (offline renders).
pub struct NoMessages;

impl MessageReceiver for NoMessages {
    fn pop(&mut self) -> Option<SynthMessage> {
        None
    }
}
