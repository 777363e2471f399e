use std::collections::VecDeque;

use crate::{
    score::{Score, ScoreEvent},
    synth::message::SynthMessage,
};

/// Frame-stamped control messages waiting for their block.
///
/// Messages are kept sorted by frame; ties keep insertion order. A message
/// takes effect at the start of the block that contains its frame.
#[derive(Debug, Default)]
pub struct Scheduler {
    queue: VecDeque<(u64, SynthMessage)>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_score(score: &Score, sample_rate: f32) -> Self {
        let mut scheduler = Self::new();
        scheduler.enqueue_score(score, sample_rate, 0);
        scheduler
    }

    pub fn enqueue(&mut self, frame: u64, message: SynthMessage) {
        let at = self.queue.partition_point(|&(f, _)| f <= frame);
        self.queue.insert(at, (frame, message));
    }

    /// Queue a score whose time zero is frame `offset`.
    pub fn enqueue_score(&mut self, score: &Score, sample_rate: f32, offset: u64) {
        for event in score.events() {
            let frame = offset + (event.time().max(0.0) * sample_rate).round() as u64;
            let message = match event {
                ScoreEvent::Note(note) => SynthMessage::NoteOn {
                    instrument: note.instrument,
                    key: note.key,
                    velocity: note.velocity,
                    pan: note.pan,
                    duration: note.duration,
                },
                ScoreEvent::SetLevel(level) => SynthMessage::SetLevel {
                    send: level.send,
                    bus: level.bus,
                    gain: level.gain,
                },
            };
            self.enqueue(frame, message);
        }
    }

    /// Pop the next message stamped before `end`.
    pub fn pop_due(&mut self, end: u64) -> Option<SynthMessage> {
        match self.queue.front() {
            Some(&(frame, _)) if frame < end => self.queue.pop_front().map(|(_, m)| m),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn clear(&mut self) {
        self.queue.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::score::NoteEvent;

    fn note_off(key: f32) -> SynthMessage {
        SynthMessage::NoteOff { instrument: 5, key }
    }

    #[test]
    fn test_pops_in_frame_order() {
        let mut scheduler = Scheduler::new();
        scheduler.enqueue(100, note_off(1.0));
        scheduler.enqueue(10, note_off(2.0));
        scheduler.enqueue(100, note_off(3.0));

        assert_eq!(scheduler.pop_due(10), None);
        assert_eq!(scheduler.pop_due(11), Some(note_off(2.0)));
        assert_eq!(scheduler.pop_due(101), Some(note_off(1.0)));
        assert_eq!(scheduler.pop_due(101), Some(note_off(3.0)));
        assert!(scheduler.is_empty());
    }

    #[test]
    fn test_score_times_become_frames() {
        let score = Score::new()
            .note(NoteEvent::new(5, 0.5, 1.0, 60.0, 80.0))
            .note(NoteEvent::new(13, 0.0, 1.0, 64.0, 80.0));
        let mut scheduler = Scheduler::from_score(&score, 1_000.0);

        assert!(matches!(
            scheduler.pop_due(1),
            Some(SynthMessage::NoteOn { instrument: 13, .. })
        ));
        assert_eq!(scheduler.pop_due(500), None);
        assert!(scheduler.pop_due(501).is_some());
    }
}
