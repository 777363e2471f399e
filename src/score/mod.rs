//! Timed note and level events.
//!
//! A score is what the engine plays: notes for the voice instruments and
//! level changes for the send table (instrument 1 in the orchestra's
//! numbering). Scores are plain TOML:
//!
//! ```toml
//! [[notes]]
//! instrument = 11
//! start = 0.0
//! duration = 4.0
//! key = 64.0
//! velocity = 80.0
//! pan = -0.5
//!
//! [[levels]]
//! time = 2.0
//! send = 11
//! bus = 210
//! gain = 0.6
//!
//! # score channel 0 plays on the organ, 3 dB quieter, panned right
//! [[arrangement]]
//! channel = 0
//! instrument = 5
//! gain_db = -3.0
//! pan = 0.5
//! ```

use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::{
    io::converter::{offset_velocity, VELOCITY_RANGE_DB},
    mixer::{BusId, SendId},
    voices,
};

#[derive(Debug, Error)]
pub enum ScoreError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid score: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("note {index}: instrument {instrument} does not exist")]
    UnknownInstrument { index: usize, instrument: u32 },
    #[error("event {index}: {field} is not a finite number")]
    NonFinite { index: usize, field: &'static str },
    #[error("event {index}: starts at {start} s, before the beginning")]
    NegativeStart { index: usize, start: f32 },
}

fn default_velocity() -> f32 {
    80.0
}

/// One note: which instrument, when, how long, what pitch, how loud, where.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NoteEvent {
    pub instrument: u32,
    /// Seconds from the beginning.
    pub start: f32,
    /// Seconds; 0 holds the note to the end of the render.
    #[serde(default)]
    pub duration: f32,
    /// MIDI key, fractional keys allowed.
    pub key: f32,
    /// MIDI velocity 0-127 over a 60 dB range.
    #[serde(default = "default_velocity")]
    pub velocity: f32,
    /// -1 hard left, 1 hard right.
    #[serde(default)]
    pub pan: f32,
}

impl NoteEvent {
    pub fn new(instrument: u32, start: f32, duration: f32, key: f32, velocity: f32) -> Self {
        Self {
            instrument,
            start,
            duration,
            key,
            velocity,
            pan: 0.0,
        }
    }

    pub fn with_pan(mut self, pan: f32) -> Self {
        self.pan = pan;
        self
    }

    pub fn is_held(&self) -> bool {
        self.duration <= 0.0
    }

    /// When the note stops sounding, declick release included. `None` when held.
    pub fn end(&self) -> Option<f32> {
        if self.is_held() {
            return None;
        }
        let (attack, release) = voices::lookup(self.instrument)
            .map_or((0.0, 0.0), |def| (def.attack, def.release));
        Some(self.start + attack + self.duration + release)
    }
}

/// A change to the send table at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LevelEvent {
    pub time: f32,
    pub send: SendId,
    pub bus: BusId,
    pub gain: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScoreEvent {
    Note(NoteEvent),
    SetLevel(LevelEvent),
}

impl ScoreEvent {
    pub fn time(&self) -> f32 {
        match self {
            ScoreEvent::Note(note) => note.start,
            ScoreEvent::SetLevel(level) => level.time,
        }
    }
}

/// Maps a score channel onto an orchestra instrument.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ArrangementEntry {
    pub channel: u32,
    pub instrument: u32,
    /// Added to every note's velocity, in dB of the velocity range.
    #[serde(default)]
    pub gain_db: f32,
    /// Replaces every note's pan when set.
    #[serde(default)]
    pub pan: Option<f32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Arrangement {
    entries: Vec<ArrangementEntry>,
}

impl Arrangement {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn assign(mut self, channel: u32, instrument: u32) -> Self {
        self.entries.push(ArrangementEntry {
            channel,
            instrument,
            gain_db: 0.0,
            pan: None,
        });
        self
    }

    pub fn assign_gain(mut self, channel: u32, instrument: u32, gain_db: f32) -> Self {
        self = self.assign(channel, instrument);
        if let Some(entry) = self.entries.last_mut() {
            entry.gain_db = gain_db;
        }
        self
    }

    pub fn assign_gain_pan(self, channel: u32, instrument: u32, gain_db: f32, pan: f32) -> Self {
        let mut arrangement = self.assign_gain(channel, instrument, gain_db);
        if let Some(entry) = arrangement.entries.last_mut() {
            entry.pan = Some(pan);
        }
        arrangement
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entry(&self, channel: u32) -> Option<&ArrangementEntry> {
        self.entries.iter().rev().find(|e| e.channel == channel)
    }

    /// Rewrite a note played on a score channel as one on its instrument.
    /// Channels without an entry pass through unchanged.
    pub fn apply(&self, note: NoteEvent) -> NoteEvent {
        match self.entry(note.instrument) {
            Some(entry) => NoteEvent {
                instrument: entry.instrument,
                velocity: offset_velocity(note.velocity, entry.gain_db, VELOCITY_RANGE_DB),
                pan: entry.pan.unwrap_or(note.pan),
                ..note
            },
            None => note,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Score {
    pub notes: Vec<NoteEvent>,
    pub levels: Vec<LevelEvent>,
    pub arrangement: Arrangement,
}

impl Score {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn note(mut self, note: NoteEvent) -> Self {
        self.notes.push(note);
        self
    }

    pub fn level(mut self, time: f32, send: SendId, bus: BusId, gain: f32) -> Self {
        self.levels.push(LevelEvent {
            time,
            send,
            bus,
            gain,
        });
        self
    }

    pub fn with_arrangement(mut self, arrangement: Arrangement) -> Self {
        self.arrangement = arrangement;
        self
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ScoreError> {
        let score: Self = toml::from_str(text)?;
        score.validate()?;
        Ok(score)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ScoreError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ScoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let score = Self::from_toml_str(&text)?;
        debug!(
            path = %path.display(),
            notes = score.notes.len(),
            levels = score.levels.len(),
            "loaded score"
        );
        Ok(score)
    }

    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Notes with the arrangement applied.
    pub fn arranged_notes(&self) -> impl Iterator<Item = NoteEvent> + '_ {
        self.notes.iter().map(|&note| self.arrangement.apply(note))
    }

    pub fn validate(&self) -> Result<(), ScoreError> {
        for (index, note) in self.arranged_notes().enumerate() {
            let fields = [
                ("start", note.start),
                ("duration", note.duration),
                ("key", note.key),
                ("velocity", note.velocity),
                ("pan", note.pan),
            ];
            if let Some(&(field, _)) = fields.iter().find(|(_, value)| !value.is_finite()) {
                return Err(ScoreError::NonFinite { index, field });
            }
            if note.start < 0.0 {
                return Err(ScoreError::NegativeStart {
                    index,
                    start: note.start,
                });
            }
            if voices::lookup(note.instrument).is_none() {
                return Err(ScoreError::UnknownInstrument {
                    index,
                    instrument: note.instrument,
                });
            }
            if !(0.0..=127.0).contains(&note.velocity) || !(-1.0..=1.0).contains(&note.pan) {
                warn!(index, ?note, "velocity or pan out of range, will be clamped");
            }
        }

        let offset = self.notes.len();
        for (i, level) in self.levels.iter().enumerate() {
            let index = offset + i;
            if !level.time.is_finite() {
                return Err(ScoreError::NonFinite {
                    index,
                    field: "time",
                });
            }
            if !level.gain.is_finite() {
                return Err(ScoreError::NonFinite {
                    index,
                    field: "gain",
                });
            }
            if level.time < 0.0 {
                return Err(ScoreError::NegativeStart {
                    index,
                    start: level.time,
                });
            }
        }
        Ok(())
    }

    /// Every event, arranged, in time order. Level changes at the same time
    /// as a note come first so the note already uses them.
    pub fn events(&self) -> Vec<ScoreEvent> {
        let mut events: Vec<ScoreEvent> = self
            .levels
            .iter()
            .copied()
            .map(ScoreEvent::SetLevel)
            .chain(self.arranged_notes().map(ScoreEvent::Note))
            .collect();
        events.sort_by(|a, b| a.time().total_cmp(&b.time()));
        events
    }

    /// Seconds until the last note has finished, held notes counting only
    /// their start.
    pub fn duration(&self) -> f32 {
        self.arranged_notes()
            .map(|note| note.end().unwrap_or(note.start))
            .chain(self.levels.iter().map(|level| level.time))
            .fold(0.0, f32::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCORE: &str = r#"
        [[notes]]
        instrument = 11
        start = 1.0
        duration = 2.0
        key = 64.0

        [[notes]]
        instrument = 0
        start = 0.5
        duration = 1.0
        key = 60.0
        velocity = 100.0

        [[levels]]
        time = 1.0
        send = 11
        bus = 210
        gain = 0.6

        [[arrangement]]
        channel = 0
        instrument = 5
        gain_db = -6.0
        pan = 0.25
    "#;

    #[test]
    fn test_parses_with_defaults() {
        let score = Score::from_toml_str(SCORE).unwrap();

        assert_eq!(score.notes.len(), 2);
        assert_eq!(score.notes[0].velocity, 80.0);
        assert_eq!(score.notes[0].pan, 0.0);
        assert_eq!(score.levels[0].bus, BusId(210));
    }

    #[test]
    fn test_arrangement_rewrites_channels() {
        let score = Score::from_toml_str(SCORE).unwrap();
        let notes: Vec<NoteEvent> = score.arranged_notes().collect();

        assert_eq!(notes[0].instrument, 11, "unmapped channel passes through");
        assert_eq!(notes[1].instrument, 5);
        assert_eq!(notes[1].pan, 0.25);
        assert!(notes[1].velocity < 100.0, "-6 dB lowers velocity");
    }

    #[test]
    fn test_events_are_time_ordered_levels_first() {
        let score = Score::from_toml_str(SCORE).unwrap();
        let events = score.events();

        let times: Vec<f32> = events.iter().map(ScoreEvent::time).collect();
        assert_eq!(times, vec![0.5, 1.0, 1.0]);
        assert!(matches!(events[1], ScoreEvent::SetLevel(_)));
    }

    #[test]
    fn test_duration_includes_declick() {
        let score = Score::new().note(NoteEvent::new(11, 1.0, 2.0, 64.0, 80.0));
        // pad declick: .25 in, .5 out
        assert!((score.duration() - 3.75).abs() < 1e-6, "got {}", score.duration());

        let held = Score::new().note(NoteEvent::new(5, 4.0, 0.0, 60.0, 80.0));
        assert_eq!(held.duration(), 4.0);
    }

    #[test]
    fn test_rejects_bad_events() {
        let unknown = Score::new().note(NoteEvent::new(42, 0.0, 1.0, 60.0, 80.0));
        assert!(matches!(
            unknown.validate(),
            Err(ScoreError::UnknownInstrument { instrument: 42, .. })
        ));

        let early = Score::new().note(NoteEvent::new(5, -1.0, 1.0, 60.0, 80.0));
        assert!(matches!(early.validate(), Err(ScoreError::NegativeStart { .. })));

        let nan = Score::new().note(NoteEvent::new(5, 0.0, 1.0, f32::NAN, 80.0));
        assert!(matches!(
            nan.validate(),
            Err(ScoreError::NonFinite { field: "key", .. })
        ));
    }
}
