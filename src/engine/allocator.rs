use tracing::debug;

use crate::{
    graph::node::GraphNode,
    mixer::{BusId, MixerState, SendId, LEFT, RIGHT},
    synth::voice::{Voice, VoiceParams, VoiceState},
    MAX_BLOCK_SIZE,
};

/// The sounding voices, and the scratch space they render into.
///
/// When the pool is full the oldest releasing voice is cut, or failing that
/// the oldest voice of all.
pub struct VoicePool {
    voices: Vec<Voice>,
    max_voices: usize,
    next_age: u64,
    mono: Vec<f32>,
    left: Vec<f32>,
    right: Vec<f32>,
}

impl VoicePool {
    pub fn new(max_voices: usize) -> Self {
        let max_voices = max_voices.max(1);
        Self {
            voices: Vec::with_capacity(max_voices),
            max_voices,
            next_age: 0,
            mono: vec![0.0; MAX_BLOCK_SIZE],
            left: vec![0.0; MAX_BLOCK_SIZE],
            right: vec![0.0; MAX_BLOCK_SIZE],
        }
    }

    pub fn note_on(&mut self, graph: Box<dyn GraphNode>, params: VoiceParams, sample_rate: f32) {
        if self.voices.len() >= self.max_voices {
            self.steal();
        }
        let age = self.next_age;
        self.next_age += 1;
        self.voices.push(Voice::start(graph, params, sample_rate, age));
    }

    /// Release every active voice of `instrument` playing `key`.
    pub fn note_off(&mut self, instrument: SendId, key: f32) -> usize {
        let mut released = 0;
        for voice in &mut self.voices {
            if voice.state() == VoiceState::Active
                && voice.instrument() == instrument
                && voice.key() == key
            {
                voice.release();
                released += 1;
            }
        }
        released
    }

    pub fn release_all(&mut self) {
        for voice in &mut self.voices {
            voice.release();
        }
    }

    /// Render every voice and send it into `busses` at its own levels.
    pub fn render(&mut self, mixer: &mut MixerState, busses: &[BusId], frames: usize) {
        let frames = frames.min(MAX_BLOCK_SIZE);
        let (mono, left, right) = (
            &mut self.mono[..frames],
            &mut self.left[..frames],
            &mut self.right[..frames],
        );

        for voice in &mut self.voices {
            voice.render(mono, left, right);
            let send = voice.instrument();
            for &bus in busses {
                mixer.send(left, send, bus, LEFT);
                mixer.send(right, send, bus, RIGHT);
            }
        }

        self.voices.retain(|voice| !voice.is_free());
    }

    pub fn len(&self) -> usize {
        self.voices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voices.is_empty()
    }

    pub fn voices(&self) -> &[Voice] {
        &self.voices
    }

    pub fn clear(&mut self) {
        self.voices.clear();
    }

    fn steal(&mut self) {
        let oldest = |state: VoiceState| {
            self.voices
                .iter()
                .enumerate()
                .filter(|(_, v)| v.state() == state)
                .min_by_key(|(_, v)| v.age())
                .map(|(i, _)| i)
        };
        let victim = oldest(VoiceState::Releasing).or_else(|| oldest(VoiceState::Active));

        if let Some(index) = victim {
            let voice = self.voices.remove(index);
            debug!(
                instrument = voice.instrument().0,
                key = voice.key(),
                "voice stolen"
            );
        }
    }
}
