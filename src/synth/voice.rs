use crate::{
    dsp::{envelope::Envelope, mix::constant_power_pan},
    graph::node::{GraphNode, RenderCtx},
    mixer::SendId,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceState {
    Free,      // Finished, can be dropped or reused
    Active,    // Gate open: declick attack or hold
    Releasing, // Gate closed, declick ramping to zero
}

/// Everything a voice needs to know about its note.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoiceParams {
    pub instrument: SendId,
    pub key: f32,
    /// Linear peak amplitude (velocity curve and instrument measure applied).
    pub amplitude: f32,
    /// Pan position in [-1, 1].
    pub pan: f32,
    /// Written length in seconds; 0.0 holds until released.
    pub duration: f32,
    /// Declick ramp in, seconds.
    pub attack: f32,
    /// Declick ramp out, seconds. Sounds after the written duration.
    pub release: f32,
}

/// One sounding note: a mono graph, a declick envelope and a pan position.
///
/// The note lasts `attack + duration + release` seconds. The gate closes
/// `attack + duration` seconds after the start, on the exact sample, and the
/// voice frees itself once the release ramp reaches zero.
pub struct Voice {
    instrument: SendId,
    key: f32,
    state: VoiceState,
    age: u64,
    ctx: RenderCtx,
    graph: Box<dyn GraphNode>,
    declick: Envelope,
    gate_frames: Option<u64>,
    left_gain: f32,
    right_gain: f32,
}

impl Voice {
    pub fn start(
        mut graph: Box<dyn GraphNode>,
        params: VoiceParams,
        sample_rate: f32,
        age: u64,
    ) -> Self {
        let ctx = RenderCtx::from_note(sample_rate, params.key, params.amplitude)
            .with_duration(params.duration);
        let mut declick = Envelope::declick(params.attack, params.release);
        declick.note_on(&ctx);
        graph.note_on(&ctx);

        let gate_frames = (params.duration > 0.0)
            .then(|| ((params.attack + params.duration) * sample_rate).round() as u64);
        let (left_gain, right_gain) = constant_power_pan(params.pan);

        Self {
            instrument: params.instrument,
            key: params.key,
            state: VoiceState::Active,
            age,
            ctx,
            graph,
            declick,
            gate_frames,
            left_gain,
            right_gain,
        }
    }

    /// Close the gate now; the declick release follows.
    pub fn release(&mut self) {
        if self.state == VoiceState::Active {
            self.state = VoiceState::Releasing;
            self.gate_frames = None;
            self.declick.note_off(&self.ctx);
            self.graph.note_off(&self.ctx);
        }
    }

    /// Render one block of stereo output. `mono` is scratch space of the same
    /// length.
    pub fn render(&mut self, mono: &mut [f32], left: &mut [f32], right: &mut [f32]) {
        let frames = mono.len().min(left.len()).min(right.len());
        let mono = &mut mono[..frames];
        self.graph.render_block(mono, &self.ctx);

        for ((m, l), r) in mono.iter().zip(left.iter_mut()).zip(right.iter_mut()) {
            if let Some(remaining) = self.gate_frames {
                if remaining == 0 {
                    self.release();
                } else {
                    self.gate_frames = Some(remaining - 1);
                }
            }

            let sample = m * self.declick.next_sample(&self.ctx) * self.ctx.amplitude;
            *l = sample * self.left_gain;
            *r = sample * self.right_gain;
        }

        if self.state == VoiceState::Releasing && !self.declick.is_active() {
            self.state = VoiceState::Free;
        }
    }

    pub fn is_free(&self) -> bool {
        self.state == VoiceState::Free
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, VoiceState::Active | VoiceState::Releasing)
    }

    pub fn get_envelope_level(&self) -> Option<f32> {
        Some(self.declick.level())
    }

    pub fn instrument(&self) -> SendId {
        self.instrument
    }

    pub fn key(&self) -> f32 {
        self.key
    }

    pub fn age(&self) -> u64 {
        self.age
    }

    pub fn state(&self) -> VoiceState {
        self.state
    }
}
