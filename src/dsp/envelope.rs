use crate::{graph::node::RenderCtx, MIN_TIME};

/*
Envelopes
=========

Two envelope generators live here.

`Envelope` is a gated linear ADSR. Voices use it as their declick: a short
attack from silence, a sustain at full level for the written duration, and a
short release back to silence, so no note ever starts or stops with a step.

`Segments` is a breakpoint envelope: a start level followed by a list of
(target, seconds, curve) segments, holding the last target once they run
out. The voices use it for shapes tied to the written note length, like the
pad's rise-and-fall or the pluck's decay.

Vocabulary
----------

  level       Current output value. Multiplies the audio signal.

  stage       Where the ADSR state machine is: Idle, Attack, Decay,
              Sustain or Release.

  gate        note_on raises it (Attack), note_off lowers it (Release from
              whatever level we are at).

  curve       How a segment travels from its start level to its target:

                Linear       straight line
                Exponential  constant ratio per sample; both ends must be
                             non-zero and share a sign
                Shape(c)     c = 0 is linear, c < 0 moves fast then slow
                             (a natural decay), c > 0 slow then fast


Segment Curves
--------------

For progress p = t / duration in [0, 1] from level a to level b:

    Linear        a + (b - a)·p
    Exponential   a·(b / a)^p
    Shape(c)      a + (b - a)·(1 - e^(c·p)) / (1 - e^c)

  Level                       Shape(-3)
    1.0 ┐╲
        │ ╲__
        │    ‾‾──___
    0.1 └───────────‾‾‾──→ Time


The ADSR State Machine
----------------------

    Idle ──note_on──→ Attack ──level=1──→ Decay ──level=S──→ Sustain
      ↑                  │                  │                   │
      │                  └──────note_off────┴───────────────────┤
      │                                                         ↓
      └────────────────────────level=0───────────────────── Release

Release always starts from the CURRENT level, so releasing during the
attack never clicks.
*/

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeState {
    Idle,
    Attack,
    Decay,
    Sustain,
    Release,
}

pub struct Envelope {
    attack_time: f32,
    decay_time: f32,
    sustain_level: f32,
    release_time: f32,

    stage: EnvelopeState,
    level: f32,

    decay_start_level: f32,

    // Release is interpolated from a snapshot so it lands exactly on 0.0
    release_start_level: f32,
    release_total_samples: u32,
    release_elapsed_samples: u32,
}

impl Envelope {
    pub fn adsr(attack: f32, decay: f32, sustain: f32, release: f32) -> Self {
        Self {
            attack_time: attack.max(MIN_TIME),
            decay_time: decay.max(MIN_TIME),
            sustain_level: sustain.clamp(0.0, 1.0),
            release_time: release.max(MIN_TIME),

            stage: EnvelopeState::Idle,
            level: 0.0,
            decay_start_level: 0.0,
            release_start_level: 0.0,
            release_total_samples: 1,
            release_elapsed_samples: 0,
        }
    }

    /// Attack to full level, hold it, release when the gate drops.
    pub fn declick(attack: f32, release: f32) -> Self {
        Self::adsr(attack, MIN_TIME, 1.0, release)
    }

    pub fn release_time(&self) -> f32 {
        self.release_time
    }

    pub fn note_on(&mut self, _ctx: &RenderCtx) {
        self.level = 0.0;
        self.stage = EnvelopeState::Attack;
        self.release_elapsed_samples = 0;
    }

    pub fn note_off(&mut self, ctx: &RenderCtx) {
        if matches!(self.stage, EnvelopeState::Idle | EnvelopeState::Release) {
            return;
        }

        self.release_start_level = self.level;
        self.release_total_samples = (self.release_time * ctx.sample_rate).round().max(1.0) as u32;
        self.release_elapsed_samples = 0;
        self.stage = EnvelopeState::Release;
    }

    /// Advance the envelope by one sample.
    pub fn next_sample(&mut self, ctx: &RenderCtx) -> f32 {
        match self.stage {
            EnvelopeState::Idle => {
                self.level = 0.0;
            }

            EnvelopeState::Attack => {
                self.level += 1.0 / (self.attack_time * ctx.sample_rate);

                if self.level >= 1.0 {
                    self.level = 1.0;
                    self.decay_start_level = 1.0;
                    self.stage = EnvelopeState::Decay;
                }
            }

            EnvelopeState::Decay => {
                let target = self.sustain_level;
                let total_drop = self.decay_start_level - target;
                self.level -= total_drop / (self.decay_time * ctx.sample_rate);

                if self.level <= target {
                    self.level = target;
                    self.stage = EnvelopeState::Sustain;
                }
            }

            EnvelopeState::Sustain => {
                self.level = self.sustain_level;
            }

            EnvelopeState::Release => {
                self.release_elapsed_samples = self.release_elapsed_samples.saturating_add(1);
                let progress =
                    self.release_elapsed_samples as f32 / self.release_total_samples as f32;
                self.level = (self.release_start_level * (1.0 - progress)).max(0.0);

                if self.release_elapsed_samples >= self.release_total_samples {
                    self.level = 0.0;
                    self.stage = EnvelopeState::Idle;
                }
            }
        }

        debug_assert!((0.0..=1.0).contains(&self.level));
        self.level
    }

    pub fn render(&mut self, buffer: &mut [f32], ctx: &RenderCtx) {
        for sample in buffer.iter_mut() {
            *sample = self.next_sample(ctx);
        }
    }

    pub fn is_active(&self) -> bool {
        !matches!(self.stage, EnvelopeState::Idle)
    }

    pub fn reset(&mut self) {
        self.stage = EnvelopeState::Idle;
        self.level = 0.0;
        self.decay_start_level = 0.0;
        self.release_elapsed_samples = 0;
        self.release_start_level = 0.0;
    }

    pub fn level(&self) -> f32 {
        self.level
    }

    pub fn state(&self) -> EnvelopeState {
        self.stage
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Curve {
    Linear,
    Exponential,
    Shape(f32),
}

impl Curve {
    #[inline]
    fn interpolate(self, from: f32, to: f32, progress: f32) -> f32 {
        match self {
            Curve::Linear => from + (to - from) * progress,
            Curve::Exponential => {
                if from == 0.0 || from.signum() != to.signum() {
                    // Degenerate ratio, fall back to a straight line
                    from + (to - from) * progress
                } else {
                    from * (to / from).powf(progress)
                }
            }
            Curve::Shape(c) if c.abs() < 1e-6 => from + (to - from) * progress,
            Curve::Shape(c) => from + (to - from) * (1.0 - (c * progress).exp()) / (1.0 - c.exp()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub target: f32,
    pub seconds: f32,
    pub curve: Curve,
}

impl Segment {
    pub fn linear(target: f32, seconds: f32) -> Self {
        Self {
            target,
            seconds,
            curve: Curve::Linear,
        }
    }

    pub fn exponential(target: f32, seconds: f32) -> Self {
        Self {
            target,
            seconds,
            curve: Curve::Exponential,
        }
    }

    pub fn shaped(target: f32, seconds: f32, curvature: f32) -> Self {
        Self {
            target,
            seconds,
            curve: Curve::Shape(curvature),
        }
    }
}

/// Breakpoint envelope: `start`, then each segment in turn, then hold.
pub struct Segments {
    start: f32,
    segments: Vec<Segment>,
    index: usize,
    from: f32,
    elapsed: u32,
    total: u32,
    level: f32,
}

impl Segments {
    pub fn new(start: f32, segments: Vec<Segment>) -> Self {
        Self {
            start,
            segments,
            index: 0,
            from: start,
            elapsed: 0,
            total: 0,
            level: start,
        }
    }

    /// Replace the breakpoints (e.g. once the note duration is known) and restart.
    pub fn set_segments(&mut self, start: f32, segments: Vec<Segment>) {
        self.start = start;
        self.segments = segments;
        self.restart();
    }

    pub fn restart(&mut self) {
        self.index = 0;
        self.from = self.start;
        self.elapsed = 0;
        self.total = 0;
        self.level = self.start;
    }

    pub fn is_finished(&self) -> bool {
        self.index >= self.segments.len()
    }

    pub fn level(&self) -> f32 {
        self.level
    }

    pub fn next_sample(&mut self, sample_rate: f32) -> f32 {
        let output = self.level;

        if let Some(segment) = self.segments.get(self.index) {
            if self.total == 0 {
                self.total = (segment.seconds * sample_rate).round().max(1.0) as u32;
            }

            self.elapsed += 1;
            let progress = self.elapsed as f32 / self.total as f32;
            if progress >= 1.0 {
                self.level = segment.target;
                self.from = segment.target;
                self.index += 1;
                self.elapsed = 0;
                self.total = 0;
            } else {
                self.level = segment.curve.interpolate(self.from, segment.target, progress);
            }
        }

        output
    }

    pub fn render(&mut self, buffer: &mut [f32], sample_rate: f32) {
        for sample in buffer.iter_mut() {
            *sample = self.next_sample(sample_rate);
        }
    }
}
