use std::{f32::consts::TAU, sync::Arc};

use serde::{Deserialize, Serialize};

use crate::graph::node::RenderCtx;

/*
Phase Accumulator Oscillators
=============================

Every oscillator here keeps a normalised phase in [0, 1). Each sample the
phase advances by frequency / sample_rate and wraps. The waveform is a pure
function of phase:

  Sine       sin(2π·phase)
  Saw        2·phase - 1
  Square     +1 for phase < 0.5, -1 otherwise
  Triangle   1 - 4·|phase - 0.5|
  Table      linear lookup into a single-cycle wavetable
  Noise      white noise, phase unused

Tables are built from harmonic partial strengths (partial 1 is the
fundamental, partial 2 one octave up, ...) and normalised so the peak is
1.0. They are shared behind an `Arc`, so detuned copies of an oscillator
cost one pointer.
*/

/// Samples per single-cycle table.
pub const TABLE_SIZE: usize = 4096;

const NOISE_SEED: u32 = 0x1234_5678;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OscillatorWaveform {
    Sine,
    Saw,
    Square,
    Triangle,
    Table,
    Noise,
}

/// Single-cycle wavetable built from harmonic partials.
#[derive(Debug, Clone)]
pub struct WaveTable {
    samples: Arc<[f32]>,
}

impl WaveTable {
    /// Sum of sines with the given relative partial strengths, peak-normalised.
    pub fn harmonics(partials: &[f32]) -> Self {
        let mut samples = vec![0.0f32; TABLE_SIZE];
        for (index, &strength) in partials.iter().enumerate() {
            if strength == 0.0 {
                continue;
            }
            let harmonic = (index + 1) as f32;
            for (n, sample) in samples.iter_mut().enumerate() {
                let phase = n as f32 / TABLE_SIZE as f32;
                *sample += strength * (TAU * harmonic * phase).sin();
            }
        }

        let peak = samples.iter().fold(0.0f32, |acc, &s| acc.max(s.abs()));
        if peak > 0.0 {
            for sample in samples.iter_mut() {
                *sample /= peak;
            }
        }

        Self {
            samples: samples.into(),
        }
    }

    pub fn sine() -> Self {
        Self::harmonics(&[1.0])
    }

    /// One cycle of `shape`, sampled at phases in [0, 1). Not normalised.
    pub fn from_fn(shape: impl Fn(f32) -> f32) -> Self {
        let samples: Vec<f32> = (0..TABLE_SIZE)
            .map(|n| shape(n as f32 / TABLE_SIZE as f32))
            .collect();
        Self {
            samples: samples.into(),
        }
    }

    pub fn cosine() -> Self {
        Self::from_fn(|phase| (TAU * phase).cos())
    }

    /// Straight segments from -1 up to 1 and back.
    pub fn triangle() -> Self {
        Self::from_fn(|phase| 1.0 - 4.0 * (phase - 0.5).abs())
    }

    /// Linearly interpolated lookup, `phase` in [0, 1).
    #[inline]
    pub fn lookup(&self, phase: f32) -> f32 {
        let len = self.samples.len();
        let position = phase * len as f32;
        let index = position as usize % len;
        let frac = position - position.floor();
        let a = self.samples[index];
        let b = self.samples[(index + 1) % len];
        a + (b - a) * frac
    }
}

pub struct OscillatorBlock {
    waveform: OscillatorWaveform,
    table: Option<WaveTable>,
    phase: f32,
    initial_phase: f32,
    noise_state: u32,
}

impl OscillatorBlock {
    fn new(waveform: OscillatorWaveform) -> Self {
        Self {
            waveform,
            table: None,
            phase: 0.0,
            initial_phase: 0.0,
            noise_state: NOISE_SEED,
        }
    }

    pub fn sine() -> Self {
        Self::new(OscillatorWaveform::Sine)
    }

    pub fn sawtooth() -> Self {
        Self::new(OscillatorWaveform::Saw)
    }

    pub fn square() -> Self {
        Self::new(OscillatorWaveform::Square)
    }

    pub fn triangle() -> Self {
        Self::new(OscillatorWaveform::Triangle)
    }

    pub fn noise() -> Self {
        Self::new(OscillatorWaveform::Noise)
    }

    pub fn table(table: WaveTable) -> Self {
        Self {
            table: Some(table),
            ..Self::new(OscillatorWaveform::Table)
        }
    }

    /// Start at `phase` (0..1) instead of zero, also after `reset`.
    pub fn with_phase(mut self, phase: f32) -> Self {
        self.initial_phase = phase.rem_euclid(1.0);
        self.phase = self.initial_phase;
        self
    }

    pub fn waveform(&self) -> OscillatorWaveform {
        self.waveform
    }

    #[inline]
    fn next_noise(&mut self) -> f32 {
        // xorshift32
        let mut x = self.noise_state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.noise_state = x;
        (x as f32 / u32::MAX as f32) * 2.0 - 1.0
    }

    /// Emit the sample at the current phase, then advance by `frequency / sample_rate`.
    #[inline]
    pub fn next_sample(&mut self, frequency: f32, sample_rate: f32) -> f32 {
        let phase = self.phase;
        let value = match self.waveform {
            OscillatorWaveform::Sine => (TAU * phase).sin(),
            OscillatorWaveform::Saw => 2.0 * phase - 1.0,
            OscillatorWaveform::Square => {
                if phase < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            OscillatorWaveform::Triangle => 1.0 - 4.0 * (phase - 0.5).abs(),
            OscillatorWaveform::Table => match &self.table {
                Some(table) => table.lookup(phase),
                None => (TAU * phase).sin(),
            },
            OscillatorWaveform::Noise => self.next_noise(),
        };

        self.phase = (phase + frequency / sample_rate).rem_euclid(1.0);
        value
    }

    pub fn render(&mut self, out: &mut [f32], ctx: &RenderCtx) {
        for sample in out.iter_mut() {
            *sample = self.next_sample(ctx.frequency, ctx.sample_rate);
        }
    }

    /// Back to the initial phase; noise restarts its sequence.
    pub fn reset(&mut self) {
        self.phase = self.initial_phase;
        self.noise_state = NOISE_SEED;
    }
}
