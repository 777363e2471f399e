//! Waveguide and recirculating-table plucked strings.

use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::dsp::{delay::DelayLine, oscillator::WaveTable};

/*
Plucked String Waveguide
========================

A string is modelled as one delay line whose length is one period of the
note, closed into a loop through a lossy reflection filter:

    ┌──────────── delay (sr / f samples) ◄───────────┐
    │                                                 │
    └──► reflection: (1 - r)·x[n] + r·x[n-1] ──► ×g ──┘
                                  │
                                  └──► pickup comb ──► out

  pluck point   Where along the string it was displaced (0..1). The loop is
                filled with a triangle peaking at this point, so plucks near
                the end are brighter than plucks in the middle.

  pickup        Where along the string it is listened to (0..1). Reading the
                loop twice, half a trip apart, notches out the harmonics
                that have a node at that point.

  reflection    r ∈ (0, 1) of the one-zero loss filter. Larger r averages
                more of the previous sample, so high harmonics die faster.

Each trip around the loop loses a little energy (g < 1) and a little more
top end, which is what makes the tone ring and then mellow out.
*/

const LOOP_GAIN: f32 = 0.996;

pub struct PluckedString {
    line: DelayLine,
    period: f32,
    pickup_delay: f32,
    reflection: f32,
    previous: f32,
}

impl PluckedString {
    /// Excite a string tuned to `frequency` Hz.
    pub fn new(
        sample_rate: f32,
        frequency: f32,
        amplitude: f32,
        pluck_point: f32,
        pickup: f32,
        reflection: f32,
    ) -> Self {
        let frequency = frequency.clamp(1.0, sample_rate * 0.25);
        let reflection = reflection.clamp(0.0, 0.99);
        let period_samples = sample_rate / frequency;
        let mut line = DelayLine::new(period_samples.ceil() as usize + 8);

        // The one-zero filter adds `reflection` samples of delay at low frequencies
        let period = (period_samples - reflection).clamp(2.0, line.max_delay());
        let pickup_delay = (pickup.clamp(0.0, 1.0) * period).max(1.0);

        let length = period.round().max(2.0) as usize;
        let pluck = pluck_point.clamp(0.01, 0.99);
        let shape = |n: usize| {
            let x = n as f32 / length as f32;
            if x < pluck {
                x / pluck
            } else {
                (1.0 - x) / (1.0 - pluck)
            }
        };
        let mean = (0..length).map(shape).sum::<f32>() / length as f32;
        for n in 0..length {
            line.write(amplitude * (shape(n) - mean));
        }

        Self {
            line,
            period,
            pickup_delay,
            reflection,
            previous: 0.0,
        }
    }

    #[inline]
    pub fn next_sample(&mut self) -> f32 {
        let delayed = self.line.read_interpolated(self.period);
        let reflected =
            LOOP_GAIN * ((1.0 - self.reflection) * delayed + self.reflection * self.previous);
        self.previous = delayed;
        self.line.write(reflected);

        reflected - self.line.read_interpolated(self.pickup_delay)
    }

    pub fn render(&mut self, out: &mut [f32]) {
        for sample in out.iter_mut() {
            *sample = self.next_sample();
        }
    }

    /// Loop length in samples.
    pub fn period(&self) -> f32 {
        self.period
    }
}

/*
Recirculating Table String
==========================

The older Karplus-Strong design: one period of the note sits in a table,
filled from noise or from a waveform. The table is read like a wavetable
oscillator, and each time the read position wraps the whole table is
smoothed by a two-point average. High partials lose energy on every lap
while the fundamental hardly does, so the note rings and dulls the way a
plucked string does.

The table length is fixed when the string is excited, but the read rate
can follow a changing pitch. Vibrato bends the note without re-tuning the
loop.
*/

/// What fills the loop of a [`KarplusString`] when it is plucked.
#[derive(Debug, Clone)]
pub enum Excitation {
    /// Uniform noise from a seeded generator, mean removed. The note's
    /// frequency is mixed into the seed.
    Noise { seed: u64 },
    /// One cycle of a waveform.
    Table(WaveTable),
}

pub struct KarplusString {
    table: Vec<f32>,
    phase: f32,
}

impl KarplusString {
    pub fn new() -> Self {
        Self {
            table: Vec::new(),
            phase: 0.0,
        }
    }

    /// Refill the loop for a note at `frequency` Hz. Reuses the table's allocation.
    pub fn pluck(&mut self, sample_rate: f32, frequency: f32, excitation: &Excitation) {
        let length = (sample_rate / frequency.clamp(1.0, sample_rate * 0.25))
            .round()
            .max(2.0) as usize;
        self.table.clear();
        match excitation {
            Excitation::Noise { seed } => {
                // each pitch gets its own repeatable noise
                let mut rng = StdRng::seed_from_u64(seed ^ u64::from(frequency.to_bits()));
                self.table
                    .extend((0..length).map(|_| rng.gen_range(-1.0f32..1.0)));
                let mean = self.table.iter().sum::<f32>() / length as f32;
                for sample in self.table.iter_mut() {
                    *sample -= mean;
                }
            }
            Excitation::Table(wave) => {
                self.table
                    .extend((0..length).map(|n| wave.lookup(n as f32 / length as f32)));
            }
        }
        self.phase = 0.0;
    }

    /// Next sample with the loop read at `frequency` Hz.
    #[inline]
    pub fn next_sample(&mut self, frequency: f32, sample_rate: f32) -> f32 {
        let length = self.table.len();
        if length == 0 {
            return 0.0;
        }

        let whole = self.phase as usize;
        let frac = self.phase - whole as f32;
        let a = self.table[whole % length];
        let b = self.table[(whole + 1) % length];
        let value = a + (b - a) * frac;

        self.phase += frequency.max(0.0) * length as f32 / sample_rate;
        while self.phase >= length as f32 {
            self.phase -= length as f32;
            self.smooth();
        }
        value
    }

    fn smooth(&mut self) {
        let mut previous = self.table.last().copied().unwrap_or(0.0);
        for sample in self.table.iter_mut() {
            let current = *sample;
            *sample = 0.5 * (current + previous);
            previous = current;
        }
    }

    /// Loop length in samples (0 before the first pluck).
    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

impl Default for KarplusString {
    fn default() -> Self {
        Self::new()
    }
}
