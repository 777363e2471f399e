//! Control-rate modulation sources.

use std::f32::consts::TAU;

use rand::{rngs::StdRng, Rng, SeedableRng};

/*
Modulation Sources
==================

Two sub-audio sources move delay taps around:

  Lfo                 A sine at a fixed rate and depth. The chorus runs four
                      of them at slightly different rates so its taps drift
                      against each other instead of moving in lockstep.

  RandomInterpolator  Interpolating random noise: a new random target is
                      drawn every 1/rate seconds and the output glides
                      linearly towards it. The reverb lines each use one to
                      wobble their lengths a fraction of a millisecond,
                      which breaks up the metallic ringing of a static
                      delay network.

                          target drawn every 1/rate s
                        ●        ●
                      ╱   ╲     ╱ ╲      ●
                    ●       ╲ ╱     ╲  ╱
                             ●        ●

The random source is deterministic: it is driven by a seeded `StdRng`, so a
render with the same seed reproduces bit for bit. It is evaluated once per
block, not per sample.
*/

/// Sine low frequency oscillator, bipolar output scaled by `depth`.
#[derive(Debug, Clone)]
pub struct Lfo {
    rate_hz: f32,
    depth: f32,
    phase: f32,
}

impl Lfo {
    pub fn new(rate_hz: f32, depth: f32) -> Self {
        Self {
            rate_hz,
            depth,
            phase: 0.0,
        }
    }

    pub fn rate(&self) -> f32 {
        self.rate_hz
    }

    pub fn depth(&self) -> f32 {
        self.depth
    }

    #[inline]
    pub fn next_sample(&mut self, sample_rate: f32) -> f32 {
        let value = (TAU * self.phase).sin() * self.depth;
        self.phase = (self.phase + self.rate_hz / sample_rate).rem_euclid(1.0);
        value
    }

    pub fn reset(&mut self) {
        self.phase = 0.0;
    }
}

/// Linearly interpolated random values, refreshed `rate_hz` times a second.
#[derive(Debug, Clone)]
pub struct RandomInterpolator {
    rng: StdRng,
    seed: u64,
    amplitude: f32,
    rate_hz: f32,
    phase: f32,
    from: f32,
    to: f32,
}

impl RandomInterpolator {
    pub fn new(amplitude: f32, rate_hz: f32, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let to = rng.gen_range(-1.0f32..=1.0);
        Self {
            rng,
            seed,
            amplitude,
            rate_hz,
            phase: 0.0,
            from: 0.0,
            to,
        }
    }

    /// Current value, then advance the glide by `elapsed_secs`.
    pub fn next_value(&mut self, elapsed_secs: f32) -> f32 {
        let value = (self.from + (self.to - self.from) * self.phase) * self.amplitude;

        self.phase += self.rate_hz * elapsed_secs;
        while self.phase >= 1.0 {
            self.phase -= 1.0;
            self.from = self.to;
            self.to = self.rng.gen_range(-1.0f32..=1.0);
        }

        value
    }

    pub fn amplitude(&self) -> f32 {
        self.amplitude
    }

    /// Rewind to the first value of the seeded sequence.
    pub fn reset(&mut self) {
        *self = Self::new(self.amplitude, self.rate_hz, self.seed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lfo_swings_between_depth_bounds() {
        let mut lfo = Lfo::new(1.0, 2.0);
        let sample_rate = 1_000.0;
        let values: Vec<f32> = (0..1_000).map(|_| lfo.next_sample(sample_rate)).collect();

        let max = values.iter().cloned().fold(f32::MIN, f32::max);
        let min = values.iter().cloned().fold(f32::MAX, f32::min);
        assert!((max - 2.0).abs() < 1e-3, "max {}", max);
        assert!((min + 2.0).abs() < 1e-3, "min {}", min);
        assert!(values[0].abs() < 1e-6, "sine LFO starts at zero");
    }

    #[test]
    fn test_random_interpolator_stays_within_amplitude() {
        let mut randi = RandomInterpolator::new(0.0017, 1.11, 7);
        for _ in 0..10_000 {
            let v = randi.next_value(15.0 / 44_100.0);
            assert!(v.abs() <= 0.0017 + 1e-9, "value {} exceeds amplitude", v);
        }
    }

    #[test]
    fn test_random_interpolator_is_seeded() {
        let mut a = RandomInterpolator::new(1.0, 3.1, 42);
        let mut b = RandomInterpolator::new(1.0, 3.1, 42);
        let mut c = RandomInterpolator::new(1.0, 3.1, 43);

        let sa: Vec<f32> = (0..500).map(|_| a.next_value(0.01)).collect();
        let sb: Vec<f32> = (0..500).map(|_| b.next_value(0.01)).collect();
        let sc: Vec<f32> = (0..500).map(|_| c.next_value(0.01)).collect();

        assert_eq!(sa, sb, "same seed must reproduce");
        assert_ne!(sa, sc, "different seeds should diverge");
    }

    #[test]
    fn test_random_interpolator_reset_replays_sequence() {
        let mut randi = RandomInterpolator::new(1.0, 3.1, 9);
        let first: Vec<f32> = (0..300).map(|_| randi.next_value(0.01)).collect();
        randi.reset();
        let again: Vec<f32> = (0..300).map(|_| randi.next_value(0.01)).collect();

        assert_eq!(first, again);
    }

    #[test]
    fn test_random_interpolator_glides_linearly() {
        let mut randi = RandomInterpolator::new(1.0, 1.0, 3);
        let v0 = randi.next_value(0.25);
        let v1 = randi.next_value(0.25);
        let v2 = randi.next_value(0.25);

        assert!(v0.abs() < 1e-9, "glide starts from zero");
        assert!(((v2 - v1) - (v1 - v0)).abs() < 1e-6, "constant slope within a segment");
    }
}
