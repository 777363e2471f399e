//! Stereo-linked peak compressor and RMS level matching.

use crate::dsp::filter::OnePole;

/*
Compression
===========

An envelope follower tracks the peak level of the signal; whenever that
level is above the threshold, gain is reduced so that every `ratio` dB of
input over the threshold comes out as 1 dB.

    gain = (envelope / threshold)^(1/ratio - 1)     when envelope > threshold
    gain = 1                                        otherwise

The follower rises with the attack coefficient and falls with the release
coefficient, both one-pole smoothers derived from times in seconds:

    coeff = 1 - e^(-1 / (time · sample_rate))

Both channels share one envelope (the louder of the two drives it), so the
stereo image does not wander when one side gets compressed harder.
*/

#[derive(Debug, Clone)]
pub struct Compressor {
    envelope: f32,
    attack_coeff: f32,
    release_coeff: f32,
    threshold: f32,
    ratio: f32,
}

impl Compressor {
    /// `threshold` is linear amplitude, `ratio` ≥ 1, times in seconds.
    pub fn new(
        threshold: f32,
        ratio: f32,
        attack_secs: f32,
        release_secs: f32,
        sample_rate: f32,
    ) -> Self {
        Self {
            envelope: 0.0,
            attack_coeff: smoothing_coeff(attack_secs, sample_rate),
            release_coeff: smoothing_coeff(release_secs, sample_rate),
            threshold: threshold.max(f32::MIN_POSITIVE),
            ratio: ratio.max(1.0),
        }
    }

    #[inline]
    pub fn gain_for(&self, envelope: f32) -> f32 {
        if envelope > self.threshold {
            (envelope / self.threshold).powf(1.0 / self.ratio - 1.0)
        } else {
            1.0
        }
    }

    #[inline]
    pub fn process_stereo(&mut self, left: f32, right: f32) -> (f32, f32) {
        let peak = left.abs().max(right.abs());
        let coeff = if peak > self.envelope {
            self.attack_coeff
        } else {
            self.release_coeff
        };
        self.envelope += coeff * (peak - self.envelope);

        let gain = self.gain_for(self.envelope);
        (left * gain, right * gain)
    }

    pub fn render(&mut self, left: &mut [f32], right: &mut [f32]) {
        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let (cl, cr) = self.process_stereo(*l, *r);
            *l = cl;
            *r = cr;
        }
    }

    pub fn reset(&mut self) {
        self.envelope = 0.0;
    }
}

/*
Level Matching
==============

A balance stage rescales one signal so that its RMS level follows another
one's. Both levels are measured the same way: the squared signal through a
10 Hz one-pole tone filter, which is slow enough to ignore the waveform and
fast enough to follow a note's envelope.

    gain = √(power(comparator) / power(signal))

Filters that throw away most of a signal's energy (narrow band-passes, a
sub-sonic high-pass) are followed by a balance against their own input so
the instrument keeps its loudness.
*/

/// Half-power point of the level followers.
pub const BALANCE_HZ: f32 = 10.0;

/// Smoothed mean square of a signal.
#[derive(Debug, Clone)]
pub struct RmsFollower {
    smoother: OnePole,
}

impl RmsFollower {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            smoother: OnePole::new(BALANCE_HZ, sample_rate),
        }
    }

    /// Feed one sample and return the current power.
    #[inline]
    pub fn process(&mut self, sample: f32) -> f32 {
        self.smoother.process(sample * sample)
    }

    pub fn reset(&mut self) {
        self.smoother.reset();
    }
}

/// Gain that brings a signal to the level of a comparator.
#[derive(Debug, Clone)]
pub struct Balancer {
    signal: RmsFollower,
    comparator: RmsFollower,
}

impl Balancer {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            signal: RmsFollower::new(sample_rate),
            comparator: RmsFollower::new(sample_rate),
        }
    }

    #[inline]
    pub fn gain(&mut self, signal: f32, comparator: f32) -> f32 {
        let power = self.signal.process(signal);
        let target = self.comparator.process(comparator);
        if power <= 1e-12 {
            target.sqrt()
        } else {
            (target / power).sqrt()
        }
    }

    pub fn reset(&mut self) {
        self.signal.reset();
        self.comparator.reset();
    }
}

fn smoothing_coeff(time_secs: f32, sample_rate: f32) -> f32 {
    if time_secs <= 0.0 {
        1.0
    } else {
        1.0 - (-1.0 / (time_secs * sample_rate)).exp()
    }
}
