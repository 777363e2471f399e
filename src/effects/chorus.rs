//! Four-tap stereo chorus on bus 200.

use crate::{
    config::ChorusConfig,
    dsp::{delay::DelayLine, lfo::Lfo},
    effects::BusEffect,
    mixer::{BusId, MixerState, SendId, CHORUS_BUS, MASTER_BUS, REVERB_BUS, STEREO},
    MAX_BLOCK_SIZE,
};

/*
Chorus
======

Each channel feeds one delay line. Four taps read it at a few milliseconds
behind the input, each tap swept by its own slow sine:

    tap_k(t) = delay_ms / 5 + (delay_ms / divisor) · sin(2π · rate_k · t)     [ms]

    rates     1.0   0.995   1.05   1.0    Hz
    longest   900   700     700    900    ms

The sweeps are shared between left and right, so the two channels are
modulated identically and the stereo image of the dry signal survives.
Taps are read with cubic interpolation because the delay is almost never a
whole number of samples.

    out = (dry + tap_1 + tap_2 + tap_3 + tap_4) · 0.5

The result is sent to every target bus (reverb and master by default), each
at its own level from the mixer's gain table.
*/

pub const TAP_RATES_HZ: [f32; TAP_COUNT] = [1.0, 0.995, 1.05, 1.0];
pub const TAP_MAX_DELAYS_MS: [f32; TAP_COUNT] = [900.0, 700.0, 700.0, 900.0];
pub const TAP_COUNT: usize = 4;

/// The tightest tap limit; swept taps must stay inside it.
pub const SHORTEST_MAX_DELAY_MS: f32 = 700.0;

const LONGEST_MAX_DELAY_MS: f32 = 900.0;

pub struct Chorus {
    id: BusId,
    targets: Vec<BusId>,
    sample_rate: f32,
    center_ms: f32,
    lfos: [Lfo; TAP_COUNT],
    max_taps: [f32; TAP_COUNT],
    lines: [DelayLine; STEREO],
    taps: Vec<[f32; TAP_COUNT]>,
    out: [Vec<f32>; STEREO],
}

impl Chorus {
    pub fn new(config: &ChorusConfig, sample_rate: f32) -> Self {
        let depth = config.depth_ms();
        let line = || DelayLine::with_max_seconds(LONGEST_MAX_DELAY_MS / 1000.0, sample_rate);

        Self {
            id: CHORUS_BUS,
            targets: vec![REVERB_BUS, MASTER_BUS],
            sample_rate,
            center_ms: config.center_ms(),
            lfos: TAP_RATES_HZ.map(|rate| Lfo::new(rate, depth)),
            max_taps: TAP_MAX_DELAYS_MS.map(|ms| ms * sample_rate / 1000.0),
            lines: [line(), line()],
            taps: vec![[0.0; TAP_COUNT]; MAX_BLOCK_SIZE],
            out: [vec![0.0; MAX_BLOCK_SIZE], vec![0.0; MAX_BLOCK_SIZE]],
        }
    }

    /// Own `bus` instead of the orchestra's default number.
    pub fn on_bus(mut self, bus: BusId) -> Self {
        self.id = bus;
        self
    }

    /// Send to `targets` instead of reverb and master.
    pub fn with_targets(mut self, targets: impl IntoIterator<Item = BusId>) -> Self {
        self.targets = targets.into_iter().collect();
        self
    }

    pub fn targets(&self) -> &[BusId] {
        &self.targets
    }

    /// The last processed block of one channel.
    pub fn output(&self, channel: usize) -> &[f32] {
        self.out.get(channel).map(Vec::as_slice).unwrap_or(&[])
    }
}

impl BusEffect for Chorus {
    fn id(&self) -> BusId {
        self.id
    }

    fn name(&self) -> &'static str {
        "chorus"
    }

    fn process(&mut self, mixer: &mut MixerState, frames: usize) {
        let frames = frames.min(MAX_BLOCK_SIZE);
        let samples_per_ms = self.sample_rate / 1000.0;

        // sweep every tap once per frame, shared by both channels
        for frame in self.taps[..frames].iter_mut() {
            for ((tap, lfo), &max) in frame.iter_mut().zip(&mut self.lfos).zip(&self.max_taps) {
                let ms = self.center_ms + lfo.next_sample(self.sample_rate);
                *tap = (ms * samples_per_ms).clamp(0.0, max);
            }
        }

        for (channel, (line, out)) in self.lines.iter_mut().zip(&mut self.out).enumerate() {
            let input = mixer.receive(self.id, channel);
            let out = &mut out[..frames];
            out.fill(0.0);

            for ((&dry, taps), y) in input.iter().zip(&self.taps[..frames]).zip(out.iter_mut()) {
                line.write(dry);
                // tap 1 is the sample just written, so a zero delay reads `dry`
                let wet: f32 = taps.iter().map(|&d| line.read_interpolated(d + 1.0)).sum();
                *y = (dry + wet) * 0.5;
            }
        }

        let send = SendId::from(self.id);
        for &target in &self.targets {
            for (channel, out) in self.out.iter().enumerate() {
                mixer.send(&out[..frames], send, target, channel);
            }
        }
    }

    fn reset(&mut self) {
        for lfo in &mut self.lfos {
            lfo.reset();
        }
        for line in &mut self.lines {
            line.reset();
        }
    }
}
