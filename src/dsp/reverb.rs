//! Reverb - eight-line feedback delay network
//!
//! The network models eight lossless waveguides of equal impedance meeting at
//! one scattering junction. Each waveguide is a delay line with a gain and a
//! one-pole lowpass in its return path.
//!
//! ```text
//!                 ┌────────────────────────────────────────────┐
//!                 │   apj = (2/N) · Σ filtered_k               │
//!                 ▼                                            │
//! input ──► (+ apj - filtered_k) ──► [delay k ± jitter] ──► ×gain ──► [tone] ──┬──► filtered_k
//!                                                                               │
//!                            left = lines 1,3,5,7   right = lines 2,4,6,8 ◄────┘
//! ```
//!
//! # Junction pressure
//!
//! With N lines of equal impedance the pressure at the junction is
//! `apj = (2/N) Σ filtered_k`, i.e. `0.25 Σ` for N = 8. The wave travelling
//! back into line k is `input + apj - filtered_k`. Without the gain and the
//! lowpass the junction is lossless; `gain` sets the decay time and the
//! lowpass cutoff sets how fast high frequencies die.
//!
//! # Block update order
//!
//! Every line is updated from the same snapshot of the previous block's
//! filtered outputs:
//!
//! 1. read every line's tap for the whole block (taps are longer than a block,
//!    so nothing written this block is ever read this block);
//! 2. compute `apj` per frame from the previous block's filtered vectors and
//!    write every line;
//! 3. filter the taps into the current block's vectors;
//! 4. swap current and previous.
//!
//! The feedback round trip is therefore the line length plus one block, and
//! no line ever sees a partially updated neighbour.
//!
//! # Pitch modulation
//!
//! Each line length wobbles by an interpolated random offset (a fraction of a
//! millisecond, scaled by `pitch_mod`) refreshed once per block. That keeps
//! the tail from ringing at the lines' fixed resonances. `pitch_mod = 0` means
//! static lengths and no random numbers drawn at all.

use crate::{
    dsp::{delay::DelayLine, filter::OnePole, lfo::RandomInterpolator},
    MAX_BLOCK_SIZE,
};

pub const LINE_COUNT: usize = 8;

/// Nominal line lengths in samples.
pub const LINE_LENGTHS: [f32; LINE_COUNT] = [
    2473.0, 2767.0, 3217.0, 3557.0, 3907.0, 4127.0, 2143.0, 1933.0,
];

/// Length jitter depth per line, in seconds.
pub const JITTER_DEPTHS: [f32; LINE_COUNT] =
    [0.001, 0.0011, 0.0017, 0.0006, 0.001, 0.0011, 0.0017, 0.0006];

/// Length jitter refresh rate per line, in Hz.
pub const JITTER_RATES: [f32; LINE_COUNT] =
    [3.1, 3.5, 1.11, 3.973, 2.341, 1.897, 0.891, 3.221];

/// Per-line seed fractions, mixed with the network seed.
pub const JITTER_SEEDS: [f32; LINE_COUNT] = [0.06, 0.9, 0.7, 0.3, 0.63, 0.7, 0.9, 0.44];

/// Every line buffer holds one second of audio.
const LINE_SECONDS: f32 = 1.0;

/// Junction pressure of `N` equal-impedance waveguides: `(2/N) Σ filtered`.
#[inline]
pub fn junction_pressure(filtered: &[f32; LINE_COUNT]) -> f32 {
    (2.0 / LINE_COUNT as f32) * filtered.iter().sum::<f32>()
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FdnParams {
    /// Feedback gain applied to every line output, in [0, 1).
    pub gain: f32,
    /// Scale of the random length modulation; 0 disables it.
    pub pitch_mod: f32,
    /// Cutoff of the lowpass in every feedback path.
    pub cutoff_hz: f32,
    pub seed: u64,
}

impl Default for FdnParams {
    fn default() -> Self {
        Self {
            gain: 0.81,
            pitch_mod: 0.02,
            cutoff_hz: 16_000.0,
            seed: 0,
        }
    }
}

struct FdnLine {
    delay: DelayLine,
    nominal: f32,
    jitter: RandomInterpolator,
    tone: OnePole,
}

pub struct FeedbackDelayNetwork {
    lines: Vec<FdnLine>,
    sample_rate: f32,
    gain: f32,
    pitch_mod: f32,
    taps: Vec<[f32; LINE_COUNT]>,
    previous: Vec<[f32; LINE_COUNT]>,
    current: Vec<[f32; LINE_COUNT]>,
}

impl FeedbackDelayNetwork {
    pub fn new(params: FdnParams, sample_rate: f32) -> Self {
        let lines = (0..LINE_COUNT)
            .map(|k| {
                let seed = params
                    .seed
                    .wrapping_mul(0x9E37_79B9_7F4A_7C15)
                    .wrapping_add((JITTER_SEEDS[k] as f64 * 1_000_000.0) as u64)
                    .wrapping_add(k as u64);
                FdnLine {
                    delay: DelayLine::with_max_seconds(LINE_SECONDS, sample_rate),
                    nominal: LINE_LENGTHS[k],
                    jitter: RandomInterpolator::new(JITTER_DEPTHS[k], JITTER_RATES[k], seed),
                    tone: OnePole::new(params.cutoff_hz, sample_rate),
                }
            })
            .collect();

        Self {
            lines,
            sample_rate,
            gain: params.gain,
            pitch_mod: params.pitch_mod,
            taps: vec![[0.0; LINE_COUNT]; MAX_BLOCK_SIZE],
            previous: vec![[0.0; LINE_COUNT]; MAX_BLOCK_SIZE],
            current: vec![[0.0; LINE_COUNT]; MAX_BLOCK_SIZE],
        }
    }

    pub fn gain(&self) -> f32 {
        self.gain
    }

    /// Run one block: mono `input` in, stereo out.
    pub fn process_block(&mut self, input: &[f32], left: &mut [f32], right: &mut [f32]) {
        let frames = input
            .len()
            .min(left.len())
            .min(right.len())
            .min(MAX_BLOCK_SIZE);
        let elapsed = frames as f32 / self.sample_rate;

        // 1. taps for the whole block, from history only
        for (k, line) in self.lines.iter_mut().enumerate() {
            let jitter = if self.pitch_mod == 0.0 {
                0.0
            } else {
                line.jitter.next_value(elapsed) * self.pitch_mod * self.sample_rate
            };
            let tap = line.nominal + jitter;
            for (i, frame) in self.taps[..frames].iter_mut().enumerate() {
                frame[k] = line.delay.read_interpolated(tap - i as f32);
            }
        }

        // 2. scatter at the junction using the previous block's outputs
        for (i, &x) in input[..frames].iter().enumerate() {
            let prev = &self.previous[i];
            let apj = junction_pressure(prev);
            for (k, line) in self.lines.iter_mut().enumerate() {
                line.delay.write(x + apj - prev[k]);
            }
        }

        // 3. loss and damping
        for (k, line) in self.lines.iter_mut().enumerate() {
            for (tap, out) in self.taps[..frames].iter().zip(self.current[..frames].iter_mut()) {
                out[k] = line.tone.process(tap[k] * self.gain);
            }
        }
        for frame in self.current[frames..].iter_mut() {
            *frame = [0.0; LINE_COUNT];
        }

        for ((frame, l), r) in self.current[..frames]
            .iter()
            .zip(left.iter_mut())
            .zip(right.iter_mut())
        {
            *l = frame[0] + frame[2] + frame[4] + frame[6];
            *r = frame[1] + frame[3] + frame[5] + frame[7];
        }

        // 4. publish
        std::mem::swap(&mut self.previous, &mut self.current);
    }

    pub fn reset(&mut self) {
        for line in &mut self.lines {
            line.delay.reset();
            line.tone.reset();
            line.jitter.reset();
        }
        for frame in self.previous.iter_mut().chain(self.current.iter_mut()) {
            *frame = [0.0; LINE_COUNT];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RATE: f32 = 44_100.0;
    const BLOCK: usize = 15;

    fn run(fdn: &mut FeedbackDelayNetwork, input: &[f32]) -> (Vec<f32>, Vec<f32>) {
        let mut left = vec![0.0; input.len()];
        let mut right = vec![0.0; input.len()];
        for ((inp, l), r) in input
            .chunks(BLOCK)
            .zip(left.chunks_mut(BLOCK))
            .zip(right.chunks_mut(BLOCK))
        {
            fdn.process_block(inp, l, r);
        }
        (left, right)
    }

    fn static_params() -> FdnParams {
        FdnParams {
            pitch_mod: 0.0,
            ..FdnParams::default()
        }
    }

    #[test]
    fn test_junction_pressure_is_quarter_sum() {
        let filtered = [1.0, 2.0, 3.0, 4.0, -1.0, 0.5, 0.25, 0.0];
        let expected = 0.25 * filtered.iter().sum::<f32>();
        assert!((junction_pressure(&filtered) - expected).abs() < 1e-6);
    }

    #[test]
    fn test_silence_in_silence_out() {
        let mut fdn = FeedbackDelayNetwork::new(FdnParams::default(), SAMPLE_RATE);
        let (left, right) = run(&mut fdn, &vec![0.0; 44_100]);
        assert!(left.iter().chain(right.iter()).all(|&s| s == 0.0));
    }

    #[test]
    fn test_first_echo_arrives_after_shortest_line() {
        let mut fdn = FeedbackDelayNetwork::new(static_params(), SAMPLE_RATE);
        let mut input = vec![0.0; 6_000];
        input[0] = 1.0;

        let (left, right) = run(&mut fdn, &input);

        // Line 8 (1933 samples) is the shortest and feeds the right channel,
        // line 7 (2143 samples) is the shortest on the left
        assert!(right[..1_933].iter().all(|&s| s == 0.0), "no output before 1933");
        assert!(left[..2_143].iter().all(|&s| s == 0.0), "left waits for line 7");
        assert!(right[1_933] > 0.5, "direct arrival, got {}", right[1_933]);
        assert!(left[2_143] > 0.5, "direct arrival, got {}", left[2_143]);
    }

    #[test]
    fn test_tail_decays_and_stays_finite() {
        let mut fdn = FeedbackDelayNetwork::new(FdnParams::default(), SAMPLE_RATE);
        let mut input = vec![0.0; 44_100 * 6];
        input[0] = 1.0;

        let (left, _) = run(&mut fdn, &input);

        let energy = |range: std::ops::Range<usize>| -> f32 {
            left[range].iter().map(|s| s * s).sum()
        };
        let early = energy(0..44_100);
        let late = energy(44_100 * 5..44_100 * 6);

        assert!(left.iter().all(|s| s.is_finite()));
        assert!(early > 0.0);
        assert!(late < early * 0.01, "tail should decay: early={early}, late={late}");
    }

    #[test]
    fn test_static_network_is_repeatable() {
        let mut input = vec![0.0; 20_000];
        input[3] = 0.7;
        input[500] = -0.2;

        let mut a = FeedbackDelayNetwork::new(static_params(), SAMPLE_RATE);
        let mut b = FeedbackDelayNetwork::new(static_params(), SAMPLE_RATE);
        assert_eq!(run(&mut a, &input), run(&mut b, &input));
    }

    #[test]
    fn test_seeded_modulation_is_repeatable() {
        let params = FdnParams {
            seed: 99,
            ..FdnParams::default()
        };
        let mut input = vec![0.0; 20_000];
        input[0] = 1.0;

        let mut a = FeedbackDelayNetwork::new(params, SAMPLE_RATE);
        let mut b = FeedbackDelayNetwork::new(params, SAMPLE_RATE);
        assert_eq!(run(&mut a, &input), run(&mut b, &input));
    }

    #[test]
    fn test_reset_replays_modulated_network() {
        let mut input = vec![0.0; 12_000];
        input[0] = 1.0;

        let mut fdn = FeedbackDelayNetwork::new(FdnParams::default(), SAMPLE_RATE);
        let first = run(&mut fdn, &input);
        fdn.reset();
        let second = run(&mut fdn, &input);

        assert_eq!(first, second, "reset must rewind the jitter too");
    }
}
