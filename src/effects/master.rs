//! Bus 220: output conditioning and the once-per-block clear.

use crate::{
    config::MasterConfig,
    dsp::{
        dynamics::Compressor,
        filter::{DcBlocker, SVFilter},
        mix::sum_scaled_in_place,
    },
    mixer::{BusId, MixerState, MASTER_BUS, STEREO},
    MAX_BLOCK_SIZE,
};

/*
Master Output
=============

Everything that reaches bus 220 is audible. Per block the stage runs

    receive 220 ──► x + boost·lowpass(x) ──► DC blocker ──► [compressor] ──► level·fade ──► emit
                                                                                             │
                                        mixer.clear()  ◄──── after the block has left ◄──────┘

  bass boost    2nd-order Butterworth low-pass at `bass_cutoff_hz`, added
                back at `bass_boost` times its level.
  DC blocker    y = x - x₁ + g·y₁ per channel.
  compressor    stereo-linked, off unless the config enables it.
  fades         linear in from the first frame and out towards the last,
                only when the total length of the render is known.

State per block:

    Idle ──► Accumulating ──► Conditioning ──► Emit ──► Clear ──┐
                  ▲                                             │
                  └─────────────────────────────────────────────┘
*/

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MasterState {
    /// Nothing processed yet.
    Idle,
    /// Voices and effects are sending into the busses.
    Accumulating,
    /// Bus 220 has been read and filtered; the block is not out yet.
    Conditioning,
    /// The block has been handed to the sink.
    Emit,
    /// Every bus has been zeroed for the next block.
    Clear,
}

struct Channel {
    bass: SVFilter,
    dc: DcBlocker,
    out: Vec<f32>,
    low: Vec<f32>,
}

impl Channel {
    fn new(config: &MasterConfig) -> Self {
        Self {
            bass: SVFilter::butterworth_lowpass(config.bass_cutoff_hz),
            dc: DcBlocker::new(config.dc_block_gain),
            out: vec![0.0; MAX_BLOCK_SIZE],
            low: vec![0.0; MAX_BLOCK_SIZE],
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Fades {
    in_frames: f32,
    out_frames: f32,
    total: Option<u64>,
}

impl Fades {
    fn gain(&self, frame: u64) -> f32 {
        let Some(total) = self.total else {
            return 1.0;
        };

        let fade_in = if self.in_frames > 0.0 {
            (frame as f32 / self.in_frames).min(1.0)
        } else {
            1.0
        };
        let remaining = total.saturating_sub(frame) as f32;
        let fade_out = if self.out_frames > 0.0 {
            (remaining / self.out_frames).min(1.0)
        } else if frame < total {
            1.0
        } else {
            0.0
        };
        fade_in * fade_out
    }
}

pub struct MasterOutput {
    id: BusId,
    state: MasterState,
    sample_rate: f32,
    bass_boost: f32,
    level: f32,
    fades: Fades,
    position: u64,
    frames: usize,
    channels: [Channel; STEREO],
    compressor: Option<Compressor>,
}

impl MasterOutput {
    pub fn new(config: &MasterConfig, sample_rate: f32) -> Self {
        let compressor = config.compressor.enabled.then(|| {
            let comp = &config.compressor;
            Compressor::new(
                comp.threshold,
                comp.ratio,
                comp.attack_secs,
                comp.release_secs,
                sample_rate,
            )
        });

        Self {
            id: MASTER_BUS,
            state: MasterState::Idle,
            sample_rate,
            bass_boost: config.bass_boost,
            level: config.level,
            fades: Fades {
                in_frames: config.fade_in_secs * sample_rate,
                out_frames: config.fade_out_secs * sample_rate,
                total: None,
            },
            position: 0,
            frames: 0,
            channels: [Channel::new(config), Channel::new(config)],
            compressor,
        }
    }

    /// Read `bus` instead of the orchestra's default number.
    pub fn on_bus(mut self, bus: BusId) -> Self {
        self.id = bus;
        self
    }

    pub fn id(&self) -> BusId {
        self.id
    }

    pub fn state(&self) -> MasterState {
        self.state
    }

    /// Frames emitted since construction or the last reset.
    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn is_compressing(&self) -> bool {
        self.compressor.is_some()
    }

    /// Length of the whole render; enables the fades. `None` disables them.
    pub fn set_total_frames(&mut self, total: Option<u64>) {
        self.fades.total = total;
    }

    /// Open a new block for sending.
    pub fn begin_block(&mut self) {
        self.state = MasterState::Accumulating;
    }

    /// Read bus 220 and condition `frames` of it into the output buffers.
    pub fn condition(&mut self, mixer: &MixerState, frames: usize) {
        self.state = MasterState::Conditioning;
        let frames = frames.min(MAX_BLOCK_SIZE);
        self.frames = frames;

        for (index, channel) in self.channels.iter_mut().enumerate() {
            let out = &mut channel.out[..frames];
            let low = &mut channel.low[..frames];
            out.fill(0.0);
            for (o, &x) in out.iter_mut().zip(mixer.receive(self.id, index)) {
                *o = x;
            }

            low.copy_from_slice(out);
            channel.bass.render(low, self.sample_rate);
            sum_scaled_in_place(out, low, self.bass_boost);
            channel.dc.render(out);
        }

        let (level, fades, position) = (self.level, self.fades, self.position);
        let [left, right] = &mut self.channels;
        let (left, right) = (&mut left.out[..frames], &mut right.out[..frames]);

        if let Some(compressor) = &mut self.compressor {
            compressor.render(left, right);
        }

        for (i, (l, r)) in left.iter_mut().zip(right.iter_mut()).enumerate() {
            let gain = level * fades.gain(position + i as u64);
            *l *= gain;
            *r *= gain;
        }

        self.position += frames as u64;
    }

    /// Hand the conditioned block to the sink.
    pub fn emit(&mut self) -> (&[f32], &[f32]) {
        self.state = MasterState::Emit;
        self.output()
    }

    /// The last conditioned block.
    pub fn output(&self) -> (&[f32], &[f32]) {
        let [left, right] = &self.channels;
        (&left.out[..self.frames], &right.out[..self.frames])
    }

    /// Zero every bus. Called once per block, after the block was emitted.
    pub fn clear(&mut self, mixer: &mut MixerState) {
        mixer.clear();
        self.state = MasterState::Clear;
    }

    pub fn reset(&mut self) {
        for channel in &mut self.channels {
            channel.bass.reset();
            channel.dc.reset();
        }
        if let Some(compressor) = &mut self.compressor {
            compressor.reset();
        }
        self.position = 0;
        self.frames = 0;
        self.state = MasterState::Idle;
    }
}
