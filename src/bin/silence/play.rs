//! Realtime playback on the default cpal device.
//!
//! The engine lives inside the audio callback. The main thread talks to it
//! through an rtrb ring of `SynthMessage`s and watches its progress through
//! an atomic frame counter.

use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    thread,
    time::Duration,
};

use color_eyre::eyre::{eyre, Result, WrapErr};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use rtrb::{Consumer, RingBuffer};
use silence_dsp::{
    config::OrchestraConfig,
    engine::Engine,
    io::BufferSink,
    score::Score,
    synth::message::SynthMessage,
};
use tracing::{error, info, warn};

const CONTROL_QUEUE_SIZE: usize = 64;

/// The engine plus whatever part of its last block the device has not
/// taken yet.
struct AudioState {
    engine: Engine,
    controls: Consumer<SynthMessage>,
    played: Arc<AtomicU64>,
    pending: BufferSink,
    cursor: usize,
}

impl AudioState {
    fn next_frame(&mut self) -> (f32, f32) {
        if self.cursor >= self.pending.frames() {
            self.pending.clear();
            self.cursor = 0;
            self.engine.drain_messages(&mut self.controls);
            let rendered = self.engine.process_block(&mut self.pending);
            self.played.store(self.engine.frame(), Ordering::Relaxed);
            if let Err(error) = rendered {
                error!(%error, "block lost");
                return (0.0, 0.0);
            }
        }
        let frame = (
            self.pending.left.get(self.cursor).copied().unwrap_or(0.0),
            self.pending.right.get(self.cursor).copied().unwrap_or(0.0),
        );
        self.cursor += 1;
        frame
    }
}

pub fn run(mut config: OrchestraConfig, score: &Score, tail: Option<f32>) -> Result<()> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| eyre!("no default output device available"))?;
    let stream_config = device
        .default_output_config()
        .wrap_err("failed to fetch default output config")?;

    // the orchestra follows the device
    config.sample_rate = stream_config.sample_rate().0 as f32;
    let channels = usize::from(stream_config.channels());

    let mut engine = Engine::new(&config)?;
    let sample_rate = engine.sample_rate();
    let score_end = (score.duration() * sample_rate).ceil() as u64;
    let total = score_end + (tail.unwrap_or(config.tail_secs) * sample_rate).ceil() as u64;
    engine.set_total_frames(Some(total));
    engine.schedule_score(score);

    info!(
        sample_rate,
        channels,
        seconds = total as f32 / sample_rate,
        "playing"
    );

    let (mut controls, consumer) = RingBuffer::<SynthMessage>::new(CONTROL_QUEUE_SIZE);
    let played = Arc::new(AtomicU64::new(0));

    let mut state = AudioState {
        engine,
        controls: consumer,
        played: played.clone(),
        pending: BufferSink::with_capacity(config.block_size),
        cursor: 0,
    };

    let stream = device.build_output_stream(
        &stream_config.into(),
        move |data: &mut [f32], _| {
            for frame in data.chunks_mut(channels) {
                let (left, right) = state.next_frame();
                match frame {
                    [mono] => *mono = (left + right) * 0.5,
                    [l, r, rest @ ..] => {
                        *l = left;
                        *r = right;
                        rest.fill(0.0);
                    }
                    [] => {}
                }
            }
        },
        |err| error!(%err, "audio stream error"),
        None,
    )?;
    stream.play()?;

    let mut released = false;
    loop {
        thread::sleep(Duration::from_millis(100));
        let frame = played.load(Ordering::Relaxed);
        if !released && frame >= score_end {
            // held notes stop with the score; effects ring on through the tail
            match controls.push(SynthMessage::AllNotesOff) {
                Ok(()) => released = true,
                Err(_) => warn!("control queue full, retrying"),
            }
        }
        if frame >= total {
            break;
        }
    }

    info!("playback finished");
    Ok(())
}
