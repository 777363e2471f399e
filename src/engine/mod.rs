//! Block-synchronous orchestra runtime.
//!
//! Per block, in this order and on one thread:
//!
//! ```text
//!   due messages ──► voices render + send ──► bus effects (scheduled order)
//!        ──► master conditions bus 220 ──► sink ──► master clears every bus
//! ```
//!
//! Send levels from the schedule (instrument defaults, config overrides and
//! the effects matrix) are written into the mixer at construction and again
//! on every reset. `SetLevel` messages change them in between.
//!
//! Every bus of the patch is allocated up front, and voices only send into
//! those, so the block path never grows the mixer.

pub mod allocator;
pub mod scheduler;

use thiserror::Error;
use tracing::{debug, info, trace, warn};

use crate::{
    config::{ConfigError, OrchestraConfig},
    effects::{
        chorus::Chorus,
        master::{MasterOutput, MasterState},
        reverb::Reverb,
        BusEffect,
    },
    io::{AudioSink, SinkError},
    mixer::{BusId, MixerState, SendId, STEREO},
    patch::{PatchError, Schedule, SendRoute, StageKind},
    score::Score,
    synth::{
        message::{MessageReceiver, SynthMessage},
        voice::VoiceParams,
    },
    voices,
};

use self::{allocator::VoicePool, scheduler::Scheduler};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Patch(#[from] PatchError),
}

pub struct Engine {
    sample_rate: f32,
    block_size: usize,
    mixer: MixerState,
    pool: VoicePool,
    effects: Vec<Box<dyn BusEffect>>,
    master: MasterOutput,
    busses: Vec<BusId>,
    sends: Vec<SendRoute>,
    scheduler: Scheduler,
    frame: u64,
}

impl Engine {
    /// The full orchestra as configured.
    pub fn new(config: &OrchestraConfig) -> Result<Self, EngineError> {
        config.validate()?;
        let schedule = Schedule::orchestra(config)?;
        Self::with_schedule(config, &schedule)
    }

    /// An engine for a custom patch. Effects are built per stage kind.
    pub fn with_schedule(
        config: &OrchestraConfig,
        schedule: &Schedule,
    ) -> Result<Self, EngineError> {
        config.validate()?;
        let sample_rate = config.sample_rate;

        let busses: Vec<BusId> = schedule.busses().collect();
        let mut mixer = MixerState::new(config.block_size, STEREO);
        for &bus in &busses {
            mixer.declare_bus(bus);
        }
        let sends = schedule.sends().to_vec();
        apply_sends(&mut mixer, &sends);

        let effects = schedule
            .effects()
            .iter()
            .filter_map(|stage| -> Option<Box<dyn BusEffect>> {
                let targets = stage.targets.iter().copied();
                match stage.kind {
                    StageKind::Chorus => Some(Box::new(
                        Chorus::new(&config.chorus, sample_rate)
                            .on_bus(stage.bus)
                            .with_targets(targets),
                    )),
                    StageKind::Reverb => Some(Box::new(
                        Reverb::new(config.reverb.fdn_params(), sample_rate)
                            .on_bus(stage.bus)
                            .with_targets(targets),
                    )),
                    StageKind::Voice | StageKind::Master => None,
                }
            })
            .collect();

        info!(
            sample_rate,
            block_size = config.block_size,
            busses = ?busses,
            master = %schedule.master(),
            "engine ready"
        );

        Ok(Self {
            sample_rate,
            block_size: config.block_size,
            mixer,
            pool: VoicePool::new(config.max_voices),
            effects,
            master: MasterOutput::new(&config.master, sample_rate).on_bus(schedule.master()),
            busses,
            sends,
            scheduler: Scheduler::new(),
            frame: 0,
        })
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Frames rendered so far.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn mixer(&self) -> &MixerState {
        &self.mixer
    }

    pub fn master_state(&self) -> MasterState {
        self.master.state()
    }

    pub fn active_voices(&self) -> usize {
        self.pool.len()
    }

    /// Nothing queued and nothing sounding (effect tails aside).
    pub fn is_idle(&self) -> bool {
        self.scheduler.is_empty() && self.pool.is_empty()
    }

    /// Queue every event of `score`, timed from the current frame.
    pub fn schedule_score(&mut self, score: &Score) {
        self.scheduler.enqueue_score(score, self.sample_rate, self.frame);
        debug!(pending = self.scheduler.len(), "score queued");
    }

    /// Queue one message `frames_from_now` into the future.
    pub fn schedule(&mut self, frames_from_now: u64, message: SynthMessage) {
        self.scheduler.enqueue(self.frame + frames_from_now, message);
    }

    /// Enable master fades over a render of `total` frames.
    pub fn set_total_frames(&mut self, total: Option<u64>) {
        self.master.set_total_frames(total);
    }

    pub fn handle(&mut self, message: SynthMessage) {
        match message {
            SynthMessage::NoteOn {
                instrument,
                key,
                velocity,
                pan,
                duration,
            } => {
                let Some(def) = voices::lookup(instrument) else {
                    warn!(instrument, "note for unknown instrument dropped");
                    return;
                };
                trace!(instrument, key, velocity, duration, "note on");
                let params = VoiceParams {
                    instrument: def.send_id(),
                    key,
                    amplitude: def.amplitude(velocity),
                    pan: pan.clamp(-1.0, 1.0),
                    duration: duration.max(0.0),
                    attack: def.attack,
                    release: def.release,
                };
                self.pool.note_on(def.create_graph(), params, self.sample_rate);
            }
            SynthMessage::NoteOff { instrument, key } => {
                let released = self.pool.note_off(SendId(instrument), key);
                trace!(instrument, key, released, "note off");
            }
            SynthMessage::SetLevel { send, bus, gain } => {
                debug!(%send, %bus, gain, "level set");
                self.mixer.set_level(send, bus, gain);
            }
            SynthMessage::AllNotesOff => {
                debug!(voices = self.pool.len(), "all notes off");
                self.pool.release_all();
            }
        }
    }

    /// Apply every message waiting in `receiver`, now.
    pub fn drain_messages<R: MessageReceiver + ?Sized>(&mut self, receiver: &mut R) {
        while let Some(message) = receiver.pop() {
            self.handle(message);
        }
    }

    /// Render one block into `sink`. The busses are cleared afterwards even
    /// when the sink fails.
    pub fn process_block<S>(&mut self, sink: &mut S) -> Result<(), SinkError>
    where
        S: AudioSink + ?Sized,
    {
        let frames = self.block_size;
        self.master.begin_block();

        let end = self.frame + frames as u64;
        while let Some(message) = self.scheduler.pop_due(end) {
            self.handle(message);
        }

        self.pool.render(&mut self.mixer, &self.busses, frames);
        for effect in &mut self.effects {
            effect.process(&mut self.mixer, frames);
        }

        self.master.condition(&self.mixer, frames);
        let (left, right) = self.master.emit();
        let written = sink.write_block(left, right);
        self.master.clear(&mut self.mixer);

        self.frame = end;
        written
    }

    /// Silence every voice and effect, drop pending events, rewind to frame 0.
    /// Send levels go back to the patch's own; earlier `SetLevel`s are lost.
    pub fn reset(&mut self) {
        self.pool.clear();
        self.scheduler.clear();
        for effect in &mut self.effects {
            effect.reset();
        }
        self.master.reset();
        self.mixer.clear();
        self.mixer.reset_levels();
        apply_sends(&mut self.mixer, &self.sends);
        self.frame = 0;
    }
}

fn apply_sends(mixer: &mut MixerState, sends: &[SendRoute]) {
    for route in sends {
        mixer.set_level(route.from, route.to, route.gain);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::ReverbConfig,
        io::BufferSink,
        mixer::{MASTER_BUS, REVERB_BUS},
        patch::Patch,
    };

    fn quick() -> OrchestraConfig {
        OrchestraConfig {
            sample_rate: 8_000.0,
            block_size: 32,
            reverb: ReverbConfig {
                cutoff_hz: 3_000.0,
                ..ReverbConfig::default()
            },
            ..OrchestraConfig::default()
        }
    }

    fn organ() -> SynthMessage {
        SynthMessage::NoteOn {
            instrument: 5,
            key: 60.0,
            velocity: 100.0,
            pan: 0.0,
            duration: 0.0,
        }
    }

    fn render(engine: &mut Engine, blocks: usize) -> BufferSink {
        let mut sink = BufferSink::new();
        for _ in 0..blocks {
            engine.process_block(&mut sink).unwrap();
        }
        sink
    }

    #[test]
    fn test_master_follows_the_patch() {
        let mut patch = Patch::default();
        patch
            .stage(5, StageKind::Voice, "organ")
            .stage(230, StageKind::Master, "master")
            .send(SendId(5), BusId(230), 1.0);
        let schedule = patch.schedule().unwrap();
        let mut engine = Engine::with_schedule(&quick(), &schedule).unwrap();

        engine.handle(organ());
        let sink = render(&mut engine, 50);

        assert!(sink.peak() > 0.0, "organ should reach master 230");
    }

    #[test]
    fn test_reset_restores_patch_levels() {
        let mut engine = Engine::new(&quick()).unwrap();
        let before = engine.mixer().level(SendId(13), REVERB_BUS);
        engine.handle(SynthMessage::SetLevel {
            send: SendId(13),
            bus: REVERB_BUS,
            gain: 0.0,
        });
        engine.handle(SynthMessage::SetLevel {
            send: SendId(13),
            bus: BusId(230),
            gain: 1.0,
        });

        engine.reset();

        assert_eq!(engine.mixer().level(SendId(13), REVERB_BUS), before);
        assert_eq!(engine.mixer().level(SendId(13), BusId(230)), 0.0);
        assert_eq!(engine.mixer().level(SendId(13), MASTER_BUS), 1.0);
    }

    #[test]
    fn test_block_path_keeps_the_patch_busses() {
        let mut engine = Engine::new(&quick()).unwrap();
        let busses: Vec<BusId> = engine.mixer().bus_ids().collect();
        engine.handle(SynthMessage::SetLevel {
            send: SendId(5),
            bus: BusId(230),
            gain: 1.0,
        });
        engine.handle(organ());

        render(&mut engine, 20);

        let after: Vec<BusId> = engine.mixer().bus_ids().collect();
        assert_eq!(after, busses, "no bus allocated while rendering");
    }

    #[test]
    fn test_master_state_after_a_block() {
        let mut engine = Engine::new(&quick()).unwrap();
        assert_eq!(engine.master_state(), MasterState::Idle);

        render(&mut engine, 1);

        assert_eq!(engine.master_state(), MasterState::Clear);
    }
}
