//! Offline rendering of a score through the engine.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use thiserror::Error;
use tracing::{info, warn};

use crate::{
    config::{ConfigError, OrchestraConfig},
    engine::{Engine, EngineError},
    io::{AudioSink, SinkError},
    score::{Score, ScoreError},
};

#[derive(Debug, Error)]
pub enum RenderError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Score(#[from] ScoreError),
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error("sink: {0}")]
    Sink(#[from] SinkError),
}

/// Cancels a render between blocks. Cloning shares the flag.
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderSummary {
    pub frames: u64,
    pub seconds: f32,
    /// Cut short by a [`StopHandle`]; the sink was not finished.
    pub stopped: bool,
}

pub struct Renderer {
    engine: Engine,
    tail_secs: f32,
    stop: StopHandle,
}

impl Renderer {
    pub fn new(config: &OrchestraConfig) -> Result<Self, RenderError> {
        Ok(Self {
            engine: Engine::new(config)?,
            tail_secs: config.tail_secs,
            stop: StopHandle::new(),
        })
    }

    /// Seconds rendered after the score's last note has finished.
    pub fn with_tail(mut self, seconds: f32) -> Self {
        self.tail_secs = seconds.max(0.0);
        self
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut Engine {
        &mut self.engine
    }

    /// Frames a render of `score` will produce, whole blocks.
    pub fn total_frames(&self, score: &Score) -> u64 {
        let block = self.engine.block_size() as u64;
        let seconds = score.duration() + self.tail_secs;
        let frames = (seconds * self.engine.sample_rate()).ceil() as u64;
        frames.div_ceil(block) * block
    }

    /// Play `score` from the top into `sink`, then finish the sink.
    ///
    /// A stop request ends the render at the next block boundary and throws
    /// away everything still pending.
    pub fn render<S: AudioSink + ?Sized>(
        &mut self,
        score: &Score,
        sink: &mut S,
    ) -> Result<RenderSummary, RenderError> {
        score.validate()?;
        let total = self.total_frames(score);

        self.engine.reset();
        self.engine.set_total_frames(Some(total));
        self.engine.schedule_score(score);
        info!(
            frames = total,
            seconds = total as f32 / self.engine.sample_rate(),
            notes = score.notes.len(),
            "render started"
        );

        let mut stopped = false;
        while self.engine.frame() < total {
            if self.stop.is_stopped() {
                stopped = true;
                break;
            }
            self.engine.process_block(sink)?;
        }

        let frames = self.engine.frame();
        if stopped {
            warn!(frames, "render stopped");
            self.engine.reset();
        } else {
            sink.finish()?;
            info!(frames, "render finished");
        }

        Ok(RenderSummary {
            frames,
            seconds: frames as f32 / self.engine.sample_rate(),
            stopped,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::ReverbConfig, io::BufferSink, score::NoteEvent};

    fn quick() -> OrchestraConfig {
        OrchestraConfig {
            sample_rate: 8_000.0,
            block_size: 64,
            tail_secs: 0.1,
            reverb: ReverbConfig {
                cutoff_hz: 3_000.0,
                ..ReverbConfig::default()
            },
            ..OrchestraConfig::default()
        }
    }

    #[test]
    fn test_length_is_score_plus_tail_in_whole_blocks() {
        let renderer = Renderer::new(&quick()).unwrap();
        let score = Score::new().note(NoteEvent::new(13, 0.0, 0.1, 60.0, 80.0));

        // .002 + .1 + .05 + .1 tail = .252 s = 2016 frames -> 32 blocks
        assert_eq!(renderer.total_frames(&score), 2_048);
    }

    #[test]
    fn test_render_fills_sink() {
        let mut renderer = Renderer::new(&quick()).unwrap();
        let score = Score::new().note(NoteEvent::new(16, 0.0, 0.1, 60.0, 100.0));
        let mut sink = BufferSink::new();

        let summary = renderer.render(&score, &mut sink).unwrap();

        assert!(!summary.stopped);
        assert_eq!(summary.frames, sink.frames() as u64);
        assert!(sink.peak() > 0.0, "note should be audible");
    }

    #[test]
    fn test_stop_before_start_renders_nothing() {
        let mut renderer = Renderer::new(&quick()).unwrap();
        renderer.stop_handle().stop();
        let score = Score::new().note(NoteEvent::new(5, 0.0, 1.0, 60.0, 80.0));
        let mut sink = BufferSink::new();

        let summary = renderer.render(&score, &mut sink).unwrap();

        assert!(summary.stopped);
        assert_eq!(sink.frames(), 0);
    }
}
