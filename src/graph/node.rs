use crate::io::converter::key_to_frequency;

/// Context passed to graph nodes during rendering
///
/// Contains information about what to render:
/// - sample_rate: Audio sample rate (e.g., 44100.0)
/// - frequency: Pitch to render (Hz)
/// - amplitude: Linear peak amplitude of the note (already scaled by velocity)
/// - duration: Written length of the note in seconds, 0.0 when held
#[derive(Debug, Clone, Copy)]
pub struct RenderCtx {
    pub sample_rate: f32,
    pub frequency: f32,
    pub amplitude: f32,
    pub duration: f32,
}

impl RenderCtx {
    /// Create context from a (possibly fractional) MIDI key
    pub fn from_note(sample_rate: f32, key: f32, amplitude: f32) -> Self {
        Self::from_freq(sample_rate, key_to_frequency(key), amplitude)
    }

    /// Create context from direct frequency
    pub fn from_freq(sample_rate: f32, frequency: f32, amplitude: f32) -> Self {
        Self {
            sample_rate,
            frequency,
            amplitude,
            duration: 0.0,
        }
    }

    pub fn with_duration(mut self, seconds: f32) -> Self {
        self.duration = seconds.max(0.0);
        self
    }
}

/// Core trait for audio processing graph nodes
///
/// Nodes can render audio and respond to note events. Every node is mono;
/// panning to the busses happens in the voice that owns the graph.
pub trait GraphNode: Send {
    fn render_block(&mut self, out: &mut [f32], ctx: &RenderCtx);

    /// Triggered when a note starts
    ///
    /// Default implementation does nothing (stateless sources).
    fn note_on(&mut self, _ctx: &RenderCtx) {}

    /// Triggered when a note is released
    ///
    /// Default implementation does nothing.
    fn note_off(&mut self, _ctx: &RenderCtx) {}

    fn get_envelope_level(&self) -> Option<f32> {
        None
    }

    /// Check if this node is still producing sound
    ///
    /// Used by voice management to know when a voice can be freed.
    fn is_active(&self) -> bool {
        true
    }
}

/// Allow boxed graph nodes to be used as graph nodes (for dynamic dispatch)
impl GraphNode for Box<dyn GraphNode> {
    fn render_block(&mut self, out: &mut [f32], ctx: &RenderCtx) {
        (**self).render_block(out, ctx)
    }

    fn note_on(&mut self, ctx: &RenderCtx) {
        (**self).note_on(ctx)
    }

    fn note_off(&mut self, ctx: &RenderCtx) {
        (**self).note_off(ctx)
    }

    fn get_envelope_level(&self) -> Option<f32> {
        (**self).get_envelope_level()
    }

    fn is_active(&self) -> bool {
        (**self).is_active()
    }
}
