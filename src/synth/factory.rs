use crate::graph::node::GraphNode;

/// Factory for creating the graph of one note
///
/// This is the "instrument design" layer: the sound is described once and
/// a fresh graph is built from it for every note-on.
pub trait VoiceFactory: Send + Sync {
    type Voice: GraphNode;

    fn create_voice(&self) -> Self::Voice;
}

impl<F, T> VoiceFactory for F
where
    F: Fn() -> T + Send + Sync,
    T: GraphNode,
{
    type Voice = T;

    fn create_voice(&self) -> Self::Voice {
        self()
    }
}
