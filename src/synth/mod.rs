// Purpose: note lifecycle and control messages
// This layer sits above graph nodes: one Voice per sounding note

pub mod factory;
pub mod message;
pub mod voice;
