// Text-generation side of crease: the streaming Claude client, prompt
// templates and insight request composition.

pub mod client;
pub mod error;
pub mod event;
pub mod prompt;
pub mod request;
