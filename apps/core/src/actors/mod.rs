//! # Actors
//!
//! Long-running collaborators around the brain.
//!
//! - `speech`: the serialized text-to-speech queue and its worker thread
//! - `voice`: microphone capture and speech-to-text
//! - `supervisor`: the `Assistant` facade consumed by the shell
//! - `traits`: backend seams (`SpeechSynthesizer`, `Microphone`, `Transcriber`)
//! - `messages`: errors and messages shared by the above

pub mod messages;
pub mod speech;
pub mod supervisor;
pub mod traits;
pub mod voice;
