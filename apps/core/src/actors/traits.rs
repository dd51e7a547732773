use crate::actors::messages::{AudioClip, NoiseProfile, SpeechError, VoiceError};
use async_trait::async_trait;
use std::time::Duration;

/// Defines the text-to-speech backend driven by the speech worker.
///
/// `speak` blocks the calling thread until the utterance has finished playing,
/// which is why it only ever runs on the dedicated worker thread.
pub trait SpeechSynthesizer: Send + 'static {
    /// Synthesizes and plays `text` at `rate` words per minute.
    fn speak(&mut self, text: &str, rate: u32) -> Result<(), SpeechError>;
}

/// Defines the microphone backend used by the voice adapter.
///
/// Both calls block on audio I/O and run on the blocking thread pool.
/// `device` is `None` for the system default input.
pub trait Microphone: Send + Sync + 'static {
    /// Listens to the room for `window` and measures its noise level.
    fn calibrate(&self, device: Option<usize>, window: Duration) -> Result<NoiseProfile, VoiceError>;

    /// Records a single utterance, stopping once speech is followed by silence.
    fn capture(&self, device: Option<usize>, noise: &NoiseProfile) -> Result<AudioClip, VoiceError>;
}

/// Defines the speech-to-text collaborator.
#[async_trait]
pub trait Transcriber: Send + Sync + 'static {
    /// Turns captured audio into text.
    async fn transcribe(&self, clip: AudioClip) -> Result<String, VoiceError>;
}
