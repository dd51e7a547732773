use serde::Serialize;

/// Failures of the voice input path. All are recoverable and reported to the shell.
#[derive(Debug, thiserror::Error, Serialize, Clone, PartialEq, Eq)]
pub enum VoiceError {
    /// Audio was captured but no words could be recognized.
    #[error("Could not understand audio.")]
    Unintelligible,
    /// The speech-to-text service could not be reached or answered badly.
    #[error("Speech recognition error: {0}")]
    ServiceUnavailable(String),
    /// Microphone or recorder failure.
    #[error("Mic error: {0}")]
    Device(String),
}

impl VoiceError {
    /// The status line shown in the conversation log.
    pub fn status_line(&self) -> String {
        match self {
            VoiceError::Unintelligible => "Could not understand audio.".to_string(),
            VoiceError::ServiceUnavailable(_) => "Speech recognition error.".to_string(),
            VoiceError::Device(message) => format!("Mic error: {}", message),
        }
    }
}

/// Failures of the text-to-speech path.
#[derive(Debug, thiserror::Error, Serialize, Clone, PartialEq, Eq)]
pub enum SpeechError {
    /// One utterance failed to synthesize or play. The queue moves on.
    #[error("Speech synthesis failed: {0}")]
    Synthesis(String),
    /// No text-to-speech program is available.
    #[error("Text-to-speech unavailable: {0}")]
    Unavailable(String),
    /// The speech worker has stopped and no longer accepts requests.
    #[error("Speech queue is closed")]
    QueueClosed,
    /// The speech worker thread panicked outside a synthesis call.
    #[error("Speech worker panicked")]
    WorkerPanicked,
}

/// One utterance waiting in the speech queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechRequest {
    /// Enqueue sequence number, starting at 1.
    pub id: u64,
    pub text: String,
}

/// Messages consumed by the speech worker.
#[derive(Debug)]
pub enum SpeechMessage {
    /// Synthesize and play one utterance.
    Speak(SpeechRequest),
    /// Finish the current utterance and exit. Anything queued earlier is played first.
    Shutdown,
}

/// Captured microphone audio.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioClip {
    /// WAV-encoded bytes.
    pub wav: Vec<u8>,
    pub sample_rate: u32,
}

/// Ambient noise level measured before a capture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoiseProfile {
    /// RMS of the calibration window, `0.0..=1.0` of full scale.
    pub rms: f32,
    /// Silence threshold handed to the recorder, in percent of full scale.
    pub threshold_percent: f32,
}
