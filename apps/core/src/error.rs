use std::io;
use thiserror::Error;

use crate::actors::messages::{SpeechError, VoiceError};
use crate::brain::knowledge::ParseError;

/// Application-wide error type, consolidating all startup and runtime errors into a single enum.
#[derive(Debug, Error)]
pub enum AppError {
    /// A knowledge, keyword or small-talk source is malformed. Fatal at startup.
    #[error("Knowledge base error: {0}")]
    Parse(#[from] ParseError),

    /// Represents standard input/output errors.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Represents configuration-related errors (e.g., an out-of-range environment variable).
    #[error("Configuration error: {0}")]
    Config(String),

    /// Text-to-speech failures surfaced outside the speech worker.
    #[error("Speech error: {0}")]
    Speech(#[from] SpeechError),

    /// Voice capture or transcription failures.
    #[error("Voice error: {0}")]
    Voice(#[from] VoiceError),
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::Config(format!("Validation errors: {}", err))
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::Config(format!("HTTP client error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brain::knowledge::SourceKind;

    #[test]
    fn test_parse_error_converts_and_keeps_context() {
        let err: AppError = ParseError::MissingDelimiter {
            source_kind: SourceKind::Keywords,
            line: 3,
            text: "burns cool water".to_string(),
        }
        .into();

        let message = err.to_string();
        assert!(message.starts_with("Knowledge base error"));
        assert!(message.contains("keywords"));
        assert!(message.contains("line 3"));
    }

    #[test]
    fn test_voice_error_converts() {
        let err: AppError = VoiceError::Unintelligible.into();
        assert!(matches!(err, AppError::Voice(VoiceError::Unintelligible)));
    }
}
