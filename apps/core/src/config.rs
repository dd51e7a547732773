//! Runtime configuration from environment variables (optionally seeded by `.env`).

use crate::error::AppError;
use crate::fs_manager::PortablePathManager;
use serde::Serialize;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use validator::Validate;

pub const DEFAULT_SPEECH_RATE: u32 = 150;
pub const DEFAULT_RECORDER: &str = "rec";
pub const DEFAULT_STT_URL: &str = "http://127.0.0.1:8080/inference";
pub const DEFAULT_STT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CALIBRATION_MS: u64 = 1000;

/// Assistant settings. Every field has a working default.
#[derive(Debug, Clone, Serialize, Validate)]
pub struct AppConfig {
    /// Directory holding `first_aid.txt`, `keywords.txt` and `small_talk.txt`.
    pub data_dir: PathBuf,
    /// Speaking rate in words per minute.
    #[validate(range(min = 80, max = 400))]
    pub speech_rate: u32,
    /// TTS program to use instead of auto-detection.
    pub tts_program: Option<String>,
    #[validate(length(min = 1))]
    pub recorder_program: String,
    /// whisper.cpp-compatible transcription endpoint.
    #[validate(url)]
    pub stt_url: String,
    #[validate(range(min = 1, max = 300))]
    pub stt_timeout_secs: u64,
    /// Ambient-noise calibration window before each capture.
    #[validate(range(min = 100, max = 5000))]
    pub calibration_ms: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: PortablePathManager::data_dir(),
            speech_rate: DEFAULT_SPEECH_RATE,
            tts_program: None,
            recorder_program: DEFAULT_RECORDER.to_string(),
            stt_url: DEFAULT_STT_URL.to_string(),
            stt_timeout_secs: DEFAULT_STT_TIMEOUT_SECS,
            calibration_ms: DEFAULT_CALIBRATION_MS,
        }
    }
}

impl AppConfig {
    /// Loads `.env` if present, then reads the environment.
    pub fn load() -> Result<Self, AppError> {
        dotenv::dotenv().ok();
        Self::from_env()
    }

    /// Reads `FIRSTAID_*` variables over the defaults and validates the result.
    pub fn from_env() -> Result<Self, AppError> {
        let defaults = Self::default();
        let config = Self {
            data_dir: var("FIRSTAID_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            speech_rate: parse_var("FIRSTAID_SPEECH_RATE", defaults.speech_rate)?,
            tts_program: var("FIRSTAID_TTS_PROGRAM"),
            recorder_program: var("FIRSTAID_RECORDER").unwrap_or(defaults.recorder_program),
            stt_url: var("FIRSTAID_STT_URL").unwrap_or(defaults.stt_url),
            stt_timeout_secs: parse_var("FIRSTAID_STT_TIMEOUT_SECS", defaults.stt_timeout_secs)?,
            calibration_ms: parse_var("FIRSTAID_CALIBRATION_MS", defaults.calibration_ms)?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn stt_timeout(&self) -> Duration {
        Duration::from_secs(self.stt_timeout_secs)
    }

    pub fn calibration_window(&self) -> Duration {
        Duration::from_millis(self.calibration_ms)
    }
}

/// Non-empty, trimmed value of an environment variable.
fn var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_var<T: FromStr>(name: &str, default: T) -> Result<T, AppError> {
    match var(name) {
        Some(raw) => raw
            .parse()
            .map_err(|_| AppError::Config(format!("{} must be a number, got {:?}", name, raw))),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VARS: [&str; 7] = [
        "FIRSTAID_DATA_DIR",
        "FIRSTAID_SPEECH_RATE",
        "FIRSTAID_TTS_PROGRAM",
        "FIRSTAID_RECORDER",
        "FIRSTAID_STT_URL",
        "FIRSTAID_STT_TIMEOUT_SECS",
        "FIRSTAID_CALIBRATION_MS",
    ];

    fn with_env<R>(set: &[(&str, &str)], f: impl FnOnce() -> R) -> R {
        let kvs: Vec<(&str, Option<&str>)> = VARS
            .iter()
            .map(|name| {
                let value = set.iter().find(|(k, _)| k == name).map(|(_, v)| *v);
                (*name, value)
            })
            .collect();
        temp_env::with_vars(kvs, f)
    }

    #[test]
    fn test_defaults() {
        let config = with_env(&[], AppConfig::from_env).unwrap();
        assert_eq!(config.speech_rate, 150);
        assert_eq!(config.recorder_program, "rec");
        assert_eq!(config.stt_url, DEFAULT_STT_URL);
        assert_eq!(config.tts_program, None);
        assert_eq!(config.calibration_window(), Duration::from_secs(1));
        assert!(config.data_dir.ends_with("data"));
    }

    #[test]
    fn test_overrides() {
        let config = with_env(
            &[
                ("FIRSTAID_DATA_DIR", "/tmp/firstaid"),
                ("FIRSTAID_SPEECH_RATE", "180"),
                ("FIRSTAID_TTS_PROGRAM", "espeak"),
                ("FIRSTAID_STT_URL", "http://localhost:9000/inference"),
            ],
            AppConfig::from_env,
        )
        .unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/tmp/firstaid"));
        assert_eq!(config.speech_rate, 180);
        assert_eq!(config.tts_program.as_deref(), Some("espeak"));
        assert_eq!(config.stt_url, "http://localhost:9000/inference");
    }

    #[test]
    fn test_blank_values_fall_back_to_defaults() {
        let config = with_env(&[("FIRSTAID_TTS_PROGRAM", "  ")], AppConfig::from_env).unwrap();
        assert_eq!(config.tts_program, None);
    }

    #[test]
    fn test_non_numeric_rate_is_config_error() {
        let err = with_env(&[("FIRSTAID_SPEECH_RATE", "fast")], AppConfig::from_env).unwrap_err();
        assert!(matches!(err, AppError::Config(msg) if msg.contains("FIRSTAID_SPEECH_RATE")));
    }

    #[test]
    fn test_out_of_range_rate_fails_validation() {
        let err = with_env(&[("FIRSTAID_SPEECH_RATE", "5")], AppConfig::from_env).unwrap_err();
        assert!(matches!(err, AppError::Config(msg) if msg.contains("speech_rate")));
    }

    #[test]
    fn test_invalid_url_fails_validation() {
        let err = with_env(&[("FIRSTAID_STT_URL", "not a url")], AppConfig::from_env).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }
}
