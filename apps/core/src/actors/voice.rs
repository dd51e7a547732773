use crate::actors::messages::{AudioClip, NoiseProfile, VoiceError};
use crate::actors::traits::{Microphone, Transcriber};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use std::process::Command;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

// --- Constants ---
const SAMPLE_RATE: u32 = 16_000;
const SAMPLE_RATE_ARG: &str = "16000";
/// Multiplier applied to the ambient RMS to get the silence threshold.
const NOISE_MULTIPLIER: f32 = 1.5;
const MIN_THRESHOLD_PERCENT: f32 = 0.5;
const MAX_THRESHOLD_PERCENT: f32 = 20.0;
/// Trailing silence that ends an utterance.
const END_OF_SPEECH_SECS: &str = "1.5";
const MAX_UTTERANCE_SECS: &str = "30";

pub const CAPTURE_IN_PROGRESS: &str = "a voice capture is already in progress";

/// The voice input adapter: calibrate, capture one utterance, transcribe.
///
/// Only one capture runs at a time; the microphone is a single shared device.
#[derive(Clone)]
pub struct VoiceCapture {
    microphone: Arc<dyn Microphone>,
    transcriber: Arc<dyn Transcriber>,
    calibration: Duration,
    busy: Arc<AtomicBool>,
}

impl VoiceCapture {
    pub fn new(
        microphone: Arc<dyn Microphone>,
        transcriber: Arc<dyn Transcriber>,
        calibration: Duration,
    ) -> Self {
        Self {
            microphone,
            transcriber,
            calibration,
            busy: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Listens on `device_index` (0 = system default) and returns the transcript.
    ///
    /// Recording runs on the blocking pool; transcription is awaited on the runtime.
    #[instrument(skip(self))]
    pub async fn listen(&self, device_index: usize) -> Result<String, VoiceError> {
        let _guard = CaptureGuard::acquire(&self.busy)
            .ok_or_else(|| VoiceError::Device(CAPTURE_IN_PROGRESS.to_string()))?;

        let device = (device_index != 0).then_some(device_index);
        let microphone = Arc::clone(&self.microphone);
        let window = self.calibration;

        let clip = tokio::task::spawn_blocking(move || {
            let noise = microphone.calibrate(device, window)?;
            debug!(
                rms = noise.rms,
                threshold = noise.threshold_percent,
                "Ambient noise calibrated"
            );
            microphone.capture(device, &noise)
        })
        .await
        .map_err(|e| VoiceError::Device(format!("capture task failed: {}", e)))??;

        let text = self.transcriber.transcribe(clip).await?;
        info!("Transcribed utterance: {}", text);
        Ok(text)
    }

    pub fn is_capturing(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

/// Holds the single-capture flag for the lifetime of one `listen` call.
struct CaptureGuard {
    flag: Arc<AtomicBool>,
}

impl CaptureGuard {
    fn acquire(flag: &Arc<AtomicBool>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self {
                flag: Arc::clone(flag),
            })
    }
}

impl Drop for CaptureGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Records through SoX `rec` as 16-bit mono PCM.
///
/// A device index selects ALSA card `hw:<index>` through `AUDIODEV`.
#[derive(Debug, Clone)]
pub struct SoxMicrophone {
    program: String,
}

impl SoxMicrophone {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn command(&self, device: Option<usize>) -> Command {
        let mut cmd = Command::new(&self.program);
        if let Some(index) = device {
            cmd.env("AUDIODEV", format!("hw:{}", index));
        }
        cmd.args([
            "-q",
            "-c",
            "1",
            "-r",
            SAMPLE_RATE_ARG,
            "-b",
            "16",
            "-e",
            "signed-integer",
            "-t",
            "raw",
            "-",
        ]);
        cmd
    }

    fn record(&self, mut cmd: Command) -> Result<Vec<u8>, VoiceError> {
        let output = cmd
            .output()
            .map_err(|e| VoiceError::Device(format!("cannot start {}: {}", self.program, e)))?;
        if !output.status.success() {
            return Err(VoiceError::Device(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(output.stdout)
    }
}

impl Microphone for SoxMicrophone {
    fn calibrate(&self, device: Option<usize>, window: Duration) -> Result<NoiseProfile, VoiceError> {
        let mut cmd = self.command(device);
        let seconds = format!("{:.2}", window.as_secs_f32());
        cmd.args(["trim", "0", seconds.as_str()]);
        let pcm = self.record(cmd)?;
        Ok(noise_profile(&pcm))
    }

    fn capture(&self, device: Option<usize>, noise: &NoiseProfile) -> Result<AudioClip, VoiceError> {
        let threshold = format!("{:.1}%", noise.threshold_percent);
        let mut cmd = self.command(device);
        cmd.args([
            "silence",
            "1",
            "0.1",
            threshold.as_str(),
            "1",
            END_OF_SPEECH_SECS,
            threshold.as_str(),
            "trim",
            "0",
            MAX_UTTERANCE_SECS,
        ]);
        let pcm = self.record(cmd)?;
        if pcm.is_empty() {
            return Err(VoiceError::Unintelligible);
        }
        Ok(AudioClip {
            wav: wav_from_pcm16(&pcm, SAMPLE_RATE),
            sample_rate: SAMPLE_RATE,
        })
    }
}

/// Root-mean-square level of little-endian 16-bit samples, `0.0..=1.0`.
pub fn pcm16_rms(pcm: &[u8]) -> f32 {
    let samples = pcm.chunks_exact(2).len();
    if samples == 0 {
        return 0.0;
    }
    let sum: f64 = pcm
        .chunks_exact(2)
        .map(|b| {
            let s = i16::from_le_bytes([b[0], b[1]]) as f64 / 32768.0;
            s * s
        })
        .sum();
    (sum / samples as f64).sqrt() as f32
}

pub fn noise_profile(pcm: &[u8]) -> NoiseProfile {
    let rms = pcm16_rms(pcm);
    NoiseProfile {
        rms,
        threshold_percent: (rms * 100.0 * NOISE_MULTIPLIER)
            .clamp(MIN_THRESHOLD_PERCENT, MAX_THRESHOLD_PERCENT),
    }
}

/// Wraps mono 16-bit PCM in a canonical 44-byte WAV header.
pub fn wav_from_pcm16(pcm: &[u8], sample_rate: u32) -> Vec<u8> {
    let data_len = pcm.len() as u32;
    let byte_rate = sample_rate * 2;
    let mut wav = Vec::with_capacity(44 + pcm.len());
    wav.extend_from_slice(b"RIFF");
    wav.extend_from_slice(&(36 + data_len).to_le_bytes());
    wav.extend_from_slice(b"WAVEfmt ");
    wav.extend_from_slice(&16u32.to_le_bytes()); // fmt chunk size
    wav.extend_from_slice(&1u16.to_le_bytes()); // PCM
    wav.extend_from_slice(&1u16.to_le_bytes()); // mono
    wav.extend_from_slice(&sample_rate.to_le_bytes());
    wav.extend_from_slice(&byte_rate.to_le_bytes());
    wav.extend_from_slice(&2u16.to_le_bytes()); // block align
    wav.extend_from_slice(&16u16.to_le_bytes()); // bits per sample
    wav.extend_from_slice(b"data");
    wav.extend_from_slice(&data_len.to_le_bytes());
    wav.extend_from_slice(pcm);
    wav
}

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    text: String,
}

/// Speech-to-text through a local whisper.cpp-compatible `/inference` endpoint.
#[derive(Debug, Clone)]
pub struct WhisperTranscriber {
    client: Client,
    endpoint: String,
}

impl WhisperTranscriber {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl Transcriber for WhisperTranscriber {
    async fn transcribe(&self, clip: AudioClip) -> Result<String, VoiceError> {
        debug!(
            bytes = clip.wav.len(),
            sample_rate = clip.sample_rate,
            "Sending utterance for transcription"
        );
        let part = Part::bytes(clip.wav)
            .file_name("utterance.wav")
            .mime_str("audio/wav")
            .map_err(|e| VoiceError::ServiceUnavailable(e.to_string()))?;
        let form = Form::new()
            .part("file", part)
            .text("response_format", "json")
            .text("temperature", "0.0");

        let response = self
            .client
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                warn!("Transcription request failed: {}", e);
                VoiceError::ServiceUnavailable(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(VoiceError::ServiceUnavailable(format!(
                "transcription service returned {}",
                status
            )));
        }

        let body: TranscriptionResponse = response
            .json()
            .await
            .map_err(|e| VoiceError::ServiceUnavailable(format!("invalid response: {}", e)))?;

        let text = body.text.trim();
        // whisper reports silence as a bracketed marker such as [BLANK_AUDIO]
        if text.is_empty() || (text.starts_with('[') && text.ends_with(']')) {
            return Err(VoiceError::Unintelligible);
        }
        Ok(text.to_string())
    }
}
