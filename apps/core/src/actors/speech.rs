use crate::actors::messages::{SpeechError, SpeechMessage, SpeechRequest};
use crate::actors::traits::SpeechSynthesizer;
use std::io::Write;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::{Arc, Mutex};
use std::thread;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Programs tried, in order, when no TTS program is configured.
const TTS_CANDIDATES: &[&str] = &["espeak-ng", "espeak", "say"];

/// A cloneable producer side of the speech queue.
///
/// Enqueueing never blocks: the channel is unbounded and all waiting happens
/// on the worker thread.
#[derive(Clone)]
pub struct SpeechHandle {
    sender: mpsc::UnboundedSender<SpeechMessage>,
    /// Last issued request id. Held across the send so ids follow channel order.
    last_id: Arc<Mutex<u64>>,
}

impl SpeechHandle {
    /// Appends `text` to the queue and returns its sequence number.
    pub fn enqueue(&self, text: impl Into<String>) -> Result<u64, SpeechError> {
        let mut last_id = self.last_id.lock().map_err(|_| SpeechError::QueueClosed)?;
        let id = *last_id + 1;
        self.sender
            .send(SpeechMessage::Speak(SpeechRequest {
                id,
                text: text.into(),
            }))
            .map_err(|_| SpeechError::QueueClosed)?;
        *last_id = id;
        Ok(id)
    }

    fn shutdown(&self) -> bool {
        self.sender.send(SpeechMessage::Shutdown).is_ok()
    }
}

/// Owner of the single speech worker thread.
pub struct SpeechQueue {
    handle: SpeechHandle,
    worker: Option<thread::JoinHandle<()>>,
}

impl SpeechQueue {
    /// Spawns the speech worker and returns the queue that owns it.
    ///
    /// # Arguments
    ///
    /// * `synthesizer` - The blocking text-to-speech backend.
    /// * `rate` - Speaking rate in words per minute, passed on every call.
    pub fn start(synthesizer: Box<dyn SpeechSynthesizer>, rate: u32) -> Result<Self, SpeechError> {
        let (sender, receiver) = mpsc::unbounded_channel();
        let worker = SpeechWorker::new(receiver, synthesizer, rate);
        let join = thread::Builder::new()
            .name("speech-worker".to_string())
            .spawn(move || worker.run())
            .map_err(|e| SpeechError::Unavailable(format!("cannot spawn speech worker: {}", e)))?;

        Ok(Self {
            handle: SpeechHandle {
                sender,
                last_id: Arc::new(Mutex::new(0)),
            },
            worker: Some(join),
        })
    }

    pub fn handle(&self) -> SpeechHandle {
        self.handle.clone()
    }

    #[allow(dead_code)]
    pub fn enqueue(&self, text: impl Into<String>) -> Result<u64, SpeechError> {
        self.handle.enqueue(text)
    }

    /// Queues a shutdown behind everything already enqueued and waits for the worker to exit.
    ///
    /// The utterance in flight and every request enqueued before this call are played.
    pub fn stop(mut self) -> Result<(), SpeechError> {
        if !self.handle.shutdown() {
            warn!("Speech worker already gone before shutdown");
        }
        match self.worker.take() {
            Some(join) => join.join().map_err(|_| SpeechError::WorkerPanicked),
            None => Ok(()),
        }
    }
}

impl Drop for SpeechQueue {
    fn drop(&mut self) {
        // Dropped without stop(): let the worker drain and exit on its own.
        if self.worker.is_some() {
            self.handle.shutdown();
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WorkerState {
    Idle,
    Speaking(u64),
}

// --- Worker (Internal Logic) ---
struct SpeechWorker {
    receiver: mpsc::UnboundedReceiver<SpeechMessage>,
    synthesizer: Box<dyn SpeechSynthesizer>,
    rate: u32,
    state: WorkerState,
}

impl SpeechWorker {
    fn new(
        receiver: mpsc::UnboundedReceiver<SpeechMessage>,
        synthesizer: Box<dyn SpeechSynthesizer>,
        rate: u32,
    ) -> Self {
        Self {
            receiver,
            synthesizer,
            rate,
            state: WorkerState::Idle,
        }
    }

    fn run(mut self) {
        info!("Speech worker started (rate {} wpm)", self.rate);
        while let Some(msg) = self.receiver.blocking_recv() {
            match msg {
                SpeechMessage::Speak(request) => self.play(request),
                SpeechMessage::Shutdown => {
                    info!("Speech worker shutting down...");
                    break;
                }
            }
        }
        info!("Speech worker stopped");
    }

    fn play(&mut self, request: SpeechRequest) {
        self.set_state(WorkerState::Speaking(request.id));

        let rate = self.rate;
        let synthesizer = &mut self.synthesizer;
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| synthesizer.speak(&request.text, rate)));
        match outcome {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!(request_id = request.id, "Skipping utterance: {}", e),
            Err(_) => error!(request_id = request.id, "Synthesizer panicked, skipping utterance"),
        }

        self.set_state(WorkerState::Idle);
    }

    fn set_state(&mut self, state: WorkerState) {
        debug!(from = ?self.state, to = ?state, "Speech worker state");
        self.state = state;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TtsFlavor {
    /// espeak / espeak-ng: `-s <wpm> --stdin`
    Espeak,
    /// macOS say: `-r <wpm> -f -`
    Say,
}

/// Speaks through a system text-to-speech program, one process per utterance.
///
/// Text is written to the program's stdin so it is never parsed as options.
#[derive(Debug, Clone)]
pub struct CommandSynthesizer {
    program: PathBuf,
    flavor: TtsFlavor,
}

impl CommandSynthesizer {
    /// Finds a TTS program on `PATH`: the configured one, or the first known candidate.
    pub fn discover(preferred: Option<&str>) -> Result<Self, SpeechError> {
        let candidates: Vec<&str> = match preferred {
            Some(name) => vec![name],
            None => TTS_CANDIDATES.to_vec(),
        };

        for name in &candidates {
            if let Ok(path) = which::which(name) {
                info!("Using text-to-speech program {:?}", path);
                return Ok(Self::new(path));
            }
        }

        Err(SpeechError::Unavailable(format!(
            "none of {:?} found in PATH",
            candidates
        )))
    }

    pub fn new(program: PathBuf) -> Self {
        let flavor = match program.file_stem().and_then(|s| s.to_str()) {
            Some("say") => TtsFlavor::Say,
            _ => TtsFlavor::Espeak,
        };
        Self { program, flavor }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    fn args(&self, rate: u32) -> Vec<String> {
        match self.flavor {
            TtsFlavor::Espeak => vec!["-s".to_string(), rate.to_string(), "--stdin".to_string()],
            TtsFlavor::Say => vec![
                "-r".to_string(),
                rate.to_string(),
                "-f".to_string(),
                "-".to_string(),
            ],
        }
    }
}

impl SpeechSynthesizer for CommandSynthesizer {
    fn speak(&mut self, text: &str, rate: u32) -> Result<(), SpeechError> {
        let mut child = Command::new(&self.program)
            .args(self.args(rate))
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| SpeechError::Synthesis(format!("failed to start {:?}: {}", self.program, e)))?;

        // stdin is closed at the end of this block so the program sees EOF
        let sent = match child.stdin.take() {
            Some(mut stdin) => stdin.write_all(text.as_bytes()),
            None => Ok(()),
        };

        // Always reap the child, even when it stopped reading early.
        let output = child
            .wait_with_output()
            .map_err(|e| SpeechError::Synthesis(e.to_string()))?;
        sent.map_err(|e| SpeechError::Synthesis(format!("failed to send text: {}", e)))?;
        if !output.status.success() {
            return Err(SpeechError::Synthesis(format!(
                "{:?} exited with {}: {}",
                self.program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(())
    }
}

/// Stand-in used when no TTS program is installed; the answer is still shown on screen.
#[derive(Debug, Default)]
pub struct MutedSynthesizer;

impl SpeechSynthesizer for MutedSynthesizer {
    fn speak(&mut self, text: &str, _rate: u32) -> Result<(), SpeechError> {
        debug!(chars = text.chars().count(), "Speech muted, skipping playback");
        Ok(())
    }
}
