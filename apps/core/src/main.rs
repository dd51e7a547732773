// Smart First-Aid Assistant entry point
// Loads the knowledge base, starts the speech worker and runs the terminal shell.

mod actors;
mod brain;
mod config;
mod error;
mod fs_manager;
mod input;
mod preflight;
mod shell;

#[cfg(test)]
mod tests;

use actors::speech::{CommandSynthesizer, MutedSynthesizer, SpeechQueue};
use actors::supervisor::Assistant;
use actors::traits::SpeechSynthesizer;
use actors::voice::{SoxMicrophone, VoiceCapture, WhisperTranscriber};
use brain::KnowledgeStore;
use config::AppConfig;
use error::AppError;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::BufReader;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    // Logs go to stderr so they never interleave with the conversation on stdout.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// How long shutdown waits for blocking work such as an unfinished recording.
const SHUTDOWN_GRACE: Duration = Duration::from_millis(500);

fn main() -> anyhow::Result<()> {
    init_tracing();
    block_on_runtime(run(), SHUTDOWN_GRACE)?
}

/// Drives `future` on a multi-threaded runtime, then shuts the runtime down.
///
/// Blocking tasks still running after `grace` are abandoned rather than joined.
fn block_on_runtime<F: Future>(future: F, grace: Duration) -> std::io::Result<F::Output> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let output = runtime.block_on(future);
    runtime.shutdown_timeout(grace);
    Ok(output)
}

async fn run() -> anyhow::Result<()> {
    let config = AppConfig::load()?;
    info!(data_dir = %config.data_dir.display(), "Configuration loaded");

    let report = preflight::run_preflight_checks(&config);
    if !report.ready_to_start {
        error!("{}", report.summary);
    } else if !report.all_passed {
        let failed: Vec<&str> = report
            .checks
            .iter()
            .filter(|c| !c.passed)
            .map(|c| c.name.as_str())
            .collect();
        warn!(failed = ?failed, "{}", report.summary);
    }

    // A malformed knowledge base is fatal.
    let store = match KnowledgeStore::load_from_dir(&config.data_dir) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            error!("Failed to load knowledge base: {}", e);
            return Err(e.into());
        }
    };
    info!(topics = store.topics().count(), "Knowledge base loaded");

    let synthesizer: Box<dyn SpeechSynthesizer> =
        match CommandSynthesizer::discover(config.tts_program.as_deref()) {
            Ok(synth) => Box::new(synth),
            Err(e) => {
                warn!("{}. Answers will only be shown on screen.", e);
                Box::new(MutedSynthesizer)
            }
        };
    let speech = SpeechQueue::start(synthesizer, config.speech_rate)?;

    let transcriber =
        WhisperTranscriber::new(config.stt_url.clone(), config.stt_timeout()).map_err(AppError::from)?;
    let voice = VoiceCapture::new(
        Arc::new(SoxMicrophone::new(config.recorder_program.clone())),
        Arc::new(transcriber),
        config.calibration_window(),
    );

    let assistant = Assistant::new(store, speech.handle(), voice);
    let stdin = BufReader::new(tokio::io::stdin());
    let log = shell::run(assistant, stdin, std::io::stdout()).await;
    info!(entries = log.entries().len(), "Session ended");

    info!("Shutting down, finishing queued speech");
    tokio::task::spawn_blocking(move || speech.stop()).await??;
    Ok(())
}
