use crate::actors::messages::VoiceError;
use crate::actors::speech::SpeechHandle;
use crate::actors::voice::VoiceCapture;
use crate::brain::{KnowledgeStore, Resolution, ResponseResolver};
use crate::input::UserInput;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{info, instrument, warn};

/// Shell-facing entry point for all assistant logic.
///
/// Cheap to clone: the knowledge store is shared read-only, the speech handle
/// is a channel sender and the voice adapter carries its own capture guard.
#[derive(Clone)]
pub struct Assistant {
    resolver: ResponseResolver,
    speech: SpeechHandle,
    voice: VoiceCapture,
}

impl Assistant {
    pub fn new(store: Arc<KnowledgeStore>, speech: SpeechHandle, voice: VoiceCapture) -> Self {
        Self {
            resolver: ResponseResolver::new(store),
            speech,
            voice,
        }
    }

    /// Best response for `text`. Never fails.
    #[allow(dead_code)]
    pub fn resolve(&self, text: &str) -> String {
        self.resolver.resolve(text)
    }

    #[allow(dead_code)]
    pub fn resolve_detailed(&self, text: &str) -> Resolution {
        self.resolver.resolve_detailed(text)
    }

    /// Queues `text` for playback. Failures are logged, never returned.
    pub fn speak(&self, text: &str) {
        match self.speech.enqueue(text) {
            Ok(id) => info!(request_id = id, "Queued speech"),
            Err(e) => warn!("Could not queue speech: {}", e),
        }
    }

    /// Handles one user input end to end.
    ///
    /// 1. Rejects blank input (returns `None`).
    /// 2. Resolves the text against the knowledge base.
    /// 3. Hands question and response to `display`.
    /// 4. Queues the response for speech.
    ///
    /// # Returns
    ///
    /// The response, already displayed and queued for playback.
    #[instrument(skip(self, display))]
    pub fn ask(&self, input: UserInput, display: impl FnOnce(&str, &str)) -> Option<String> {
        let text = input.into_text()?;
        let resolution = self.resolver.resolve_detailed(&text);
        info!(matched = ?resolution.matched, "Answering");
        display(&text, &resolution.response);
        self.speak(&resolution.response);
        Some(resolution.response)
    }

    /// Captures and transcribes one utterance from `device_index` (0 = default device).
    pub async fn listen(&self, device_index: usize) -> Result<String, VoiceError> {
        self.voice.listen(device_index).await
    }

    /// Runs `listen` in the background and hands back its result.
    pub fn start_voice_capture(&self, device_index: usize) -> JoinHandle<Result<String, VoiceError>> {
        let assistant = self.clone();
        tokio::spawn(async move { assistant.listen(device_index).await })
    }

    pub fn is_listening(&self) -> bool {
        self.voice.is_capturing()
    }

    /// Topic ids in knowledge order, each with its keywords.
    pub fn topics(&self) -> Vec<(String, Vec<String>)> {
        let store = self.resolver.store();
        store
            .topics()
            .map(|id| (id.to_string(), store.keywords_for(id).to_vec()))
            .collect()
    }

    /// First-aid instructions for a topic id, case-insensitive.
    pub fn topic_content(&self, topic: &str) -> Option<String> {
        self.resolver.store().get_content(topic).map(str::to_string)
    }
}
