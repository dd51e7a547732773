//! Terminal presentation shell.
//!
//! Owns the conversation log and user interaction. Typed lines are answered
//! inline; voice captures run in the background and report back through a
//! channel so the prompt never blocks on the microphone.

use crate::actors::messages::VoiceError;
use crate::actors::supervisor::Assistant;
use crate::actors::voice::CAPTURE_IN_PROGRESS;
use crate::input::UserInput;
use chrono::{DateTime, Local};
use std::io::Write;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

const WELCOME: &str = "Smart First-Aid Assistant. Type a question, or /help for commands.";
const HELP: &str = "/voice [mic index]  ask by voice (index 0 = default microphone)\n/topics             list first-aid topics and their keywords\n/topic <name>       show the instructions for one topic\n/quit               exit";
const LISTENING: &str = "Listening...";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Speaker {
    You,
    Ai,
    Status,
}

#[derive(Debug, Clone)]
pub struct LogEntry {
    pub timestamp: DateTime<Local>,
    pub speaker: Speaker,
    pub text: String,
}

/// Session-only conversation log. Nothing is persisted.
pub struct ConversationLog<W: Write> {
    out: W,
    entries: Vec<LogEntry>,
}

impl<W: Write> ConversationLog<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            entries: Vec::new(),
        }
    }

    pub fn you(&mut self, text: &str) {
        self.push(Speaker::You, text);
    }

    pub fn ai(&mut self, text: &str) {
        self.push(Speaker::Ai, text);
    }

    pub fn status(&mut self, text: &str) {
        self.push(Speaker::Status, text);
    }

    fn push(&mut self, speaker: Speaker, text: &str) {
        let rendered = match speaker {
            Speaker::You => format!("You: {}", text),
            Speaker::Ai => format!("AI:\n{}", text),
            Speaker::Status => text.to_string(),
        };
        if let Err(e) = write!(self.out, "{}\n\n", rendered).and_then(|_| self.out.flush()) {
            warn!("Failed to write conversation log: {}", e);
        }
        let entry = LogEntry {
            timestamp: Local::now(),
            speaker,
            text: text.to_string(),
        };
        debug!(
            at = %entry.timestamp.format("%H:%M:%S"),
            speaker = ?entry.speaker,
            chars = entry.text.chars().count(),
            "Conversation entry"
        );
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    #[allow(dead_code)]
    pub fn into_writer(self) -> W {
        self.out
    }
}

/// One line of shell input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Ask(String),
    Voice(usize),
    Topics,
    Topic(String),
    Help,
    Quit,
    Invalid(String),
}

pub fn parse_command(line: &str) -> ShellCommand {
    let trimmed = line.trim();
    let mut parts = trimmed.split_whitespace();
    match parts.next() {
        Some("/quit") | Some("/exit") => ShellCommand::Quit,
        Some("/help") => ShellCommand::Help,
        Some("/topics") => ShellCommand::Topics,
        Some("/topic") => {
            let name = parts.collect::<Vec<_>>().join(" ");
            if name.is_empty() {
                ShellCommand::Invalid("Usage: /topic <name>".to_string())
            } else {
                ShellCommand::Topic(name)
            }
        }
        Some("/voice") => match parts.next().map(str::parse::<usize>) {
            None => ShellCommand::Voice(0),
            Some(Ok(index)) => ShellCommand::Voice(index),
            Some(Err(_)) => ShellCommand::Invalid("Usage: /voice [mic index]".to_string()),
        },
        _ => ShellCommand::Ask(line.to_string()),
    }
}

/// Runs the shell until `/quit` or end of input and returns the session log.
pub async fn run<R, W>(assistant: Assistant, input: R, out: W) -> ConversationLog<W>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut log = ConversationLog::new(out);
    let mut lines = input.lines();
    let (voice_tx, mut voice_rx) = mpsc::channel::<Result<String, VoiceError>>(8);

    log.status(WELCOME);

    loop {
        tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(line)) => {
                    if !handle_line(&assistant, &mut log, &line, &voice_tx) {
                        break;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    error!("Failed to read input: {}", e);
                    break;
                }
            },
            Some(result) = voice_rx.recv() => handle_voice_result(&assistant, &mut log, result),
        }
    }

    log
}

/// Returns `false` when the shell should exit.
fn handle_line<W: Write>(
    assistant: &Assistant,
    log: &mut ConversationLog<W>,
    line: &str,
    voice_tx: &mpsc::Sender<Result<String, VoiceError>>,
) -> bool {
    match parse_command(line) {
        ShellCommand::Quit => return false,
        ShellCommand::Help => log.status(HELP),
        ShellCommand::Topics => log.status(&topic_listing(assistant)),
        ShellCommand::Topic(name) => match assistant.topic_content(&name) {
            Some(content) => log.status(&format!("{}:\n{}", name.to_lowercase(), content)),
            None => log.status(&format!("Unknown topic {:?}. Try /topics.", name)),
        },
        ShellCommand::Invalid(message) => log.status(&message),
        ShellCommand::Voice(index) => {
            if assistant.is_listening() {
                log.status(&VoiceError::Device(CAPTURE_IN_PROGRESS.to_string()).status_line());
            } else {
                log.status(LISTENING);
                let capture = assistant.start_voice_capture(index);
                let tx = voice_tx.clone();
                tokio::spawn(async move {
                    let result = capture
                        .await
                        .unwrap_or_else(|e| Err(VoiceError::Device(format!("capture task failed: {}", e))));
                    let _ = tx.send(result).await;
                });
            }
        }
        ShellCommand::Ask(text) => answer(assistant, log, UserInput::Typed(text)),
    }
    true
}

fn handle_voice_result<W: Write>(
    assistant: &Assistant,
    log: &mut ConversationLog<W>,
    result: Result<String, VoiceError>,
) {
    match result {
        Ok(text) => answer(assistant, log, UserInput::Spoken(text)),
        Err(e) => {
            warn!("Voice input failed: {}", e);
            log.status(&e.status_line());
        }
    }
}

/// Shows the question and the answer before the answer is queued for speech.
fn answer<W: Write>(assistant: &Assistant, log: &mut ConversationLog<W>, input: UserInput) {
    let spoken = matches!(input, UserInput::Spoken(_));
    let answered = assistant.ask(input, |question, response| {
        log.you(question);
        log.ai(response);
    });
    if answered.is_none() && spoken {
        log.status(&VoiceError::Unintelligible.status_line());
    }
}

fn topic_listing(assistant: &Assistant) -> String {
    let mut listing = String::from("Topics:");
    for (topic, keywords) in assistant.topics() {
        listing.push_str(&format!("\n{}: {}", topic, keywords.join(", ")));
    }
    listing
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(parse_command("/quit"), ShellCommand::Quit);
        assert_eq!(parse_command("  /help "), ShellCommand::Help);
        assert_eq!(parse_command("/topics"), ShellCommand::Topics);
        assert_eq!(parse_command("/voice"), ShellCommand::Voice(0));
        assert_eq!(parse_command("/voice 2"), ShellCommand::Voice(2));
        assert!(matches!(parse_command("/voice left"), ShellCommand::Invalid(_)));
        assert_eq!(parse_command("/topic Burns"), ShellCommand::Topic("Burns".to_string()));
        assert!(matches!(parse_command("/topic"), ShellCommand::Invalid(_)));
        assert_eq!(
            parse_command("snake bite, what to do"),
            ShellCommand::Ask("snake bite, what to do".to_string())
        );
    }

    #[test]
    fn test_log_rendering() {
        let mut log = ConversationLog::new(Vec::new());
        log.you("burn");
        log.ai("Cool the burn.");
        log.status("Listening...");

        assert_eq!(log.entries().len(), 3);
        assert_eq!(log.entries()[1].speaker, Speaker::Ai);
        let written = String::from_utf8(log.into_writer()).unwrap();
        assert_eq!(written, "You: burn\n\nAI:\nCool the burn.\n\nListening...\n\n");
    }
}
