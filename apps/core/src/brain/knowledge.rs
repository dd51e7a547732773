//! Knowledge Store
//!
//! Holds the curated first-aid knowledge: topic content, topic keywords and
//! small-talk replies. Built once at startup from three plain-text sources and
//! never mutated afterwards, so it can be shared behind an `Arc` and read from
//! any thread without locking.
//!
//! ## Source formats
//! - Knowledge: blank-line separated records, `Title:` followed by content lines
//! - Keywords: one `topic: key1, key2, ...` per line
//! - Small talk: one `trigger: response` per line

use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::info;

use crate::error::AppError;

/// File names inside the data directory.
pub const KNOWLEDGE_FILE: &str = "first_aid.txt";
pub const KEYWORDS_FILE: &str = "keywords.txt";
pub const SMALL_TALK_FILE: &str = "small_talk.txt";

/// Which source text a parse error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SourceKind {
    Knowledge,
    Keywords,
    SmallTalk,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SourceKind::Knowledge => "knowledge",
            SourceKind::Keywords => "keywords",
            SourceKind::SmallTalk => "small talk",
        };
        write!(f, "{}", label)
    }
}

/// Errors raised while building a `KnowledgeStore`. Line numbers are 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("{source_kind} line {line} is missing the ':' delimiter: {text:?}")]
    MissingDelimiter {
        source_kind: SourceKind,
        line: usize,
        text: String,
    },

    #[error("{source_kind} line {line} has an empty key")]
    EmptyKey { source_kind: SourceKind, line: usize },

    #[error("knowledge topic {topic:?} (line {line}) has no content")]
    EmptyContent { topic: String, line: usize },

    #[error("{source_kind} line {line} repeats {key:?}")]
    Duplicate {
        source_kind: SourceKind,
        line: usize,
        key: String,
    },

    #[error("keywords line {line} references unknown topic {topic:?}")]
    UnknownTopic { topic: String, line: usize },

    #[error("keywords line {line}: keyword {keyword:?} already belongs to topic {owner:?}")]
    KeywordConflict {
        line: usize,
        keyword: String,
        owner: String,
    },
}

/// A first-aid subject with its instructions and trigger phrases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Topic {
    pub id: String,
    pub content: String,
    pub keywords: Vec<String>,
}

/// A conversational trigger and its canned reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SmallTalkEntry {
    pub trigger: String,
    pub response: String,
}

/// Immutable topic, keyword and small-talk mappings.
///
/// Every collection is an ordered `Vec` so that match precedence follows the
/// order of the source files.
#[derive(Debug, Clone, Default)]
pub struct KnowledgeStore {
    /// Topics in knowledge-file order.
    topics: Vec<Topic>,
    /// Topic id -> position in `topics`.
    index: HashMap<String, usize>,
    /// Positions in `topics`, in keyword-file order.
    keyword_order: Vec<usize>,
    small_talk: Vec<SmallTalkEntry>,
}

impl KnowledgeStore {
    /// Builds a store from the three source texts.
    ///
    /// Any malformed line, unknown topic or duplicate key rejects the whole
    /// load; the assistant never runs with partial data.
    pub fn load(
        knowledge_text: &str,
        keyword_text: &str,
        small_talk_text: &str,
    ) -> Result<Self, ParseError> {
        let mut store = KnowledgeStore::default();
        store.parse_knowledge(knowledge_text)?;
        store.parse_keywords(keyword_text)?;
        store.parse_small_talk(small_talk_text)?;
        Ok(store)
    }

    /// Reads `first_aid.txt`, `keywords.txt` and `small_talk.txt` from `dir`.
    pub fn load_from_dir(dir: &Path) -> Result<Self, AppError> {
        let knowledge = fs::read_to_string(dir.join(KNOWLEDGE_FILE))?;
        let keywords = fs::read_to_string(dir.join(KEYWORDS_FILE))?;
        let small_talk = fs::read_to_string(dir.join(SMALL_TALK_FILE))?;

        let store = Self::load(&knowledge, &keywords, &small_talk)?;
        info!(
            "Knowledge base loaded from {:?}: {} topics, {} small-talk triggers",
            dir,
            store.topics.len(),
            store.small_talk.len()
        );
        Ok(store)
    }

    fn parse_knowledge(&mut self, text: &str) -> Result<(), ParseError> {
        let mut record: Vec<(usize, &str)> = Vec::new();
        for (idx, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                self.push_record(&record)?;
                record.clear();
            } else {
                record.push((idx + 1, line));
            }
        }
        self.push_record(&record)
    }

    fn push_record(&mut self, record: &[(usize, &str)]) -> Result<(), ParseError> {
        let Some(&(line, title)) = record.first() else {
            return Ok(());
        };

        if !title.contains(':') {
            return Err(ParseError::MissingDelimiter {
                source_kind: SourceKind::Knowledge,
                line,
                text: title.to_string(),
            });
        }
        let id = title.replace(':', "").trim().to_lowercase();
        if id.is_empty() {
            return Err(ParseError::EmptyKey {
                source_kind: SourceKind::Knowledge,
                line,
            });
        }
        if self.index.contains_key(&id) {
            return Err(ParseError::Duplicate {
                source_kind: SourceKind::Knowledge,
                line,
                key: id,
            });
        }

        let content = record[1..]
            .iter()
            .map(|(_, l)| *l)
            .collect::<Vec<_>>()
            .join("\n")
            .trim()
            .to_string();
        if content.is_empty() {
            return Err(ParseError::EmptyContent { topic: id, line });
        }

        self.index.insert(id.clone(), self.topics.len());
        self.topics.push(Topic {
            id,
            content,
            keywords: Vec::new(),
        });
        Ok(())
    }

    fn parse_keywords(&mut self, text: &str) -> Result<(), ParseError> {
        // keyword -> owning topic id
        let mut owners: HashMap<String, String> = HashMap::new();

        for (line, topic, rest) in delimited_lines(text, SourceKind::Keywords)? {
            let topic = topic.to_lowercase();
            let Some(&pos) = self.index.get(&topic) else {
                return Err(ParseError::UnknownTopic { topic, line });
            };
            if self.keyword_order.contains(&pos) {
                return Err(ParseError::Duplicate {
                    source_kind: SourceKind::Keywords,
                    line,
                    key: topic,
                });
            }

            let mut keys = Vec::new();
            for key in rest.split(',').map(|k| k.trim().to_lowercase()) {
                // "a, , b" and trailing commas leave empty keys; an empty key would match everything
                if key.is_empty() || keys.contains(&key) {
                    continue;
                }
                if let Some(owner) = owners.get(&key) {
                    return Err(ParseError::KeywordConflict {
                        line,
                        keyword: key,
                        owner: owner.clone(),
                    });
                }
                owners.insert(key.clone(), topic.clone());
                keys.push(key);
            }

            self.topics[pos].keywords = keys;
            self.keyword_order.push(pos);
        }
        Ok(())
    }

    fn parse_small_talk(&mut self, text: &str) -> Result<(), ParseError> {
        for (line, trigger, response) in delimited_lines(text, SourceKind::SmallTalk)? {
            let trigger = trigger.to_lowercase();
            if self.small_talk.iter().any(|e| e.trigger == trigger) {
                return Err(ParseError::Duplicate {
                    source_kind: SourceKind::SmallTalk,
                    line,
                    key: trigger,
                });
            }
            self.small_talk.push(SmallTalkEntry {
                trigger,
                response: response.to_string(),
            });
        }
        Ok(())
    }

    /// Content for a topic id. The lookup is case-insensitive.
    pub fn get_content(&self, topic: &str) -> Option<&str> {
        self.topic(topic).map(|t| t.content.as_str())
    }

    pub fn topic(&self, topic: &str) -> Option<&Topic> {
        self.index
            .get(&topic.trim().to_lowercase())
            .map(|&pos| &self.topics[pos])
    }

    /// Topic ids in knowledge-file order.
    pub fn topics(&self) -> impl Iterator<Item = &str> {
        self.topics.iter().map(|t| t.id.as_str())
    }

    pub fn topic_entries(&self) -> &[Topic] {
        &self.topics
    }

    /// Keywords of a topic in line order; empty for unknown topics.
    pub fn keywords_for(&self, topic: &str) -> &[String] {
        self.topic(topic).map(|t| t.keywords.as_slice()).unwrap_or(&[])
    }

    /// First small-talk entry whose trigger occurs in `input`, in file order.
    pub fn small_talk_lookup(&self, input: &str) -> Option<&SmallTalkEntry> {
        let lowered = input.to_lowercase();
        self.small_talk
            .iter()
            .find(|e| lowered.contains(e.trigger.as_str()))
    }

    /// First topic/keyword pair whose keyword occurs in `input`.
    ///
    /// Topics are scanned in keyword-file order, keywords in line order.
    pub fn keyword_lookup(&self, input: &str) -> Option<(&Topic, &str)> {
        let lowered = input.to_lowercase();
        self.keyword_order.iter().find_map(|&pos| {
            let topic = &self.topics[pos];
            topic
                .keywords
                .iter()
                .find(|k| lowered.contains(k.as_str()))
                .map(|k| (topic, k.as_str()))
        })
    }
}

/// Splits non-blank lines on their first ':' into trimmed `(line, key, value)` triples.
fn delimited_lines(
    text: &str,
    source_kind: SourceKind,
) -> Result<Vec<(usize, &str, &str)>, ParseError> {
    let mut out = Vec::new();
    for (idx, raw) in text.lines().enumerate() {
        let line = idx + 1;
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            continue;
        }
        let Some((key, value)) = trimmed.split_once(':') else {
            return Err(ParseError::MissingDelimiter {
                source_kind,
                line,
                text: trimmed.to_string(),
            });
        };
        let key = key.trim();
        if key.is_empty() {
            return Err(ParseError::EmptyKey { source_kind, line });
        }
        out.push((line, key, value.trim()));
    }
    Ok(out)
}
