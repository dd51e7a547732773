//! Response Resolution
//!
//! Layered matching, cheapest first. The first layer that matches wins:
//! 1. Small talk: trigger substring of the lower-cased input
//! 2. Keywords: curated keyword substring, returning the topic content
//! 3. Fuzzy: nearest topic id by sequence similarity (cutoff 0.4)
//! 4. Default emergency message
//!
//! Curated keywords always take precedence over a fuzzy near-miss.

use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

use super::knowledge::KnowledgeStore;
use super::similarity;

/// Returned when no layer matches.
pub const DEFAULT_RESPONSE: &str = "Sorry, no instructions found. Call emergency services.";

/// Minimum similarity for the fuzzy layer.
pub const FUZZY_CUTOFF: f64 = 0.4;

/// Which layer produced a response.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "layer", rename_all = "snake_case")]
pub enum MatchKind {
    SmallTalk { trigger: String },
    Keyword { topic: String, keyword: String },
    Fuzzy { topic: String, score: f64 },
    Default,
}

/// A response together with the layer that produced it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resolution {
    pub response: String,
    pub matched: MatchKind,
}

/// Resolves free text against a shared, immutable `KnowledgeStore`.
#[derive(Debug, Clone)]
pub struct ResponseResolver {
    store: Arc<KnowledgeStore>,
}

impl ResponseResolver {
    pub fn new(store: Arc<KnowledgeStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &KnowledgeStore {
        &self.store
    }

    /// Best response for `input`. Never fails.
    pub fn resolve(&self, input: &str) -> String {
        self.resolve_detailed(input).response
    }

    /// Like `resolve`, but also reports the matching layer.
    pub fn resolve_detailed(&self, input: &str) -> Resolution {
        let lowered = input.to_lowercase();
        let resolution = self
            .match_small_talk(&lowered)
            .or_else(|| self.match_keyword(&lowered))
            .or_else(|| self.match_fuzzy(&lowered))
            .unwrap_or_else(|| Resolution {
                response: DEFAULT_RESPONSE.to_string(),
                matched: MatchKind::Default,
            });

        debug!(matched = ?resolution.matched, "Resolved input");
        resolution
    }

    fn match_small_talk(&self, lowered: &str) -> Option<Resolution> {
        self.store
            .small_talk_lookup(lowered)
            .map(|entry| Resolution {
                response: entry.response.clone(),
                matched: MatchKind::SmallTalk {
                    trigger: entry.trigger.clone(),
                },
            })
    }

    fn match_keyword(&self, lowered: &str) -> Option<Resolution> {
        self.store
            .keyword_lookup(lowered)
            .map(|(topic, keyword)| Resolution {
                response: topic.content.clone(),
                matched: MatchKind::Keyword {
                    topic: topic.id.clone(),
                    keyword: keyword.to_string(),
                },
            })
    }

    /// Highest-scoring topic id at or above the cutoff; ties keep the earlier topic.
    fn match_fuzzy(&self, lowered: &str) -> Option<Resolution> {
        let mut best: Option<(usize, f64)> = None;

        for (pos, topic) in self.store.topic_entries().iter().enumerate() {
            let cutoff = best.map_or(FUZZY_CUTOFF, |(_, score)| score);
            let Some(score) = similarity::score_at_least(&topic.id, lowered, cutoff) else {
                continue;
            };
            if best.map_or(true, |(_, top)| score > top) {
                best = Some((pos, score));
            }
        }

        best.map(|(pos, score)| {
            let topic = &self.store.topic_entries()[pos];
            Resolution {
                response: topic.content.clone(),
                matched: MatchKind::Fuzzy {
                    topic: topic.id.clone(),
                    score,
                },
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> ResponseResolver {
        let store = KnowledgeStore::load(
            "Burns:\nCool the burn.\n\nSnakebite:\nKeep still.\n\nChoking:\nGive back blows.",
            "snakebite: snake bite, bitten by a snake\nburns: burn, scald",
            "hello: Hello! Ask me a first-aid question.\nthank: You're welcome.",
        )
        .unwrap();
        ResponseResolver::new(Arc::new(store))
    }

    #[test]
    fn test_small_talk_wins_over_keyword() {
        let r = resolver().resolve_detailed("Hello, I got a burn");
        assert_eq!(r.response, "Hello! Ask me a first-aid question.");
        assert_eq!(
            r.matched,
            MatchKind::SmallTalk {
                trigger: "hello".to_string()
            }
        );
    }

    #[test]
    fn test_keyword_match() {
        assert_eq!(resolver().resolve("snake bite, what to do"), "Keep still.");
        assert_eq!(resolver().resolve("I SCALDED my hand"), "Cool the burn.");
    }

    #[test]
    fn test_fuzzy_match_on_topic_id() {
        let r = resolver().resolve_detailed("chokng");
        assert_eq!(r.response, "Give back blows.");
        assert!(matches!(r.matched, MatchKind::Fuzzy { ref topic, .. } if topic == "choking"));
    }

    #[test]
    fn test_default_when_nothing_matches() {
        let r = resolver().resolve_detailed("xyz");
        assert_eq!(r.response, DEFAULT_RESPONSE);
        assert_eq!(r.matched, MatchKind::Default);
    }

    #[test]
    fn test_fuzzy_tie_keeps_first_topic() {
        let store = KnowledgeStore::load("ab:\nFirst.\n\nba:\nSecond.", "", "").unwrap();
        let r = ResponseResolver::new(Arc::new(store)).resolve("a");
        assert_eq!(r, "First.");
    }

    #[test]
    fn test_resolution_serializes_with_layer_tag() {
        let r = resolver().resolve_detailed("burn");
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["matched"]["layer"], "keyword");
        assert_eq!(json["matched"]["topic"], "burns");
    }
}
