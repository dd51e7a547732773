//! Brain Module Tests
//!
//! Knowledge loading and layered response resolution.

use crate::brain::knowledge::{KnowledgeStore, ParseError, SourceKind};
use crate::brain::resolver::{MatchKind, ResponseResolver, DEFAULT_RESPONSE};
use std::sync::Arc;

// ============================================================================
// Fixtures
// ============================================================================

const KNOWLEDGE: &str = "\
Burns:
Cool the burn under running water for 20 minutes.

Choking:
Give 5 back blows.
Then 5 abdominal thrusts.

Snakebite:
Keep the person still and call for help.
";

const KEYWORDS: &str = "\
snakebite: snake bite, snake
choking: choking, choke
burns: burn, scald
";

const SMALL_TALK: &str = "\
hello: Hello! How can I help?
thank you: You are welcome.
";

fn store() -> Arc<KnowledgeStore> {
    Arc::new(KnowledgeStore::load(KNOWLEDGE, KEYWORDS, SMALL_TALK).unwrap())
}

fn resolver() -> ResponseResolver {
    ResponseResolver::new(store())
}

// ============================================================================
// Knowledge Store
// ============================================================================

#[test]
fn test_store_keeps_knowledge_order_and_multiline_content() {
    let store = store();
    let topics: Vec<&str> = store.topics().collect();
    assert_eq!(topics, vec!["burns", "choking", "snakebite"]);
    assert_eq!(
        store.get_content("CHOKING"),
        Some("Give 5 back blows.\nThen 5 abdominal thrusts.")
    );
    assert_eq!(store.keywords_for("snakebite"), ["snake bite", "snake"]);
}

#[test]
fn test_every_keyword_points_at_a_known_topic() {
    let store = store();
    for topic in store.topic_entries() {
        for keyword in &topic.keywords {
            let (owner, matched) = store.keyword_lookup(keyword).unwrap();
            assert_eq!(matched, keyword);
            assert!(store.get_content(&owner.id).is_some());
        }
    }
}

#[test]
fn test_keyword_line_missing_delimiter_rejects_load() {
    let err = KnowledgeStore::load(KNOWLEDGE, "burns burn, scald\n", SMALL_TALK).unwrap_err();
    assert_eq!(
        err,
        ParseError::MissingDelimiter {
            source_kind: SourceKind::Keywords,
            line: 1,
            text: "burns burn, scald".to_string(),
        }
    );
}

#[test]
fn test_small_talk_line_missing_delimiter_rejects_load() {
    let err = KnowledgeStore::load(KNOWLEDGE, KEYWORDS, "hello there\n").unwrap_err();
    assert!(matches!(
        err,
        ParseError::MissingDelimiter {
            source_kind: SourceKind::SmallTalk,
            line: 1,
            ..
        }
    ));
}

#[test]
fn test_empty_sources_load_an_empty_store() {
    let store = KnowledgeStore::load("", "", "").unwrap();
    assert_eq!(store.topics().count(), 0);
    let resolver = ResponseResolver::new(Arc::new(store));
    assert_eq!(resolver.resolve("burn"), DEFAULT_RESPONSE);
}

// ============================================================================
// Resolver Layers
// ============================================================================

#[test]
fn test_small_talk_beats_keywords() {
    let resolution = resolver().resolve_detailed("Hello, my hand has a burn");
    assert_eq!(resolution.response, "Hello! How can I help?");
    assert_eq!(
        resolution.matched,
        MatchKind::SmallTalk {
            trigger: "hello".to_string()
        }
    );
}

#[test]
fn test_first_matching_small_talk_trigger_wins() {
    let store = KnowledgeStore::load(KNOWLEDGE, KEYWORDS, "thank: Glad to help.\nthank you: You are welcome.\n")
        .unwrap();
    let resolution = ResponseResolver::new(Arc::new(store)).resolve_detailed("Thank you so much");
    assert_eq!(resolution.response, "Glad to help.");
    assert_eq!(
        resolution.matched,
        MatchKind::SmallTalk {
            trigger: "thank".to_string()
        }
    );

    let reversed = KnowledgeStore::load(KNOWLEDGE, KEYWORDS, "thank you: You are welcome.\nthank: Glad to help.\n")
        .unwrap();
    let resolution = ResponseResolver::new(Arc::new(reversed)).resolve_detailed("Thank you so much");
    assert_eq!(resolution.response, "You are welcome.");
    assert_eq!(
        resolution.matched,
        MatchKind::SmallTalk {
            trigger: "thank you".to_string()
        }
    );
}

#[test]
fn test_keyword_match_is_case_insensitive_substring() {
    let resolution = resolver().resolve_detailed("SNAKE BITE, what to do");
    assert_eq!(resolution.response, "Keep the person still and call for help.");
    assert_eq!(
        resolution.matched,
        MatchKind::Keyword {
            topic: "snakebite".to_string(),
            keyword: "snake bite".to_string(),
        }
    );
}

#[test]
fn test_keyword_beats_fuzzy_on_topic_name() {
    // "burns" is also an exact topic id, but the keyword layer runs first
    let resolution = resolver().resolve_detailed("burns");
    assert!(matches!(resolution.matched, MatchKind::Keyword { ref keyword, .. } if keyword == "burn"));
}

#[test]
fn test_fuzzy_accepts_score_exactly_at_cutoff() {
    // "burns" vs "buxyz": 2 matched chars over 10 total = 0.4
    let resolution = resolver().resolve_detailed("buxyz");
    match resolution.matched {
        MatchKind::Fuzzy { topic, score } => {
            assert_eq!(topic, "burns");
            assert!((score - 0.4).abs() < 1e-9);
        }
        other => panic!("expected fuzzy match, got {:?}", other),
    }
}

#[test]
fn test_fuzzy_recovers_misspelled_topic() {
    let resolution = resolver().resolve_detailed("snakbit");
    assert!(matches!(resolution.matched, MatchKind::Fuzzy { ref topic, .. } if topic == "snakebite"));
}

#[test]
fn test_unrelated_input_falls_back_to_default() {
    let resolution = resolver().resolve_detailed("qqq");
    assert_eq!(resolution.response, DEFAULT_RESPONSE);
    assert_eq!(resolution.matched, MatchKind::Default);
}

#[test]
fn test_resolution_is_deterministic() {
    let resolver = resolver();
    for input in ["burn", "chokng", "hello", "qqq", "", "   "] {
        let first = resolver.resolve_detailed(input);
        let second = resolver.resolve_detailed(input);
        assert_eq!(first, second);
        assert!(!first.response.is_empty());
    }
}

#[test]
fn test_resolver_is_shareable_across_threads() {
    let resolver = resolver();
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let resolver = resolver.clone();
            std::thread::spawn(move || resolver.resolve("I think he is choking"))
        })
        .collect();
    for handle in handles {
        assert_eq!(
            handle.join().unwrap(),
            "Give 5 back blows.\nThen 5 abdominal thrusts."
        );
    }
}
