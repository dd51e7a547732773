//! # Brain Module
//!
//! Fast, deterministic first-aid matching. No model, no network.
//!
//! ## Components
//! - `knowledge`: the immutable topic / keyword / small-talk store
//! - `similarity`: Ratcliff/Obershelp similarity ratio for the fuzzy layer
//! - `resolver`: layered response resolution

pub mod knowledge;
pub mod resolver;
pub mod similarity;

pub use knowledge::KnowledgeStore;
pub use resolver::{Resolution, ResponseResolver};
