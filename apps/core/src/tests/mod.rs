//! Test Module
//!
//! Cross-module test suite for the first-aid assistant.
//!
//! ## Test Categories
//! - `brain_tests`: knowledge loading and layered response resolution
//! - `actor_tests`: speech queue ordering, voice capture and transcription
//! - `integration_tests`: bundled data and the assistant facade end to end

pub mod brain_tests;
