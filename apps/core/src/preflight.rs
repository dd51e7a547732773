//! Preflight Check System
//!
//! Verifies the knowledge files and the external speech programs before the
//! shell starts. Missing speech programs only degrade the assistant; missing
//! knowledge files stop it.

use crate::config::AppConfig;
use crate::fs_manager::PortablePathManager;
use tracing::{info, warn};

/// Result of a single check
#[derive(Debug, Clone)]
pub struct CheckResult {
    pub name: String,
    pub passed: bool,
    pub message: String,
    pub details: Option<String>,
}

impl CheckResult {
    fn pass(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            passed: true,
            message: message.to_string(),
            details: None,
        }
    }

    fn fail(name: &str, message: &str, details: Option<String>) -> Self {
        Self {
            name: name.to_string(),
            passed: false,
            message: message.to_string(),
            details,
        }
    }
}

/// Complete preflight check report
#[derive(Debug, Clone)]
pub struct PreflightReport {
    pub all_passed: bool,
    pub checks: Vec<CheckResult>,
    pub ready_to_start: bool,
    pub summary: String,
}

/// Performs all preflight checks and returns a report
pub fn run_preflight_checks(config: &AppConfig) -> PreflightReport {
    info!("Running preflight checks");

    let checks = vec![
        check_knowledge_files(config),
        check_tts_program(config),
        check_recorder(config),
    ];

    let all_passed = checks.iter().all(|c| c.passed);
    let critical_passed = checks
        .iter()
        .filter(|c| is_critical_check(&c.name))
        .all(|c| c.passed);

    let summary = if all_passed {
        "All checks passed. System ready.".to_string()
    } else if critical_passed {
        "Some speech checks failed. Answers will still be shown on screen.".to_string()
    } else {
        "Knowledge files missing. System cannot start.".to_string()
    };

    for check in &checks {
        if check.passed {
            info!("  ok {}: {}", check.name, check.message);
        } else {
            warn!("  failed {}: {}", check.name, check.message);
            if let Some(details) = &check.details {
                warn!("      Details: {}", details);
            }
        }
    }
    info!("Summary: {}", summary);

    PreflightReport {
        all_passed,
        checks,
        ready_to_start: critical_passed,
        summary,
    }
}

fn is_critical_check(name: &str) -> bool {
    matches!(name, "knowledge_files")
}

// --- Individual Checks ---

fn check_knowledge_files(config: &AppConfig) -> CheckResult {
    let missing: Vec<String> = PortablePathManager::source_files(&config.data_dir)
        .iter()
        .filter(|p| !p.is_file())
        .map(|p| p.display().to_string())
        .collect();

    if missing.is_empty() {
        CheckResult::pass(
            "knowledge_files",
            &format!("Found in {}", config.data_dir.display()),
        )
    } else {
        CheckResult::fail(
            "knowledge_files",
            "Knowledge files not found",
            Some(missing.join(", ")),
        )
    }
}

fn check_tts_program(config: &AppConfig) -> CheckResult {
    match crate::actors::speech::CommandSynthesizer::discover(config.tts_program.as_deref()) {
        Ok(synth) => CheckResult::pass(
            "tts_program",
            &format!("Found at {}", synth.program().display()),
        ),
        Err(e) => CheckResult::fail(
            "tts_program",
            "No text-to-speech program, answers will not be spoken",
            Some(e.to_string()),
        ),
    }
}

fn check_recorder(config: &AppConfig) -> CheckResult {
    match which::which(&config.recorder_program) {
        Ok(path) => CheckResult::pass("recorder", &format!("Found at {}", path.display())),
        Err(e) => CheckResult::fail(
            "recorder",
            "Audio recorder not found, voice input will fail",
            Some(format!("{}: {}", config.recorder_program, e)),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_missing_knowledge_files_block_start() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig {
            data_dir: dir.path().to_path_buf(),
            recorder_program: "definitely-not-a-recorder-xyz".to_string(),
            ..AppConfig::default()
        };

        let report = run_preflight_checks(&config);
        assert!(!report.ready_to_start);
        assert!(!report.all_passed);
        let knowledge = &report.checks[0];
        assert_eq!(knowledge.name, "knowledge_files");
        assert!(knowledge.details.as_deref().unwrap().contains("first_aid.txt"));
    }

    #[test]
    fn test_missing_recorder_is_not_critical() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["first_aid.txt", "keywords.txt", "small_talk.txt"] {
            fs::write(dir.path().join(name), "").unwrap();
        }
        let config = AppConfig {
            data_dir: dir.path().to_path_buf(),
            recorder_program: "definitely-not-a-recorder-xyz".to_string(),
            ..AppConfig::default()
        };

        let report = run_preflight_checks(&config);
        assert!(report.ready_to_start);
        assert!(!report.all_passed);
    }
}
