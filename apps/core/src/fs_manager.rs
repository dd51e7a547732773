use crate::brain::knowledge::{KEYWORDS_FILE, KNOWLEDGE_FILE, SMALL_TALK_FILE};
use std::path::{Path, PathBuf};
use tracing::error;

pub struct PortablePathManager;

impl PortablePathManager {
    /// Application root: the executable's directory, or `apps/core` in debug builds.
    pub fn root_dir() -> PathBuf {
        let exe_dir = match std::env::current_exe() {
            Ok(mut path) => {
                path.pop(); // remove exe name
                path
            }
            Err(e) => {
                error!("Failed to get current exe path: {}. Falling back to current_dir.", e);
                return std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
            }
        };

        if cfg!(debug_assertions) {
            // target/debug (or target/debug/deps for tests) below the workspace root
            for ancestor in exe_dir.ancestors() {
                let core_path = ancestor.join("apps").join("core");
                if core_path.join("Cargo.toml").exists() {
                    return core_path;
                }
            }
        }

        exe_dir
    }

    /// Default data directory (./data).
    pub fn data_dir() -> PathBuf {
        Self::root_dir().join("data")
    }

    /// The three knowledge source files inside `dir`.
    pub fn source_files(dir: &Path) -> [PathBuf; 3] {
        [
            dir.join(KNOWLEDGE_FILE),
            dir.join(KEYWORDS_FILE),
            dir.join(SMALL_TALK_FILE),
        ]
    }
}
