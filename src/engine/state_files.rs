//! engine::state_files
//!
//! Tolerant reader for git's private state files.
//!
//! Operation markers and their auxiliary files come and go while git runs,
//! so a file that cannot be read is treated exactly like a missing one.
//! Callers decide whether absence means "inactive" or "malformed".

use std::path::Path;

use tokio::fs;

use crate::core::paths::StrataPaths;

/// Reads plumbing files relative to a working copy's metadata directory.
#[derive(Debug, Clone)]
pub struct StateFiles {
    paths: StrataPaths,
}

impl StateFiles {
    pub fn new(paths: StrataPaths) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &StrataPaths {
        &self.paths
    }

    /// Contents of `relative` with a single trailing line terminator
    /// removed. `None` if the file is missing or unreadable.
    pub async fn read(&self, relative: impl AsRef<Path>) -> Option<String> {
        let contents = fs::read_to_string(self.paths.state_file(relative)).await.ok()?;
        Some(strip_final_newline(&contents).to_string())
    }

    /// Whether `relative` exists (file or directory).
    pub async fn exists(&self, relative: impl AsRef<Path>) -> bool {
        fs::try_exists(self.paths.state_file(relative))
            .await
            .unwrap_or(false)
    }

    /// Whether `relative` is a directory with at least one entry.
    pub async fn is_populated_dir(&self, relative: impl AsRef<Path>) -> bool {
        match fs::read_dir(self.paths.state_file(relative)).await {
            Ok(mut entries) => matches!(entries.next_entry().await, Ok(Some(_))),
            Err(_) => false,
        }
    }
}

/// Remove one trailing `\n` or `\r\n`.
pub fn strip_final_newline(s: &str) -> &str {
    s.strip_suffix("\r\n")
        .or_else(|| s.strip_suffix('\n'))
        .unwrap_or(s)
}
