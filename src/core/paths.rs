//! core::paths
//!
//! Centralized path routing for git plumbing files and strata storage.
//!
//! # Architecture
//!
//! Two directories matter for a working copy:
//! - `git_dir`: per-worktree metadata. In-progress operation state
//!   (`MERGE_HEAD`, `rebase-merge/`, `sequencer/`, ...) lives here.
//! - `common_dir`: shared metadata (refs, objects, config). Strata's repo
//!   config lives here so every worktree of a repository shares it.
//!
//! For normal repositories the two are equal. No code may assume `.git/`
//! is a directory; all locations go through [`StrataPaths`] or the
//! [`plumbing`] names.
//!
//! # Example
//!
//! ```
//! use strata::core::paths::{plumbing, StrataPaths};
//! use std::path::PathBuf;
//!
//! let paths = StrataPaths::new(
//!     PathBuf::from("/repo/.git"),
//!     PathBuf::from("/repo/.git"),
//! );
//!
//! assert_eq!(
//!     paths.state_file(plumbing::MERGE_HEAD),
//!     PathBuf::from("/repo/.git/MERGE_HEAD")
//! );
//! assert_eq!(
//!     paths.repo_config_path(),
//!     PathBuf::from("/repo/.git/strata/config.toml")
//! );
//! ```

use std::path::{Path, PathBuf};

use crate::git::RepoInfo;

/// Names of the plumbing files read directly, relative to `git_dir`.
pub mod plumbing {
    /// Present while a merge is stopped; one merge head per line.
    pub const MERGE_HEAD: &str = "MERGE_HEAD";
    /// Prepared merge commit message.
    pub const MERGE_MSG: &str = "MERGE_MSG";
    /// Commit being replayed by a stopped rebase.
    pub const REBASE_HEAD: &str = "REBASE_HEAD";
    pub const CHERRY_PICK_HEAD: &str = "CHERRY_PICK_HEAD";
    pub const REVERT_HEAD: &str = "REVERT_HEAD";

    /// State directory of a patch-based (`am` backend) rebase.
    pub const REBASE_APPLY_DIR: &str = "rebase-apply";
    pub const REBASE_APPLY_HEAD_NAME: &str = "rebase-apply/head-name";
    pub const REBASE_APPLY_ONTO: &str = "rebase-apply/onto";
    pub const REBASE_APPLY_NEXT: &str = "rebase-apply/next";
    pub const REBASE_APPLY_LAST: &str = "rebase-apply/last";

    /// State directory of a todo-list (`merge` backend) rebase.
    pub const REBASE_MERGE_DIR: &str = "rebase-merge";
    pub const REBASE_MERGE_HEAD_NAME: &str = "rebase-merge/head-name";
    pub const REBASE_MERGE_ONTO: &str = "rebase-merge/onto";
    pub const REBASE_MERGE_MSGNUM: &str = "rebase-merge/msgnum";
    pub const REBASE_MERGE_TODO: &str = "rebase-merge/git-rebase-todo";
    pub const REBASE_MERGE_STOPPED_SHA: &str = "rebase-merge/stopped-sha";

    /// Shared by cherry-pick and revert.
    pub const SEQUENCER_TODO: &str = "sequencer/todo";
    pub const SEQUENCER_HEAD: &str = "sequencer/head";

    /// Numbered patch file of an apply-style rebase (`rebase-apply/0003`).
    pub fn rebase_apply_patch(index: u32) -> String {
        format!("{REBASE_APPLY_DIR}/{index:04}")
    }
}

/// Path routing for one working copy.
///
/// # Invariants
///
/// - Operation state is always resolved against `git_dir`
/// - Strata's own storage is always under `common_dir`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrataPaths {
    /// Path to the per-worktree .git directory.
    pub git_dir: PathBuf,

    /// Path to the shared git directory (refs, objects, config).
    pub common_dir: PathBuf,
}

impl StrataPaths {
    /// Create a new StrataPaths from git_dir and common_dir.
    pub fn new(git_dir: PathBuf, common_dir: PathBuf) -> Self {
        Self {
            git_dir,
            common_dir,
        }
    }

    /// Create StrataPaths from a discovered repository.
    pub fn from_repo_info(info: &RepoInfo) -> Self {
        Self {
            git_dir: info.git_dir.clone(),
            common_dir: info.common_dir.clone(),
        }
    }

    /// Absolute path of a plumbing file.
    pub fn state_file(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.git_dir.join(relative)
    }

    /// Root of strata's repository-scoped storage.
    pub fn repo_strata_dir(&self) -> PathBuf {
        self.common_dir.join("strata")
    }

    /// `<common_dir>/strata/config.toml`.
    pub fn repo_config_path(&self) -> PathBuf {
        self.repo_strata_dir().join("config.toml")
    }
}
