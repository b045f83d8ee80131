//! git
//!
//! Single interface for all Git operations.
//!
//! # Architecture
//!
//! This module is the **only doorway** to Git. Repository discovery goes
//! through `git2`; every content query runs the git executable through a
//! [`GitRunner`]. No other module spawns processes or imports `git2`.
//!
//! # Responsibilities
//!
//! - Repository discovery and object format detection ([`repo`])
//! - Running git with typed, classified failures ([`runner`])
//! - The argument lists of every query the engine issues ([`commands`])
//! - A scripted runner for tests ([`mock`])
//!
//! # Example
//!
//! ```ignore
//! use strata::git::{CliRunner, Git, GitRunner};
//! use std::path::Path;
//!
//! let info = Git::open(Path::new("."))?.info()?;
//! let runner = CliRunner::new("git", &info.work_dir);
//! let stashes = runner.output(&strata::git::commands::stash_list()).await?;
//! ```

pub mod commands;
pub mod mock;
mod repo;
mod runner;

pub use repo::{Git, GitError, RepoInfo};
pub use runner::{CliRunner, GitErrorCode, GitRunner, RunOutput, RunnerError};
