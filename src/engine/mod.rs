//! engine
//!
//! Builds point-in-time snapshots of a working copy.
//!
//! # Architecture
//!
//! A refresh flows bottom-up through:
//!
//! 1. [`state_files`]: reads git's private plumbing files
//! 2. [`parse`] and [`log`]: turn command output into domain values
//! 3. [`commit_cache`]: memoized commit lookups shared across refreshes
//! 4. [`operations`]: in-progress merge, rebase, cherry-pick, revert
//! 5. [`divergence`]: ahead/behind lists against upstream and push remote
//! 6. [`scan`]: the concurrent assembler producing a [`RepoSnapshot`]
//! 7. [`registry`]: tracked repositories with single-flight refresh
//!
//! # Invariants
//!
//! - The engine never mutates the repository
//! - A snapshot reports at most one in-progress operation
//! - Non-fatal lookup failures are visible in [`RepoSnapshot::degraded`]
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use strata::engine::{ScanOptions, SnapshotEngine};
//! use strata::git::{CliRunner, Git};
//!
//! let git = Git::open(".")?;
//! let info = git.info()?;
//! let runner = Arc::new(CliRunner::new("git", info.work_dir.clone()));
//! let engine = SnapshotEngine::new();
//! let repo = engine.track(info, runner, ScanOptions::default());
//! let snapshot = repo.refresh().await?;
//! ```

pub mod commit_cache;
pub mod divergence;
pub mod log;
pub mod operations;
pub mod parse;
pub mod registry;
pub mod scan;
pub mod state_files;

pub use commit_cache::{CommitCache, LookupError};
pub use divergence::{resolve_divergence, Divergence, DivergenceError};
pub use log::{parse_log, LogParser};
pub use operations::{OperationState, Probe, ProbeError};
pub use registry::{SnapshotEngine, TrackedRepo};
pub use scan::{
    scan, Head, RepoSnapshot, ScanContext, ScanError, ScanOptions, TaskFailure, UpstreamRef,
};
