//! strata - Repository snapshots for editor-integrated git porcelains
//!
//! strata reconstructs, on every refresh, a complete read-only picture of a
//! git working copy: HEAD and its upstream, change lists with diffs,
//! stashes, recent history, refs, remotes, submodules, and whichever
//! multi-step operation (merge, rebase, cherry-pick, revert) is stopped
//! part way.
//!
//! # Architecture
//!
//! - [`cli`] - Command-line interface layer (parses args, delegates to engine)
//! - [`engine`] - Concurrent snapshot assembly and tracked repositories
//! - [`core`] - Domain types, configuration, and paths
//! - [`git`] - Repository discovery and the git process runner
//!
//! # Correctness Invariants
//!
//! 1. A refresh never mutates the repository
//! 2. At most one in-progress operation is reported
//! 3. A failed lookup degrades one section, never the whole snapshot

pub mod cli;
pub mod core;
pub mod engine;
pub mod git;
