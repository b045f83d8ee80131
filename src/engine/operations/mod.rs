//! engine::operations
//!
//! Detection of in-progress multi-step operations.
//!
//! # Architecture
//!
//! Each resolver inspects git's private state files for one operation and
//! returns a [`Probe`]:
//!
//! 1. A cheap marker check decides [`Probe::Inactive`].
//! 2. Auxiliary files and git queries fill in the state.
//! 3. Anything unreadable or malformed past the marker is
//!    [`Probe::Failed`], never a partially filled state.
//!
//! The snapshot assembler treats `Failed` as "no operation" and records the
//! failure, so a broken state file degrades one section of the snapshot
//! instead of the whole refresh.
//!
//! Resolvers that need the recent log or the ref list get them through
//! [`History`], which the assembler backs with shared tasks so nothing is
//! queried twice.

pub mod merging;
pub mod rebasing;
pub mod sequencer;

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use super::commit_cache::{CommitCache, LookupError};
use super::parse::ParseError;
use super::scan::TaskFailure;
use super::state_files::StateFiles;
use crate::core::model::{Commit, LogEntry, PlannedCommit, Ref};
use crate::core::types::{ObjectFormat, Oid, TypeError};
use crate::git::{GitRunner, RunnerError};

/// Outcome of one resolver.
#[derive(Debug)]
pub enum Probe<T> {
    Active(T),
    Inactive,
    Failed(ProbeError),
}

impl<T> Probe<T> {
    pub fn is_active(&self) -> bool {
        matches!(self, Probe::Active(_))
    }

    /// The active state, discarding inactivity and failure.
    pub fn active(self) -> Option<T> {
        match self {
            Probe::Active(state) => Some(state),
            _ => None,
        }
    }
}

impl<T> From<Result<Option<T>, ProbeError>> for Probe<T> {
    fn from(result: Result<Option<T>, ProbeError>) -> Self {
        match result {
            Ok(Some(state)) => Probe::Active(state),
            Ok(None) => Probe::Inactive,
            Err(e) => Probe::Failed(e),
        }
    }
}

/// Why a resolver could not describe an active operation.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("{0} is missing or unreadable")]
    Unreadable(&'static str),

    #[error("malformed {file}: {detail}")]
    Malformed { file: &'static str, detail: String },

    #[error("no HEAD commit to resume from")]
    NoHead,

    #[error(transparent)]
    Run(#[from] RunnerError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Lookup(#[from] LookupError),

    #[error(transparent)]
    Dependency(#[from] TaskFailure),
}

/// Source of the recent log and the ref list for resolvers.
#[async_trait]
pub trait History: Send + Sync {
    async fn log(&self) -> Result<Arc<Vec<LogEntry>>, TaskFailure>;
    async fn refs(&self) -> Result<Arc<Vec<Ref>>, TaskFailure>;
}

/// Everything a resolver may consult.
#[derive(Clone, Copy)]
pub struct ResolverContext<'a> {
    pub files: &'a StateFiles,
    pub runner: &'a dyn GitRunner,
    pub cache: &'a CommitCache,
    pub history: &'a dyn History,
    /// HEAD commit reported by status; `None` on an unborn branch.
    pub head_commit: Option<&'a Oid>,
    pub abbrev_len: usize,
}

impl ResolverContext<'_> {
    pub fn format(&self) -> ObjectFormat {
        self.cache.format()
    }

    /// Read a file that must exist once the marker has been seen.
    pub(crate) async fn read_required(&self, file: &'static str) -> Result<String, ProbeError> {
        self.files.read(file).await.ok_or(ProbeError::Unreadable(file))
    }

    /// Parse the first line of `text` as a full object id.
    pub(crate) fn parse_id(&self, file: &'static str, text: &str) -> Result<Oid, ProbeError> {
        let first = text.lines().next().unwrap_or("");
        Oid::parse(first, self.format()).map_err(|e: TypeError| ProbeError::Malformed {
            file,
            detail: e.to_string(),
        })
    }
}

/// A merge stopped for conflict resolution or `--no-commit`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MergingState {
    /// First merge head.
    pub head: Oid,
    /// Names being merged, or the abbreviated head when none are known.
    pub branches: Vec<String>,
    /// Commits reachable from the merge head but not from HEAD.
    pub commits: Vec<Arc<Commit>>,
}

/// Target of a rebase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RebaseOnto {
    /// A local branch or tag at `commit`, else the abbreviated id.
    pub name: String,
    pub commit: Oid,
}

/// A rebase stopped part way.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RebasingState {
    /// Branch being rebased (`head-name` without `refs/heads/`).
    pub branch: String,
    pub onto: RebaseOnto,
    pub interactive: bool,
    /// Already replayed, newest first.
    pub done: Vec<LogEntry>,
    /// Commit being replayed, when its id is known in full.
    pub current: Option<Arc<Commit>>,
    /// Still to be replayed, last-to-apply first.
    pub upcoming: Vec<PlannedCommit>,
}

/// A cherry-pick or revert stopped part way.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SequencerState {
    /// HEAD when the sequence started.
    pub original_head: Oid,
    /// Commit being picked or reverted.
    pub current: Arc<Commit>,
    /// Still to be applied, last-to-apply first.
    pub upcoming: Vec<PlannedCommit>,
}

/// The single in-progress operation of a working copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum OperationState {
    Merging(MergingState),
    Rebasing(RebasingState),
    CherryPicking(SequencerState),
    Reverting(SequencerState),
}

impl OperationState {
    pub fn label(&self) -> &'static str {
        match self {
            OperationState::Merging(_) => "merging",
            OperationState::Rebasing(_) => "rebasing",
            OperationState::CherryPicking(_) => "cherry-picking",
            OperationState::Reverting(_) => "reverting",
        }
    }
}
