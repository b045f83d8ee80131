//! engine::scan
//!
//! Snapshot assembly.
//!
//! # Architecture
//!
//! The scanner reads repository state and produces a [`RepoSnapshot`]
//! containing:
//! - HEAD with its upstream and push-remote divergence
//! - Unstaged, staged, merge, and untracked change lists with diffs
//! - Stashes and the recent log
//! - At most one in-progress operation
//! - Branches, remotes, tags, and submodules
//! - Every non-fatal lookup that failed, in [`RepoSnapshot::degraded`]
//!
//! The status query runs first and is fatal; everything else fans out
//! concurrently afterwards. The recent log and the ref list are shared
//! dependency tasks ([`Deps`]): the rebase resolver and HEAD resolution
//! await the same results the snapshot uses, so neither query runs twice.
//!
//! # Invariants
//!
//! - Scan is read-only; it never mutates the repository
//! - Scan is deterministic given the same files and command outputs
//! - A failed non-fatal lookup never blanks another section

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use super::commit_cache::CommitCache;
use super::divergence::{resolve_divergence, Divergence};
use super::log::LogParser;
use super::operations::{
    merging, rebasing, sequencer, History, OperationState, Probe, ResolverContext,
};
use super::parse::{
    group_remote_branches, parse_branch_config, parse_diff_hunks, parse_refs, parse_remotes,
    parse_stash_list, parse_status, parse_submodule_status, parse_untracked, BranchConfig,
    BranchHeader, ParseError,
};
use super::state_files::StateFiles;
use crate::core::config::{Config, DEFAULT_ABBREV_LEN, DEFAULT_LOG_LIMIT};
use crate::core::model::{
    Change, Commit, LogEntry, Ref, RefKind, Remote, Stash, Submodule, UpstreamName,
};
use crate::core::paths::StrataPaths;
use crate::core::types::{BranchName, Fingerprint, Oid};
use crate::git::commands::{self, LogArgs};
use crate::git::{GitRunner, RepoInfo, RunnerError};

/// Per-file diff invocations allowed in flight at once.
const DIFF_CONCURRENCY: usize = 16;

/// Errors that abort a scan.
#[derive(Debug, Error)]
pub enum ScanError {
    /// The status query failed.
    #[error("status query failed: {0}")]
    Status(#[source] RunnerError),

    /// Status output did not parse.
    #[error("failed to parse status: {0}")]
    StatusParse(#[from] ParseError),

    /// Untracked files could not be listed.
    #[error("untracked file listing failed: {0}")]
    Untracked(#[source] RunnerError),
}

/// A non-fatal lookup that failed during a scan.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Error, Serialize)]
#[error("{task}: {message}")]
pub struct TaskFailure {
    /// Which lookup failed (`stashes`, `diff src/lib.rs`, `rebasing`, ...).
    pub task: String,
    pub message: String,
}

impl TaskFailure {
    pub fn new(task: impl Into<String>, error: impl std::fmt::Display) -> Self {
        Self {
            task: task.into(),
            message: error.to_string(),
        }
    }
}

/// Tunables for one scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanOptions {
    pub log_limit: usize,
    pub abbrev_len: usize,
    pub show_untracked: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            log_limit: DEFAULT_LOG_LIMIT,
            abbrev_len: DEFAULT_ABBREV_LEN,
            show_untracked: true,
        }
    }
}

impl ScanOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            log_limit: config.log_limit(),
            abbrev_len: config.abbrev_len(),
            show_untracked: config.show_untracked(),
        }
    }
}

/// Everything a scan reads from.
#[derive(Clone, Copy)]
pub struct ScanContext<'a> {
    pub info: &'a RepoInfo,
    pub runner: &'a dyn GitRunner,
    /// Must match `info.object_format`.
    pub cache: &'a CommitCache,
    pub options: &'a ScanOptions,
}

/// Upstream or push-remote counterpart of the current branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpstreamRef {
    /// Remote name, or `.` for a local upstream.
    pub remote: String,
    pub branch: String,
    /// `None` when the tracking ref does not exist locally.
    pub commit: Option<Arc<Commit>>,
    /// Commits on HEAD but not on this ref, newest first.
    pub ahead: Vec<Arc<Commit>>,
    /// Commits on this ref but not on HEAD, newest first.
    pub behind: Vec<Arc<Commit>>,
    /// Whether pulling integrates by rebasing.
    pub rebase: bool,
}

impl UpstreamRef {
    /// `remote/branch`, or just `branch` for a local upstream.
    pub fn display_name(&self) -> String {
        if self.remote == "." {
            self.branch.clone()
        } else {
            format!("{}/{}", self.remote, self.branch)
        }
    }

    fn tracking_ref(remote: &str, branch: &str) -> String {
        if remote == "." {
            format!("refs/heads/{branch}")
        } else {
            format!("refs/remotes/{remote}/{branch}")
        }
    }
}

/// The checked-out branch or detached commit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Head {
    /// `None` when detached.
    pub name: Option<BranchName>,
    /// `None` on an unborn branch.
    pub commit_id: Option<Oid>,
    pub commit: Option<Arc<Commit>>,
    pub upstream: Option<UpstreamRef>,
    pub push_remote: Option<UpstreamRef>,
    /// A tag pointing at the HEAD commit.
    pub tag: Option<Ref>,
    /// Counts against the upstream as reported by status.
    pub ahead: u32,
    pub behind: u32,
}

impl Head {
    pub fn is_detached(&self) -> bool {
        self.name.is_none()
    }

    pub fn is_unborn(&self) -> bool {
        self.commit_id.is_none()
    }
}

/// One consistent, immutable view of a working copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepoSnapshot {
    pub work_dir: PathBuf,
    pub git_dir: PathBuf,
    pub head: Head,
    pub unstaged: Vec<Change>,
    pub staged: Vec<Change>,
    /// Unmerged paths of a stopped merge, rebase, or pick.
    pub merge_changes: Vec<Change>,
    pub untracked: Vec<Change>,
    pub stashes: Vec<Stash>,
    /// Recent history, newest first.
    pub log: Vec<LogEntry>,
    pub operation: Option<OperationState>,
    pub branches: Vec<Ref>,
    pub remotes: Vec<Remote>,
    pub tags: Vec<Ref>,
    pub submodules: Vec<Submodule>,
    /// Non-fatal lookups that failed, in a fixed order.
    pub degraded: Vec<TaskFailure>,
}

impl RepoSnapshot {
    /// Content hash of the serialized snapshot.
    pub fn fingerprint(&self) -> Result<Fingerprint, serde_json::Error> {
        Ok(Fingerprint::of_bytes(&serde_json::to_vec(self)?))
    }

    /// Whether every lookup succeeded.
    pub fn is_complete(&self) -> bool {
        self.degraded.is_empty()
    }
}

/// Shared dependency tasks of one scan.
///
/// Each result is computed at most once; failures are kept and handed to
/// every dependent rather than retried.
pub struct Deps<'a> {
    ctx: ScanContext<'a>,
    has_head: bool,
    log: OnceCell<Result<Arc<Vec<LogEntry>>, TaskFailure>>,
    refs: OnceCell<Result<Arc<Vec<Ref>>, TaskFailure>>,
}

impl<'a> Deps<'a> {
    fn new(ctx: ScanContext<'a>, has_head: bool) -> Self {
        Self {
            ctx,
            has_head,
            log: OnceCell::new(),
            refs: OnceCell::new(),
        }
    }

    async fn load_log(&self) -> Result<Arc<Vec<LogEntry>>, TaskFailure> {
        if !self.has_head {
            return Ok(Arc::new(Vec::new()));
        }
        let args = commands::log(&LogArgs {
            limit: self.ctx.options.log_limit,
            graph: false,
            decorate: true,
            revisions: Vec::new(),
        });
        let out = self
            .ctx
            .runner
            .output(&args)
            .await
            .map_err(|e| TaskFailure::new("log", e))?;
        Ok(Arc::new(
            LogParser::new(self.ctx.info.object_format).parse(&out),
        ))
    }

    async fn load_refs(&self) -> Result<Arc<Vec<Ref>>, TaskFailure> {
        let out = self
            .ctx
            .runner
            .output(&commands::for_each_ref())
            .await
            .map_err(|e| TaskFailure::new("refs", e))?;
        let refs = parse_refs(&out, self.ctx.info.object_format)
            .map_err(|e| TaskFailure::new("refs", e))?;
        Ok(Arc::new(refs))
    }
}

#[async_trait]
impl History for Deps<'_> {
    async fn log(&self) -> Result<Arc<Vec<LogEntry>>, TaskFailure> {
        self.log.get_or_init(|| self.load_log()).await.clone()
    }

    async fn refs(&self) -> Result<Arc<Vec<Ref>>, TaskFailure> {
        self.refs.get_or_init(|| self.load_refs()).await.clone()
    }
}

/// Keep a successful result; record a failure and fall back to the default.
fn settle<T: Default>(result: Result<T, TaskFailure>, degraded: &mut Vec<TaskFailure>) -> T {
    match result {
        Ok(value) => value,
        Err(failure) => {
            degraded.push(failure);
            T::default()
        }
    }
}

fn settle_probe<T>(task: &str, probe: Probe<T>, degraded: &mut Vec<TaskFailure>) -> Option<T> {
    match probe {
        Probe::Active(state) => Some(state),
        Probe::Inactive => None,
        Probe::Failed(e) => {
            degraded.push(TaskFailure::new(task, e));
            None
        }
    }
}

/// Build a snapshot of the working copy.
///
/// # Errors
///
/// Only the status query, its parsing, and the untracked listing are
/// fatal. Every other failure is recorded in [`RepoSnapshot::degraded`].
pub async fn scan(ctx: ScanContext<'_>) -> Result<RepoSnapshot, ScanError> {
    let started = Instant::now();
    let format = ctx.info.object_format;

    let status_out = ctx
        .runner
        .output(&commands::status())
        .await
        .map_err(ScanError::Status)?;
    let status = parse_status(&status_out, format)?;

    let deps = Deps::new(ctx, status.branch.oid.is_some());
    let files = StateFiles::new(StrataPaths::from_repo_info(ctx.info));
    let resolver_ctx = ResolverContext {
        files: &files,
        runner: ctx.runner,
        cache: ctx.cache,
        history: &deps,
        head_commit: status.branch.oid.as_ref(),
        abbrev_len: ctx.options.abbrev_len,
    };

    let (
        untracked,
        stashes,
        log,
        refs,
        remotes,
        submodules,
        (unstaged, unstaged_failures),
        (staged, staged_failures),
        (merge_changes, merge_failures),
        (head, head_failures),
        rebasing,
        merging,
        reverting,
        cherry_picking,
    ) = tokio::join!(
        list_untracked(ctx),
        list_stashes(ctx),
        deps.log(),
        deps.refs(),
        list_remotes(ctx, &deps),
        list_submodules(ctx),
        attach_diffs(ctx, status.unstaged, DiffSide::Worktree),
        attach_diffs(ctx, status.staged, DiffSide::Index),
        attach_diffs(ctx, status.unmerged, DiffSide::Worktree),
        resolve_head(ctx, &deps, &status.branch),
        rebasing::resolve(&resolver_ctx),
        merging::resolve(&resolver_ctx),
        sequencer::resolve_revert(&resolver_ctx),
        sequencer::resolve_cherry_pick(&resolver_ctx),
    );
    let untracked = untracked?;

    let mut degraded = Vec::new();
    let stashes = settle(stashes, &mut degraded);
    let log = settle(log, &mut degraded);
    let refs = settle(refs, &mut degraded);
    let remotes = settle(remotes, &mut degraded);
    let submodules = settle(submodules, &mut degraded);
    degraded.extend(unstaged_failures);
    degraded.extend(staged_failures);
    degraded.extend(merge_failures);
    degraded.extend(head_failures);

    let candidates: Vec<OperationState> = [
        settle_probe("rebasing", rebasing, &mut degraded).map(OperationState::Rebasing),
        settle_probe("merging", merging, &mut degraded).map(OperationState::Merging),
        settle_probe("reverting", reverting, &mut degraded).map(OperationState::Reverting),
        settle_probe("cherry-picking", cherry_picking, &mut degraded)
            .map(OperationState::CherryPicking),
    ]
    .into_iter()
    .flatten()
    .collect();
    if candidates.len() > 1 {
        let labels: Vec<_> = candidates.iter().map(OperationState::label).collect();
        warn!(active = ?labels, kept = labels[0], "several operations in progress");
    }
    let operation = candidates.into_iter().next();

    for failure in &degraded {
        warn!(task = %failure.task, error = %failure.message, "lookup degraded");
    }

    let branches = refs
        .iter()
        .filter(|r| r.kind == RefKind::Head)
        .cloned()
        .collect();
    let tags = refs
        .iter()
        .filter(|r| r.kind == RefKind::Tag)
        .cloned()
        .collect();

    let snapshot = RepoSnapshot {
        work_dir: ctx.info.work_dir.clone(),
        git_dir: ctx.info.git_dir.clone(),
        head,
        unstaged,
        staged,
        merge_changes,
        untracked,
        stashes,
        log: log.to_vec(),
        operation,
        branches,
        remotes,
        tags,
        submodules,
        degraded,
    };

    debug!(
        work_dir = %ctx.info.work_dir.display(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        degraded = snapshot.degraded.len(),
        "scan complete"
    );
    Ok(snapshot)
}

async fn list_untracked(ctx: ScanContext<'_>) -> Result<Vec<Change>, ScanError> {
    if !ctx.options.show_untracked {
        return Ok(Vec::new());
    }
    let out = ctx
        .runner
        .output(&commands::untracked())
        .await
        .map_err(ScanError::Untracked)?;
    Ok(parse_untracked(&out))
}

async fn list_stashes(ctx: ScanContext<'_>) -> Result<Vec<Stash>, TaskFailure> {
    let out = ctx
        .runner
        .output(&commands::stash_list())
        .await
        .map_err(|e| TaskFailure::new("stashes", e))?;
    Ok(parse_stash_list(&out))
}

async fn list_remotes(ctx: ScanContext<'_>, deps: &Deps<'_>) -> Result<Vec<Remote>, TaskFailure> {
    let args = commands::remotes();
    let (out, refs) = tokio::join!(ctx.runner.output(&args), deps.refs());
    let mut remotes = parse_remotes(&out.map_err(|e| TaskFailure::new("remotes", e))?);
    // A refs failure is recorded by the refs task itself.
    if let Ok(refs) = refs {
        group_remote_branches(&mut remotes, &refs);
    }
    Ok(remotes)
}

async fn list_submodules(ctx: ScanContext<'_>) -> Result<Vec<Submodule>, TaskFailure> {
    let gitmodules = ctx.info.work_dir.join(".gitmodules");
    if !tokio::fs::try_exists(&gitmodules).await.unwrap_or(false) {
        return Ok(Vec::new());
    }
    let out = ctx
        .runner
        .output(&commands::submodule_status())
        .await
        .map_err(|e| TaskFailure::new("submodules", e))?;
    parse_submodule_status(&out, ctx.info.object_format)
        .map_err(|e| TaskFailure::new("submodules", e))
}

#[derive(Debug, Clone, Copy)]
enum DiffSide {
    Worktree,
    Index,
}

async fn attach_diffs(
    ctx: ScanContext<'_>,
    changes: Vec<Change>,
    side: DiffSide,
) -> (Vec<Change>, Vec<TaskFailure>) {
    let results: Vec<(Change, Option<TaskFailure>)> = stream::iter(changes)
        .map(|mut change| async move {
            let args = match side {
                DiffSide::Worktree => commands::diff_worktree(&change.path),
                DiffSide::Index if change.is_rename() => {
                    commands::diff_cached_renamed(&change.original_path, &change.path)
                }
                DiffSide::Index => commands::diff_cached(&change.path),
            };
            match ctx.runner.output(&args).await {
                Ok(diff) => {
                    change.hunks = parse_diff_hunks(&diff);
                    change.diff = Some(diff);
                    (change, None)
                }
                Err(e) => {
                    let failure = TaskFailure::new(format!("diff {}", change.path.display()), e);
                    (change, Some(failure))
                }
            }
        })
        .buffered(DIFF_CONCURRENCY)
        .collect()
        .await;

    let mut failures = Vec::new();
    let changes = results
        .into_iter()
        .map(|(change, failure)| {
            failures.extend(failure);
            change
        })
        .collect();
    (changes, failures)
}

async fn branch_config(
    ctx: ScanContext<'_>,
    name: Option<&BranchName>,
) -> Result<BranchConfig, TaskFailure> {
    let Some(name) = name else {
        return Ok(BranchConfig::default());
    };
    let args = commands::branch_config(name.as_str());
    let out = ctx
        .runner
        .run(&args, None)
        .await
        .map_err(|e| TaskFailure::new("branch config", e))?;
    // Exit 1: none of the keys are set.
    if out.exit_code == 1 {
        return Ok(BranchConfig::default());
    }
    let stdout = out
        .into_stdout(&args)
        .map_err(|e| TaskFailure::new("branch config", e))?;
    Ok(parse_branch_config(&stdout, name.as_str()))
}

async fn resolve_head(
    ctx: ScanContext<'_>,
    deps: &Deps<'_>,
    header: &BranchHeader,
) -> (Head, Vec<TaskFailure>) {
    let mut failures = Vec::new();
    let name = header
        .head
        .as_deref()
        .and_then(|n| BranchName::new(n).ok());
    let mut head = Head {
        name: name.clone(),
        commit_id: header.oid.clone(),
        ahead: header.ahead,
        behind: header.behind,
        ..Head::default()
    };
    let Some(commit_id) = header.oid.as_ref() else {
        return (head, failures);
    };

    let (commit, refs, config) = tokio::join!(
        ctx.cache.resolve(ctx.runner, commit_id),
        deps.refs(),
        branch_config(ctx, name.as_ref()),
    );
    match commit {
        Ok(commit) => head.commit = Some(commit),
        Err(e) => failures.push(TaskFailure::new("head commit", e)),
    }
    let refs = refs.unwrap_or_default();
    let config = settle(config, &mut failures);

    head.tag = refs
        .iter()
        .find(|r| r.kind == RefKind::Tag && &r.commit == commit_id)
        .cloned();

    let Some(name) = name else {
        return (head, failures);
    };

    let upstream_name = refs
        .iter()
        .find(|r| r.kind == RefKind::Head && r.name == name.as_str())
        .and_then(|r| r.upstream.clone())
        .or_else(|| {
            let (remote, branch) = header.upstream.as_deref()?.split_once('/')?;
            Some(UpstreamName {
                remote: remote.to_string(),
                branch: branch.to_string(),
            })
        });
    let push_name = config.push_remote().map(|remote| UpstreamName {
        remote: remote.to_string(),
        branch: name.as_str().to_string(),
    });
    let diverged = header.ahead > 0 || header.behind > 0;

    let (upstream, push_remote) = tokio::join!(
        async {
            match upstream_name {
                Some(n) => Some(resolve_counterpart(ctx, &refs, n, config.rebase(), |_| diverged).await),
                None => None,
            }
        },
        async {
            match push_name {
                Some(n) => Some(
                    resolve_counterpart(ctx, &refs, n, config.rebase(), |tip| tip != commit_id)
                        .await,
                ),
                None => None,
            }
        },
    );

    if let Some((upstream, mut errs)) = upstream {
        head.upstream = Some(upstream);
        failures.append(&mut errs);
    }
    if let Some((push_remote, mut errs)) = push_remote {
        head.push_remote = Some(push_remote);
        failures.append(&mut errs);
    }
    (head, failures)
}

/// Resolve a tracking ref's commit and, when `compare` says so, its
/// divergence from HEAD.
async fn resolve_counterpart(
    ctx: ScanContext<'_>,
    refs: &[Ref],
    name: UpstreamName,
    rebase: bool,
    compare: impl Fn(&Oid) -> bool,
) -> (UpstreamRef, Vec<TaskFailure>) {
    let mut failures = Vec::new();
    let mut counterpart = UpstreamRef {
        commit: None,
        ahead: Vec::new(),
        behind: Vec::new(),
        rebase,
        remote: name.remote,
        branch: name.branch,
    };
    let full_name = UpstreamRef::tracking_ref(&counterpart.remote, &counterpart.branch);
    let Some(tracking) = refs.iter().find(|r| r.full_name.as_str() == full_name) else {
        return (counterpart, failures);
    };
    let label = counterpart.display_name();

    let should_compare = compare(&tracking.commit);
    let (commit, divergence) = tokio::join!(
        ctx.cache.resolve(ctx.runner, &tracking.commit),
        async {
            if should_compare {
                resolve_divergence(ctx.runner, ctx.cache, "HEAD", &full_name)
                    .await
                    .map(Some)
            } else {
                Ok(None)
            }
        }
    );
    match commit {
        Ok(commit) => counterpart.commit = Some(commit),
        Err(e) => failures.push(TaskFailure::new(format!("{label} commit"), e)),
    }
    match divergence {
        Ok(Some(Divergence { ahead, behind })) => {
            counterpart.ahead = ahead;
            counterpart.behind = behind;
        }
        Ok(None) => {}
        Err(e) => failures.push(TaskFailure::new(format!("{label} divergence"), e)),
    }
    (counterpart, failures)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{ObjectFormat, UtcTimestamp};
    use crate::git::mock::MockRunner;
    use tempfile::TempDir;

    const HEAD_ID: &str = "1111111111111111111111111111111111111111";
    const UPSTREAM_ID: &str = "2222222222222222222222222222222222222222";

    fn commit(id: &str, message: &str) -> Commit {
        let ts = UtcTimestamp::from_unix_seconds(1_700_000_000).unwrap();
        Commit {
            id: Oid::new(id).unwrap(),
            parents: Vec::new(),
            author_name: "Ada".into(),
            author_email: "ada@example.com".into(),
            author_time: ts,
            commit_time: ts,
            message: message.into(),
        }
    }

    fn repo() -> (TempDir, RepoInfo) {
        let temp = TempDir::new().unwrap();
        let git_dir = temp.path().join(".git");
        std::fs::create_dir_all(&git_dir).unwrap();
        let info = RepoInfo {
            common_dir: git_dir.clone(),
            git_dir,
            work_dir: temp.path().to_path_buf(),
            object_format: ObjectFormat::Sha1,
        };
        (temp, info)
    }

    fn status(ab: &str) -> String {
        [
            format!("# branch.oid {HEAD_ID}"),
            "# branch.head main".to_string(),
            "# branch.upstream origin/main".to_string(),
            format!("# branch.ab {ab}"),
            format!("1 .M N... 100644 100644 100644 {HEAD_ID} {HEAD_ID} a.txt"),
            String::new(),
        ]
        .join("\0")
    }

    fn refs() -> String {
        [
            format!("refs/heads/main\0{HEAD_ID}\0\0origin\0refs/heads/main"),
            format!("refs/remotes/origin/main\0{UPSTREAM_ID}\0\0\0"),
            format!("refs/tags/v1\0{HEAD_ID}\0\0\0"),
        ]
        .join("\n")
    }

    fn runner(ab: &str) -> MockRunner {
        MockRunner::new()
            .on_args(commands::status(), &status(ab))
            .on_args(commands::untracked(), "new.txt\0")
            .on_args(commands::stash_list(), "stash@{0}: WIP on main: 1111111 Head\n")
            .on_prefix(
                &["log"],
                &format!("{HEAD_ID} (HEAD -> main, tag: v1) [Ada] [1700000000]Head\n"),
            )
            .on_args(commands::for_each_ref(), &refs())
            .on_args(commands::remotes(), "origin\thttps://example.com/r.git (fetch)\n")
            .on_prefix(&["config", "--get-regexp"], "branch.main.rebase true\n")
            .on_prefix(&["diff"], "@@ -1 +1 @@\n-a\n+b\n")
            .on_args(
                commands::rev_list_left_right("HEAD", "refs/remotes/origin/main"),
                &format!(">{UPSTREAM_ID}\n"),
            )
            .with_commit(&commit(HEAD_ID, "Head"))
            .with_commit(&commit(UPSTREAM_ID, "Upstream"))
    }

    async fn run_scan(runner: &MockRunner, info: &RepoInfo) -> Result<RepoSnapshot, ScanError> {
        let cache = CommitCache::new(ObjectFormat::Sha1);
        let options = ScanOptions::default();
        scan(ScanContext {
            info,
            runner,
            cache: &cache,
            options: &options,
        })
        .await
    }

    #[tokio::test]
    async fn assembles_every_section() {
        let (_temp, info) = repo();
        let runner = runner("+0 -1");
        let snapshot = run_scan(&runner, &info).await.unwrap();

        assert!(snapshot.is_complete(), "{:?}", snapshot.degraded);
        assert_eq!(snapshot.head.name.as_ref().map(|n| n.as_str()), Some("main"));
        assert_eq!(snapshot.head.commit.as_ref().unwrap().summary(), "Head");
        assert_eq!(snapshot.head.tag.as_ref().unwrap().name, "v1");

        let upstream = snapshot.head.upstream.as_ref().unwrap();
        assert_eq!(upstream.display_name(), "origin/main");
        assert!(upstream.rebase);
        assert!(upstream.ahead.is_empty());
        assert_eq!(upstream.behind.len(), 1);
        assert_eq!(upstream.behind[0].summary(), "Upstream");
        assert!(snapshot.head.push_remote.is_none());

        assert_eq!(snapshot.unstaged.len(), 1);
        assert_eq!(snapshot.unstaged[0].hunks.len(), 1);
        assert_eq!(snapshot.untracked.len(), 1);
        assert_eq!(snapshot.stashes.len(), 1);
        assert_eq!(snapshot.log.len(), 1);
        assert_eq!(snapshot.branches.len(), 1);
        assert_eq!(snapshot.tags.len(), 1);
        assert_eq!(snapshot.remotes[0].branches.len(), 1);
        assert!(snapshot.operation.is_none());
        assert!(snapshot.submodules.is_empty());
    }

    #[tokio::test]
    async fn shared_queries_run_once() {
        let (temp, info) = repo();
        // An active rebase makes the resolver consume the log and refs too.
        let git_dir = temp.path().join(".git");
        std::fs::create_dir_all(git_dir.join("rebase-merge")).unwrap();
        std::fs::write(git_dir.join("REBASE_HEAD"), format!("{UPSTREAM_ID}\n")).unwrap();
        std::fs::write(git_dir.join("rebase-merge/head-name"), "refs/heads/main\n").unwrap();
        std::fs::write(git_dir.join("rebase-merge/onto"), format!("{UPSTREAM_ID}\n")).unwrap();
        std::fs::write(git_dir.join("rebase-merge/msgnum"), "2\n").unwrap();

        let runner = runner("+0 -1");
        let snapshot = run_scan(&runner, &info).await.unwrap();

        assert_eq!(runner.call_count(&["log"]), 1);
        assert_eq!(runner.call_count(&["for-each-ref"]), 1);
        match snapshot.operation {
            Some(OperationState::Rebasing(state)) => {
                assert_eq!(state.done.len(), 1);
                assert_eq!(state.onto.name, UPSTREAM_ID[..7].to_string());
            }
            other => panic!("expected rebasing, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn even_upstream_skips_divergence() {
        let (_temp, info) = repo();
        let runner = runner("+0 -0");
        let snapshot = run_scan(&runner, &info).await.unwrap();

        assert_eq!(runner.call_count(&["rev-list"]), 0);
        let upstream = snapshot.head.upstream.unwrap();
        assert!(upstream.behind.is_empty());
        assert!(upstream.commit.is_some());
    }

    #[tokio::test]
    async fn status_failure_is_fatal() {
        let (_temp, info) = repo();
        let runner = MockRunner::new().fail_prefix(&["status"], 128, "fatal: not a git repository");
        let err = run_scan(&runner, &info).await.unwrap_err();
        assert!(matches!(err, ScanError::Status(_)));
    }

    #[tokio::test]
    async fn untracked_failure_is_fatal() {
        let (_temp, info) = repo();
        let runner = runner("+0 -0").fail_prefix(&["ls-files"], 128, "fatal: index corrupt");
        let err = run_scan(&runner, &info).await.unwrap_err();
        assert!(matches!(err, ScanError::Untracked(_)));
    }

    #[tokio::test]
    async fn stash_failure_degrades_only_stashes() {
        let (_temp, info) = repo();
        let runner = runner("+0 -0").fail(&["stash", "list"], 1, "boom");
        let snapshot = run_scan(&runner, &info).await.unwrap();

        assert!(snapshot.stashes.is_empty());
        assert_eq!(snapshot.degraded.len(), 1);
        assert_eq!(snapshot.degraded[0].task, "stashes");
        assert_eq!(snapshot.log.len(), 1);
        assert_eq!(snapshot.unstaged.len(), 1);
    }

    #[tokio::test]
    async fn diff_failure_keeps_the_change() {
        let (_temp, info) = repo();
        let runner = runner("+0 -0").fail_prefix(&["diff"], 128, "fatal: bad path");
        let snapshot = run_scan(&runner, &info).await.unwrap();

        assert_eq!(snapshot.unstaged.len(), 1);
        assert!(snapshot.unstaged[0].diff.is_none());
        assert_eq!(snapshot.degraded[0].task, "diff a.txt");
    }

    #[tokio::test]
    async fn unborn_head_skips_log() {
        let (_temp, info) = repo();
        let runner = MockRunner::new()
            .on_args(
                commands::status(),
                "# branch.oid (initial)\0# branch.head main\0",
            )
            .on_args(commands::untracked(), "")
            .on_args(commands::stash_list(), "")
            .on_args(commands::for_each_ref(), "")
            .on_args(commands::remotes(), "");
        let snapshot = run_scan(&runner, &info).await.unwrap();

        assert!(snapshot.is_complete(), "{:?}", snapshot.degraded);
        assert!(snapshot.head.is_unborn());
        assert!(snapshot.log.is_empty());
        assert_eq!(runner.call_count(&["log"]), 0);
    }

    #[tokio::test]
    async fn hidden_untracked_not_listed() {
        let (_temp, info) = repo();
        let runner = runner("+0 -0");
        let cache = CommitCache::new(ObjectFormat::Sha1);
        let options = ScanOptions {
            show_untracked: false,
            ..ScanOptions::default()
        };
        let snapshot = scan(ScanContext {
            info: &info,
            runner: &runner,
            cache: &cache,
            options: &options,
        })
        .await
        .unwrap();

        assert!(snapshot.untracked.is_empty());
        assert_eq!(runner.call_count(&["ls-files"]), 0);
    }

    #[tokio::test]
    async fn fingerprint_is_stable() {
        let (_temp, info) = repo();
        let runner = runner("+0 -1");
        let first = run_scan(&runner, &info).await.unwrap();
        let second = run_scan(&runner, &info).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first.fingerprint().unwrap(), second.fingerprint().unwrap());
    }
}
