//! engine::registry
//!
//! Tracked working copies and their refreshes.
//!
//! [`SnapshotEngine`] is an explicit value holding the commit caches and
//! every [`TrackedRepo`]; nothing here is global. Commits are immutable and
//! content addressed, so one cache per object format is shared by every
//! repository using that format.
//!
//! Refreshes are single-flight per repository: a caller arriving while a
//! refresh runs waits for it and receives its snapshot. Only successful
//! refreshes are shared; after a failure each waiter runs its own scan.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use tracing::debug;

use super::commit_cache::CommitCache;
use super::scan::{scan, RepoSnapshot, ScanContext, ScanError, ScanOptions};
use crate::core::types::ObjectFormat;
use crate::git::{GitRunner, RepoInfo};

/// One working copy and its latest snapshot.
pub struct TrackedRepo {
    info: RepoInfo,
    runner: Arc<dyn GitRunner>,
    cache: Arc<CommitCache>,
    options: ScanOptions,
    /// Held for the duration of a refresh.
    in_flight: tokio::sync::Mutex<()>,
    /// Number of successful refreshes.
    completed: AtomicU64,
    latest: RwLock<Option<Arc<RepoSnapshot>>>,
}

impl std::fmt::Debug for TrackedRepo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackedRepo")
            .field("work_dir", &self.info.work_dir)
            .field("completed", &self.completed.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl TrackedRepo {
    fn new(
        info: RepoInfo,
        runner: Arc<dyn GitRunner>,
        cache: Arc<CommitCache>,
        options: ScanOptions,
    ) -> Self {
        Self {
            info,
            runner,
            cache,
            options,
            in_flight: tokio::sync::Mutex::new(()),
            completed: AtomicU64::new(0),
            latest: RwLock::new(None),
        }
    }

    pub fn info(&self) -> &RepoInfo {
        &self.info
    }

    pub fn options(&self) -> &ScanOptions {
        &self.options
    }

    /// The last successful snapshot, if any.
    pub fn latest(&self) -> Option<Arc<RepoSnapshot>> {
        self.latest
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Scan the working copy, or join a scan already in progress.
    pub async fn refresh(&self) -> Result<Arc<RepoSnapshot>, ScanError> {
        let seen = self.completed.load(Ordering::Acquire);
        let _guard = self.in_flight.lock().await;

        if self.completed.load(Ordering::Acquire) != seen {
            if let Some(snapshot) = self.latest() {
                debug!(work_dir = %self.info.work_dir.display(), "joined in-flight refresh");
                return Ok(snapshot);
            }
        }

        let snapshot = Arc::new(
            scan(ScanContext {
                info: &self.info,
                runner: self.runner.as_ref(),
                cache: &self.cache,
                options: &self.options,
            })
            .await?,
        );
        *self.latest.write().unwrap_or_else(PoisonError::into_inner) = Some(snapshot.clone());
        self.completed.fetch_add(1, Ordering::Release);
        Ok(snapshot)
    }
}

/// Registry of tracked working copies.
#[derive(Debug)]
pub struct SnapshotEngine {
    sha1_commits: Arc<CommitCache>,
    sha256_commits: Arc<CommitCache>,
    repos: Mutex<HashMap<PathBuf, Arc<TrackedRepo>>>,
}

impl Default for SnapshotEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotEngine {
    pub fn new() -> Self {
        Self {
            sha1_commits: Arc::new(CommitCache::new(ObjectFormat::Sha1)),
            sha256_commits: Arc::new(CommitCache::new(ObjectFormat::Sha256)),
            repos: Mutex::new(HashMap::new()),
        }
    }

    fn repos(&self) -> MutexGuard<'_, HashMap<PathBuf, Arc<TrackedRepo>>> {
        self.repos.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The shared commit cache for `format`.
    pub fn commit_cache(&self, format: ObjectFormat) -> &Arc<CommitCache> {
        match format {
            ObjectFormat::Sha1 => &self.sha1_commits,
            ObjectFormat::Sha256 => &self.sha256_commits,
        }
    }

    /// Register a working copy, keyed by its root.
    ///
    /// Tracking an already tracked root returns the existing handle and
    /// ignores `runner` and `options`.
    pub fn track(
        &self,
        info: RepoInfo,
        runner: Arc<dyn GitRunner>,
        options: ScanOptions,
    ) -> Arc<TrackedRepo> {
        let mut repos = self.repos();
        if let Some(existing) = repos.get(&info.work_dir) {
            return existing.clone();
        }
        let root = info.work_dir.clone();
        let cache = self.commit_cache(info.object_format).clone();
        debug!(work_dir = %root.display(), format = info.object_format.name(), "tracking repository");
        let repo = Arc::new(TrackedRepo::new(info, runner, cache, options));
        repos.insert(root, repo.clone());
        repo
    }

    pub fn get(&self, root: &Path) -> Option<Arc<TrackedRepo>> {
        self.repos().get(root).cloned()
    }

    /// Stop tracking `root`. Outstanding handles keep working.
    pub fn untrack(&self, root: &Path) -> Option<Arc<TrackedRepo>> {
        self.repos().remove(root)
    }

    /// Tracked roots, sorted.
    pub fn tracked(&self) -> Vec<PathBuf> {
        let mut roots: Vec<PathBuf> = self.repos().keys().cloned().collect();
        roots.sort();
        roots
    }
}
