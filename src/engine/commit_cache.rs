//! engine::commit_cache
//!
//! Memoized commit lookups shared across snapshots.
//!
//! # Invariants
//!
//! - Commit ids are content addressed, so a resolved entry never goes stale
//!   and the cache is append-only.
//! - Concurrent resolutions of one id issue a single `git show`; the other
//!   callers wait on the same cell.
//! - A failed resolution leaves its cell empty; the next caller retries.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use futures::future::try_join_all;
use thiserror::Error;
use tokio::sync::OnceCell;

use super::parse::{parse_commit_record, ParseError};
use crate::core::model::Commit;
use crate::core::types::{ObjectFormat, Oid};
use crate::git::{commands, GitRunner, RunnerError};

/// Errors from resolving a commit.
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("failed to look up commit {id}: {source}")]
    Run { id: String, source: RunnerError },

    #[error("failed to parse commit {id}: {source}")]
    Parse { id: String, source: ParseError },

    #[error("asked for commit {requested} but git returned {returned}")]
    Mismatch { requested: String, returned: String },
}

type Cell = Arc<OnceCell<Arc<Commit>>>;

/// Caller-owned commit cache.
#[derive(Debug)]
pub struct CommitCache {
    format: ObjectFormat,
    cells: Mutex<HashMap<Oid, Cell>>,
}

impl CommitCache {
    pub fn new(format: ObjectFormat) -> Self {
        Self {
            format,
            cells: Mutex::new(HashMap::new()),
        }
    }

    pub fn format(&self) -> ObjectFormat {
        self.format
    }

    fn cell(&self, id: &Oid) -> Cell {
        let mut cells = self.cells.lock().unwrap_or_else(PoisonError::into_inner);
        cells.entry(id.clone()).or_default().clone()
    }

    /// Number of resolved commits.
    pub fn len(&self) -> usize {
        self.cells
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|cell| cell.initialized())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Already-resolved commit, without running git.
    pub fn get(&self, id: &Oid) -> Option<Arc<Commit>> {
        self.cells
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .and_then(|cell| cell.get().cloned())
    }

    /// Resolve `id`, running git at most once per id.
    pub async fn resolve(
        &self,
        runner: &dyn GitRunner,
        id: &Oid,
    ) -> Result<Arc<Commit>, LookupError> {
        let cell = self.cell(id);
        let commit = cell
            .get_or_try_init(|| async {
                let out = runner
                    .output(&commands::show_commit(id.as_str()))
                    .await
                    .map_err(|source| LookupError::Run {
                        id: id.to_string(),
                        source,
                    })?;
                let commit =
                    parse_commit_record(&out, self.format).map_err(|source| LookupError::Parse {
                        id: id.to_string(),
                        source,
                    })?;
                if &commit.id != id {
                    return Err(LookupError::Mismatch {
                        requested: id.to_string(),
                        returned: commit.id.to_string(),
                    });
                }
                Ok(Arc::new(commit))
            })
            .await?;
        Ok(commit.clone())
    }

    /// Resolve every id concurrently, preserving order.
    pub async fn resolve_all(
        &self,
        runner: &dyn GitRunner,
        ids: &[Oid],
    ) -> Result<Vec<Arc<Commit>>, LookupError> {
        try_join_all(ids.iter().map(|id| self.resolve(runner, id))).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::UtcTimestamp;
    use crate::git::mock::MockRunner;

    fn commit(c: char) -> Commit {
        let ts = UtcTimestamp::from_unix_seconds(1_700_000_000).unwrap();
        Commit {
            id: Oid::new(c.to_string().repeat(40)).unwrap(),
            parents: Vec::new(),
            author_name: "Ada".into(),
            author_email: "ada@example.com".into(),
            author_time: ts,
            commit_time: ts,
            message: format!("Commit {c}"),
        }
    }

    #[tokio::test]
    async fn resolves_and_memoizes() {
        let a = commit('a');
        let runner = MockRunner::new().with_commit(&a);
        let cache = CommitCache::new(ObjectFormat::Sha1);

        let first = cache.resolve(&runner, &a.id).await.unwrap();
        let second = cache.resolve(&runner, &a.id).await.unwrap();

        assert_eq!(*first, a);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(runner.call_count(&["show"]), 1);
        assert_eq!(cache.len(), 1);
        assert!(cache.get(&a.id).is_some());
    }

    #[tokio::test]
    async fn concurrent_lookups_collapse() {
        let a = commit('a');
        let runner = MockRunner::new().with_commit(&a);
        let cache = CommitCache::new(ObjectFormat::Sha1);

        let ids = vec![a.id.clone(); 8];
        let commits = cache.resolve_all(&runner, &ids).await.unwrap();

        assert_eq!(commits.len(), 8);
        assert_eq!(runner.call_count(&["show"]), 1);
    }

    #[tokio::test]
    async fn resolve_all_preserves_order() {
        let (a, b) = (commit('a'), commit('b'));
        let runner = MockRunner::new().with_commit(&a).with_commit(&b);
        let cache = CommitCache::new(ObjectFormat::Sha1);

        let commits = cache
            .resolve_all(&runner, &[b.id.clone(), a.id.clone()])
            .await
            .unwrap();
        assert_eq!(commits[0].id, b.id);
        assert_eq!(commits[1].id, a.id);
    }

    #[tokio::test]
    async fn failure_is_retried() {
        let a = commit('a');
        let cache = CommitCache::new(ObjectFormat::Sha1);

        let failing = MockRunner::new().fail_prefix(&["show"], 128, "fatal: bad object");
        let err = cache.resolve(&failing, &a.id).await.unwrap_err();
        assert!(matches!(err, LookupError::Run { .. }));
        assert!(cache.is_empty());

        let working = MockRunner::new().with_commit(&a);
        assert!(cache.resolve(&working, &a.id).await.is_ok());
    }

    #[tokio::test]
    async fn mismatched_record_rejected() {
        let (a, b) = (commit('a'), commit('b'));
        let record = MockRunner::new()
            .with_commit(&b)
            .output(&commands::show_commit(b.id.as_str()))
            .await
            .unwrap();
        let runner = MockRunner::new().on_args(commands::show_commit(a.id.as_str()), &record);

        let cache = CommitCache::new(ObjectFormat::Sha1);
        let err = cache.resolve(&runner, &a.id).await.unwrap_err();
        assert!(matches!(err, LookupError::Mismatch { .. }));
    }
}
