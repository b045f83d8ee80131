//! engine::divergence
//!
//! Ahead/behind commit lists between two revisions.

use std::sync::Arc;

use thiserror::Error;

use super::commit_cache::{CommitCache, LookupError};
use super::parse::{parse_left_right, ParseError};
use crate::core::model::Commit;
use crate::git::{commands, GitRunner, RunnerError};

#[derive(Debug, Error)]
pub enum DivergenceError {
    #[error("failed to list divergence: {0}")]
    Run(#[from] RunnerError),

    #[error("failed to parse divergence: {0}")]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Lookup(#[from] LookupError),
}

/// Commits only on one side of a comparison, newest first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Divergence {
    /// Reachable from the left revision only.
    pub ahead: Vec<Arc<Commit>>,
    /// Reachable from the right revision only.
    pub behind: Vec<Arc<Commit>>,
}

/// Compare `left` against `right` with `rev-list --left-right` and resolve
/// both sides through the cache.
pub async fn resolve_divergence(
    runner: &dyn GitRunner,
    cache: &CommitCache,
    left: &str,
    right: &str,
) -> Result<Divergence, DivergenceError> {
    let out = runner
        .output(&commands::rev_list_left_right(left, right))
        .await?;
    let (ahead, behind) = parse_left_right(&out, cache.format())?;
    let (ahead, behind) = tokio::try_join!(
        cache.resolve_all(runner, &ahead),
        cache.resolve_all(runner, &behind)
    )?;
    Ok(Divergence { ahead, behind })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{ObjectFormat, Oid, UtcTimestamp};
    use crate::git::mock::MockRunner;

    fn commit(c: char) -> Commit {
        let ts = UtcTimestamp::from_unix_seconds(0).unwrap();
        Commit {
            id: Oid::new(c.to_string().repeat(40)).unwrap(),
            parents: Vec::new(),
            author_name: "A".into(),
            author_email: "a@example.com".into(),
            author_time: ts,
            commit_time: ts,
            message: c.to_string(),
        }
    }

    #[tokio::test]
    async fn partitions_in_emission_order() {
        let (a, b, c) = (commit('a'), commit('b'), commit('c'));
        let listing = format!(">{}\n<{}\n<{}\n", b.id, c.id, a.id);
        let runner = MockRunner::new()
            .on_args(commands::rev_list_left_right("HEAD", "origin/main"), &listing)
            .with_commit(&a)
            .with_commit(&b)
            .with_commit(&c);
        let cache = CommitCache::new(ObjectFormat::Sha1);

        let div = resolve_divergence(&runner, &cache, "HEAD", "origin/main")
            .await
            .unwrap();

        let ids = |v: &[Arc<Commit>]| v.iter().map(|c| c.id.clone()).collect::<Vec<_>>();
        assert_eq!(ids(&div.ahead), [c.id.clone(), a.id.clone()]);
        assert_eq!(ids(&div.behind), [b.id.clone()]);
    }

    #[tokio::test]
    async fn even_comparison_is_empty() {
        let runner = MockRunner::new().on_prefix(&["rev-list"], "");
        let cache = CommitCache::new(ObjectFormat::Sha1);
        let div = resolve_divergence(&runner, &cache, "HEAD", "x").await.unwrap();
        assert_eq!(div, Divergence::default());
    }

    #[tokio::test]
    async fn listing_failure_propagates() {
        let runner = MockRunner::new().fail_prefix(&["rev-list"], 128, "fatal: bad revision");
        let cache = CommitCache::new(ObjectFormat::Sha1);
        let err = resolve_divergence(&runner, &cache, "HEAD", "gone")
            .await
            .unwrap_err();
        assert!(matches!(err, DivergenceError::Run(_)));
    }
}
