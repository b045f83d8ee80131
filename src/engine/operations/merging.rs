//! engine::operations::merging
//!
//! A merge is in progress while both `MERGE_HEAD` and `MERGE_MSG` exist.

use super::{MergingState, Probe, ProbeError, ResolverContext};
use crate::core::paths::plumbing;
use crate::engine::parse::{parse_merge_msg, parse_rev_list};
use crate::git::commands;

pub async fn resolve(ctx: &ResolverContext<'_>) -> Probe<MergingState> {
    inspect(ctx).await.into()
}

async fn inspect(ctx: &ResolverContext<'_>) -> Result<Option<MergingState>, ProbeError> {
    let (has_head, has_msg) = tokio::join!(
        ctx.files.exists(plumbing::MERGE_HEAD),
        ctx.files.exists(plumbing::MERGE_MSG)
    );
    if !(has_head && has_msg) {
        return Ok(None);
    }

    let head_text = ctx.read_required(plumbing::MERGE_HEAD).await?;
    let head = ctx.parse_id(plumbing::MERGE_HEAD, &head_text)?;

    let message = ctx.read_required(plumbing::MERGE_MSG).await?;
    let mut branches = parse_merge_msg(message.lines().next().unwrap_or(""));
    if branches.is_empty() {
        branches.push(head.short(ctx.abbrev_len).to_string());
    }

    let listing = ctx
        .runner
        .output(&commands::rev_list_not_in_head(head.as_str()))
        .await?;
    let ids = parse_rev_list(&listing, ctx.format())?;
    let commits = ctx.cache.resolve_all(ctx.runner, &ids).await?;

    Ok(Some(MergingState {
        head,
        branches,
        commits,
    }))
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use super::*;
    use crate::core::types::ObjectFormat;
    use crate::engine::commit_cache::CommitCache;
    use crate::git::mock::MockRunner;

    fn history() -> StaticHistory {
        StaticHistory {
            log: Vec::new(),
            refs: Vec::new(),
        }
    }

    #[tokio::test]
    async fn inactive_without_markers() {
        let (_temp, files) = git_dir();
        let runner = MockRunner::new();
        let cache = CommitCache::new(ObjectFormat::Sha1);
        let history = history();
        let ctx = ResolverContext {
            files: &files,
            runner: &runner,
            cache: &cache,
            history: &history,
            head_commit: None,
            abbrev_len: 7,
        };

        assert!(matches!(resolve(&ctx).await, Probe::Inactive));
        assert!(runner.calls().is_empty());
    }

    #[tokio::test]
    async fn merge_head_alone_is_inactive() {
        let (temp, files) = git_dir();
        write(&temp, "MERGE_HEAD", &format!("{}\n", id('b')));
        let runner = MockRunner::new();
        let cache = CommitCache::new(ObjectFormat::Sha1);
        let history = history();
        let ctx = ResolverContext {
            files: &files,
            runner: &runner,
            cache: &cache,
            history: &history,
            head_commit: None,
            abbrev_len: 7,
        };

        assert!(matches!(resolve(&ctx).await, Probe::Inactive));
    }

    #[tokio::test]
    async fn active_merge() {
        let (temp, files) = git_dir();
        let b = commit('b');
        write(&temp, "MERGE_HEAD", &format!("{}\n", b.id));
        write(
            &temp,
            "MERGE_MSG",
            "Merge branch 'feature' into main\n\n# Conflicts:\n#\ta.txt\n",
        );
        let runner = MockRunner::new()
            .on_args(commands::rev_list_not_in_head(b.id.as_str()), &format!("{}\n", b.id))
            .with_commit(&b);
        let cache = CommitCache::new(ObjectFormat::Sha1);
        let history = history();
        let ctx = ResolverContext {
            files: &files,
            runner: &runner,
            cache: &cache,
            history: &history,
            head_commit: None,
            abbrev_len: 7,
        };

        let state = resolve(&ctx).await.active().unwrap();
        assert_eq!(state.head, b.id);
        assert_eq!(state.branches, ["feature"]);
        assert_eq!(state.commits.len(), 1);
        assert_eq!(state.commits[0].id, b.id);
    }

    #[tokio::test]
    async fn unknown_message_falls_back_to_short_id() {
        let (temp, files) = git_dir();
        write(&temp, "MERGE_HEAD", &format!("{}\n", id('c')));
        write(&temp, "MERGE_MSG", "my own words\n");
        let runner = MockRunner::new().on_prefix(&["rev-list"], "");
        let cache = CommitCache::new(ObjectFormat::Sha1);
        let history = history();
        let ctx = ResolverContext {
            files: &files,
            runner: &runner,
            cache: &cache,
            history: &history,
            head_commit: None,
            abbrev_len: 7,
        };

        let state = resolve(&ctx).await.active().unwrap();
        assert_eq!(state.branches, ["ccccccc"]);
        assert!(state.commits.is_empty());
    }

    #[tokio::test]
    async fn garbage_merge_head_fails() {
        let (temp, files) = git_dir();
        write(&temp, "MERGE_HEAD", "not an id\n");
        write(&temp, "MERGE_MSG", "Merge branch 'x'\n");
        let runner = MockRunner::new();
        let cache = CommitCache::new(ObjectFormat::Sha1);
        let history = history();
        let ctx = ResolverContext {
            files: &files,
            runner: &runner,
            cache: &cache,
            history: &history,
            head_commit: None,
            abbrev_len: 7,
        };

        assert!(matches!(
            resolve(&ctx).await,
            Probe::Failed(ProbeError::Malformed { .. })
        ));
    }
}
