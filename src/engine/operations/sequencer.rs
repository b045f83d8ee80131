//! engine::operations::sequencer
//!
//! Cherry-pick and revert share git's sequencer: a marker file at the top
//! of the metadata directory (`CHERRY_PICK_HEAD` or `REVERT_HEAD`) plus an
//! optional `sequencer/` directory for multi-commit runs.

use super::{Probe, ProbeError, ResolverContext, SequencerState};
use crate::core::paths::plumbing;
use crate::engine::parse::parse_todo;

/// Cherry-pick in progress.
pub async fn resolve_cherry_pick(ctx: &ResolverContext<'_>) -> Probe<SequencerState> {
    inspect(ctx, plumbing::CHERRY_PICK_HEAD).await.into()
}

/// Revert in progress.
pub async fn resolve_revert(ctx: &ResolverContext<'_>) -> Probe<SequencerState> {
    inspect(ctx, plumbing::REVERT_HEAD).await.into()
}

async fn inspect(
    ctx: &ResolverContext<'_>,
    marker: &'static str,
) -> Result<Option<SequencerState>, ProbeError> {
    if !ctx.files.exists(marker).await {
        return Ok(None);
    }
    let current_id = ctx.parse_id(marker, &ctx.read_required(marker).await?)?;

    // The first todo entry is the commit being applied right now.
    let todo = ctx
        .files
        .read(plumbing::SEQUENCER_TODO)
        .await
        .unwrap_or_default();
    let mut upcoming: Vec<_> = parse_todo(&todo).into_iter().skip(1).collect();
    upcoming.reverse();

    let original_head = match ctx.files.read(plumbing::SEQUENCER_HEAD).await {
        Some(text) => ctx.parse_id(plumbing::SEQUENCER_HEAD, &text)?,
        None => ctx.head_commit.cloned().ok_or(ProbeError::NoHead)?,
    };

    let current = ctx.cache.resolve(ctx.runner, &current_id).await?;

    Ok(Some(SequencerState {
        original_head,
        current,
        upcoming,
    }))
}
