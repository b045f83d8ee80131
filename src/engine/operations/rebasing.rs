//! engine::operations::rebasing
//!
//! A rebase is in progress while a commit is being replayed (`REBASE_HEAD`,
//! or `rebase-merge/stopped-sha` from older gits). The layout of the state
//! directory decides the flavour:
//!
//! - `rebase-apply/` populated: patch based, non-interactive. Progress is
//!   `next` of `last`; remaining commits are recovered from the numbered
//!   patch files.
//! - `rebase-merge/` populated: todo-list based, interactive. Progress is
//!   `msgnum`; remaining commits are the todo list.
//! - neither: the marker is stale and the rebase is treated as inactive.

use tracing::debug;

use super::{Probe, ProbeError, RebaseOnto, RebasingState, ResolverContext};
use crate::core::model::{branch_from_head_name, PlannedCommit, RefKind};
use crate::core::paths::plumbing;
use crate::engine::parse::{parse_patch_header, parse_todo};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Layout {
    Apply,
    Merge,
}

impl Layout {
    fn head_name(self) -> &'static str {
        match self {
            Layout::Apply => plumbing::REBASE_APPLY_HEAD_NAME,
            Layout::Merge => plumbing::REBASE_MERGE_HEAD_NAME,
        }
    }

    fn onto(self) -> &'static str {
        match self {
            Layout::Apply => plumbing::REBASE_APPLY_ONTO,
            Layout::Merge => plumbing::REBASE_MERGE_ONTO,
        }
    }

    fn progress(self) -> &'static str {
        match self {
            Layout::Apply => plumbing::REBASE_APPLY_NEXT,
            Layout::Merge => plumbing::REBASE_MERGE_MSGNUM,
        }
    }
}

pub async fn resolve(ctx: &ResolverContext<'_>) -> Probe<RebasingState> {
    inspect(ctx).await.into()
}

async fn detect_layout(ctx: &ResolverContext<'_>) -> Option<Layout> {
    if ctx.files.is_populated_dir(plumbing::REBASE_APPLY_DIR).await {
        Some(Layout::Apply)
    } else if ctx.files.is_populated_dir(plumbing::REBASE_MERGE_DIR).await {
        Some(Layout::Merge)
    } else {
        None
    }
}

fn parse_count(file: &'static str, text: &str) -> Result<u32, ProbeError> {
    text.trim().parse().map_err(|_| ProbeError::Malformed {
        file,
        detail: format!("expected a number, got {text:?}"),
    })
}

async fn inspect(ctx: &ResolverContext<'_>) -> Result<Option<RebasingState>, ProbeError> {
    let marker = match ctx.files.read(plumbing::REBASE_HEAD).await {
        Some(text) => Some((plumbing::REBASE_HEAD, text)),
        None => ctx
            .files
            .read(plumbing::REBASE_MERGE_STOPPED_SHA)
            .await
            .map(|text| (plumbing::REBASE_MERGE_STOPPED_SHA, text)),
    };
    let Some((marker_file, marker)) = marker else {
        return Ok(None);
    };
    let Some(layout) = detect_layout(ctx).await else {
        debug!("replay marker without rebase state directory");
        return Ok(None);
    };

    let head_name = ctx.read_required(layout.head_name()).await?;
    let onto_text = ctx.read_required(layout.onto()).await?;
    let onto_commit = ctx.parse_id(layout.onto(), &onto_text)?;
    let index = parse_count(
        layout.progress(),
        &ctx.read_required(layout.progress()).await?,
    )?;

    let upcoming = match layout {
        Layout::Merge => {
            let todo = ctx
                .files
                .read(plumbing::REBASE_MERGE_TODO)
                .await
                .unwrap_or_default();
            let mut planned = parse_todo(&todo);
            planned.reverse();
            planned
        }
        Layout::Apply => remaining_patches(ctx, index).await?,
    };

    let (log, refs) = tokio::join!(ctx.history.log(), ctx.history.refs());
    let (log, refs) = (log?, refs?);

    let done = log
        .iter()
        .take(index.saturating_sub(1) as usize)
        .cloned()
        .collect();

    let onto_name = refs
        .iter()
        .find(|r| r.kind != RefKind::RemoteHead && r.commit == onto_commit)
        .map(|r| r.name.clone())
        .unwrap_or_else(|| onto_commit.short(ctx.abbrev_len).to_string());

    // stopped-sha may be abbreviated; only a full id can be looked up.
    let current = match ctx.parse_id(marker_file, &marker) {
        Ok(id) => Some(ctx.cache.resolve(ctx.runner, &id).await?),
        Err(e) if marker_file == plumbing::REBASE_MERGE_STOPPED_SHA => {
            debug!(error = %e, "abbreviated stopped-sha");
            None
        }
        Err(e) => return Err(e),
    };

    Ok(Some(RebasingState {
        branch: branch_from_head_name(&head_name),
        onto: RebaseOnto {
            name: onto_name,
            commit: onto_commit,
        },
        interactive: layout == Layout::Merge,
        done,
        current,
        upcoming,
    }))
}

/// Patches `last` down to `next + 1`.
async fn remaining_patches(
    ctx: &ResolverContext<'_>,
    next: u32,
) -> Result<Vec<PlannedCommit>, ProbeError> {
    let last = parse_count(
        plumbing::REBASE_APPLY_LAST,
        &ctx.read_required(plumbing::REBASE_APPLY_LAST).await?,
    )?;

    let mut upcoming = Vec::new();
    for index in (next.saturating_add(1)..=last).rev() {
        let name = plumbing::rebase_apply_patch(index);
        match ctx.files.read(&name).await {
            Some(text) => match parse_patch_header(&text, ctx.format()) {
                Some(planned) => upcoming.push(planned),
                None => debug!(patch = %name, "no mbox header"),
            },
            None => debug!(patch = %name, "patch file missing"),
        }
    }
    Ok(upcoming)
}
