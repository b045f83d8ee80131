//! status command - Snapshot the working copy and print it

use std::sync::Arc;

use anyhow::{Context as _, Result};

use crate::cli::Context;
use crate::core::model::{Change, Commit, LogEntry, PlannedCommit};
use crate::engine::{OperationState, RepoSnapshot, ScanOptions, SnapshotEngine, UpstreamRef};

/// Scan the working copy and print a summary or the JSON snapshot.
pub async fn status(ctx: &Context, json: bool) -> Result<()> {
    let session = super::open(ctx)?;
    let abbrev = session.config.abbrev_len();
    let options = ScanOptions::from_config(&session.config);

    let engine = SnapshotEngine::new();
    let repo = engine.track(session.info, session.runner, options);
    let snapshot = repo.refresh().await.context("Failed to scan repository")?;

    if json {
        let text = serde_json::to_string_pretty(snapshot.as_ref())
            .context("Failed to serialize snapshot")?;
        println!("{text}");
    } else {
        print!("{}", render(&snapshot, abbrev));
    }
    Ok(())
}

fn commit_line(commit: &Commit, abbrev: usize) -> String {
    format!("{} {}", commit.id.short(abbrev), commit.summary())
}

fn planned_line(planned: &PlannedCommit, abbrev: usize) -> String {
    let id = planned.id.get(..abbrev).unwrap_or(planned.id.as_str());
    format!("{} {} {}", planned.action, id, planned.summary)
}

fn change_line(change: &Change) -> String {
    let path = if change.is_rename() {
        format!(
            "{} -> {}",
            change.original_path.display(),
            change.path.display()
        )
    } else {
        change.path.display().to_string()
    };
    format!("{:<16}{path}", change.status.label())
}

fn change_lines(changes: &[Change]) -> Vec<String> {
    changes.iter().map(change_line).collect()
}

fn commit_lines(commits: &[Arc<Commit>], abbrev: usize) -> Vec<String> {
    commits.iter().map(|c| commit_line(c, abbrev)).collect()
}

fn log_line(entry: &LogEntry, abbrev: usize) -> String {
    if entry.refs.is_empty() {
        format!("{} {}", entry.commit.short(abbrev), entry.subject)
    } else {
        format!(
            "{} ({}) {}",
            entry.commit.short(abbrev),
            entry.refs.join(", "),
            entry.subject
        )
    }
}

fn counterpart_line(label: &str, counterpart: &UpstreamRef, abbrev: usize) -> String {
    let target = match &counterpart.commit {
        Some(commit) => commit_line(commit, abbrev),
        None => "(gone)".to_string(),
    };
    format!("{label:<10}{} {target}", counterpart.display_name())
}

fn section(out: &mut Vec<String>, title: &str, items: Vec<String>) {
    if items.is_empty() {
        return;
    }
    out.push(String::new());
    out.push(format!("{title} ({})", items.len()));
    out.extend(items.into_iter().map(|item| format!("  {item}")));
}

fn operation_section(out: &mut Vec<String>, operation: &OperationState, abbrev: usize) {
    let (title, items) = match operation {
        OperationState::Merging(state) => (
            format!("Merging {}", state.branches.join(", ")),
            commit_lines(&state.commits, abbrev),
        ),
        OperationState::Rebasing(state) => {
            let mut items: Vec<String> = state
                .upcoming
                .iter()
                .map(|p| planned_line(p, abbrev))
                .collect();
            if let Some(current) = &state.current {
                items.push(format!("stop {}", commit_line(current, abbrev)));
            }
            items.extend(
                state
                    .done
                    .iter()
                    .map(|e| format!("done {}", log_line(e, abbrev))),
            );
            let mode = if state.interactive { "Rebasing" } else { "Applying" };
            (
                format!("{mode} {} onto {}", state.branch, state.onto.name),
                items,
            )
        }
        OperationState::CherryPicking(state) | OperationState::Reverting(state) => {
            let mut items: Vec<String> = state
                .upcoming
                .iter()
                .map(|p| planned_line(p, abbrev))
                .collect();
            items.push(format!("stop {}", commit_line(&state.current, abbrev)));
            items.push(format!("onto {}", state.original_head.short(abbrev)));
            let title = match operation {
                OperationState::Reverting(_) => "Reverting",
                _ => "Cherry-picking",
            };
            (title.to_string(), items)
        }
    };
    section(out, &title, items);
}

/// Plain-text rendering of a snapshot.
pub(crate) fn render(snapshot: &RepoSnapshot, abbrev: usize) -> String {
    let mut out = Vec::new();
    let head = &snapshot.head;

    let name = match &head.name {
        Some(name) => name.to_string(),
        None => "(detached)".to_string(),
    };
    let target = match (&head.commit, &head.commit_id) {
        (Some(commit), _) => commit_line(commit, abbrev),
        (None, Some(id)) => id.short(abbrev).to_string(),
        (None, None) => "(no commits yet)".to_string(),
    };
    out.push(format!("{:<10}{name} {target}", "Head:"));

    if let Some(upstream) = &head.upstream {
        let mut line = counterpart_line("Merge:", upstream, abbrev);
        if head.ahead > 0 || head.behind > 0 {
            line.push_str(&format!(" (ahead {}, behind {})", head.ahead, head.behind));
        }
        out.push(line);
    }
    if let Some(push) = &head.push_remote {
        out.push(counterpart_line("Push:", push, abbrev));
    }
    if let Some(tag) = &head.tag {
        out.push(format!("{:<10}{}", "Tag:", tag.name));
    }

    if let Some(operation) = &snapshot.operation {
        operation_section(&mut out, operation, abbrev);
    }

    section(
        &mut out,
        "Untracked files",
        snapshot
            .untracked
            .iter()
            .map(|c| c.path.display().to_string())
            .collect(),
    );
    section(&mut out, "Unmerged changes", change_lines(&snapshot.merge_changes));
    section(&mut out, "Unstaged changes", change_lines(&snapshot.unstaged));
    section(&mut out, "Staged changes", change_lines(&snapshot.staged));
    section(
        &mut out,
        "Stashes",
        snapshot
            .stashes
            .iter()
            .map(|s| format!("stash@{{{}}} {}", s.index, s.description))
            .collect(),
    );

    for counterpart in [&head.upstream, &head.push_remote].into_iter().flatten() {
        let name = counterpart.display_name();
        section(
            &mut out,
            &format!("Unpulled from {name}"),
            commit_lines(&counterpart.behind, abbrev),
        );
        section(
            &mut out,
            &format!("Unpushed to {name}"),
            commit_lines(&counterpart.ahead, abbrev),
        );
    }

    section(
        &mut out,
        "Recent commits",
        snapshot.log.iter().map(|e| log_line(e, abbrev)).collect(),
    );
    section(
        &mut out,
        "Incomplete",
        snapshot.degraded.iter().map(ToString::to_string).collect(),
    );

    out.push(String::new());
    out.join("\n")
}
