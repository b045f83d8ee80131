//! engine::parse
//!
//! Parsers for git command output and plumbing file contents.
//!
//! Every parser is a pure function over text so it can be tested without a
//! repository. Object ids are validated against the repository's
//! [`ObjectFormat`]; anything that does not fit the expected grammar is a
//! [`ParseError`] rather than a silently dropped record, except where git's
//! own output is documented to contain free-form lines.

use std::path::PathBuf;
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use crate::core::model::{
    Change, Commit, FileStatus, Hunk, PlannedCommit, Ref, RefKind, Remote, Stash, Submodule,
    SubmoduleState, UpstreamName,
};
use crate::core::types::{ObjectFormat, Oid, RefName, TypeError, UtcTimestamp};

/// Errors from parsing git output.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("malformed {what}: {line:?}")]
    Malformed { what: &'static str, line: String },

    #[error("invalid object id in {what}: {source}")]
    Oid {
        what: &'static str,
        source: TypeError,
    },
}

fn malformed(what: &'static str, line: &str) -> ParseError {
    ParseError::Malformed {
        what,
        line: line.to_string(),
    }
}

fn oid(what: &'static str, s: &str, format: ObjectFormat) -> Result<Oid, ParseError> {
    Oid::parse(s, format).map_err(|source| ParseError::Oid { what, source })
}

// =============================================================================
// Status
// =============================================================================

/// Branch headers of `status --porcelain=v2 --branch`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BranchHeader {
    /// `None` on an unborn branch.
    pub oid: Option<Oid>,
    /// `None` when HEAD is detached.
    pub head: Option<String>,
    /// Upstream as `remote/branch`.
    pub upstream: Option<String>,
    pub ahead: u32,
    pub behind: u32,
}

/// Parsed status: branch headers and the tracked change lists.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusReport {
    pub branch: BranchHeader,
    pub unstaged: Vec<Change>,
    pub staged: Vec<Change>,
    pub unmerged: Vec<Change>,
}

/// Parse `status --porcelain=v2 --branch -z`.
///
/// Records are NUL terminated. Rename and copy records (`2`) are followed
/// by a separate record holding the original path.
pub fn parse_status(out: &str, format: ObjectFormat) -> Result<StatusReport, ParseError> {
    let mut report = StatusReport::default();
    let mut records = out.split('\0').filter(|r| !r.is_empty());

    while let Some(record) = records.next() {
        let (kind, rest) = record.split_once(' ').unwrap_or((record, ""));
        match kind {
            "#" => parse_branch_header(rest, format, &mut report.branch)?,
            "1" => {
                let fields: Vec<&str> = rest.splitn(8, ' ').collect();
                if fields.len() != 8 {
                    return Err(malformed("status entry", record));
                }
                push_tracked(&mut report, fields[0], fields[7], None, record)?;
            }
            "2" => {
                let fields: Vec<&str> = rest.splitn(9, ' ').collect();
                if fields.len() != 9 {
                    return Err(malformed("status rename entry", record));
                }
                let original = records
                    .next()
                    .ok_or_else(|| malformed("status rename entry", record))?;
                push_tracked(&mut report, fields[0], fields[8], Some(original), record)?;
            }
            "u" => {
                let fields: Vec<&str> = rest.splitn(10, ' ').collect();
                if fields.len() != 10 {
                    return Err(malformed("status unmerged entry", record));
                }
                let status = FileStatus::from_unmerged(fields[0])
                    .ok_or_else(|| malformed("unmerged status", record))?;
                report.unmerged.push(Change::new(fields[9], status));
            }
            // Untracked and ignored entries are enumerated separately.
            "?" | "!" => {}
            _ => return Err(malformed("status record", record)),
        }
    }

    Ok(report)
}

fn parse_branch_header(
    rest: &str,
    format: ObjectFormat,
    branch: &mut BranchHeader,
) -> Result<(), ParseError> {
    let (key, value) = rest.split_once(' ').unwrap_or((rest, ""));
    match key {
        "branch.oid" if value != "(initial)" => {
            branch.oid = Some(oid("branch.oid header", value, format)?);
        }
        "branch.head" if value != "(detached)" => {
            branch.head = Some(value.to_string());
        }
        "branch.upstream" => branch.upstream = Some(value.to_string()),
        "branch.ab" => {
            let (ahead, behind) = value
                .split_once(' ')
                .ok_or_else(|| malformed("branch.ab header", rest))?;
            branch.ahead = ahead
                .trim_start_matches('+')
                .parse()
                .map_err(|_| malformed("branch.ab header", rest))?;
            branch.behind = behind
                .trim_start_matches('-')
                .parse()
                .map_err(|_| malformed("branch.ab header", rest))?;
        }
        // branch.oid (initial), branch.head (detached), stash headers.
        _ => {}
    }
    Ok(())
}

fn push_tracked(
    report: &mut StatusReport,
    xy: &str,
    path: &str,
    original: Option<&str>,
    record: &str,
) -> Result<(), ParseError> {
    let mut letters = xy.chars();
    let (x, y) = match (letters.next(), letters.next()) {
        (Some(x), Some(y)) => (x, y),
        _ => return Err(malformed("status XY", record)),
    };

    if let Some(status) = FileStatus::from_porcelain(x) {
        let mut change = Change::new(path, status);
        if let Some(original) = original {
            change.original_path = PathBuf::from(original);
        }
        report.staged.push(change);
    }
    if let Some(status) = FileStatus::from_porcelain(y) {
        report.unstaged.push(Change::new(path, status));
    }
    Ok(())
}

/// Parse `ls-files -z --others` output into untracked changes.
///
/// Records are NUL-terminated and paths are never quoted.
pub fn parse_untracked(out: &str) -> Vec<Change> {
    out.split('\0')
        .filter(|l| !l.is_empty())
        .map(|l| Change::new(l, FileStatus::Untracked))
        .collect()
}

// =============================================================================
// Stash, divergence, todo lists
// =============================================================================

static STASH_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^stash@\{(\d+)\}: (.*)$").unwrap());

/// Parse `stash list`. Index 0 is the most recent stash.
pub fn parse_stash_list(out: &str) -> Vec<Stash> {
    out.lines()
        .filter(|l| !l.is_empty())
        .enumerate()
        .map(|(position, line)| match STASH_LINE.captures(line) {
            Some(caps) => Stash {
                index: caps[1].parse().unwrap_or(position),
                description: caps[2].to_string(),
            },
            None => Stash {
                index: position,
                description: line.to_string(),
            },
        })
        .collect()
}

/// Parse `rev-list --left-right A...B` into `(only_in_a, only_in_b)`,
/// each in emission order.
pub fn parse_left_right(
    out: &str,
    format: ObjectFormat,
) -> Result<(Vec<Oid>, Vec<Oid>), ParseError> {
    let mut left = Vec::new();
    let mut right = Vec::new();
    for line in out.lines().filter(|l| !l.is_empty()) {
        if let Some(id) = line.strip_prefix('<') {
            left.push(oid("left-right listing", id, format)?);
        } else if let Some(id) = line.strip_prefix('>') {
            right.push(oid("left-right listing", id, format)?);
        } else {
            return Err(malformed("left-right listing", line));
        }
    }
    Ok((left, right))
}

/// Parse a plain `rev-list` listing.
pub fn parse_rev_list(out: &str, format: ObjectFormat) -> Result<Vec<Oid>, ParseError> {
    out.lines()
        .filter(|l| !l.is_empty())
        .map(|l| oid("rev-list", l, format))
        .collect()
}

/// Expand abbreviated todo verbs. Verbs that carry no commit map to `None`.
fn todo_verb(verb: &str) -> Option<&'static str> {
    match verb {
        "p" | "pick" => Some("pick"),
        "r" | "reword" => Some("reword"),
        "e" | "edit" => Some("edit"),
        "s" | "squash" => Some("squash"),
        "f" | "fixup" => Some("fixup"),
        "d" | "drop" => Some("drop"),
        "m" | "merge" => Some("merge"),
        "revert" => Some("revert"),
        _ => None,
    }
}

/// Parse a rebase or sequencer todo list, in file order.
///
/// Comments, blank lines, and commands without a commit (`exec`, `break`,
/// `label`, `reset`, `update-ref`, ...) are skipped. Option flags such as
/// `fixup -C` or `merge -C` are skipped too.
pub fn parse_todo(text: &str) -> Vec<PlannedCommit> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .filter_map(|line| {
            let mut words = line.split_whitespace();
            let action = todo_verb(words.next()?)?;
            let mut rest = line.splitn(2, char::is_whitespace).nth(1)?.trim_start();
            while rest.starts_with('-') {
                rest = rest.split_once(char::is_whitespace)?.1.trim_start();
            }
            let (id, summary) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
            if id.len() < 4 || !id.chars().all(|c| c.is_ascii_hexdigit()) {
                return None;
            }
            Some(PlannedCommit {
                action: action.to_string(),
                id: id.to_string(),
                summary: summary.trim().to_string(),
            })
        })
        .collect()
}

static QUOTED: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"'([^']+)'").unwrap());

/// Names being merged, from the first line of `MERGE_MSG`.
///
/// Understands `Merge branch 'x'`, `Merge branches 'a' and 'b'`,
/// `Merge remote-tracking branch 'origin/x'`, `Merge tag 'v1'`, and
/// `Merge commit 'abc'`, each with an optional ` into <target>` suffix.
pub fn parse_merge_msg(first_line: &str) -> Vec<String> {
    if !first_line.starts_with("Merge ") {
        return Vec::new();
    }
    let subject = first_line
        .rsplit_once(" into ")
        .map_or(first_line, |(head, _)| head);
    QUOTED
        .captures_iter(subject)
        .map(|caps| caps[1].to_string())
        .collect()
}

static PATCH_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[[^\]]*PATCH[^\]]*\]\s*").unwrap());

/// Recover the commit a `rebase-apply/NNNN` patch was made from.
///
/// Only the mbox header is read: `From <id> <date>`, `From: <author>`, and
/// a possibly folded `Subject:` whose `[PATCH ...]` prefix is dropped.
pub fn parse_patch_header(text: &str, format: ObjectFormat) -> Option<PlannedCommit> {
    let mut lines = text.lines();
    let first = lines.next()?;
    let id = first.strip_prefix("From ")?.split_whitespace().next()?;
    let id = Oid::parse(id, format).ok()?;

    let mut subject: Option<String> = None;
    let mut in_subject = false;
    for line in lines {
        if line.is_empty() {
            break;
        }
        if in_subject && line.starts_with([' ', '\t']) {
            if let Some(s) = subject.as_mut() {
                s.push(' ');
                s.push_str(line.trim());
            }
            continue;
        }
        in_subject = false;
        if let Some(value) = line.strip_prefix("Subject:") {
            subject = Some(value.trim().to_string());
            in_subject = true;
        }
    }

    let subject = subject.unwrap_or_default();
    Some(PlannedCommit {
        action: "pick".to_string(),
        id: id.to_string(),
        summary: PATCH_PREFIX.replace(&subject, "").into_owned(),
    })
}

// =============================================================================
// Refs, remotes, submodules
// =============================================================================

/// Parse the NUL separated `for-each-ref` format from
/// [`crate::git::commands::for_each_ref`].
///
/// Symbolic remote heads (`refs/remotes/<remote>/HEAD`) are kept here and
/// excluded when remotes are grouped.
pub fn parse_refs(out: &str, format: ObjectFormat) -> Result<Vec<Ref>, ParseError> {
    let mut refs = Vec::new();
    for line in out.lines().filter(|l| !l.is_empty()) {
        let fields: Vec<&str> = line.split('\0').collect();
        if fields.len() != 5 {
            return Err(malformed("ref listing", line));
        }
        let full_name = RefName::new(fields[0]).map_err(|_| malformed("ref name", line))?;
        let commit = if fields[2].is_empty() {
            oid("ref listing", fields[1], format)?
        } else {
            oid("ref listing", fields[2], format)?
        };

        let (kind, name, remote) = if let Some(short) = full_name.strip_prefix("refs/heads/") {
            (RefKind::Head, short.to_string(), None)
        } else if let Some(short) = full_name.strip_prefix("refs/remotes/") {
            let remote = short.split('/').next().map(String::from);
            (RefKind::RemoteHead, short.to_string(), remote)
        } else if let Some(short) = full_name.strip_prefix("refs/tags/") {
            (RefKind::Tag, short.to_string(), None)
        } else {
            continue;
        };

        let upstream = match (kind, fields[3], fields[4]) {
            (RefKind::Head, remote, merge) if !remote.is_empty() && !merge.is_empty() => {
                Some(UpstreamName {
                    remote: remote.to_string(),
                    branch: merge.strip_prefix("refs/heads/").unwrap_or(merge).to_string(),
                })
            }
            _ => None,
        };

        refs.push(Ref {
            name,
            full_name,
            kind,
            commit,
            remote,
            upstream,
        });
    }
    Ok(refs)
}

/// Parse `remote -v`, preserving first-appearance order.
///
/// Returned remotes have no branches; see [`group_remote_branches`].
pub fn parse_remotes(out: &str) -> Vec<Remote> {
    let mut remotes: Vec<Remote> = Vec::new();
    for line in out.lines().filter(|l| !l.is_empty()) {
        let Some((name, rest)) = line.split_once('\t') else {
            continue;
        };
        let (url, kind) = match rest.rsplit_once(' ') {
            Some((url, kind)) => (url.to_string(), kind),
            None => (rest.to_string(), "(fetch)"),
        };

        let index = match remotes.iter().position(|r| r.name == name) {
            Some(index) => index,
            None => {
                remotes.push(Remote {
                    name: name.to_string(),
                    fetch_url: None,
                    push_url: None,
                    branches: Vec::new(),
                });
                remotes.len() - 1
            }
        };
        match kind {
            "(push)" => remotes[index].push_url = Some(url),
            _ => remotes[index].fetch_url = Some(url),
        }
    }
    remotes
}

/// Attach remote-tracking refs to their remotes, longest remote name first
/// so `origin/x` never claims `origin/x/y`'s refs. `<remote>/HEAD` is
/// excluded.
pub fn group_remote_branches(remotes: &mut [Remote], refs: &[Ref]) {
    let mut order: Vec<usize> = (0..remotes.len()).collect();
    order.sort_by_key(|&i| std::cmp::Reverse(remotes[i].name.len()));

    for r in refs.iter().filter(|r| r.kind == RefKind::RemoteHead) {
        let owner = order.iter().copied().find(|&i| {
            r.name
                .strip_prefix(remotes[i].name.as_str())
                .is_some_and(|rest| rest.starts_with('/'))
        });
        let Some(owner) = owner else {
            continue;
        };
        let branch = &r.name[remotes[owner].name.len() + 1..];
        if branch == "HEAD" {
            continue;
        }
        let mut tracked = r.clone();
        tracked.remote = Some(remotes[owner].name.clone());
        remotes[owner].branches.push(tracked);
    }
}

/// Parse `submodule status`.
pub fn parse_submodule_status(
    out: &str,
    format: ObjectFormat,
) -> Result<Vec<Submodule>, ParseError> {
    let mut submodules = Vec::new();
    for line in out.lines().filter(|l| !l.is_empty()) {
        let mut chars = line.chars();
        let state = match chars.next() {
            Some(' ') => SubmoduleState::Current,
            Some('-') => SubmoduleState::Uninitialized,
            Some('+') => SubmoduleState::Modified,
            Some('U') => SubmoduleState::Conflicted,
            _ => return Err(malformed("submodule status", line)),
        };
        let rest = chars.as_str();
        let (id, rest) = rest
            .split_once(' ')
            .ok_or_else(|| malformed("submodule status", line))?;
        let commit = Some(oid("submodule status", id, format)?).filter(|c| !c.is_zero());

        let (path, describe) = match rest.rsplit_once(" (") {
            Some((path, d)) if d.ends_with(')') => {
                (path, Some(d.trim_end_matches(')').to_string()))
            }
            _ => (rest, None),
        };

        submodules.push(Submodule {
            path: PathBuf::from(path),
            commit,
            state,
            describe,
        });
    }
    Ok(submodules)
}

// =============================================================================
// Diffs and commits
// =============================================================================

static HUNK_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^@{2,} -(\d+)(?:,(\d+))?(?: -\d+(?:,\d+)?)* \+(\d+)(?:,(\d+))? @{2,}").unwrap()
});

/// Split a unified or combined diff into hunks.
///
/// File headers are not part of any hunk. A missing line count means 1,
/// as in git's own output. Combined hunks (`@@@ -a,b -c,d +e,f @@@`, as
/// printed for unmerged paths) report the first parent's range as the
/// old side.
pub fn parse_diff_hunks(diff: &str) -> Vec<Hunk> {
    let mut hunks: Vec<Hunk> = Vec::new();
    let mut in_hunk = false;

    for line in diff.lines() {
        if let Some(caps) = HUNK_HEADER.captures(line) {
            let num = |i: usize, default: u32| {
                caps.get(i)
                    .and_then(|m| m.as_str().parse().ok())
                    .unwrap_or(default)
            };
            hunks.push(Hunk {
                header: line.to_string(),
                old_start: num(1, 0),
                old_lines: num(2, 1),
                new_start: num(3, 0),
                new_lines: num(4, 1),
                text: format!("{line}\n"),
            });
            in_hunk = true;
        } else if line.starts_with("diff --git ")
            || line.starts_with("diff --cc ")
            || line.starts_with("diff --combined ")
        {
            in_hunk = false;
        } else if in_hunk {
            if let Some(hunk) = hunks.last_mut() {
                hunk.text.push_str(line);
                hunk.text.push('\n');
            }
        }
    }
    hunks
}

/// Parse the NUL separated record from [`crate::git::commands::show_commit`].
pub fn parse_commit_record(out: &str, format: ObjectFormat) -> Result<Commit, ParseError> {
    let fields: Vec<&str> = out.splitn(7, '\0').collect();
    if fields.len() != 7 {
        return Err(malformed("commit record", out));
    }
    let time = |s: &str| {
        s.trim()
            .parse::<i64>()
            .ok()
            .and_then(UtcTimestamp::from_unix_seconds)
            .ok_or_else(|| malformed("commit timestamp", s))
    };

    Ok(Commit {
        id: oid("commit record", fields[0].trim(), format)?,
        parents: fields[1]
            .split_whitespace()
            .map(|p| oid("commit parents", p, format))
            .collect::<Result<_, _>>()?,
        author_name: fields[2].to_string(),
        author_email: fields[3].to_string(),
        author_time: time(fields[4])?,
        commit_time: time(fields[5])?,
        message: fields[6].trim_end().to_string(),
    })
}

// =============================================================================
// Branch configuration
// =============================================================================

/// Integration settings relevant to the current branch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BranchConfig {
    pub branch_rebase: Option<bool>,
    pub branch_push_remote: Option<String>,
    pub push_default: Option<String>,
    pub pull_rebase: Option<bool>,
}

impl BranchConfig {
    /// Whether pulling integrates by rebasing: `branch.<name>.rebase`,
    /// falling back to `pull.rebase`.
    pub fn rebase(&self) -> bool {
        self.branch_rebase.or(self.pull_rebase).unwrap_or(false)
    }

    /// `branch.<name>.pushRemote`, falling back to `remote.pushDefault`.
    pub fn push_remote(&self) -> Option<&str> {
        self.branch_push_remote
            .as_deref()
            .or(self.push_default.as_deref())
    }
}

fn config_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" | "interactive" | "i" | "merges" | "m" | "preserve" | "p" => {
            Some(true)
        }
        "false" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}

/// Parse `config --get-regexp` output from
/// [`crate::git::commands::branch_config`].
pub fn parse_branch_config(out: &str, branch: &str) -> BranchConfig {
    let rebase_key = format!("branch.{branch}.rebase");
    let push_key = format!("branch.{branch}.pushremote");
    let mut config = BranchConfig::default();

    for line in out.lines().filter(|l| !l.is_empty()) {
        let (key, value) = line.split_once(' ').unwrap_or((line, "true"));
        if key == rebase_key {
            config.branch_rebase = config_bool(value);
        } else if key == push_key {
            config.branch_push_remote = Some(value.to_string());
        } else if key == "remote.pushdefault" {
            config.push_default = Some(value.to_string());
        } else if key == "pull.rebase" {
            config.pull_rebase = config_bool(value);
        }
    }
    config
}
