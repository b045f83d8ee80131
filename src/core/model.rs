//! core::model
//!
//! Value types that make up a repository snapshot.
//!
//! Everything here is plain data: parsers in [`crate::engine::parse`] and
//! [`crate::engine::log`] produce these values, the assembler in
//! [`crate::engine::scan`] composes them, and nothing mutates them after
//! construction.

use std::path::PathBuf;

use serde::Serialize;

use super::types::{BranchName, Oid, RefName, UtcTimestamp};

/// Full commit metadata, as resolved by the commit cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Commit {
    pub id: Oid,
    pub parents: Vec<Oid>,
    pub author_name: String,
    pub author_email: String,
    pub author_time: UtcTimestamp,
    pub commit_time: UtcTimestamp,
    /// Full message with trailing whitespace removed.
    pub message: String,
}

impl Commit {
    /// First line of the message.
    pub fn summary(&self) -> &str {
        self.message.lines().next().unwrap_or("")
    }

    /// Whether this is a merge commit.
    pub fn is_merge(&self) -> bool {
        self.parents.len() > 1
    }
}

/// Status of a changed path.
///
/// The `Both*`, `AddedBy*` and `DeletedBy*` variants only occur in the
/// merge change list; they mirror the seven unmerged `XY` combinations of
/// `git status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FileStatus {
    Modified,
    Added,
    Deleted,
    Renamed,
    Copied,
    TypeChanged,
    Untracked,
    BothModified,
    BothAdded,
    BothDeleted,
    AddedByUs,
    AddedByThem,
    DeletedByUs,
    DeletedByThem,
}

impl FileStatus {
    /// Map a single porcelain status letter (`X` or `Y`) to a status.
    ///
    /// Returns `None` for `.` (unchanged) and unknown letters.
    pub fn from_porcelain(c: char) -> Option<Self> {
        match c {
            'M' => Some(FileStatus::Modified),
            'A' => Some(FileStatus::Added),
            'D' => Some(FileStatus::Deleted),
            'R' => Some(FileStatus::Renamed),
            'C' => Some(FileStatus::Copied),
            'T' => Some(FileStatus::TypeChanged),
            _ => None,
        }
    }

    /// Map an unmerged `XY` pair to a conflict status.
    pub fn from_unmerged(xy: &str) -> Option<Self> {
        match xy {
            "DD" => Some(FileStatus::BothDeleted),
            "AU" => Some(FileStatus::AddedByUs),
            "UD" => Some(FileStatus::DeletedByThem),
            "UA" => Some(FileStatus::AddedByThem),
            "DU" => Some(FileStatus::DeletedByUs),
            "AA" => Some(FileStatus::BothAdded),
            "UU" => Some(FileStatus::BothModified),
            _ => None,
        }
    }

    /// Short label as shown in a status buffer.
    pub fn label(self) -> &'static str {
        match self {
            FileStatus::Modified => "modified",
            FileStatus::Added => "new file",
            FileStatus::Deleted => "deleted",
            FileStatus::Renamed => "renamed",
            FileStatus::Copied => "copied",
            FileStatus::TypeChanged => "typechange",
            FileStatus::Untracked => "untracked",
            FileStatus::BothModified => "both modified",
            FileStatus::BothAdded => "both added",
            FileStatus::BothDeleted => "both deleted",
            FileStatus::AddedByUs => "added by us",
            FileStatus::AddedByThem => "added by them",
            FileStatus::DeletedByUs => "deleted by us",
            FileStatus::DeletedByThem => "deleted by them",
        }
    }
}

/// A contiguous block of changed lines within a file diff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Hunk {
    /// The `@@ -a,b +c,d @@ context` line, or its combined `@@@` form.
    pub header: String,
    pub old_start: u32,
    pub old_lines: u32,
    pub new_start: u32,
    pub new_lines: u32,
    /// Header plus body lines, newline terminated.
    pub text: String,
}

/// One changed path in the working tree, the index, or the merge state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Change {
    /// Path relative to the working-copy root.
    pub path: PathBuf,
    /// Path before a rename or copy; equal to `path` otherwise.
    pub original_path: PathBuf,
    pub status: FileStatus,
    /// Unified diff text, when one was produced.
    pub diff: Option<String>,
    pub hunks: Vec<Hunk>,
}

impl Change {
    /// A change with no diff attached yet.
    pub fn new(path: impl Into<PathBuf>, status: FileStatus) -> Self {
        let path = path.into();
        Self {
            original_path: path.clone(),
            path,
            status,
            diff: None,
            hunks: Vec::new(),
        }
    }

    /// Whether the path moved.
    pub fn is_rename(&self) -> bool {
        self.original_path != self.path
    }
}

/// A stash entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Stash {
    /// 0 is the most recent stash.
    pub index: usize,
    pub description: String,
}

/// One commit line of `git log` output, with any graph rows attached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogEntry {
    pub commit: Oid,
    /// Decorations such as `HEAD -> main` or `tag: v1.0`.
    pub refs: Vec<String>,
    /// Empty when the format carried no author.
    pub author: String,
    pub time: Option<UtcTimestamp>,
    pub subject: String,
    /// The graph prefix of the commit line followed by any graph-only
    /// continuation rows, in output order.
    pub graph: Vec<String>,
}

/// Kind of a ref returned by ref enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RefKind {
    Head,
    RemoteHead,
    Tag,
}

/// The upstream configured for a local branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpstreamName {
    /// Remote name, or `.` for a local upstream.
    pub remote: String,
    /// Branch name on that remote.
    pub branch: String,
}

/// A branch, remote-tracking branch, or tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Ref {
    /// Short name (`main`, `origin/main`, `v1.0`).
    pub name: String,
    pub full_name: RefName,
    pub kind: RefKind,
    /// Commit the ref points at (annotated tags are peeled).
    pub commit: Oid,
    /// Owning remote for remote-tracking refs.
    pub remote: Option<String>,
    /// Configured upstream for local branches.
    pub upstream: Option<UpstreamName>,
}

/// A configured remote and its tracking branches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Remote {
    pub name: String,
    pub fetch_url: Option<String>,
    pub push_url: Option<String>,
    /// Remote-tracking branches, excluding `<remote>/HEAD`.
    pub branches: Vec<Ref>,
}

/// Checkout state of a submodule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SubmoduleState {
    Current,
    Uninitialized,
    Modified,
    Conflicted,
}

/// A submodule as reported by `git submodule status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Submodule {
    pub path: PathBuf,
    pub commit: Option<Oid>,
    pub state: SubmoduleState,
    /// `git describe` output, when git printed one.
    pub describe: Option<String>,
}

/// A step still to be applied by a rebase or the sequencer.
///
/// The id is kept exactly as written: todo files usually carry
/// abbreviated ids, patch headers carry full ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedCommit {
    pub action: String,
    pub id: String,
    pub summary: String,
}

/// The local branch name a rebase started from, from `head-name`.
///
/// Returns the raw value when it is not a branch ref (`detached HEAD`).
pub fn branch_from_head_name(head_name: &str) -> String {
    head_name
        .trim()
        .strip_prefix("refs/heads/")
        .and_then(|b| BranchName::new(b).ok())
        .map(String::from)
        .unwrap_or_else(|| head_name.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn commit(message: &str, parents: usize) -> Commit {
        let ts = UtcTimestamp::from_unix_seconds(0).unwrap();
        Commit {
            id: Oid::new("a".repeat(40)).unwrap(),
            parents: (0..parents)
                .map(|i| Oid::new(format!("{i}").repeat(40)).unwrap())
                .collect(),
            author_name: "A".into(),
            author_email: "a@example.com".into(),
            author_time: ts,
            commit_time: ts,
            message: message.into(),
        }
    }

    #[test]
    fn summary_is_first_line() {
        assert_eq!(commit("Subject\n\nBody", 1).summary(), "Subject");
        assert_eq!(commit("", 1).summary(), "");
    }

    #[test]
    fn merge_detection() {
        assert!(commit("m", 2).is_merge());
        assert!(!commit("m", 1).is_merge());
    }

    #[test]
    fn porcelain_letters() {
        assert_eq!(FileStatus::from_porcelain('M'), Some(FileStatus::Modified));
        assert_eq!(FileStatus::from_porcelain('.'), None);
        assert_eq!(FileStatus::from_unmerged("UU"), Some(FileStatus::BothModified));
        assert_eq!(FileStatus::from_unmerged("DU"), Some(FileStatus::DeletedByUs));
        assert_eq!(FileStatus::from_unmerged("MM"), None);
    }

    #[test]
    fn change_rename_detection() {
        let mut change = Change::new("new.rs", FileStatus::Renamed);
        assert!(!change.is_rename());
        change.original_path = PathBuf::from("old.rs");
        assert!(change.is_rename());
    }

    #[test]
    fn head_name_to_branch() {
        assert_eq!(branch_from_head_name("refs/heads/feature/x\n"), "feature/x");
        assert_eq!(branch_from_head_name("detached HEAD"), "detached HEAD");
    }
}
