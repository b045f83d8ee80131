//! git::commands
//!
//! Argument lists for every query the engine issues.
//!
//! Keeping them in one place means the parsers in `engine::parse` and the
//! formats requested here cannot drift apart, and tests can script
//! [`super::mock::MockRunner`] with the same lists.

use std::path::Path;

/// Field separator used by formats that would otherwise be ambiguous.
pub const NUL: char = '\0';

fn args<const N: usize>(parts: [&str; N]) -> Vec<String> {
    parts.iter().map(|s| s.to_string()).collect()
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Machine-readable status with branch headers, tracked files only.
pub fn status() -> Vec<String> {
    args([
        "status",
        "--porcelain=v2",
        "--branch",
        "-z",
        "--untracked-files=no",
    ])
}

/// Untracked files, collapsing wholly untracked directories.
pub fn untracked() -> Vec<String> {
    args([
        "ls-files",
        "-z",
        "--others",
        "--exclude-standard",
        "--directory",
        "--no-empty-directory",
    ])
}

pub fn stash_list() -> Vec<String> {
    args(["stash", "list"])
}

/// Log format understood by `engine::log::LogParser`.
pub const LOG_FORMAT: &str = "--format=%H%d [%an] [%at]%s";

/// Options for a log listing.
#[derive(Debug, Clone, Default)]
pub struct LogArgs {
    pub limit: usize,
    pub graph: bool,
    pub decorate: bool,
    pub revisions: Vec<String>,
}

/// Recent history, newest first.
pub fn log(opts: &LogArgs) -> Vec<String> {
    let mut out = args(["log", LOG_FORMAT, "--use-mailmap"]);
    out.push(if opts.decorate {
        "--decorate=short".into()
    } else {
        "--no-decorate".into()
    });
    if opts.graph {
        out.push("--graph".into());
    }
    out.push("-n".into());
    out.push(opts.limit.to_string());
    out.extend(opts.revisions.iter().cloned());
    out.push("--".into());
    out
}

/// Every branch, remote-tracking branch, and tag with peeled targets and
/// configured upstreams, NUL separated.
pub fn for_each_ref() -> Vec<String> {
    args([
        "for-each-ref",
        "--format=%(refname)%00%(objectname)%00%(*objectname)%00%(upstream:remotename)%00%(upstream:remoteref)",
        "refs/heads",
        "refs/remotes",
        "refs/tags",
    ])
}

pub fn remotes() -> Vec<String> {
    args(["remote", "-v"])
}

pub fn submodule_status() -> Vec<String> {
    args(["submodule", "status"])
}

/// Commit record fields, NUL separated, message last.
pub const COMMIT_FORMAT: &str = "--format=%H%x00%P%x00%an%x00%ae%x00%at%x00%ct%x00%B";

pub fn show_commit(id: &str) -> Vec<String> {
    let mut out = args(["show", "-s", "--no-color", COMMIT_FORMAT]);
    out.push(id.to_string());
    out
}

/// Commits only in `left` (`<`) or only in `right` (`>`).
pub fn rev_list_left_right(left: &str, right: &str) -> Vec<String> {
    let mut out = args(["rev-list", "--left-right"]);
    out.push(format!("{left}...{right}"));
    out
}

/// Commits reachable from `id` but not from HEAD.
pub fn rev_list_not_in_head(id: &str) -> Vec<String> {
    let mut out = args(["rev-list"]);
    out.push(format!("HEAD..{id}"));
    out
}

/// Integration settings for `branch`: its `rebase` and `pushRemote` keys
/// plus the repository-wide `remote.pushDefault` and `pull.rebase`.
///
/// Exit status 1 means none are set.
pub fn branch_config(branch: &str) -> Vec<String> {
    let pattern = format!(
        r"^(branch\.{}\.(rebase|pushremote)|remote\.pushdefault|pull\.rebase)$",
        regex::escape(branch)
    );
    let mut out = args(["config", "--get-regexp"]);
    out.push(pattern);
    out
}

/// Unstaged diff of one path.
pub fn diff_worktree(path: &Path) -> Vec<String> {
    let mut out = args(["diff", "--no-color", "--no-ext-diff", "--"]);
    out.push(path_arg(path));
    out
}

/// Staged diff of one path.
pub fn diff_cached(path: &Path) -> Vec<String> {
    let mut out = args(["diff", "--cached", "--no-color", "--no-ext-diff", "--"]);
    out.push(path_arg(path));
    out
}

/// Staged diff of a rename, with rename detection across both paths.
pub fn diff_cached_renamed(original: &Path, path: &Path) -> Vec<String> {
    let mut out = args([
        "diff",
        "--cached",
        "-M",
        "--no-color",
        "--no-ext-diff",
        "--",
    ]);
    out.push(path_arg(original));
    out.push(path_arg(path));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_args_order() {
        let args = log(&LogArgs {
            limit: 10,
            graph: true,
            decorate: true,
            revisions: vec!["main".into()],
        });
        assert_eq!(
            args,
            vec![
                "log",
                LOG_FORMAT,
                "--use-mailmap",
                "--decorate=short",
                "--graph",
                "-n",
                "10",
                "main",
                "--"
            ]
        );
    }

    #[test]
    fn branch_config_escapes_name() {
        let args = branch_config("fix.v1+x");
        assert_eq!(
            args[2],
            r"^(branch\.fix\.v1\+x\.(rebase|pushremote)|remote\.pushdefault|pull\.rebase)$"
        );
    }

    #[test]
    fn rename_diff_has_both_paths() {
        let args = diff_cached_renamed(Path::new("old.rs"), Path::new("new.rs"));
        assert_eq!(&args[args.len() - 3..], ["--", "old.rs", "new.rs"]);
    }

    #[test]
    fn range_arguments() {
        assert_eq!(rev_list_left_right("HEAD", "origin/main")[2], "HEAD...origin/main");
        assert_eq!(rev_list_not_in_head("abc")[1], "HEAD..abc");
    }
}
