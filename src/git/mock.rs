//! git::mock
//!
//! Scripted git runner for deterministic testing.
//!
//! # Example
//!
//! ```
//! use strata::git::mock::MockRunner;
//! use strata::git::GitRunner;
//!
//! let runner = MockRunner::new()
//!     .on(&["stash", "list"], "stash@{0}: WIP on main: abc123 Fix\n")
//!     .fail_prefix(&["rev-list"], 128, "fatal: bad revision");
//!
//! let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
//! let out = rt
//!     .block_on(runner.output(&["stash".to_string(), "list".to_string()]))
//!     .unwrap();
//! assert!(out.starts_with("stash@{0}"));
//! assert_eq!(runner.calls().len(), 1);
//! ```
//!
//! Unscripted invocations fail with exit code 128 so a missing script
//! shows up as a failure instead of silently empty output.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use super::commands;
use super::runner::{GitRunner, RunOutput, RunnerError};
use crate::core::model::Commit;

#[derive(Debug, Clone)]
enum Matcher {
    Exact(Vec<String>),
    Prefix(Vec<String>),
}

impl Matcher {
    fn matches(&self, args: &[String]) -> bool {
        match self {
            Matcher::Exact(expected) => expected.as_slice() == args,
            Matcher::Prefix(prefix) => args.starts_with(prefix),
        }
    }
}

#[derive(Debug, Default)]
struct MockRunnerInner {
    responses: Vec<(Matcher, RunOutput)>,
    calls: Vec<Vec<String>>,
}

/// Scripted [`GitRunner`].
///
/// Exact-argument scripts take precedence over prefix scripts; within each
/// kind the most recently added script wins. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct MockRunner {
    inner: Arc<Mutex<MockRunnerInner>>,
}

fn owned(args: &[&str]) -> Vec<String> {
    args.iter().map(|s| s.to_string()).collect()
}

impl MockRunner {
    /// Create a runner with no scripts.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockRunnerInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn push(self, matcher: Matcher, output: RunOutput) -> Self {
        self.lock().responses.push((matcher, output));
        self
    }

    /// Succeed with `stdout` for exactly these arguments.
    pub fn on(self, args: &[&str], stdout: &str) -> Self {
        self.push(Matcher::Exact(owned(args)), RunOutput::ok(stdout))
    }

    /// Same as [`MockRunner::on`] for an owned argument list.
    pub fn on_args(self, args: Vec<String>, stdout: &str) -> Self {
        self.push(Matcher::Exact(args), RunOutput::ok(stdout))
    }

    /// Succeed with `stdout` for any invocation starting with `prefix`.
    pub fn on_prefix(self, prefix: &[&str], stdout: &str) -> Self {
        self.push(Matcher::Prefix(owned(prefix)), RunOutput::ok(stdout))
    }

    /// Exit with `exit_code` and `stderr` for exactly these arguments.
    pub fn fail(self, args: &[&str], exit_code: i32, stderr: &str) -> Self {
        self.push(
            Matcher::Exact(owned(args)),
            RunOutput {
                exit_code,
                stdout: String::new(),
                stderr: stderr.to_string(),
            },
        )
    }

    /// Exit with `exit_code` and `stderr` for any invocation starting with
    /// `prefix`.
    pub fn fail_prefix(self, prefix: &[&str], exit_code: i32, stderr: &str) -> Self {
        self.push(
            Matcher::Prefix(owned(prefix)),
            RunOutput {
                exit_code,
                stdout: String::new(),
                stderr: stderr.to_string(),
            },
        )
    }

    /// Script the commit lookup for `commit`.
    pub fn with_commit(self, commit: &Commit) -> Self {
        let parents: Vec<&str> = commit.parents.iter().map(|p| p.as_str()).collect();
        let record = [
            commit.id.as_str().to_string(),
            parents.join(" "),
            commit.author_name.clone(),
            commit.author_email.clone(),
            commit.author_time.unix_seconds().to_string(),
            commit.commit_time.unix_seconds().to_string(),
            format!("{}\n", commit.message),
        ]
        .join(&commands::NUL.to_string());
        let args = commands::show_commit(commit.id.as_str());
        self.push(Matcher::Exact(args), RunOutput::ok(record))
    }

    /// Every invocation so far, in order.
    pub fn calls(&self) -> Vec<Vec<String>> {
        self.lock().calls.clone()
    }

    /// Number of invocations starting with `prefix`.
    pub fn call_count(&self, prefix: &[&str]) -> usize {
        let prefix = owned(prefix);
        self.lock()
            .calls
            .iter()
            .filter(|call| call.starts_with(&prefix))
            .count()
    }
}

#[async_trait]
impl GitRunner for MockRunner {
    async fn run(&self, args: &[String], _stdin: Option<&str>) -> Result<RunOutput, RunnerError> {
        let mut inner = self.lock();
        inner.calls.push(args.to_vec());

        let exact = inner
            .responses
            .iter()
            .rev()
            .find(|(m, _)| matches!(m, Matcher::Exact(_)) && m.matches(args));
        let found = exact.or_else(|| {
            inner
                .responses
                .iter()
                .rev()
                .find(|(m, _)| matches!(m, Matcher::Prefix(_)) && m.matches(args))
        });

        Ok(match found {
            Some((_, output)) => output.clone(),
            None => RunOutput {
                exit_code: 128,
                stdout: String::new(),
                stderr: format!("mock: unscripted git {}", args.join(" ")),
            },
        })
    }
}
