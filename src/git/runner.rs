//! git::runner
//!
//! Process runner for the git executable.
//!
//! # Design
//!
//! [`GitRunner`] is async because every invocation is a child process the
//! snapshot assembler fans out concurrently. The engine only depends on
//! the trait, so tests drive it with [`super::mock::MockRunner`] and the
//! binary uses [`CliRunner`].
//!
//! A non-zero exit is not an error at the [`GitRunner::run`] level; some
//! queries (`config --get-regexp`) use exit 1 to mean "nothing found".
//! [`GitRunner::output`] is the strict form that turns a non-zero exit into
//! [`RunnerError::Failed`] with a classified [`GitErrorCode`].

use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

/// Broad category of a git failure, recovered from its stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GitErrorCode {
    NotARepository,
    BadRevision,
    BranchNotFullyMerged,
    Conflict,
    LockContention,
    Other,
}

impl GitErrorCode {
    /// Classify a failed invocation from its stderr text.
    pub fn classify(stderr: &str) -> Self {
        let lower = stderr.to_ascii_lowercase();
        if lower.contains("not a git repository") {
            GitErrorCode::NotARepository
        } else if lower.contains("bad revision")
            || lower.contains("unknown revision")
            || lower.contains("ambiguous argument")
            || lower.contains("bad object")
        {
            GitErrorCode::BadRevision
        } else if lower.contains("not fully merged") {
            GitErrorCode::BranchNotFullyMerged
        } else if lower.contains("conflict") {
            GitErrorCode::Conflict
        } else if lower.contains(".lock': file exists") || lower.contains("unable to create") {
            GitErrorCode::LockContention
        } else {
            GitErrorCode::Other
        }
    }
}

/// Errors from running git.
#[derive(Debug, Error)]
pub enum RunnerError {
    /// The executable could not be started.
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    /// git exited unsuccessfully.
    #[error("git {args} exited with {exit_code}: {stderr}")]
    Failed {
        args: String,
        exit_code: i32,
        stderr: String,
        code: GitErrorCode,
    },

    /// The configured timeout elapsed first.
    #[error("git {args} timed out after {after:?}")]
    TimedOut { args: String, after: Duration },
}

impl RunnerError {
    /// Classified failure category, when git ran and failed.
    pub fn code(&self) -> Option<GitErrorCode> {
        match self {
            RunnerError::Failed { code, .. } => Some(*code),
            _ => None,
        }
    }
}

/// Captured result of one invocation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RunOutput {
    /// Exit code; `-1` when the process was killed by a signal.
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl RunOutput {
    /// A successful run with the given stdout.
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            exit_code: 0,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Stdout on success, [`RunnerError::Failed`] otherwise.
    pub fn into_stdout(self, args: &[String]) -> Result<String, RunnerError> {
        if self.success() {
            return Ok(self.stdout);
        }
        Err(RunnerError::Failed {
            args: args.join(" "),
            exit_code: self.exit_code,
            code: GitErrorCode::classify(&self.stderr),
            stderr: self.stderr.trim_end().to_string(),
        })
    }
}

/// Executes git for one working copy.
#[async_trait]
pub trait GitRunner: Send + Sync {
    /// Run git with `args`, feeding `stdin` if given.
    async fn run(&self, args: &[String], stdin: Option<&str>) -> Result<RunOutput, RunnerError>;

    /// Run git and return stdout, failing on a non-zero exit.
    async fn output(&self, args: &[String]) -> Result<String, RunnerError> {
        self.run(args, None).await?.into_stdout(args)
    }
}

/// Runs the real git executable inside a working copy.
#[derive(Debug, Clone)]
pub struct CliRunner {
    binary: String,
    work_dir: PathBuf,
    timeout: Option<Duration>,
}

impl CliRunner {
    pub fn new(binary: impl Into<String>, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            work_dir: work_dir.into(),
            timeout: None,
        }
    }

    /// Kill invocations that run longer than `timeout`.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    async fn spawn_and_wait(
        &self,
        args: &[String],
        stdin: Option<&str>,
    ) -> Result<std::process::Output, RunnerError> {
        let spawn_error = |source| RunnerError::Spawn {
            program: self.binary.clone(),
            source,
        };

        let mut child = Command::new(&self.binary)
            .current_dir(&self.work_dir)
            .args(["-c", "core.quotepath=false", "-c", "color.ui=false"])
            .args(args)
            // Read-only queries must not take the index lock.
            .env("GIT_OPTIONAL_LOCKS", "0")
            .env("LC_ALL", "C")
            .stdin(if stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(spawn_error)?;

        if let (Some(input), Some(mut pipe)) = (stdin, child.stdin.take()) {
            pipe.write_all(input.as_bytes())
                .await
                .map_err(spawn_error)?;
        }

        child.wait_with_output().await.map_err(spawn_error)
    }
}

#[async_trait]
impl GitRunner for CliRunner {
    async fn run(&self, args: &[String], stdin: Option<&str>) -> Result<RunOutput, RunnerError> {
        let started = Instant::now();
        let output = match self.timeout {
            Some(after) => tokio::time::timeout(after, self.spawn_and_wait(args, stdin))
                .await
                .map_err(|_| RunnerError::TimedOut {
                    args: args.join(" "),
                    after,
                })??,
            None => self.spawn_and_wait(args, stdin).await?,
        };

        let exit_code = output.status.code().unwrap_or(-1);
        debug!(
            args = %args.join(" "),
            exit_code,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "git"
        );

        Ok(RunOutput {
            exit_code,
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}
