//! cli::commands
//!
//! Command dispatch and handlers.
//!
//! # Architecture
//!
//! Each command handler:
//! 1. Opens the repository and loads its configuration ([`open`])
//! 2. Calls the engine or the git runner
//! 3. Formats and displays output
//!
//! Handlers never mutate the repository.

mod config_cmd;
mod log_cmd;
mod status;

pub use config_cmd::config;
pub use log_cmd::log;
pub use status::status;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use tracing::debug;

use super::args::Command;
use super::Context;
use crate::core::config::Config;
use crate::core::paths::StrataPaths;
use crate::git::{CliRunner, Git, RepoInfo};

/// Dispatch a parsed command to its handler.
pub async fn dispatch(command: Command, ctx: &Context) -> Result<()> {
    match command {
        Command::Status { json } => status::status(ctx, json).await,
        Command::Log {
            limit,
            graph,
            no_decorate,
            revisions,
        } => log_cmd::log(ctx, limit, graph, no_decorate, revisions).await,
        Command::Config => config_cmd::config(ctx),
    }
}

/// An opened repository with its effective configuration.
pub(crate) struct Session {
    pub info: RepoInfo,
    pub config: Config,
    pub runner: Arc<CliRunner>,
}

fn working_dir(ctx: &Context) -> Result<PathBuf> {
    match &ctx.cwd {
        Some(cwd) => Ok(cwd.clone()),
        None => std::env::current_dir().context("Failed to read current directory"),
    }
}

/// Discover the repository around the working directory and load config.
pub(crate) fn open(ctx: &Context) -> Result<Session> {
    let cwd = working_dir(ctx)?;
    let git = Git::open(&cwd).context("Failed to open repository")?;
    let mut info = git.info().context("Failed to inspect repository")?;

    let paths = StrataPaths::from_repo_info(&info);
    let config = Config::load(Some(&paths))
        .context("Failed to load config")?
        .config;
    if let Some(format) = config.object_format() {
        debug!(format = format.name(), "object format overridden by config");
        info.object_format = format;
    }

    let runner = Arc::new(
        CliRunner::new(config.git_binary(), info.work_dir.clone())
            .with_timeout(config.command_timeout()),
    );
    Ok(Session {
        info,
        config,
        runner,
    })
}
