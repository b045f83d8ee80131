//! cli
//!
//! Command-line interface layer for strata.
//!
//! # Responsibilities
//!
//! - Parse command-line arguments and global flags
//! - Install the log subscriber and the async runtime
//! - Delegate to command handlers
//!
//! # Architecture
//!
//! The CLI layer is thin. It parses arguments via clap and hands the
//! repository to the [`crate::engine`]; handlers only format what the
//! engine returns.

pub mod args;
pub mod commands;

pub use args::Cli;

use std::path::PathBuf;

use anyhow::{Context as _, Result};
use tracing_subscriber::filter::EnvFilter;

/// Global flags shared by every handler.
#[derive(Debug, Clone, Default)]
pub struct Context {
    /// Directory to run in (default: the process working directory)
    pub cwd: Option<PathBuf>,
    pub debug: bool,
}

/// Log to stderr. `--debug` wins over `RUST_LOG`; the default is `warn`.
fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new("strata=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    // A subscriber may already be installed when embedded.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Run the CLI application.
///
/// This is the main entry point called from `main.rs`.
pub fn run() -> Result<()> {
    let cli = Cli::parse_args();
    init_tracing(cli.debug);

    let ctx = Context {
        cwd: cli.cwd.clone(),
        debug: cli.debug,
    };

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;
    runtime.block_on(commands::dispatch(cli.command, &ctx))
}
