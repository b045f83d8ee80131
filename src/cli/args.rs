//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Global Flags
//!
//! These flags are available on all commands:
//! - `--help` / `-h`: Show help
//! - `--version`: Show version
//! - `--cwd <path>`: Run as if in that directory
//! - `--debug`: Enable debug logging

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// strata - Repository snapshots for git porcelains
#[derive(Parser, Debug)]
#[command(name = "strata")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Run as if strata was started in this directory
    #[arg(long, global = true)]
    pub cwd: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Snapshot the working copy and print it
    #[command(
        name = "status",
        long_about = "Snapshot the working copy and print it.\n\n\
            Shows HEAD with its upstream and push remote, any merge, rebase, \
            cherry-pick or revert in progress, untracked, unstaged, staged and \
            unmerged changes, stashes, unpulled and unpushed commits, and \
            recent history. Lookups that failed are listed at the end.",
        after_help = "\
EXAMPLES:
    # Human-readable summary
    strata status

    # Full snapshot, including diffs, for scripting
    strata status --json"
    )]
    Status {
        /// Print the full snapshot as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show parsed history
    #[command(
        name = "log",
        after_help = "\
EXAMPLES:
    # Last 20 commits with the branch graph
    strata log -n 20 --graph

    # History of a topic branch only
    strata log main..topic"
    )]
    Log {
        /// Number of commits (default: configured log limit)
        #[arg(short = 'n', long = "max-count", value_name = "N")]
        limit: Option<usize>,

        /// Draw the commit graph
        #[arg(long)]
        graph: bool,

        /// Omit ref decorations
        #[arg(long)]
        no_decorate: bool,

        /// Revisions to list (default: HEAD)
        #[arg(value_name = "REV")]
        revisions: Vec<String>,
    },

    /// Print the effective configuration
    Config,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_global_flags_after_command() {
        let cli = Cli::try_parse_from(["strata", "status", "--json", "--debug"]).unwrap();
        assert!(cli.debug);
        assert!(matches!(cli.command, Command::Status { json: true }));
    }

    #[test]
    fn parses_log_options() {
        let cli =
            Cli::try_parse_from(["strata", "log", "-n", "5", "--graph", "main", "topic"]).unwrap();
        match cli.command {
            Command::Log {
                limit,
                graph,
                no_decorate,
                revisions,
            } => {
                assert_eq!(limit, Some(5));
                assert!(graph);
                assert!(!no_decorate);
                assert_eq!(revisions, ["main", "topic"]);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn rejects_non_numeric_log_count() {
        assert!(Cli::try_parse_from(["strata", "log", "-n", "many"]).is_err());
    }
}
