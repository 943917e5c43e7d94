//! Operator CLI surface (§10.4): five subcommands plus a global project root.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "tdd", about = "Drives an LLM agent fleet through a PLAN/RED/GREEN/REFACTOR cycle")]
pub struct Cli {
    /// Project root to operate on; defaults to the current directory.
    #[arg(short = 'p', long = "project", global = true)]
    pub project: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Start a new workflow for a feature request.
    Run {
        /// A natural-language description of the feature to build.
        feature_request: String,
    },
    /// Resume the most recently recorded handoff state.
    Resume,
    /// Print the latest handoff state without executing anything.
    Status,
    /// Print the newest-first history of recorded handoff states.
    History {
        /// Number of entries to show.
        #[arg(short = 'n', long = "limit", default_value_t = 10)]
        limit: usize,
    },
    /// Hard-reset the repository to a prior commit.
    Rollback {
        /// The commit to reset to.
        commit: String,
        /// Actually perform the reset; otherwise this previews it only.
        #[arg(long)]
        force: bool,
    },
}
