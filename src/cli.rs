//! Command-line surface for git-metrics.
//!
//! One command, no subcommands: resolve configuration, reconcile the
//! ledger with fresh history, then evaluate whatever still needs
//! measuring. Every error is mapped to a human-readable message here;
//! `main` only prints it.

use std::path::PathBuf;

use clap::Parser;

use crate::config::Config;
use crate::engine;
use crate::git::{self, GitWorkspace};
use crate::recovery::TerminalPrompt;
use crate::store;

/// Track a numeric metric (binary size, say) across recent commits.
///
/// Checks out each tracked commit, runs the measurement command, and
/// records its numeric stdout in a resumable ledger. Safe to interrupt
/// and re-run: completed measurements are never repeated.
#[derive(Debug, Parser)]
#[command(name = "git-metrics")]
pub struct Cli {
    /// Measurement command, run with `/bin/sh -c` in the working
    /// directory. Its trimmed stdout must be a number. Falls back to
    /// `cmd` in .git-metrics.toml; required one way or the other.
    #[arg(long)]
    cmd: Option<String>,

    /// Directory of the repository to measure [default: current directory].
    #[arg(long)]
    dir: Option<PathBuf>,

    /// Branch whose history is tracked [default: main].
    #[arg(long)]
    branch: Option<String>,

    /// How many recent commits to track [default: 500].
    #[arg(long)]
    window: Option<usize>,

    /// Ledger file path [default: db.json].
    #[arg(long)]
    ledger: Option<PathBuf>,

    /// Record failures instead of prompting, and keep going.
    #[arg(long)]
    non_interactive: bool,
}

/// Run the tool, returning an error message on failure.
pub fn run() -> Result<(), String> {
    let cli = Cli::parse();
    let config = Config::resolve(
        cli.dir,
        cli.cmd,
        cli.branch,
        cli.window,
        cli.ledger,
        cli.non_interactive,
    )?;

    let fetched = git::recent_commits(&config.dir, &config.branch, config.window)
        .map_err(|e| format!("failed to enumerate history of {}: {e}", config.branch))?;

    let prior = store::load(&config.ledger_path)
        .map_err(|e| format!("failed to load {}: {e}", config.ledger_path.display()))?;

    let mut ledger = prior.merge(fetched);
    store::save(&ledger, &config.ledger_path)
        .map_err(|e| format!("failed to save {}: {e}", config.ledger_path.display()))?;

    let workspace = GitWorkspace::new(&config.dir, &config.command);
    let mut prompt = TerminalPrompt;
    engine::evaluate_all(
        &mut ledger,
        &config.ledger_path,
        &workspace,
        &mut prompt,
        config.mode,
    )
    .map_err(|e| e.to_string())
}
