//! The incremental evaluation engine.
//!
//! Walks the ledger in order, measures each commit that still needs it,
//! and saves the ledger after every record, so an interrupted run loses
//! at most the one in-flight evaluation.

use std::collections::BTreeMap;
use std::io;
use std::path::Path;

use jiff::Timestamp;

use crate::model::{CommitRecord, Ledger, Outcome};
use crate::recovery::Decision;
use crate::store;

/// The metric key stored for every successful measurement.
const METRIC_KEY: &str = "size";

/// Access to the working tree being measured.
///
/// Evaluation goes through this seam; tests substitute an in-memory fake.
pub trait Workspace {
    /// Switches the working tree to the given commit.
    fn checkout(&self, commit: &str) -> core::result::Result<(), String>;

    /// Runs the measurement command and captures its stdout.
    fn run_measurement(&self) -> core::result::Result<MeasureOutput, String>;
}

/// What the measurement command produced.
pub struct MeasureOutput {
    pub stdout: String,
    pub success: bool,
}

/// Supplies the operator's decision after a failed evaluation.
pub trait DecisionSource {
    fn decide(&mut self, commit: &CommitRecord, failure: &EvalFailure) -> io::Result<Decision>;
}

/// How failed evaluations are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryMode {
    /// Ask the operator: retry, mark broken, or skip.
    Interactive,

    /// Record the failure and move on. Re-attempted on the next run.
    Record,
}

/// A per-commit evaluation failure. Recorded or escalated, never fatal
/// to the run on its own.
#[derive(Debug, thiserror::Error)]
pub enum EvalFailure {
    #[error("{0}")]
    Checkout(String),

    #[error("failed to run measurement command: {0}")]
    Spawn(String),

    #[error("measurement command failed")]
    Command { stdout: String },
}

/// Errors that abort the run.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Store(#[from] store::StoreError),

    #[error(
        "measurement command printed {output:?}, which does not parse as a number; \
         check the configured command"
    )]
    MalformedOutput { output: String },

    #[error("failed to read recovery decision: {0}")]
    Prompt(#[from] io::Error),
}

pub type Result<T> = core::result::Result<T, EngineError>;

/// One evaluation attempt, classified.
enum Attempt {
    Measured(f64),
    Failed(EvalFailure),
}

/// Evaluates every ledger record that still needs it, in order.
///
/// Measured and broken records are never touched. The ledger is saved
/// after every walked record, whatever its outcome.
pub fn evaluate_all(
    ledger: &mut Ledger,
    ledger_path: &Path,
    workspace: &impl Workspace,
    decisions: &mut impl DecisionSource,
    mode: RecoveryMode,
) -> Result<()> {
    for i in 0..ledger.records.len() {
        if !ledger.records[i].needs_evaluation() {
            continue;
        }
        evaluate_one(&mut ledger.records[i], workspace, decisions, mode)?;
        store::save(ledger, ledger_path)?;
    }
    Ok(())
}

/// Drives one record to an outcome: measured, failed, broken, or left
/// pending by an operator skip.
fn evaluate_one(
    record: &mut CommitRecord,
    workspace: &impl Workspace,
    decisions: &mut impl DecisionSource,
    mode: RecoveryMode,
) -> Result<()> {
    loop {
        println!(
            "git-metrics: evaluating {} ({}) {}",
            short(&record.commit),
            commit_date(record.date),
            record.desc
        );

        match attempt(workspace, &record.commit)? {
            Attempt::Measured(value) => {
                println!("git-metrics: => {value}\n");
                record.data = Some(BTreeMap::from([(METRIC_KEY.to_string(), value)]));
                // A success supersedes any earlier transient failure.
                record.outcome = None;
                return Ok(());
            }
            Attempt::Failed(failure) => {
                if let EvalFailure::Command { stdout } = &failure {
                    if stdout.is_empty() {
                        println!("[measurement command had no output]");
                    } else {
                        print!("{stdout}");
                    }
                }
                eprintln!("git-metrics: {failure}");

                match mode {
                    RecoveryMode::Record => {
                        record.outcome = Some(Outcome::Failed);
                        return Ok(());
                    }
                    RecoveryMode::Interactive => match decisions.decide(record, &failure)? {
                        Decision::Retry => {}
                        Decision::MarkBroken => {
                            record.outcome = Some(Outcome::Broken);
                            return Ok(());
                        }
                        Decision::Skip => return Ok(()),
                    },
                }
            }
        }
    }
}

/// Checks out the commit and runs the measurement command once.
///
/// Checkout and command failures come back as `Attempt::Failed`. A
/// command that exits successfully but prints something non-numeric is a
/// misconfigured measurement pipeline and aborts the run instead of
/// poisoning the ledger.
fn attempt(workspace: &impl Workspace, commit: &str) -> Result<Attempt> {
    if let Err(e) = workspace.checkout(commit) {
        return Ok(Attempt::Failed(EvalFailure::Checkout(e)));
    }

    let output = match workspace.run_measurement() {
        Ok(output) => output,
        Err(e) => return Ok(Attempt::Failed(EvalFailure::Spawn(e))),
    };
    if !output.success {
        return Ok(Attempt::Failed(EvalFailure::Command {
            stdout: output.stdout,
        }));
    }

    match output.stdout.trim().parse::<f64>() {
        Ok(value) => Ok(Attempt::Measured(value)),
        Err(_) => Err(EngineError::MalformedOutput {
            output: output.stdout.trim().to_string(),
        }),
    }
}

/// First eight characters of the hash, enough to name a commit in output.
fn short(commit: &str) -> &str {
    commit.get(..8).unwrap_or(commit)
}

/// Renders stored epoch seconds as a calendar date.
fn commit_date(seconds: i64) -> String {
    Timestamp::from_second(seconds)
        .map(|t| t.strftime("%Y-%m-%d").to_string())
        .unwrap_or_else(|_| seconds.to_string())
}
