//! Git collaborators: history enumeration, checkout, and the measurement
//! command itself.
//!
//! All subprocess plumbing lives here so the engine stays free of I/O.
//! git's own stderr is passed through to the terminal for diagnosis.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::engine::{MeasureOutput, Workspace};
use crate::model::CommitRecord;

/// Errors enumerating commit history. Always fatal to the run.
#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    #[error("failed to run git: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("git log failed: {0}")]
    GitLog(String),

    #[error("unexpected git log line: {0:?}")]
    MalformedLine(String),
}

/// Enumerates up to `window` most recent commits of `branch`, newest
/// first, as fresh unmeasured records.
pub fn recent_commits(
    dir: &Path,
    branch: &str,
    window: usize,
) -> Result<Vec<CommitRecord>, HistoryError> {
    let output = Command::new("git")
        .args(["log", "--pretty=format:%H %ct %s", "-n"])
        .arg(window.to_string())
        .arg(branch)
        .current_dir(dir)
        .stderr(Stdio::inherit())
        .output()?;

    if !output.status.success() {
        return Err(HistoryError::GitLog(format!("exit status {}", output.status)));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    stdout
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(parse_log_line)
        .collect()
}

/// Parses one `%H %ct %s` log line into a record.
fn parse_log_line(line: &str) -> Result<CommitRecord, HistoryError> {
    let malformed = || HistoryError::MalformedLine(line.to_string());

    let mut parts = line.splitn(3, ' ');
    let commit = parts.next().ok_or_else(malformed)?;
    let date = parts.next().ok_or_else(malformed)?;
    let desc = parts.next().ok_or_else(malformed)?;
    let date = date.parse::<i64>().map_err(|_| malformed())?;

    Ok(CommitRecord::new(commit, date, desc))
}

/// The real working tree: checks out commits and runs the measurement
/// command in the configured directory.
pub struct GitWorkspace {
    dir: PathBuf,
    command: String,
}

impl GitWorkspace {
    pub fn new(dir: impl Into<PathBuf>, command: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            command: command.into(),
        }
    }
}

impl Workspace for GitWorkspace {
    fn checkout(&self, commit: &str) -> Result<(), String> {
        let status = Command::new("git")
            .args(["checkout", commit])
            .current_dir(&self.dir)
            .stderr(Stdio::inherit())
            .status()
            .map_err(|e| format!("failed to run git: {e}"))?;

        if !status.success() {
            return Err(format!("git checkout {commit} failed: {status}"));
        }
        Ok(())
    }

    fn run_measurement(&self) -> Result<MeasureOutput, String> {
        let output = Command::new("/bin/sh")
            .args(["-c", &self.command])
            .current_dir(&self.dir)
            .stderr(Stdio::inherit())
            .output()
            .map_err(|e| e.to_string())?;

        Ok(MeasureOutput {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            success: output.status.success(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_full_log_line() {
        let record =
            parse_log_line("3f2a1b4c5d6e7f8091a2b3c4d5e6f70812345678 1700000000 Fix the widget")
                .unwrap();

        assert_eq!(record.commit, "3f2a1b4c5d6e7f8091a2b3c4d5e6f70812345678");
        assert_eq!(record.date, 1_700_000_000);
        assert_eq!(record.desc, "Fix the widget");
        assert!(record.data.is_none());
        assert!(record.outcome.is_none());
    }

    #[test]
    fn subject_keeps_its_own_spaces() {
        let record = parse_log_line("abc 100 multi word subject  here").unwrap();
        assert_eq!(record.desc, "multi word subject  here");
    }

    #[test]
    fn line_without_subject_is_malformed() {
        let err = parse_log_line("abc 100").unwrap_err();
        assert!(matches!(err, HistoryError::MalformedLine(_)));
    }

    #[test]
    fn non_numeric_timestamp_is_malformed() {
        let err = parse_log_line("abc yesterday Fix it").unwrap_err();
        assert!(matches!(err, HistoryError::MalformedLine(_)));
    }
}
