//! Commit records and the ledger they form.
//!
//! Field names match the ledger files this tool has historically written,
//! so existing `db.json` documents keep loading.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One tracked commit and its measurement status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitRecord {
    /// Full commit hash. Unique within the ledger.
    pub commit: String,

    /// Commit timestamp, seconds since the epoch. Set once from history.
    pub date: i64,

    /// Single-line commit summary. Set once from history.
    pub desc: String,

    /// Named measurement values. Present means the commit is done.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<BTreeMap<String, f64>>,

    /// Failure marker. Absent for pending and measured commits.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<Outcome>,
}

impl CommitRecord {
    /// A fresh, unmeasured record as enumerated from history.
    pub fn new(commit: impl Into<String>, date: i64, desc: impl Into<String>) -> Self {
        Self {
            commit: commit.into(),
            date,
            desc: desc.into(),
            data: None,
            outcome: None,
        }
    }

    /// Whether the evaluation engine should attempt this record.
    ///
    /// Measured and permanently broken records are skipped forever.
    /// Transiently failed records are eligible again.
    pub fn needs_evaluation(&self) -> bool {
        self.data.is_none() && self.outcome != Some(Outcome::Broken)
    }
}

/// How a commit's evaluation ended, when it did not produce a measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    /// The operator marked the commit permanently broken. Never retried.
    Broken,

    /// The measurement failed. Re-attempted on a future run.
    Failed,
}

/// The ordered collection of commit records, newest first.
///
/// Order follows the upstream enumeration: the most recently fetched
/// commit is the first record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ledger {
    pub records: Vec<CommitRecord>,
}

impl Ledger {
    /// Reconciles freshly fetched commits against this ledger.
    ///
    /// Walks the fetched sequence in order with a forward-only cursor
    /// over the prior records. A fetched commit already in the ledger
    /// keeps its prior record, measurement and all; prior records the
    /// cursor skips over are dropped, since a rebase or force-push has
    /// made them unreachable from the current window. A fetched commit
    /// not in the ledger becomes a new unmeasured record.
    ///
    /// Prior records older than the fetch window are retained at the
    /// tail, so history survives commits scrolling out of the window.
    /// An empty fetch says nothing about history and leaves the ledger
    /// unchanged.
    pub fn merge(&self, fetched: Vec<CommitRecord>) -> Ledger {
        if fetched.is_empty() {
            return self.clone();
        }

        let mut merged = Vec::with_capacity(fetched.len());
        let mut rest = self.records.as_slice();
        for commit in fetched {
            if let Some(i) = rest.iter().position(|r| r.commit == commit.commit) {
                merged.push(rest[i].clone());
                rest = &rest[i + 1..];
            } else {
                merged.push(commit);
            }
        }
        merged.extend_from_slice(rest);
        Ledger { records: merged }
    }
}
