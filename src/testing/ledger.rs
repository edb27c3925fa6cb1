//! Per-test result accumulation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Pass/fail verdict of one check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verdict {
    /// The check passed.
    Pass,
    /// The check failed.
    Fail,
}

impl Verdict {
    /// Console marker printed in front of the check name.
    pub fn marker(&self) -> &'static str {
        match self {
            Verdict::Pass => "PASS:",
            Verdict::Fail => "FAIL:",
        }
    }
}

/// A named pass/fail record. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    /// Check name, e.g. `led_red` or `button_a`.
    pub name: String,
    /// Result of the check.
    pub verdict: Verdict,
    /// When the outcome was recorded.
    pub recorded_at: DateTime<Utc>,
}

impl Outcome {
    /// Create an outcome stamped with the current time.
    pub fn new(name: impl Into<String>, verdict: Verdict) -> Self {
        Self {
            name: name.into(),
            verdict,
            recorded_at: Utc::now(),
        }
    }
}

/// Passed and failed outcomes of a single test, in recording order.
///
/// Append-only. Duplicate names are kept as separate entries.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResultLedger {
    passed: Vec<Outcome>,
    failed: Vec<Outcome>,
}

impl ResultLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an outcome to the sequence matching its verdict.
    pub fn record(&mut self, outcome: Outcome) {
        match outcome.verdict {
            Verdict::Pass => self.passed.push(outcome),
            Verdict::Fail => self.failed.push(outcome),
        }
    }

    /// Outcomes that passed.
    pub fn passed(&self) -> &[Outcome] {
        &self.passed
    }

    /// Outcomes that failed.
    pub fn failed(&self) -> &[Outcome] {
        &self.failed
    }

    /// True when nothing has failed.
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }

    /// Names of the passed outcomes.
    pub fn passed_names(&self) -> Vec<&str> {
        self.passed.iter().map(|o| o.name.as_str()).collect()
    }

    /// Names of the failed outcomes.
    pub fn failed_names(&self) -> Vec<&str> {
        self.failed.iter().map(|o| o.name.as_str()).collect()
    }

    /// Total number of recorded outcomes.
    pub fn len(&self) -> usize {
        self.passed.len() + self.failed.len()
    }

    /// True if no outcome was recorded.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
