//! Per-step and per-run results
//!
//! Rendered as plain text for terminals or JSON for scripts.

use std::fmt::{self, Display, Write as _};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::steps::{Snapshot, Step};
use crate::store::StoreError;

/// Why a step failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Failure {
    /// A literal expectation did not hold
    Mismatch {
        check: String,
        expected: String,
        actual: String,
    },
    /// The query itself failed
    Query {
        message: String,
        fatal: bool,
    },
}

impl Failure {
    pub fn mismatch(
        check: impl Into<String>,
        expected: impl Display,
        actual: impl Display,
    ) -> Self {
        Self::Mismatch {
            check: check.into(),
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, Failure::Query { fatal: true, .. })
    }
}

impl From<StoreError> for Failure {
    fn from(err: StoreError) -> Self {
        Self::Query {
            fatal: err.is_fatal(),
            message: err.to_string(),
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Failure::Mismatch {
                check,
                expected,
                actual,
            } => write!(f, "{check}: expected {expected}, got {actual}"),
            Failure::Query { message, .. } => write!(f, "query failed: {message}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StepOutcome {
    Passed,
    Failed { failure: Failure },
}

impl From<Result<(), Failure>> for StepOutcome {
    fn from(result: Result<(), Failure>) -> Self {
        match result {
            Ok(()) => StepOutcome::Passed,
            Err(failure) => StepOutcome::Failed { failure },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StepReport {
    pub index: usize,
    pub name: String,
    pub summary: String,
    pub outcome: StepOutcome,
    pub before: Snapshot,
    pub after: Snapshot,
    pub elapsed_ms: u64,
}

impl StepReport {
    pub fn new(
        index: usize,
        step: &Step,
        outcome: StepOutcome,
        before: Snapshot,
        after: Snapshot,
        elapsed: Duration,
    ) -> Self {
        Self {
            index,
            name: step.name.to_owned(),
            summary: step.summary.to_owned(),
            outcome,
            before,
            after,
            elapsed_ms: elapsed.as_millis() as u64,
        }
    }

    pub fn passed(&self) -> bool {
        self.outcome == StepOutcome::Passed
    }
}

/// Everything observed during one run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub backend: String,
    /// Row count right after the fixture reset
    pub baseline: Option<i64>,
    pub steps: Vec<StepReport>,
    /// Set when the run stopped before the last step
    pub error: Option<String>,
    pub elapsed_ms: u64,
}

impl RunReport {
    pub fn new(backend: impl Into<String>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            backend: backend.into(),
            baseline: None,
            steps: Vec::new(),
            error: None,
            elapsed_ms: 0,
        }
    }

    pub fn passed(&self) -> usize {
        self.steps.iter().filter(|step| step.passed()).count()
    }

    pub fn failed(&self) -> usize {
        self.steps.len() - self.passed()
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none() && self.failed() == 0
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "run {} ({})", self.run_id, self.backend);
        if let Some(baseline) = self.baseline {
            let _ = writeln!(out, "fixture loaded: {baseline} rows");
        }

        for step in &self.steps {
            match &step.outcome {
                StepOutcome::Passed => {
                    let _ = write!(out, "  PASS {} {}", step.index, step.name);
                }
                StepOutcome::Failed { failure } => {
                    let _ = write!(out, "  FAIL {} {}: {}", step.index, step.name, failure);
                }
            }
            if step.before.total != step.after.total {
                let _ = write!(out, " (rows {} -> {})", step.before.total, step.after.total);
            }
            let _ = writeln!(out, " [{} ms]", step.elapsed_ms);
        }

        if let Some(error) = &self.error {
            let _ = writeln!(out, "aborted: {error}");
        }
        let _ = writeln!(
            out,
            "{} steps: {} passed, {} failed in {} ms",
            self.steps.len(),
            self.passed(),
            self.failed(),
            self.elapsed_ms
        );
        out
    }
}
