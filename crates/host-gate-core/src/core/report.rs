// crates/host-gate-core/src/core/report.rs
// ============================================================================
// Module: Host Gate Reports
// Description: Verdicts, ordered reports, summaries, and exit codes.
// Purpose: Aggregate per-assertion outcomes into a run-level status.
// Dependencies: crate::core, serde
// ============================================================================

//! ## Overview
//! Every assertion produces exactly one [`Verdict`] per run. The [`Report`]
//! keeps verdicts in declaration order together with running counts, and a
//! [`ReportSummary`] reduces it to an [`OverallStatus`] plus the first few
//! non-passing verdicts for display.
//!
//! Exit codes: `0` all passed, `1` at least one FAIL and no ERROR, `2` at
//! least one ERROR, [`EXIT_INVALID_DECLARATIONS`] when nothing was probed
//! because declarations or configuration were unusable.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::core::assertion::Assertion;
use crate::core::hashing::HashDigest;
use crate::core::identifiers::SuiteId;
use crate::core::observation::ProbeResult;

// ============================================================================
// SECTION: Exit Codes
// ============================================================================

/// Exit code when every assertion passed.
pub const EXIT_PASS: u8 = 0;
/// Exit code when at least one assertion failed and none errored.
pub const EXIT_FAIL: u8 = 1;
/// Exit code when at least one assertion errored.
pub const EXIT_ERROR: u8 = 2;
/// Exit code when declarations or configuration could not be loaded.
pub const EXIT_INVALID_DECLARATIONS: u8 = 3;

// ============================================================================
// SECTION: Verdicts
// ============================================================================

/// Outcome of evaluating one assertion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Condition held.
    Pass,
    /// Condition did not hold.
    Fail,
    /// Condition could not be evaluated.
    Error,
}

impl Outcome {
    /// Returns the report label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pass => "PASS",
            Self::Fail => "FAIL",
            Self::Error => "ERROR",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Result of evaluating one assertion in one run.
///
/// # Invariants
/// - `outcome` is `Error` whenever the probe failed.
/// - Carries no timing data; repeated runs over unchanged state are equal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    /// Assertion that was evaluated.
    pub assertion: Assertion,
    /// Probe result the verdict was derived from.
    pub probe: ProbeResult,
    /// Evaluation outcome.
    pub outcome: Outcome,
    /// Explanation for non-passing outcomes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Verdict {
    /// Returns true only for a passing verdict.
    #[must_use]
    pub const fn passed(&self) -> bool {
        matches!(self.outcome, Outcome::Pass)
    }

    /// Renders `<kind> <identifier> <PASS|FAIL|ERROR> [message]`.
    #[must_use]
    pub fn render_line(&self) -> String {
        let subject = &self.assertion.subject;
        let mut line = format!("{} {} {}", subject.kind, subject.identifier, self.outcome);
        if let Some(message) = &self.message {
            line.push(' ');
            line.push_str(message);
        }
        line
    }
}

// ============================================================================
// SECTION: Reports
// ============================================================================

/// Verdict counts for a run.
///
/// # Invariants
/// - `passed + failed + errored == total`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportCounts {
    /// Total verdicts recorded.
    pub total: usize,
    /// Passing verdicts.
    pub passed: usize,
    /// Failing verdicts.
    pub failed: usize,
    /// Errored verdicts.
    pub errored: usize,
}

/// Run-level status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverallStatus {
    /// Every verdict passed.
    Pass,
    /// At least one verdict failed or errored.
    Fail,
}

/// Ordered verdicts for one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    /// Suite that was evaluated.
    pub suite_id: SuiteId,
    /// Canonical hash of the evaluated suite.
    pub suite_hash: HashDigest,
    /// Verdicts in declaration order.
    pub verdicts: Vec<Verdict>,
    /// Running counts.
    pub counts: ReportCounts,
}

impl Report {
    /// Creates an empty report.
    #[must_use]
    pub const fn new(suite_id: SuiteId, suite_hash: HashDigest) -> Self {
        Self {
            suite_id,
            suite_hash,
            verdicts: Vec::new(),
            counts: ReportCounts {
                total: 0,
                passed: 0,
                failed: 0,
                errored: 0,
            },
        }
    }

    /// Appends a verdict and updates counts.
    pub fn record(&mut self, verdict: Verdict) {
        self.counts.total += 1;
        match verdict.outcome {
            Outcome::Pass => self.counts.passed += 1,
            Outcome::Fail => self.counts.failed += 1,
            Outcome::Error => self.counts.errored += 1,
        }
        self.verdicts.push(verdict);
    }

    /// Returns the run-level status.
    #[must_use]
    pub const fn status(&self) -> OverallStatus {
        if self.counts.failed == 0 && self.counts.errored == 0 {
            OverallStatus::Pass
        } else {
            OverallStatus::Fail
        }
    }

    /// Returns the process exit code for the report.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        if self.counts.errored > 0 {
            EXIT_ERROR
        } else if self.counts.failed > 0 {
            EXIT_FAIL
        } else {
            EXIT_PASS
        }
    }

    /// Summarizes the report, keeping at most `max_failures` non-passing verdicts.
    #[must_use]
    pub fn summary(&self, max_failures: usize) -> ReportSummary {
        let non_passing = self.verdicts.iter().filter(|verdict| !verdict.passed());
        let failures: Vec<Verdict> = non_passing.clone().take(max_failures).cloned().collect();
        let omitted = non_passing.count().saturating_sub(failures.len());
        ReportSummary {
            status: self.status(),
            counts: self.counts,
            failures,
            omitted_failures: omitted,
        }
    }
}

/// Condensed view of a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSummary {
    /// Run-level status.
    pub status: OverallStatus,
    /// Verdict counts.
    pub counts: ReportCounts,
    /// First non-passing verdicts in declaration order.
    pub failures: Vec<Verdict>,
    /// Non-passing verdicts left out of `failures`.
    pub omitted_failures: usize,
}
