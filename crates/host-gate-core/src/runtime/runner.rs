// crates/host-gate-core/src/runtime/runner.rs
// ============================================================================
// Module: Host Gate Suite Runner
// Description: Sequential assertion evaluation with cooperative cancellation.
// Purpose: Drive probes and the matcher to produce one verdict per assertion.
// Dependencies: crate::{core, interfaces, runtime}, thiserror
// ============================================================================

//! ## Overview
//! [`SuiteRunner`] evaluates assertions strictly in declaration order on the
//! calling thread. Declarations are validated and probe availability is
//! checked before the first probe runs; either failure aborts with a
//! [`RunError`] and no verdicts.
//!
//! Invariants:
//! - Every assertion yields exactly one [`Verdict`], including after cancellation.
//! - A probe failure yields an ERROR verdict and never stops the run.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

use thiserror::Error;

use crate::core::Assertion;
use crate::core::HashError;
use crate::core::Outcome;
use crate::core::ProbeError;
use crate::core::ProbeErrorKind;
use crate::core::ProbeMissingError;
use crate::core::ProbeRequest;
use crate::core::ProbeResult;
use crate::core::Report;
use crate::core::SpecError;
use crate::core::SuiteSpec;
use crate::core::TriState;
use crate::core::Verdict;
use crate::interfaces::Prober;
use crate::runtime::events::RunEvent;
use crate::runtime::events::RunEventSink;
use crate::runtime::matcher::Matcher;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors that prevent a run from starting.
#[derive(Debug, Error)]
pub enum RunError {
    /// Suite failed validation.
    #[error(transparent)]
    Spec(#[from] SpecError),
    /// Suite references probes that are missing or blocked.
    #[error(transparent)]
    ProbesMissing(#[from] ProbeMissingError),
    /// Suite could not be hashed.
    #[error(transparent)]
    Hash(#[from] HashError),
}

// ============================================================================
// SECTION: Runner
// ============================================================================

/// Sequential suite runner.
pub struct SuiteRunner<'a> {
    /// Probe backend.
    prober: &'a dyn Prober,
    /// Run event sink.
    sink: &'a dyn RunEventSink,
}

impl<'a> SuiteRunner<'a> {
    /// Creates a runner over a probe backend and event sink.
    #[must_use]
    pub const fn new(prober: &'a dyn Prober, sink: &'a dyn RunEventSink) -> Self {
        Self {
            prober,
            sink,
        }
    }

    /// Runs the suite and returns the ordered report.
    ///
    /// Once `cancel` is set, remaining assertions receive ERROR verdicts
    /// without being probed.
    ///
    /// # Errors
    ///
    /// Returns [`RunError`] when the suite is invalid or cannot be served;
    /// nothing is probed in that case.
    pub fn run(&self, suite: &SuiteSpec, cancel: &AtomicBool) -> Result<Report, RunError> {
        suite.validate()?;
        self.prober.validate_suite(suite)?;
        let suite_hash = suite.canonical_hash()?;
        self.sink.record(&RunEvent::run_started(&suite.suite_id, &suite_hash, suite.assertions.len()));

        let mut report = Report::new(suite.suite_id.clone(), suite_hash);
        let mut matcher = Matcher::new();
        let mut cancelled = false;
        for (index, assertion) in suite.assertions.iter().enumerate() {
            cancelled = cancelled || cancel.load(Ordering::SeqCst);
            let verdict = if cancelled {
                cancelled_verdict(assertion)
            } else {
                evaluate_assertion(self.prober, &mut matcher, assertion)
            };
            self.sink.record(&RunEvent::assertion_evaluated(&suite.suite_id, index, &verdict));
            report.record(verdict);
        }

        self.sink.record(&RunEvent::run_finished(&suite.suite_id, report.counts, cancelled));
        Ok(report)
    }
}

// ============================================================================
// SECTION: Evaluation
// ============================================================================

/// Probes and evaluates a single assertion.
pub fn evaluate_assertion(
    prober: &dyn Prober,
    matcher: &mut Matcher,
    assertion: &Assertion,
) -> Verdict {
    let request = ProbeRequest::for_assertion(assertion);
    match prober.probe(&request) {
        Err(error) => {
            let message = format!("probe error: {error}");
            Verdict {
                assertion: assertion.clone(),
                probe: ProbeResult::from_result(assertion.subject.clone(), Err(error)),
                outcome: Outcome::Error,
                message: Some(message),
            }
        }
        Ok(observation) => {
            let observation = observation.restrict(&request);
            let evaluation = matcher.evaluate_assertion(assertion, &observation);
            let outcome = match evaluation.result {
                TriState::True => Outcome::Pass,
                TriState::False => Outcome::Fail,
                TriState::Unknown => Outcome::Error,
            };
            Verdict {
                assertion: assertion.clone(),
                probe: ProbeResult::from_result(assertion.subject.clone(), Ok(observation)),
                outcome,
                message: evaluation.message,
            }
        }
    }
}

/// Builds the ERROR verdict recorded for assertions skipped by cancellation.
fn cancelled_verdict(assertion: &Assertion) -> Verdict {
    let error = ProbeError::new(ProbeErrorKind::Cancelled, "run cancelled before probing");
    Verdict {
        assertion: assertion.clone(),
        probe: ProbeResult::from_result(assertion.subject.clone(), Err(error)),
        outcome: Outcome::Error,
        message: Some("cancelled".to_string()),
    }
}
