// crates/host-gate-core/src/runtime/events.rs
// ============================================================================
// Module: Host Gate Run Events
// Description: Structured run events and JSON-lines sinks.
// Purpose: Emit machine-readable progress logs without a logging framework.
// Dependencies: crate::core, serde, serde_json
// ============================================================================

//! ## Overview
//! The runner emits one event when a run starts, one per evaluated assertion,
//! and one when the run finishes. Sinks serialize events as JSON lines to
//! stderr or an append-only file; the no-op sink discards them. Sink write
//! failures are ignored so logging can never change a verdict.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Serialize;

use crate::core::HashDigest;
use crate::core::Outcome;
use crate::core::ProbeErrorKind;
use crate::core::ReportCounts;
use crate::core::Subject;
use crate::core::SuiteId;
use crate::core::Verdict;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Run event payload.
#[derive(Debug, Clone, Serialize)]
pub struct RunEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Suite being evaluated.
    pub suite_id: SuiteId,
    /// Canonical suite hash (run start only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suite_hash: Option<HashDigest>,
    /// Zero-based assertion position.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
    /// Evaluated subject.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<Subject>,
    /// Verdict outcome.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<Outcome>,
    /// Probe error kind when the probe failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ProbeErrorKind>,
    /// Verdict message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Verdict counts (run finish only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub counts: Option<ReportCounts>,
    /// Assertions to evaluate (run start only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<usize>,
    /// True when the run was cancelled (run finish only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancelled: Option<bool>,
}

impl RunEvent {
    /// Creates an event with only the common fields populated.
    fn base(event: &'static str, suite_id: &SuiteId) -> Self {
        Self {
            event,
            timestamp_ms: now_ms(),
            suite_id: suite_id.clone(),
            suite_hash: None,
            index: None,
            subject: None,
            outcome: None,
            error_kind: None,
            message: None,
            counts: None,
            total: None,
            cancelled: None,
        }
    }

    /// Builds the `run_started` event.
    #[must_use]
    pub fn run_started(suite_id: &SuiteId, suite_hash: &HashDigest, total: usize) -> Self {
        Self {
            suite_hash: Some(suite_hash.clone()),
            total: Some(total),
            ..Self::base("run_started", suite_id)
        }
    }

    /// Builds the `assertion_evaluated` event.
    #[must_use]
    pub fn assertion_evaluated(suite_id: &SuiteId, index: usize, verdict: &Verdict) -> Self {
        Self {
            index: Some(index),
            subject: Some(verdict.assertion.subject.clone()),
            outcome: Some(verdict.outcome),
            error_kind: verdict.probe.error().map(|error| error.kind),
            message: verdict.message.clone(),
            ..Self::base("assertion_evaluated", suite_id)
        }
    }

    /// Builds the `run_finished` event.
    #[must_use]
    pub fn run_finished(suite_id: &SuiteId, counts: ReportCounts, cancelled: bool) -> Self {
        Self {
            counts: Some(counts),
            cancelled: Some(cancelled),
            ..Self::base("run_finished", suite_id)
        }
    }
}

/// Returns milliseconds since the Unix epoch, or zero when the clock is unset.
fn now_ms() -> u128 {
    SystemTime::now().duration_since(UNIX_EPOCH).map_or(0, |duration| duration.as_millis())
}

// ============================================================================
// SECTION: Sinks
// ============================================================================

/// Run event sink.
pub trait RunEventSink: Send + Sync {
    /// Record a run event.
    fn record(&self, event: &RunEvent);
}

/// Sink that logs JSON lines to stderr.
pub struct StderrRunEventSink;

impl RunEventSink for StderrRunEventSink {
    fn record(&self, event: &RunEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }
}

/// Sink that logs JSON lines to a file.
pub struct FileRunEventSink {
    /// File handle used for append-only logging.
    file: Mutex<std::fs::File>,
}

impl FileRunEventSink {
    /// Opens the event log file in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl RunEventSink for FileRunEventSink {
    fn record(&self, event: &RunEvent) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }
}

/// No-op run event sink.
pub struct NoopRunEventSink;

impl RunEventSink for NoopRunEventSink {
    fn record(&self, _event: &RunEvent) {}
}
