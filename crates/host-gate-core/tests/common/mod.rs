// crates/host-gate-core/tests/common/mod.rs
// ============================================================================
// Module: Common Test Fixtures
// Description: Shared fake probers, sinks, and assertion builders.
// Purpose: Provide deterministic host state for runner and matcher tests.
// Dependencies: host-gate-core
// ============================================================================

//! ## Overview
//! Fakes in this module answer probe requests from a fixed table so runner
//! behavior can be tested without touching the host.

#![allow(dead_code, reason = "Shared test helpers may be unused in some cases.")]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::cell::Cell;
use std::collections::BTreeMap;
use std::sync::Mutex;

use host_gate_core::Assertion;
use host_gate_core::Expectation;
use host_gate_core::Observation;
use host_gate_core::ProbeError;
use host_gate_core::ProbeMissingError;
use host_gate_core::ProbeRequest;
use host_gate_core::Prober;
use host_gate_core::RunEvent;
use host_gate_core::RunEventSink;
use host_gate_core::Subject;
use host_gate_core::SubjectKind;
use host_gate_core::SuiteSpec;
use serde_json::Value;

// ============================================================================
// SECTION: Fake Prober
// ============================================================================

/// Prober answering from a fixed table keyed by kind and identifier.
#[derive(Default)]
pub struct TableProber {
    /// Canned responses.
    responses: BTreeMap<(SubjectKind, String), Result<Observation, ProbeError>>,
    /// Number of probe calls observed.
    calls: Cell<usize>,
}

impl TableProber {
    /// Creates an empty table prober.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a successful observation.
    #[must_use]
    pub fn observe(mut self, kind: SubjectKind, identifier: &str, observation: Observation) -> Self {
        self.responses.insert((kind, identifier.to_string()), Ok(observation));
        self
    }

    /// Adds a probe failure.
    #[must_use]
    pub fn fail(mut self, kind: SubjectKind, identifier: &str, error: ProbeError) -> Self {
        self.responses.insert((kind, identifier.to_string()), Err(error));
        self
    }

    /// Returns the number of probe calls made.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.get()
    }
}

impl Prober for TableProber {
    fn probe(&self, request: &ProbeRequest) -> Result<Observation, ProbeError> {
        self.calls.set(self.calls.get() + 1);
        let key = (request.subject.kind, request.subject.identifier.clone());
        match self.responses.get(&key) {
            Some(response) => response.clone(),
            None => Err(ProbeError::new(
                host_gate_core::ProbeErrorKind::NotFound,
                format!("no canned response for {}", request.subject),
            )),
        }
    }
}

/// Prober that rejects every suite as unserviceable.
pub struct MissingProber;

impl Prober for MissingProber {
    fn probe(&self, _request: &ProbeRequest) -> Result<Observation, ProbeError> {
        Ok(Observation::new())
    }

    fn validate_suite(&self, _suite: &SuiteSpec) -> Result<(), ProbeMissingError> {
        Err(ProbeMissingError {
            missing_kinds: vec!["container".to_string()],
            blocked_by_policy: true,
        })
    }
}

// ============================================================================
// SECTION: Recording Sink
// ============================================================================

/// Sink that keeps events in memory.
#[derive(Default)]
pub struct RecordingSink {
    /// Captured event names.
    events: Mutex<Vec<String>>,
}

impl RecordingSink {
    /// Returns captured event names in order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.events.lock().map(|events| events.clone()).unwrap_or_default()
    }
}

impl RunEventSink for RecordingSink {
    fn record(&self, event: &RunEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.event.to_string());
        }
    }
}

// ============================================================================
// SECTION: Builders
// ============================================================================

/// Builds a single-expectation equality assertion.
#[must_use]
pub fn assert_eq_field(kind: SubjectKind, identifier: &str, field: &str, expected: Value) -> Assertion {
    Assertion::new(Subject::new(kind, identifier), Expectation::equals(field, expected))
}

/// Builds a package observation.
#[must_use]
pub fn package(installed: bool, version: Option<&str>) -> Observation {
    let observation = Observation::new().with("installed", installed);
    match version {
        Some(version) => observation.with("version", version),
        None => observation,
    }
}
