// crates/host-gate-core/tests/runner.rs
// ============================================================================
// Module: Suite Runner Tests
// Description: End-to-end evaluation over fake probers.
// Purpose: Verify verdict ordering, error isolation, cancellation, and events.
// Dependencies: host-gate-core, serde_json, tempfile
// ============================================================================
//! ## Overview
//! Drives [`host_gate_core::SuiteRunner`] with table-backed probers to check
//! the one-verdict-per-assertion invariant and ERROR versus FAIL separation.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

mod common;

use std::sync::atomic::AtomicBool;

use host_gate_core::Assertion;
use host_gate_core::Comparator;
use host_gate_core::Expectation;
use host_gate_core::FileRunEventSink;
use host_gate_core::NoopRunEventSink;
use host_gate_core::Observation;
use host_gate_core::Outcome;
use host_gate_core::ProbeError;
use host_gate_core::ProbeErrorKind;
use host_gate_core::RunError;
use host_gate_core::Subject;
use host_gate_core::SubjectKind;
use host_gate_core::SuiteRunner;
use host_gate_core::SuiteSpec;
use serde_json::json;

use crate::common::MissingProber;
use crate::common::RecordingSink;
use crate::common::TableProber;
use crate::common::assert_eq_field;
use crate::common::package;

/// Runs a suite to completion with a no-op sink.
fn run(prober: &TableProber, suite: &SuiteSpec) -> host_gate_core::Report {
    SuiteRunner::new(prober, &NoopRunEventSink).run(suite, &AtomicBool::new(false)).unwrap()
}

// ============================================================================
// SECTION: Scenarios
// ============================================================================

/// Tests the installed-package scenario on hosts with and without the package.
#[test]
fn package_installed_scenario() {
    let suite = SuiteSpec::new(
        "pkg",
        vec![assert_eq_field(SubjectKind::Package, "docker-engine", "installed", json!(true))],
    );

    let with = TableProber::new().observe(SubjectKind::Package, "docker-engine", package(true, None));
    assert_eq!(run(&with, &suite).verdicts[0].outcome, Outcome::Pass);

    let without =
        TableProber::new().observe(SubjectKind::Package, "docker-engine", package(false, None));
    assert_eq!(run(&without, &suite).verdicts[0].outcome, Outcome::Fail);
}

/// Tests that a missing file yields ERROR for a content check, not FAIL.
#[test]
fn missing_file_content_is_error() {
    let suite = SuiteSpec::new(
        "file",
        vec![Assertion::new(
            Subject::new(SubjectKind::File, "/etc/x.conf"),
            Expectation::new("content", Comparator::Contains, json!("foo")),
        )],
    );
    let prober = TableProber::new().fail(
        SubjectKind::File,
        "/etc/x.conf",
        ProbeError::new(ProbeErrorKind::NotFound, "no such file: /etc/x.conf"),
    );
    let report = run(&prober, &suite);
    assert_eq!(report.verdicts[0].outcome, Outcome::Error);
    assert_eq!(report.verdicts[0].probe.error().unwrap().kind, ProbeErrorKind::NotFound);
    assert_eq!(report.counts.errored, 1);
}

/// Tests the negated listening-port scenario on a host where the port is closed.
#[test]
fn negated_port_scenario() {
    let suite = SuiteSpec::new(
        "port",
        vec![
            Assertion::new(
                Subject::new(SubjectKind::Port, "8888").with_params(json!({"protocol": "tcp"})),
                Expectation::equals("listening", json!(true)),
            )
            .negated(true),
        ],
    );
    let prober = TableProber::new().observe(
        SubjectKind::Port,
        "8888",
        Observation::new().with("listening", false).with("protocols", json!([])),
    );
    assert_eq!(run(&prober, &suite).verdicts[0].outcome, Outcome::Pass);
}

// ============================================================================
// SECTION: Invariants
// ============================================================================

/// Tests that probe errors do not stop later assertions and order is kept.
#[test]
fn errors_are_isolated_and_order_is_kept() {
    let suite = SuiteSpec::new(
        "mixed",
        vec![
            assert_eq_field(SubjectKind::Package, "a", "installed", json!(true)),
            assert_eq_field(SubjectKind::Package, "broken", "installed", json!(true)),
            assert_eq_field(SubjectKind::Package, "c", "installed", json!(true)),
        ],
    );
    let prober = TableProber::new()
        .observe(SubjectKind::Package, "a", package(true, None))
        .fail(
            SubjectKind::Package,
            "broken",
            ProbeError::new(ProbeErrorKind::CommandNotFound, "dpkg-query not found"),
        )
        .observe(SubjectKind::Package, "c", package(false, None));
    let report = run(&prober, &suite);

    let outcomes: Vec<Outcome> = report.verdicts.iter().map(|verdict| verdict.outcome).collect();
    assert_eq!(outcomes, vec![Outcome::Pass, Outcome::Error, Outcome::Fail]);
    let counts = report.counts;
    assert_eq!(counts.passed + counts.failed + counts.errored, counts.total);
    assert_eq!(counts.total, 3);
    assert_eq!(report.exit_code(), host_gate_core::EXIT_ERROR);
}

/// Tests that repeated runs over unchanged state yield equal reports.
#[test]
fn repeated_runs_are_idempotent() {
    let suite = SuiteSpec::new(
        "idem",
        vec![assert_eq_field(SubjectKind::Package, "a", "version", json!("1.0"))],
    );
    let prober = TableProber::new().observe(SubjectKind::Package, "a", package(true, Some("1.0")));
    assert_eq!(run(&prober, &suite), run(&prober, &suite));
}

/// Tests that observations are restricted to requested fields.
#[test]
fn observations_are_restricted() {
    let suite = SuiteSpec::new(
        "restrict",
        vec![assert_eq_field(SubjectKind::Package, "a", "installed", json!(true))],
    );
    let prober = TableProber::new().observe(SubjectKind::Package, "a", package(true, Some("1.0")));
    let report = run(&prober, &suite);
    let observation = report.verdicts[0].probe.observation().unwrap();
    assert_eq!(observation.get("version"), None);
    assert_eq!(observation.get("installed"), Some(&json!(true)));
}

/// Tests that a cancelled run still yields one ERROR verdict per assertion.
#[test]
fn cancellation_yields_error_verdicts() {
    let suite = SuiteSpec::new(
        "cancel",
        vec![
            assert_eq_field(SubjectKind::Package, "a", "installed", json!(true)),
            assert_eq_field(SubjectKind::Package, "b", "installed", json!(true)),
        ],
    );
    let prober = TableProber::new();
    let sink = RecordingSink::default();
    let report =
        SuiteRunner::new(&prober, &sink).run(&suite, &AtomicBool::new(true)).unwrap();
    assert_eq!(prober.calls(), 0);
    assert_eq!(report.counts.errored, 2);
    assert!(report.verdicts.iter().all(|verdict| {
        verdict.probe.error().map(|error| error.kind) == Some(ProbeErrorKind::Cancelled)
    }));
    assert_eq!(
        sink.names(),
        vec!["run_started", "assertion_evaluated", "assertion_evaluated", "run_finished"]
    );
}

/// Tests that invalid suites and missing probes abort before probing.
#[test]
fn preflight_failures_abort_before_probing() {
    let invalid = SuiteSpec::new("bad", Vec::new());
    let prober = TableProber::new();
    let result = SuiteRunner::new(&prober, &NoopRunEventSink).run(&invalid, &AtomicBool::new(false));
    assert!(matches!(result, Err(RunError::Spec(_))));
    assert_eq!(prober.calls(), 0);

    let suite = SuiteSpec::new(
        "ok",
        vec![assert_eq_field(SubjectKind::Container, "logstash", "running", json!(true))],
    );
    let result =
        SuiteRunner::new(&MissingProber, &NoopRunEventSink).run(&suite, &AtomicBool::new(false));
    assert!(matches!(result, Err(RunError::ProbesMissing(_))));
}

// ============================================================================
// SECTION: Event Log
// ============================================================================

/// Tests that the file sink appends one JSON line per event.
#[test]
fn file_sink_appends_json_lines() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("events.jsonl");
    let suite = SuiteSpec::new(
        "log",
        vec![assert_eq_field(SubjectKind::Package, "nginx", "installed", json!(true))],
    );
    let prober = TableProber::new().observe(SubjectKind::Package, "nginx", package(true, None));

    for _ in 0 .. 2 {
        let sink = FileRunEventSink::new(&path).unwrap();
        SuiteRunner::new(&prober, &sink).run(&suite, &AtomicBool::new(false)).unwrap();
    }

    let content = std::fs::read_to_string(&path).unwrap();
    let events: Vec<serde_json::Value> =
        content.lines().map(|line| serde_json::from_str(line).unwrap()).collect();
    assert_eq!(events.len(), 6);
    assert_eq!(events[0]["event"], json!("run_started"));
    assert_eq!(events[0]["suite_id"], json!("log"));
    assert_eq!(events[1]["outcome"], json!("pass"));
    assert_eq!(events[2]["counts"]["passed"], json!(1));
    assert_eq!(events[2]["cancelled"], json!(false));
    assert_eq!(events[3]["event"], json!("run_started"));
}
