// crates/host-gate-config/tests/suite_loading.rs
// ============================================================================
// Module: Suite Loading Tests
// Description: Format detection, merging, normalization, and role selection.
// Purpose: Ensure suite files load identically across encodings and fail closed.
// Dependencies: host-gate-config, host-gate-core, serde_json, tempfile
// ============================================================================
//! ## Overview
//! The same baseline is written as TOML, JSON, and YAML to check that every
//! encoding yields the same suite, then merged with a role-specific file.

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

use std::collections::BTreeSet;
use std::path::PathBuf;

use host_gate_config::MAX_SUITE_FILE_SIZE;
use host_gate_config::SuiteLoadError;
use host_gate_config::load_suite_file;
use host_gate_config::load_suites;
use host_gate_core::Comparator;
use host_gate_core::SpecError;
use host_gate_core::SubjectKind;
use serde_json::json;
use tempfile::TempDir;

/// Baseline suite as TOML.
const BASELINE_TOML: &str = r#"
suite_id = "baseline"
description = "Shared host baseline"

[[assertions]]
id = "sshd-config-mode"
subject = { kind = "file", identifier = "/etc/ssh/sshd_config" }
expect = [{ field = "mode", expected = "600" }]

[[assertions]]
subject = { kind = "port", identifier = "23", params = { protocol = "tcp" } }
expect = [{ field = "listening", expected = true }]
negate = true
"#;

/// Baseline suite as JSON.
const BASELINE_JSON: &str = r#"{
  "suite_id": "baseline",
  "description": "Shared host baseline",
  "assertions": [
    {
      "id": "sshd-config-mode",
      "subject": {"kind": "file", "identifier": "/etc/ssh/sshd_config"},
      "expect": [{"field": "mode", "expected": "600"}]
    },
    {
      "subject": {"kind": "port", "identifier": "23", "params": {"protocol": "tcp"}},
      "expect": [{"field": "listening", "expected": true}],
      "negate": true
    }
  ]
}"#;

/// Baseline suite as YAML.
const BASELINE_YAML: &str = r#"
suite_id: baseline
description: Shared host baseline
assertions:
  - id: sshd-config-mode
    subject: {kind: file, identifier: /etc/ssh/sshd_config}
    expect:
      - {field: mode, expected: "600"}
  - subject:
      kind: port
      identifier: "23"
      params: {protocol: tcp}
    expect:
      - {field: listening, expected: true}
    negate: true
"#;

/// Role-specific suite as TOML.
const WEB_TOML: &str = r#"
suite_id = "web"

[[assertions]]
subject = { kind = "package", identifier = "nginx" }
expect = [{ field = "installed", expected = true }]
roles = ["web"]

[[assertions]]
subject = { kind = "service", identifier = "postgresql" }
expect = [{ field = "running", comparator = "equals", expected = true }]
roles = ["db"]
"#;

/// Writes a file into a directory and returns its path.
fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, content).unwrap();
    path
}

/// Tests that all encodings parse to the same suite.
#[test]
fn encodings_are_equivalent() {
    let dir = tempfile::tempdir().unwrap();
    let toml = load_suite_file(&write(&dir, "baseline.toml", BASELINE_TOML)).unwrap();
    let json = load_suite_file(&write(&dir, "baseline.json", BASELINE_JSON)).unwrap();
    let yaml = load_suite_file(&write(&dir, "baseline.yml", BASELINE_YAML)).unwrap();
    assert_eq!(toml, json);
    assert_eq!(toml, yaml);
    assert_eq!(toml.assertions[1].subject.kind, SubjectKind::Port);
    assert!(toml.assertions[1].negate);
}

/// Tests that loading normalizes mode literals to four octal digits.
#[test]
fn mode_literals_are_normalized() {
    let dir = tempfile::tempdir().unwrap();
    let paths = [write(&dir, "baseline.toml", BASELINE_TOML)];
    let suite = load_suites(&paths, &BTreeSet::new()).unwrap();
    let expectation = &suite.assertions[0].expect[0];
    assert_eq!(expectation.comparator, Comparator::Equals);
    assert_eq!(expectation.expected, json!("0600"));
}

/// Tests merging in order and role selection.
#[test]
fn merges_in_order_and_selects_roles() {
    let dir = tempfile::tempdir().unwrap();
    let paths = [write(&dir, "baseline.yaml", BASELINE_YAML), write(&dir, "web.toml", WEB_TOML)];

    let all = load_suites(&paths, &BTreeSet::new()).unwrap();
    assert_eq!(all.suite_id.as_str(), "baseline+web");
    assert_eq!(all.assertions.len(), 4);

    let web = load_suites(&paths, &BTreeSet::from(["web".to_string()])).unwrap();
    let kinds: Vec<SubjectKind> = web.assertions.iter().map(|assertion| assertion.subject.kind).collect();
    assert_eq!(kinds, vec![SubjectKind::File, SubjectKind::Port, SubjectKind::Package]);
}

/// Tests that a role selection matching nothing is an empty suite.
#[test]
fn empty_role_selection_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let web = write(&dir, "web.toml", WEB_TOML);
    let err = load_suites(&[web], &BTreeSet::from(["cache".to_string()])).unwrap_err();
    assert!(matches!(err, SuiteLoadError::Spec(SpecError::EmptySuite)));
}

/// Tests that invalid declarations are rejected at load time.
#[test]
fn invalid_declaration_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let bad = write(
        &dir,
        "bad.toml",
        r#"
suite_id = "bad"

[[assertions]]
subject = { kind = "package", identifier = "nginx" }
expect = [{ field = "version", comparator = "matches", expected = "1.(" }]
"#,
    );
    let err = load_suites(&[bad], &BTreeSet::new()).unwrap_err();
    assert!(matches!(err, SuiteLoadError::Spec(SpecError::InvalidPattern(_, _))));
}

/// Tests that unknown extensions are rejected.
#[test]
fn unknown_extension_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(&dir, "suite.ini", "suite_id = baseline");
    assert!(matches!(load_suite_file(&path), Err(SuiteLoadError::UnsupportedFormat(_))));
}

/// Tests that malformed documents report the file.
#[test]
fn malformed_document_is_parse_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(&dir, "broken.json", "{\"suite_id\": ");
    let err = load_suite_file(&path).unwrap_err();
    assert!(matches!(err, SuiteLoadError::Parse { .. }));
    assert!(err.to_string().contains("broken.json"));
}

/// Pads a suite document with a trailing comment to exactly `len` bytes.
fn padded_suite(len: usize) -> String {
    let mut content = format!("{BASELINE_TOML}\n#");
    content.push_str(&"x".repeat(len - content.len() - 1));
    content.push('\n');
    content
}

/// Tests that a suite at the size limit loads and one byte more is rejected.
#[test]
fn suite_size_limit_is_exact() {
    let dir = tempfile::tempdir().unwrap();
    let at_limit = write(&dir, "at-limit.toml", &padded_suite(MAX_SUITE_FILE_SIZE));
    assert_eq!(load_suite_file(&at_limit).unwrap().suite_id.as_str(), "baseline");

    let over = write(&dir, "over.toml", &padded_suite(MAX_SUITE_FILE_SIZE + 1));
    let err = load_suite_file(&over).unwrap_err();
    assert!(matches!(err, SuiteLoadError::TooLarge(_)));
    assert!(err.to_string().contains("over.toml"));
}

/// Tests that no suite files is an error.
#[test]
fn no_suites_is_rejected() {
    let paths: [PathBuf; 0] = [];
    assert!(matches!(load_suites(&paths, &BTreeSet::new()), Err(SuiteLoadError::NoSuites)));
}
