// crates/host-gate-core/src/core/mod.rs
// ============================================================================
// Module: Host Gate Core Types
// Description: Canonical assertion, observation, and report structures.
// Purpose: Provide stable, serializable types shared by probes, runner, and CLI.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Core types define suites of assertions, the field catalog probes honor,
//! observations and probe failures, and the verdict/report model. These
//! types are the canonical source of truth for the JSON report format.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod assertion;
pub mod fields;
pub mod hashing;
pub mod identifiers;
pub mod observation;
pub mod report;
pub mod suite;
pub mod tristate;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use assertion::Assertion;
pub use assertion::Comparator;
pub use assertion::Expectation;
pub use assertion::Subject;
pub use assertion::SubjectKind;
pub use fields::FieldSpec;
pub use fields::FieldType;
pub use fields::field_spec;
pub use fields::fields_for;
pub use fields::normalize_mode;
pub use fields::render_mode;
pub use hashing::DEFAULT_HASH_ALGORITHM;
pub use hashing::HashAlgorithm;
pub use hashing::HashDigest;
pub use hashing::HashError;
pub use hashing::hash_bytes;
pub use hashing::hash_canonical_json;
pub use identifiers::AssertionId;
pub use identifiers::SuiteId;
pub use observation::Observation;
pub use observation::ProbeError;
pub use observation::ProbeErrorKind;
pub use observation::ProbeMissingError;
pub use observation::ProbeOutcome;
pub use observation::ProbeRequest;
pub use observation::ProbeResult;
pub use report::EXIT_ERROR;
pub use report::EXIT_FAIL;
pub use report::EXIT_INVALID_DECLARATIONS;
pub use report::EXIT_PASS;
pub use report::Outcome;
pub use report::OverallStatus;
pub use report::Report;
pub use report::ReportCounts;
pub use report::ReportSummary;
pub use report::Verdict;
pub use suite::MAX_ASSERTIONS;
pub use suite::MAX_EXPECTATIONS;
pub use suite::MAX_IDENTIFIER_BYTES;
pub use suite::MAX_PATTERN_BYTES;
pub use suite::PORT_PROTOCOLS;
pub use suite::SpecError;
pub use suite::SuiteSpec;
pub use tristate::TriState;
