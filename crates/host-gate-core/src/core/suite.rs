// crates/host-gate-core/src/core/suite.rs
// ============================================================================
// Module: Host Gate Suites
// Description: Ordered assertion suites and their structural validation.
// Purpose: Reject malformed declarations before any host probing happens.
// Dependencies: crate::core, regex, serde, thiserror
// ============================================================================

//! ## Overview
//! A [`SuiteSpec`] is the unit loaded from a declaration file. Validation is
//! strict and runs before probing: unknown fields, comparators that do not
//! apply to a field type, malformed expected values, invalid patterns, and
//! malformed params all abort the run with a [`SpecError`].
//!
//! Declaration order is significant; reports list verdicts in the same order.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::net::IpAddr;

use regex::Regex;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::core::assertion::Assertion;
use crate::core::assertion::Comparator;
use crate::core::assertion::Expectation;
use crate::core::assertion::Subject;
use crate::core::assertion::SubjectKind;
use crate::core::fields::FieldType;
use crate::core::fields::field_spec;
use crate::core::fields::normalize_mode;
use crate::core::hashing::DEFAULT_HASH_ALGORITHM;
use crate::core::hashing::HashDigest;
use crate::core::hashing::HashError;
use crate::core::hashing::hash_canonical_json;
use crate::core::identifiers::SuiteId;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Maximum assertions accepted in one (merged) suite.
pub const MAX_ASSERTIONS: usize = 10_000;
/// Maximum expectations per assertion.
pub const MAX_EXPECTATIONS: usize = 64;
/// Maximum subject identifier length in bytes.
pub const MAX_IDENTIFIER_BYTES: usize = 4096;
/// Maximum regex pattern length in bytes.
pub const MAX_PATTERN_BYTES: usize = 4096;
/// Protocol qualifiers accepted by port subjects.
pub const PORT_PROTOCOLS: [&str; 4] = ["tcp", "tcp6", "udp", "udp6"];

// ============================================================================
// SECTION: Suite Specification
// ============================================================================

/// Named, ordered collection of assertions.
///
/// # Invariants
/// - Assertion order is declaration order and is preserved by every operation.
/// - Explicit assertion ids are unique after validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuiteSpec {
    /// Suite identifier.
    pub suite_id: SuiteId,
    /// Optional description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Assertions in declaration order.
    #[serde(default)]
    pub assertions: Vec<Assertion>,
}

impl SuiteSpec {
    /// Creates a suite from assertions.
    #[must_use]
    pub fn new(suite_id: impl Into<SuiteId>, assertions: Vec<Assertion>) -> Self {
        Self {
            suite_id: suite_id.into(),
            description: None,
            assertions,
        }
    }

    /// Normalizes declared literals and validates the suite.
    ///
    /// # Errors
    ///
    /// Returns [`SpecError`] when a literal cannot be normalized or validation fails.
    pub fn prepare(mut self) -> Result<Self, SpecError> {
        self.normalize_literals()?;
        self.validate()?;
        Ok(self)
    }

    /// Validates the suite structure.
    ///
    /// # Errors
    ///
    /// Returns [`SpecError`] when validation fails.
    pub fn validate(&self) -> Result<(), SpecError> {
        if self.assertions.is_empty() {
            return Err(SpecError::EmptySuite);
        }
        if self.assertions.len() > MAX_ASSERTIONS {
            return Err(SpecError::TooManyAssertions(self.assertions.len()));
        }
        ensure_unique_assertion_ids(&self.assertions)?;
        for (index, assertion) in self.assertions.iter().enumerate() {
            validate_assertion(&assertion.label(index), assertion)?;
        }
        Ok(())
    }

    /// Returns a suite holding only assertions that apply to the selected roles.
    #[must_use]
    pub fn select_roles(&self, roles: &BTreeSet<String>) -> Self {
        Self {
            suite_id: self.suite_id.clone(),
            description: self.description.clone(),
            assertions: self
                .assertions
                .iter()
                .filter(|assertion| assertion.applies_to(roles))
                .cloned()
                .collect(),
        }
    }

    /// Concatenates suites in order. A single suite is returned unchanged.
    #[must_use]
    pub fn merge(suites: impl IntoIterator<Item = Self>) -> Self {
        let mut suites: Vec<Self> = suites.into_iter().collect();
        if suites.len() == 1
            && let Some(suite) = suites.pop()
        {
            return suite;
        }
        let suite_id = suites.iter().map(|suite| suite.suite_id.as_str()).collect::<Vec<_>>();
        let suite_id = SuiteId::new(suite_id.join("+"));
        let assertions = suites.into_iter().flat_map(|suite| suite.assertions).collect();
        Self {
            suite_id,
            description: None,
            assertions,
        }
    }

    /// Computes the canonical hash of the suite.
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] when canonicalization fails.
    pub fn canonical_hash(&self) -> Result<HashDigest, HashError> {
        hash_canonical_json(DEFAULT_HASH_ALGORITHM, self)
    }

    /// Rewrites `mode` expectations into canonical octal strings.
    fn normalize_literals(&mut self) -> Result<(), SpecError> {
        for (index, assertion) in self.assertions.iter_mut().enumerate() {
            if assertion.subject.kind != SubjectKind::File {
                continue;
            }
            let label = assertion.label(index);
            for expectation in &mut assertion.expect {
                if expectation.field != "mode" {
                    continue;
                }
                expectation.expected = normalize_mode_value(&label, &expectation.expected)?;
            }
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Suite validation errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SpecError {
    /// Suite contains no assertions.
    #[error("suite must define at least one assertion")]
    EmptySuite,
    /// Suite exceeds the assertion limit.
    #[error("suite defines {0} assertions; limit is 10000")]
    TooManyAssertions(usize),
    /// Duplicate explicit assertion identifiers.
    #[error("duplicate assertion identifier: {0}")]
    DuplicateAssertionId(String),
    /// Subject identifier is empty or too long.
    #[error("assertion {0}: invalid subject identifier: {1}")]
    InvalidIdentifier(String, String),
    /// Assertion has no expectations or too many.
    #[error("assertion {0}: invalid expectation list: {1}")]
    InvalidExpectations(String, String),
    /// Expectation references a field the kind does not expose.
    #[error("assertion {0}: unknown field `{2}` for {1} subjects")]
    UnknownField(String, SubjectKind, String),
    /// Comparator does not apply to the field type.
    #[error("assertion {0}: comparator `{2}` does not apply to field `{1}`")]
    UnsupportedComparator(String, String, Comparator),
    /// Expected value has the wrong shape.
    #[error("assertion {0}: invalid expected value for field `{1}`: {2}")]
    InvalidExpected(String, String, String),
    /// Regex pattern does not compile.
    #[error("assertion {0}: invalid pattern: {1}")]
    InvalidPattern(String, String),
    /// Subject params are malformed.
    #[error("assertion {0}: invalid params: {1}")]
    InvalidParams(String, String),
}

// ============================================================================
// SECTION: Validation Helpers
// ============================================================================

/// Ensures explicit assertion identifiers are unique.
fn ensure_unique_assertion_ids(assertions: &[Assertion]) -> Result<(), SpecError> {
    let mut seen = BTreeSet::new();
    for id in assertions.iter().filter_map(|assertion| assertion.id.as_ref()) {
        if !seen.insert(id.as_str()) {
            return Err(SpecError::DuplicateAssertionId(id.to_string()));
        }
    }
    Ok(())
}

/// Validates a single assertion.
fn validate_assertion(label: &str, assertion: &Assertion) -> Result<(), SpecError> {
    validate_identifier(label, &assertion.subject)?;
    validate_params(label, &assertion.subject)?;
    if assertion.expect.is_empty() {
        return Err(SpecError::InvalidExpectations(
            label.to_string(),
            "at least one expectation is required".to_string(),
        ));
    }
    if assertion.expect.len() > MAX_EXPECTATIONS {
        return Err(SpecError::InvalidExpectations(
            label.to_string(),
            format!("limit is {MAX_EXPECTATIONS} expectations"),
        ));
    }
    for expectation in &assertion.expect {
        validate_expectation(label, assertion.subject.kind, expectation)?;
    }
    Ok(())
}

/// Validates the subject identifier.
fn validate_identifier(label: &str, subject: &Subject) -> Result<(), SpecError> {
    let identifier = subject.identifier.as_str();
    if identifier.trim().is_empty() {
        return Err(SpecError::InvalidIdentifier(label.to_string(), "empty".to_string()));
    }
    if identifier.len() > MAX_IDENTIFIER_BYTES {
        return Err(SpecError::InvalidIdentifier(
            label.to_string(),
            format!("exceeds {MAX_IDENTIFIER_BYTES} bytes"),
        ));
    }
    if subject.kind == SubjectKind::Port && !matches!(identifier.parse::<u16>(), Ok(port) if port > 0)
    {
        return Err(SpecError::InvalidIdentifier(
            label.to_string(),
            format!("port must be 1-65535, got `{identifier}`"),
        ));
    }
    Ok(())
}

/// Validates kind-specific params.
fn validate_params(label: &str, subject: &Subject) -> Result<(), SpecError> {
    let invalid = |reason: String| SpecError::InvalidParams(label.to_string(), reason);
    let Some(params) = &subject.params else {
        return Ok(());
    };
    let Value::Object(map) = params else {
        return Err(invalid("params must be an object".to_string()));
    };
    for (key, value) in map {
        match (subject.kind, key.as_str()) {
            (SubjectKind::Port, "protocol") => {
                let protocol = value.as_str().unwrap_or_default();
                if !PORT_PROTOCOLS.contains(&protocol) {
                    return Err(invalid(format!(
                        "protocol must be one of: {}",
                        PORT_PROTOCOLS.join(", ")
                    )));
                }
            }
            (SubjectKind::Port, "address") => {
                if value.as_str().and_then(|address| address.parse::<IpAddr>().ok()).is_none() {
                    return Err(invalid("address must be an IP address".to_string()));
                }
            }
            (SubjectKind::Command, "timeout_ms") => {
                if !matches!(value.as_u64(), Some(timeout) if timeout > 0) {
                    return Err(invalid("timeout_ms must be a positive integer".to_string()));
                }
            }
            (kind, key) => {
                return Err(invalid(format!("unknown param `{key}` for {kind} subjects")));
            }
        }
    }
    Ok(())
}

/// Validates an expectation against the field catalog.
fn validate_expectation(
    label: &str,
    kind: SubjectKind,
    expectation: &Expectation,
) -> Result<(), SpecError> {
    let field = expectation.field.as_str();
    let Some(spec) = field_spec(kind, field) else {
        return Err(SpecError::UnknownField(label.to_string(), kind, field.to_string()));
    };
    if !spec.field_type.supports(expectation.comparator) {
        return Err(SpecError::UnsupportedComparator(
            label.to_string(),
            field.to_string(),
            expectation.comparator,
        ));
    }
    check_expected_shape(spec.field_type, expectation.comparator, &expectation.expected)
        .map_err(|reason| SpecError::InvalidExpected(label.to_string(), field.to_string(), reason))?;
    if expectation.comparator == Comparator::Matches
        && let Value::String(pattern) = &expectation.expected
    {
        if pattern.len() > MAX_PATTERN_BYTES {
            return Err(SpecError::InvalidPattern(
                label.to_string(),
                format!("exceeds {MAX_PATTERN_BYTES} bytes"),
            ));
        }
        Regex::new(pattern)
            .map_err(|err| SpecError::InvalidPattern(label.to_string(), err.to_string()))?;
    }
    Ok(())
}

/// Checks the expected value shape for a field type and comparator.
fn check_expected_shape(
    field_type: FieldType,
    comparator: Comparator,
    expected: &Value,
) -> Result<(), String> {
    if comparator == Comparator::InSet {
        let Value::Array(items) = expected else {
            return Err("in_set expects a list".to_string());
        };
        if items.is_empty() {
            return Err("in_set expects a non-empty list".to_string());
        }
        return items.iter().try_for_each(|item| check_scalar(field_type, item));
    }
    match field_type {
        FieldType::StringList if comparator == Comparator::Contains => match expected {
            Value::String(_) => Ok(()),
            Value::Array(items) if items.iter().all(Value::is_string) => Ok(()),
            _ => Err("expected a string or a list of strings".to_string()),
        },
        FieldType::StringList => match expected {
            Value::Array(items) if items.iter().all(Value::is_string) => Ok(()),
            _ => Err("expected a list of strings".to_string()),
        },
        _ => check_scalar(field_type, expected),
    }
}

/// Checks that a scalar expected value matches the field type.
fn check_scalar(field_type: FieldType, value: &Value) -> Result<(), String> {
    let ok = match field_type {
        FieldType::Bool => value.is_boolean(),
        FieldType::String => value.is_string(),
        FieldType::Number => value.is_number(),
        FieldType::StringList => false,
        FieldType::Mode => {
            value.as_str().is_some_and(|mode| normalize_mode(value).as_deref() == Some(mode))
        }
    };
    if ok {
        return Ok(());
    }
    Err(match field_type {
        FieldType::Bool => "expected a boolean".to_string(),
        FieldType::String => "expected a string".to_string(),
        FieldType::Number => "expected a number".to_string(),
        FieldType::StringList => "expected a scalar".to_string(),
        FieldType::Mode => "expected a 4-digit octal mode such as \"0644\"".to_string(),
    })
}

/// Normalizes a mode expectation, including each member of an `in_set` list.
fn normalize_mode_value(label: &str, expected: &Value) -> Result<Value, SpecError> {
    let normalize = |value: &Value| {
        normalize_mode(value).map(Value::String).ok_or_else(|| {
            SpecError::InvalidExpected(
                label.to_string(),
                "mode".to_string(),
                format!("invalid mode literal: {value}"),
            )
        })
    };
    match expected {
        Value::Array(items) => {
            items.iter().map(normalize).collect::<Result<Vec<_>, _>>().map(Value::Array)
        }
        other => normalize(other),
    }
}
