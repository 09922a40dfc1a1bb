// crates/host-gate-core/src/runtime/matcher.rs
// ============================================================================
// Module: Host Gate Matcher Engine
// Description: Comparator evaluation over observed field values.
// Purpose: Convert observations into tri-state assertion outcomes.
// Dependencies: crate::core, bigdecimal, regex
// ============================================================================

//! ## Overview
//! The matcher compares observed values with declared expectations. Type
//! mismatches and missing fields yield `Unknown` so they surface as ERROR
//! verdicts rather than FAIL. Numeric comparisons are decimal-aware, lists
//! compare as sets, substring and regex matches are unanchored and
//! case-sensitive.
//!
//! Negation applies strong Kleene NOT to the conjunction of expectations and
//! nothing else: `Unknown` stays `Unknown` under negation.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::str::FromStr;

use bigdecimal::BigDecimal;
use regex::Regex;
use serde_json::Number;
use serde_json::Value;

use crate::core::Assertion;
use crate::core::Comparator;
use crate::core::Expectation;
use crate::core::Observation;
use crate::core::TriState;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Maximum characters of an observed value quoted in a verdict message.
const MAX_RENDERED_CHARS: usize = 120;

// ============================================================================
// SECTION: Evaluation Results
// ============================================================================

/// Result of evaluating one assertion against one observation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    /// Conjunction of expectation results before negation.
    pub condition: TriState,
    /// Final result after negation.
    pub result: TriState,
    /// Explanation when the result is not `True`.
    pub message: Option<String>,
}

// ============================================================================
// SECTION: Matcher
// ============================================================================

/// Comparator evaluator with a per-run regex cache.
///
/// # Invariants
/// - Patterns are compiled at most once per matcher; failures are cached as `None`.
#[derive(Debug, Default)]
pub struct Matcher {
    /// Compiled patterns keyed by source text.
    patterns: BTreeMap<String, Option<Regex>>,
}

impl Matcher {
    /// Creates a matcher with an empty pattern cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Evaluates an assertion's declared condition against an observation.
    pub fn evaluate_assertion(
        &mut self,
        assertion: &Assertion,
        observation: &Observation,
    ) -> Evaluation {
        let mut condition = TriState::True;
        let mut first_false: Option<String> = None;
        let mut first_unknown: Option<String> = None;

        for expectation in &assertion.expect {
            let Some(observed) = observation.get(&expectation.field) else {
                condition = condition.and(TriState::Unknown);
                first_unknown.get_or_insert_with(|| {
                    format!("probe did not report field `{}`", expectation.field)
                });
                continue;
            };
            let outcome = self.compare(expectation.comparator, &expectation.expected, observed);
            match outcome {
                TriState::True => {}
                TriState::False => {
                    first_false.get_or_insert_with(|| describe_mismatch(expectation, observed));
                }
                TriState::Unknown => {
                    first_unknown.get_or_insert_with(|| describe_indeterminate(expectation, observed));
                }
            }
            condition = condition.and(outcome);
        }

        let result = if assertion.negate { condition.not() } else { condition };
        let message = match result {
            TriState::True => None,
            TriState::Unknown => first_unknown
                .map(|detail| format!("condition indeterminate: {detail}")),
            TriState::False if assertion.negate => {
                Some("negated condition held".to_string())
            }
            TriState::False => first_false,
        };
        Evaluation {
            condition,
            result,
            message,
        }
    }

    /// Evaluates a single comparator.
    pub fn compare(&mut self, comparator: Comparator, expected: &Value, observed: &Value) -> TriState {
        match comparator {
            Comparator::Equals => compare_equals(observed, expected),
            Comparator::NotEquals => compare_equals(observed, expected).not(),
            Comparator::GreaterThan
            | Comparator::GreaterThanOrEqual
            | Comparator::LessThan
            | Comparator::LessThanOrEqual => compare_ordering(comparator, observed, expected),
            Comparator::Contains => compare_contains(observed, expected),
            Comparator::Matches => self.compare_matches(observed, expected),
            Comparator::InSet => compare_in_set(observed, expected),
        }
    }

    /// Evaluates an unanchored regex match against a string value.
    fn compare_matches(&mut self, observed: &Value, expected: &Value) -> TriState {
        let (Value::String(haystack), Value::String(pattern)) = (observed, expected) else {
            return TriState::Unknown;
        };
        let compiled =
            self.patterns.entry(pattern.clone()).or_insert_with(|| Regex::new(pattern).ok());
        compiled.as_ref().map_or(TriState::Unknown, |regex| TriState::from(regex.is_match(haystack)))
    }
}

// ============================================================================
// SECTION: Comparator Helpers
// ============================================================================

/// Compares JSON values for equality; numbers as decimals, lists as sets.
fn compare_equals(left: &Value, right: &Value) -> TriState {
    match (left, right) {
        (Value::Number(left_num), Value::Number(right_num)) => {
            decimal_cmp(left_num, right_num).map_or(TriState::Unknown, |ordering| {
                TriState::from(ordering == Ordering::Equal)
            })
        }
        (Value::Array(left), Value::Array(right)) => {
            let left: BTreeSet<String> = left.iter().map(Value::to_string).collect();
            let right: BTreeSet<String> = right.iter().map(Value::to_string).collect();
            TriState::from(left == right)
        }
        (Value::Bool(_), Value::Bool(_)) | (Value::String(_), Value::String(_)) => {
            TriState::from(left == right)
        }
        _ => TriState::Unknown,
    }
}

/// Compares numeric JSON values using ordering comparators.
fn compare_ordering(comparator: Comparator, left: &Value, right: &Value) -> TriState {
    let (Some(left_num), Some(right_num)) = (left.as_number(), right.as_number()) else {
        return TriState::Unknown;
    };
    let Some(ordering) = decimal_cmp(left_num, right_num) else {
        return TriState::Unknown;
    };
    let result = match comparator {
        Comparator::GreaterThan => ordering.is_gt(),
        Comparator::GreaterThanOrEqual => ordering.is_ge(),
        Comparator::LessThan => ordering.is_lt(),
        Comparator::LessThanOrEqual => ordering.is_le(),
        _ => return TriState::Unknown,
    };
    TriState::from(result)
}

/// Evaluates containment: substring for strings, contains-all for lists.
fn compare_contains(left: &Value, right: &Value) -> TriState {
    match (left, right) {
        (Value::String(haystack), Value::String(needle)) => {
            TriState::from(haystack.contains(needle.as_str()))
        }
        (Value::Array(haystack), Value::String(_)) => TriState::from(haystack.contains(right)),
        (Value::Array(haystack), Value::Array(needle)) => {
            TriState::from(needle.iter().all(|item| haystack.contains(item)))
        }
        _ => TriState::Unknown,
    }
}

/// Evaluates set membership for scalar values.
fn compare_in_set(value: &Value, expected: &Value) -> TriState {
    let Value::Array(values) = expected else {
        return TriState::Unknown;
    };
    if matches!(value, Value::Array(_) | Value::Object(_) | Value::Null) {
        return TriState::Unknown;
    }
    let mut result = TriState::False;
    for candidate in values {
        result = result.or(compare_equals(value, candidate));
        if result.is_true() {
            break;
        }
    }
    result
}

/// Orders numeric JSON values using decimal-aware comparison.
fn decimal_cmp(left: &Number, right: &Number) -> Option<Ordering> {
    let left = BigDecimal::from_str(&left.to_string()).ok()?;
    let right = BigDecimal::from_str(&right.to_string()).ok()?;
    Some(left.cmp(&right))
}

// ============================================================================
// SECTION: Messages
// ============================================================================

/// Describes a definite mismatch.
fn describe_mismatch(expectation: &Expectation, observed: &Value) -> String {
    format!(
        "field `{}`: expected {} {}, observed {}",
        expectation.field,
        expectation.comparator,
        render_value(&expectation.expected),
        render_value(observed)
    )
}

/// Describes a comparison that could not be decided.
fn describe_indeterminate(expectation: &Expectation, observed: &Value) -> String {
    format!(
        "field `{}`: cannot apply {} {} to observed {}",
        expectation.field,
        expectation.comparator,
        render_value(&expectation.expected),
        render_value(observed)
    )
}

/// Renders a JSON value for messages, truncating long values.
fn render_value(value: &Value) -> String {
    let rendered = value.to_string();
    if rendered.chars().count() <= MAX_RENDERED_CHARS {
        return rendered;
    }
    let truncated: String = rendered.chars().take(MAX_RENDERED_CHARS).collect();
    format!("{truncated}...")
}
