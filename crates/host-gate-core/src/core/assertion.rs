// crates/host-gate-core/src/core/assertion.rs
// ============================================================================
// Module: Host Gate Assertions
// Description: Declarative assertions about host resources.
// Purpose: Define the subject, expectation, and assertion wire forms.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! An [`Assertion`] names a [`Subject`] (a resource kind plus identifier) and
//! one or more [`Expectation`]s over fields the probe for that kind reports.
//! The declared condition is the conjunction of the expectations, optionally
//! negated. Assertions are immutable once loaded; the runner never mutates
//! them.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::core::identifiers::AssertionId;

// ============================================================================
// SECTION: Subject Kinds
// ============================================================================

/// Resource kind an assertion targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubjectKind {
    /// OS package managed by the system package manager.
    Package,
    /// Init-system service unit.
    Service,
    /// Filesystem path.
    File,
    /// Network port.
    Port,
    /// Shell command whose outcome is observed.
    Command,
    /// Container managed by the container runtime.
    Container,
}

impl SubjectKind {
    /// Every subject kind, in declaration order.
    pub const ALL: [Self; 6] =
        [Self::Package, Self::Service, Self::File, Self::Port, Self::Command, Self::Container];

    /// Returns the stable wire label for the kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Package => "package",
            Self::Service => "service",
            Self::File => "file",
            Self::Port => "port",
            Self::Command => "command",
            Self::Container => "container",
        }
    }
}

impl fmt::Display for SubjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubjectKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == value)
            .ok_or_else(|| format!("unknown subject kind: {value}"))
    }
}

// ============================================================================
// SECTION: Subject
// ============================================================================

/// Resource an assertion is about.
///
/// # Invariants
/// - `identifier` is non-empty once the owning suite validates.
/// - `params`, when present, is a JSON object with kind-specific keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    /// Resource kind.
    pub kind: SubjectKind,
    /// Kind-specific identifier (package name, path, port number, command line).
    pub identifier: String,
    /// Optional kind-specific qualifiers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl Subject {
    /// Creates a subject without params.
    #[must_use]
    pub fn new(kind: SubjectKind, identifier: impl Into<String>) -> Self {
        Self {
            kind,
            identifier: identifier.into(),
            params: None,
        }
    }

    /// Returns the subject with the given params attached.
    #[must_use]
    pub fn with_params(mut self, params: Value) -> Self {
        self.params = Some(params);
        self
    }

    /// Returns a string param by key.
    #[must_use]
    pub fn param_str(&self, key: &str) -> Option<&str> {
        self.params.as_ref().and_then(|params| params.get(key)).and_then(Value::as_str)
    }

    /// Returns an unsigned integer param by key.
    #[must_use]
    pub fn param_u64(&self, key: &str) -> Option<u64> {
        self.params.as_ref().and_then(|params| params.get(key)).and_then(Value::as_u64)
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.identifier)
    }
}

// ============================================================================
// SECTION: Comparators
// ============================================================================

/// Comparator applied to an observed field.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum Comparator {
    /// Value equality comparison.
    #[default]
    Equals,
    /// Value inequality comparison.
    NotEquals,
    /// Numeric greater-than comparison.
    GreaterThan,
    /// Numeric greater-than-or-equal comparison.
    GreaterThanOrEqual,
    /// Numeric less-than comparison.
    LessThan,
    /// Numeric less-than-or-equal comparison.
    LessThanOrEqual,
    /// Substring containment for strings, contains-all for lists.
    Contains,
    /// Unanchored regular-expression match.
    Matches,
    /// Membership in an expected set.
    InSet,
}

impl Comparator {
    /// Returns the stable wire label for the comparator.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Equals => "equals",
            Self::NotEquals => "not_equals",
            Self::GreaterThan => "greater_than",
            Self::GreaterThanOrEqual => "greater_than_or_equal",
            Self::LessThan => "less_than",
            Self::LessThanOrEqual => "less_than_or_equal",
            Self::Contains => "contains",
            Self::Matches => "matches",
            Self::InSet => "in_set",
        }
    }

    /// Returns true for the numeric ordering comparators.
    #[must_use]
    pub const fn is_ordering(self) -> bool {
        matches!(
            self,
            Self::GreaterThan | Self::GreaterThanOrEqual | Self::LessThan | Self::LessThanOrEqual
        )
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Expectations
// ============================================================================

/// One condition over one observed field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expectation {
    /// Observed field name, drawn from the kind's field catalog.
    pub field: String,
    /// Comparator applied to the observed value.
    #[serde(default)]
    pub comparator: Comparator,
    /// Expected value or pattern.
    pub expected: Value,
}

impl Expectation {
    /// Creates an expectation.
    #[must_use]
    pub fn new(field: impl Into<String>, comparator: Comparator, expected: Value) -> Self {
        Self {
            field: field.into(),
            comparator,
            expected,
        }
    }

    /// Creates an equality expectation.
    #[must_use]
    pub fn equals(field: impl Into<String>, expected: Value) -> Self {
        Self::new(field, Comparator::Equals, expected)
    }
}

// ============================================================================
// SECTION: Assertions
// ============================================================================

/// A single declarative expectation about host state.
///
/// # Invariants
/// - `expect` is non-empty once the owning suite validates.
/// - `negate` inverts the final condition only; it never alters probing.
/// - Empty `roles` means the assertion applies to every role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assertion {
    /// Optional stable identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<AssertionId>,
    /// Optional human-readable description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Resource under test.
    pub subject: Subject,
    /// Expectations combined by conjunction.
    pub expect: Vec<Expectation>,
    /// Inverts the final condition.
    #[serde(default)]
    pub negate: bool,
    /// Host roles this assertion applies to.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub roles: BTreeSet<String>,
}

impl Assertion {
    /// Creates an assertion with a single expectation.
    #[must_use]
    pub fn new(subject: Subject, expectation: Expectation) -> Self {
        Self {
            id: None,
            description: None,
            subject,
            expect: vec![expectation],
            negate: false,
            roles: BTreeSet::new(),
        }
    }

    /// Returns the assertion with an identifier attached.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<AssertionId>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Returns the assertion with another expectation appended.
    #[must_use]
    pub fn and_expect(mut self, expectation: Expectation) -> Self {
        self.expect.push(expectation);
        self
    }

    /// Returns the assertion with negation set.
    #[must_use]
    pub const fn negated(mut self, negate: bool) -> Self {
        self.negate = negate;
        self
    }

    /// Returns the assertion restricted to the given roles.
    #[must_use]
    pub fn for_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles = roles.into_iter().map(Into::into).collect();
        self
    }

    /// Returns true when the assertion applies to any of the selected roles.
    ///
    /// An empty selection or an untagged assertion always applies.
    #[must_use]
    pub fn applies_to(&self, selected: &BTreeSet<String>) -> bool {
        selected.is_empty()
            || self.roles.is_empty()
            || self.roles.iter().any(|role| selected.contains(role))
    }

    /// Returns the distinct fields referenced by the expectations.
    #[must_use]
    pub fn requested_fields(&self) -> BTreeSet<String> {
        self.expect.iter().map(|expectation| expectation.field.clone()).collect()
    }

    /// Returns a label for diagnostics: the id when present, otherwise the
    /// 1-based position and subject.
    #[must_use]
    pub fn label(&self, index: usize) -> String {
        self.id.as_ref().map_or_else(
            || format!("#{} ({})", index + 1, self.subject),
            |id| id.as_str().to_string(),
        )
    }
}
