// crates/host-gate-core/src/core/identifiers.rs
// ============================================================================
// Module: Host Gate Identifiers
// Description: Opaque identifiers for suites and assertions.
// Purpose: Provide strongly typed, serializable identifiers with stable wire forms.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Identifiers are opaque UTF-8 strings that serialize transparently. They
//! carry no validation of their own; suite validation enforces uniqueness and
//! size limits where they matter.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Identifier Types
// ============================================================================

/// Suite identifier naming a collection of assertions.
///
/// # Invariants
/// - Opaque UTF-8 string; no normalization or validation is applied by this type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SuiteId(String);

impl SuiteId {
    /// Creates a new suite identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SuiteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for SuiteId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for SuiteId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Assertion identifier, optional on each declared assertion.
///
/// # Invariants
/// - Opaque UTF-8 string; uniqueness is enforced by suite validation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssertionId(String);

impl AssertionId {
    /// Creates a new assertion identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssertionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for AssertionId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for AssertionId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}
