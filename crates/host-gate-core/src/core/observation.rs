// crates/host-gate-core/src/core/observation.rs
// ============================================================================
// Module: Host Gate Observations
// Description: Probe requests, observed snapshots, and probe failures.
// Purpose: Carry raw host state from probes to the matcher engine.
// Dependencies: crate::core::assertion, serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! A probe answers a [`ProbeRequest`] with an [`Observation`] holding every
//! requested field, or with a [`ProbeError`]. Probe failures are first-class
//! values: they become ERROR verdicts and never stop the run. Results are
//! created fresh for every run and are never cached.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::core::assertion::Assertion;
use crate::core::assertion::Subject;

// ============================================================================
// SECTION: Probe Requests
// ============================================================================

/// Request for the named fields of one subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeRequest {
    /// Resource to observe.
    pub subject: Subject,
    /// Fields the caller needs.
    pub fields: BTreeSet<String>,
}

impl ProbeRequest {
    /// Creates a request for the given fields.
    #[must_use]
    pub fn new<I, S>(subject: Subject, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            subject,
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    /// Builds the request needed to evaluate an assertion.
    #[must_use]
    pub fn for_assertion(assertion: &Assertion) -> Self {
        Self {
            subject: assertion.subject.clone(),
            fields: assertion.requested_fields(),
        }
    }

    /// Returns true when the field was requested.
    #[must_use]
    pub fn wants(&self, field: &str) -> bool {
        self.fields.contains(field)
    }

    /// Returns true when any requested field is outside `fields`.
    #[must_use]
    pub fn wants_any_except(&self, fields: &[&str]) -> bool {
        self.fields.iter().any(|field| !fields.contains(&field.as_str()))
    }
}

// ============================================================================
// SECTION: Observations
// ============================================================================

/// Raw observed snapshot of a subject.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Observation {
    /// Observed values keyed by field name.
    pub fields: BTreeMap<String, Value>,
}

impl Observation {
    /// Creates an empty observation.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a field value.
    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(field.into(), value.into());
    }

    /// Returns the observation with a field recorded.
    #[must_use]
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(field, value);
        self
    }

    /// Returns an observed field value.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Keeps only the requested fields.
    #[must_use]
    pub fn restrict(mut self, request: &ProbeRequest) -> Self {
        self.fields.retain(|field, _| request.wants(field));
        self
    }
}

// ============================================================================
// SECTION: Probe Errors
// ============================================================================

/// Classification of probe failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeErrorKind {
    /// Host query exceeded its time budget.
    Timeout,
    /// Subject does not exist and the requested fields require it.
    NotFound,
    /// Backing executable is not installed.
    CommandNotFound,
    /// Host query was denied by the operating system.
    PermissionDenied,
    /// Subject params are malformed.
    InvalidParams,
    /// No probe can serve the subject kind or backend.
    Unsupported,
    /// Probe kind is blocked by the access policy.
    PolicyDenied,
    /// Host query produced more output than allowed.
    OutputTooLarge,
    /// Host query failed with an I/O or parse error.
    Io,
    /// The run was cancelled before the probe ran.
    Cancelled,
}

impl ProbeErrorKind {
    /// Returns the stable wire label for the kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::NotFound => "not_found",
            Self::CommandNotFound => "command_not_found",
            Self::PermissionDenied => "permission_denied",
            Self::InvalidParams => "invalid_params",
            Self::Unsupported => "unsupported",
            Self::PolicyDenied => "policy_denied",
            Self::OutputTooLarge => "output_too_large",
            Self::Io => "io",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for ProbeErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure to observe host state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("{kind}: {message}")]
pub struct ProbeError {
    /// Failure classification.
    pub kind: ProbeErrorKind,
    /// Human-readable detail.
    pub message: String,
}

impl ProbeError {
    /// Creates a probe error.
    #[must_use]
    pub fn new(kind: ProbeErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Maps an I/O error into a probe error, classifying well-known kinds.
    #[must_use]
    pub fn from_io(context: &str, err: &std::io::Error) -> Self {
        let kind = match err.kind() {
            std::io::ErrorKind::NotFound => ProbeErrorKind::NotFound,
            std::io::ErrorKind::PermissionDenied => ProbeErrorKind::PermissionDenied,
            std::io::ErrorKind::TimedOut => ProbeErrorKind::Timeout,
            _ => ProbeErrorKind::Io,
        };
        Self::new(kind, format!("{context}: {err}"))
    }
}

// ============================================================================
// SECTION: Probe Results
// ============================================================================

/// Outcome of one probe invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ProbeOutcome {
    /// Probe observed the subject.
    Observed {
        /// Observed snapshot.
        observation: Observation,
    },
    /// Probe failed.
    Failed {
        /// Failure detail.
        error: ProbeError,
    },
}

/// Probe result attached to a verdict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeResult {
    /// Probed subject.
    pub subject: Subject,
    /// Probe outcome.
    pub outcome: ProbeOutcome,
}

impl ProbeResult {
    /// Wraps a probe return value.
    #[must_use]
    pub fn from_result(subject: Subject, result: Result<Observation, ProbeError>) -> Self {
        let outcome = match result {
            Ok(observation) => ProbeOutcome::Observed {
                observation,
            },
            Err(error) => ProbeOutcome::Failed {
                error,
            },
        };
        Self {
            subject,
            outcome,
        }
    }

    /// Returns the observation when the probe succeeded.
    #[must_use]
    pub const fn observation(&self) -> Option<&Observation> {
        match &self.outcome {
            ProbeOutcome::Observed {
                observation,
            } => Some(observation),
            ProbeOutcome::Failed {
                ..
            } => None,
        }
    }

    /// Returns the error when the probe failed.
    #[must_use]
    pub const fn error(&self) -> Option<&ProbeError> {
        match &self.outcome {
            ProbeOutcome::Failed {
                error,
            } => Some(error),
            ProbeOutcome::Observed {
                ..
            } => None,
        }
    }
}

// ============================================================================
// SECTION: Registry Diagnostics
// ============================================================================

/// Probe-missing diagnostics returned by probe registries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("probes unavailable for subject kinds: {}", missing_kinds.join(", "))]
pub struct ProbeMissingError {
    /// Subject kinds required by the suite but not registered or not allowed.
    pub missing_kinds: Vec<String>,
    /// Indicates a policy block (true when a probe is present but disallowed).
    pub blocked_by_policy: bool,
}
