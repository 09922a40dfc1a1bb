// crates/host-gate-core/src/core/fields.rs
// ============================================================================
// Module: Host Gate Field Catalog
// Description: Per-kind observable fields and their value types.
// Purpose: Let suite validation reject unknown fields and mistyped expectations.
// Dependencies: crate::core::assertion, serde_json
// ============================================================================

//! ## Overview
//! Each subject kind exposes a fixed set of observable fields. The catalog
//! here is the contract between suites and probes: suites may only reference
//! cataloged fields, and probes must report every requested cataloged field
//! or fail.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Value;

use crate::core::assertion::Comparator;
use crate::core::assertion::SubjectKind;

// ============================================================================
// SECTION: Field Types
// ============================================================================

/// Value type of an observable field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    /// JSON boolean.
    Bool,
    /// JSON string.
    String,
    /// JSON number.
    Number,
    /// JSON array of strings.
    StringList,
    /// Permission bits rendered as a 4-digit octal string.
    Mode,
}

impl FieldType {
    /// Returns true when the comparator is meaningful for this field type.
    #[must_use]
    pub const fn supports(self, comparator: Comparator) -> bool {
        match self {
            Self::Bool => matches!(comparator, Comparator::Equals | Comparator::NotEquals),
            Self::String => matches!(
                comparator,
                Comparator::Equals
                    | Comparator::NotEquals
                    | Comparator::Contains
                    | Comparator::Matches
                    | Comparator::InSet
            ),
            Self::Number => !matches!(comparator, Comparator::Contains | Comparator::Matches),
            Self::StringList => matches!(
                comparator,
                Comparator::Equals | Comparator::NotEquals | Comparator::Contains
            ),
            Self::Mode => {
                matches!(comparator, Comparator::Equals | Comparator::NotEquals | Comparator::InSet)
            }
        }
    }
}

/// Observable field descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    /// Field name used in expectations and observations.
    pub name: &'static str,
    /// Value type reported by the probe.
    pub field_type: FieldType,
}

/// Shorthand constructor for catalog tables.
const fn field(name: &'static str, field_type: FieldType) -> FieldSpec {
    FieldSpec {
        name,
        field_type,
    }
}

// ============================================================================
// SECTION: Catalog
// ============================================================================

/// Package fields.
const PACKAGE_FIELDS: &[FieldSpec] =
    &[field("installed", FieldType::Bool), field("version", FieldType::String)];

/// Service fields.
const SERVICE_FIELDS: &[FieldSpec] = &[
    field("enabled", FieldType::Bool),
    field("running", FieldType::Bool),
    field("state", FieldType::String),
];

/// File fields.
const FILE_FIELDS: &[FieldSpec] = &[
    field("exists", FieldType::Bool),
    field("type", FieldType::String),
    field("owner", FieldType::String),
    field("group", FieldType::String),
    field("mode", FieldType::Mode),
    field("size", FieldType::Number),
    field("content", FieldType::String),
    field("sha256", FieldType::String),
];

/// Port fields.
const PORT_FIELDS: &[FieldSpec] = &[
    field("listening", FieldType::Bool),
    field("protocols", FieldType::StringList),
    field("addresses", FieldType::StringList),
];

/// Command fields.
const COMMAND_FIELDS: &[FieldSpec] = &[
    field("exit_status", FieldType::Number),
    field("stdout", FieldType::String),
    field("stderr", FieldType::String),
];

/// Container fields.
const CONTAINER_FIELDS: &[FieldSpec] = &[
    field("exists", FieldType::Bool),
    field("running", FieldType::Bool),
    field("status", FieldType::String),
    field("image", FieldType::String),
    field("inspect", FieldType::String),
];

/// Returns the observable fields for a subject kind.
#[must_use]
pub const fn fields_for(kind: SubjectKind) -> &'static [FieldSpec] {
    match kind {
        SubjectKind::Package => PACKAGE_FIELDS,
        SubjectKind::Service => SERVICE_FIELDS,
        SubjectKind::File => FILE_FIELDS,
        SubjectKind::Port => PORT_FIELDS,
        SubjectKind::Command => COMMAND_FIELDS,
        SubjectKind::Container => CONTAINER_FIELDS,
    }
}

/// Looks up a field descriptor by kind and name.
#[must_use]
pub fn field_spec(kind: SubjectKind, name: &str) -> Option<&'static FieldSpec> {
    fields_for(kind).iter().find(|spec| spec.name == name)
}

// ============================================================================
// SECTION: Mode Literals
// ============================================================================

/// Highest permission value accepted (setuid, setgid, sticky plus rwx).
const MAX_MODE: u32 = 0o7777;

/// Renders permission bits as a 4-digit octal string (`0644`).
#[must_use]
pub fn render_mode(mode: u32) -> String {
    format!("{:04o}", mode & MAX_MODE)
}

/// Normalizes a declared mode literal into its canonical rendering.
///
/// Accepts `"644"`, `"0644"`, `"0o644"`, and bare numbers such as `644`,
/// whose decimal digits are read as octal.
#[must_use]
pub fn normalize_mode(value: &Value) -> Option<String> {
    let digits = match value {
        Value::String(text) => text.trim().trim_start_matches("0o").to_string(),
        Value::Number(number) => number.as_u64()?.to_string(),
        _ => return None,
    };
    if digits.is_empty() || digits.len() > 4 {
        return None;
    }
    let mode = u32::from_str_radix(&digits, 8).ok()?;
    if mode > MAX_MODE {
        return None;
    }
    Some(render_mode(mode))
}
