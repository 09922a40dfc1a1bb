// crates/host-gate-config/src/suites.rs
// ============================================================================
// Module: Suite Loading
// Description: Suite file parsing for TOML, JSON, and YAML declarations.
// Purpose: Turn suite files into one validated suite ready to run.
// Dependencies: host-gate-core, serde_json, serde_yaml, toml
// ============================================================================

//! ## Overview
//! Suite files are parsed by extension (`.toml`, `.json`, `.yaml`, `.yml`)
//! under a size limit. Several files merge in the order given, the merged
//! suite is normalized and validated as a whole, and role selection is
//! applied last so declaration errors surface even in assertions the selected
//! roles skip.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use host_gate_core::SpecError;
use host_gate_core::SuiteSpec;
use thiserror::Error;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Maximum suite file size in bytes.
pub const MAX_SUITE_FILE_SIZE: usize = 4 * 1024 * 1024;

// ============================================================================
// SECTION: Formats
// ============================================================================

/// Suite file encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuiteFormat {
    /// TOML document.
    Toml,
    /// JSON document.
    Json,
    /// YAML document.
    Yaml,
}

impl SuiteFormat {
    /// Detects the format from a file extension.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();
        match extension.as_str() {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            "yaml" | "yml" => Some(Self::Yaml),
            _ => None,
        }
    }

    /// Parses a suite document in this format.
    ///
    /// # Errors
    ///
    /// Returns the parser message when the document is malformed.
    pub fn parse(self, content: &str) -> Result<SuiteSpec, String> {
        match self {
            Self::Toml => toml::from_str(content).map_err(|err| err.to_string()),
            Self::Json => serde_json::from_str(content).map_err(|err| err.to_string()),
            Self::Yaml => serde_yaml::from_str(content).map_err(|err| err.to_string()),
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while loading suites.
#[derive(Debug, Error)]
pub enum SuiteLoadError {
    /// No suite files were given.
    #[error("no suite files given")]
    NoSuites,
    /// The file extension does not name a supported format.
    #[error("unsupported suite format: {0} (expected .toml, .json, .yaml or .yml)")]
    UnsupportedFormat(String),
    /// I/O failure while reading a suite file.
    #[error("suite io error: {path}: {message}")]
    Io {
        /// Suite file path.
        path: String,
        /// I/O error detail.
        message: String,
    },
    /// The suite file exceeds the size limit.
    #[error("suite file exceeds 4 MiB: {0}")]
    TooLarge(String),
    /// The suite file is not UTF-8.
    #[error("suite file must be utf-8: {0}")]
    NotUtf8(String),
    /// The suite document is malformed.
    #[error("suite parse error: {path}: {message}")]
    Parse {
        /// Suite file path.
        path: String,
        /// Parser detail.
        message: String,
    },
    /// The suite failed declaration validation.
    #[error("invalid suite: {0}")]
    Spec(#[from] SpecError),
}

// ============================================================================
// SECTION: Loaders
// ============================================================================

/// Reads at most `limit + 1` bytes so callers can reject oversized files
/// without buffering them whole.
///
/// # Errors
///
/// Returns the I/O error when the file cannot be opened or read.
pub(crate) fn read_bounded(path: &Path, limit: usize) -> std::io::Result<Vec<u8>> {
    let cap = u64::try_from(limit.saturating_add(1)).unwrap_or(u64::MAX);
    let mut bytes = Vec::new();
    File::open(path)?.take(cap).read_to_end(&mut bytes)?;
    Ok(bytes)
}

/// Reads and parses one suite file without validating it.
///
/// # Errors
///
/// Returns [`SuiteLoadError`] when the file cannot be read or parsed.
pub fn load_suite_file(path: &Path) -> Result<SuiteSpec, SuiteLoadError> {
    let display = path.display().to_string();
    let format =
        SuiteFormat::from_path(path).ok_or_else(|| SuiteLoadError::UnsupportedFormat(display.clone()))?;
    let bytes = read_bounded(path, MAX_SUITE_FILE_SIZE).map_err(|err| SuiteLoadError::Io {
        path: display.clone(),
        message: err.to_string(),
    })?;
    if bytes.len() > MAX_SUITE_FILE_SIZE {
        return Err(SuiteLoadError::TooLarge(display));
    }
    let content = std::str::from_utf8(&bytes).map_err(|_| SuiteLoadError::NotUtf8(display.clone()))?;
    format.parse(content).map_err(|message| SuiteLoadError::Parse {
        path: display,
        message,
    })
}

/// Loads, merges, validates, and role-filters suite files.
///
/// An empty `roles` set keeps every assertion.
///
/// # Errors
///
/// Returns [`SuiteLoadError`] when any file fails to load, the merged suite is
/// invalid, or the role selection leaves no assertions.
pub fn load_suites<P: AsRef<Path>>(
    paths: &[P],
    roles: &BTreeSet<String>,
) -> Result<SuiteSpec, SuiteLoadError> {
    if paths.is_empty() {
        return Err(SuiteLoadError::NoSuites);
    }
    let suites =
        paths.iter().map(|path| load_suite_file(path.as_ref())).collect::<Result<Vec<_>, _>>()?;
    let suite = SuiteSpec::merge(suites).prepare()?;
    let selected = suite.select_roles(roles);
    if selected.assertions.is_empty() {
        return Err(SuiteLoadError::Spec(SpecError::EmptySuite));
    }
    Ok(selected)
}
