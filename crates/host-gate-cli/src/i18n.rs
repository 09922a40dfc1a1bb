// crates/host-gate-cli/src/i18n.rs
// ============================================================================
// Module: CLI Internationalization Helpers
// Description: Provides message catalog and translation utilities for the CLI.
// Purpose: Centralize user-facing strings for localized CLI output.
// Dependencies: Standard library collections and formatting utilities.
// ============================================================================

//! ## Overview
//! The Host Gate CLI stores user-facing strings in a small translation
//! catalog so messages stay consistent across commands and locales.
//! All runtime output should be routed through the [`t!`](crate::t) macro.
//! Verdict lines are a stable machine-readable format and are never
//! translated.
//!
//! ## Invariants
//! - The catalog is initialized once and read-only thereafter.
//! - Missing keys fall back to English and then to the key itself.
//! - Placeholder substitutions preserve deterministic order.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::sync::OnceLock;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Supported CLI locales.
///
/// # Invariants
/// - Variants are stable for CLI parsing and catalog lookup.
/// - [`Locale::En`] is the default fallback locale.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Locale {
    /// English (default).
    En,
    /// Catalan.
    Ca,
}

impl Locale {
    /// Returns the canonical locale label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Ca => "ca",
        }
    }

    /// Attempts to parse a locale value (case-insensitive, tolerant of region tags).
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        let normalized = value.trim().to_ascii_lowercase();
        let lang = normalized.split(['-', '_', '.']).next().unwrap_or("");
        match lang {
            "en" => Some(Self::En),
            "ca" => Some(Self::Ca),
            _ => None,
        }
    }
}

/// Ordered list of supported CLI locales.
pub const SUPPORTED_LOCALES: &[Locale] = &[Locale::En, Locale::Ca];

/// A formatted message argument captured by the [`macro@crate::t`] macro.
///
/// # Invariants
/// - `key` matches a placeholder name without braces (for example, `path`).
#[derive(Clone)]
pub struct MessageArg {
    /// The placeholder name used in message templates.
    pub key: &'static str,
    /// The formatted string value to substitute for this placeholder.
    pub value: String,
}

impl MessageArg {
    /// Constructs a new [`MessageArg`] from a key and displayable value.
    pub fn new(key: &'static str, value: impl Into<String>) -> Self {
        Self {
            key,
            value: value.into(),
        }
    }
}

// ============================================================================
// SECTION: Locale Selection
// ============================================================================

/// Global locale selection for CLI output.
static CURRENT_LOCALE: OnceLock<Locale> = OnceLock::new();

/// Sets the CLI locale. Only the first call wins.
pub fn set_locale(locale: Locale) {
    let _ = CURRENT_LOCALE.set(locale);
}

/// Returns the current CLI locale (defaults to English).
#[must_use]
pub fn current_locale() -> Locale {
    CURRENT_LOCALE.get().copied().unwrap_or(Locale::En)
}

// ============================================================================
// SECTION: Catalog
// ============================================================================

/// Static English catalog entries.
const CATALOG_EN: &[(&str, &str)] = &[
    ("main.version", "host-gate {version}"),
    ("i18n.lang.invalid_env", "Invalid value for {env}: {value}. Expected 'en' or 'ca'."),
    (
        "i18n.disclaimer.machine_translated",
        "Note: non-English output is machine-translated and may be inaccurate.",
    ),
    ("config.load_failed", "Failed to load config: {error}"),
    ("config.validate.ok", "Config validated successfully."),
    ("config.sink_failed", "Failed to open the event log: {error}"),
    ("registry.build_failed", "Failed to build the probe registry: {error}"),
    ("suite.load_failed", "Failed to load suites: {error}"),
    ("suite.hash_failed", "Failed to hash suite: {error}"),
    ("validate.ok", "Suite {suite} is valid: {count} assertions, hash {algorithm}:{hash}"),
    ("run.preflight_failed", "Suite cannot run: {error}"),
    ("run.cancelling", "Shutdown requested; remaining assertions are reported as cancelled."),
    ("run.worker_failed", "Suite runner stopped unexpectedly: {error}"),
    (
        "report.summary",
        "{status}: {total} assertions, {passed} passed, {failed} failed, {errored} errored",
    ),
    ("report.status.pass", "PASS"),
    ("report.status.fail", "FAIL"),
    ("report.failures.header", "Failures:"),
    ("report.failures.omitted", "... {count} more not shown"),
    ("report.serialize_failed", "Failed to serialize report: {error}"),
    ("probe.params.invalid", "Invalid --params value: {error}"),
    ("probe.params.not_object", "--params must be a JSON object"),
    ("probe.failed", "Probe failed: {error}"),
    ("probe.serialize_failed", "Failed to serialize observation: {error}"),
    ("output.write_failed", "Failed to write to {stream}: {error}"),
    ("output.stream.stdout", "stdout"),
    ("output.stream.stderr", "stderr"),
    ("output.stream.unknown", "output"),
];

/// Static Catalan catalog entries.
const CATALOG_CA: &[(&str, &str)] = &[
    ("main.version", "host-gate {version}"),
    ("i18n.lang.invalid_env", "Valor no vàlid per a {env}: {value}. S'esperava 'en' o 'ca'."),
    (
        "i18n.disclaimer.machine_translated",
        "Nota: la sortida que no és en anglès està traduïda automàticament i pot ser inexacta.",
    ),
    ("config.load_failed", "No s'ha pogut carregar la configuració: {error}"),
    ("config.validate.ok", "La configuració s'ha validat correctament."),
    ("config.sink_failed", "No s'ha pogut obrir el registre d'esdeveniments: {error}"),
    ("registry.build_failed", "No s'ha pogut construir el registre de sondes: {error}"),
    ("suite.load_failed", "No s'han pogut carregar les suites: {error}"),
    ("suite.hash_failed", "No s'ha pogut calcular el hash de la suite: {error}"),
    (
        "validate.ok",
        "La suite {suite} és vàlida: {count} assercions, hash {algorithm}:{hash}",
    ),
    ("run.preflight_failed", "La suite no es pot executar: {error}"),
    (
        "run.cancelling",
        "S'ha demanat l'aturada; les assercions restants es marquen com a cancel·lades.",
    ),
    ("run.worker_failed", "L'executor de la suite s'ha aturat inesperadament: {error}"),
    (
        "report.summary",
        "{status}: {total} assercions, {passed} superades, {failed} fallides, {errored} amb error",
    ),
    ("report.status.pass", "SUPERAT"),
    ("report.status.fail", "FALLAT"),
    ("report.failures.header", "Incidències:"),
    ("report.failures.omitted", "... {count} més no es mostren"),
    ("report.serialize_failed", "No s'ha pogut serialitzar l'informe: {error}"),
    ("probe.params.invalid", "Valor de --params no vàlid: {error}"),
    ("probe.params.not_object", "--params ha de ser un objecte JSON"),
    ("probe.failed", "La sonda ha fallat: {error}"),
    ("probe.serialize_failed", "No s'ha pogut serialitzar l'observació: {error}"),
    ("output.write_failed", "No s'ha pogut escriure a {stream}: {error}"),
    ("output.stream.stdout", "stdout"),
    ("output.stream.stderr", "stderr"),
    ("output.stream.unknown", "sortida"),
];

/// Returns the message catalog for the requested locale.
pub(crate) fn catalog_for(locale: Locale) -> &'static HashMap<&'static str, &'static str> {
    static CATALOG_EN_MAP: OnceLock<HashMap<&'static str, &'static str>> = OnceLock::new();
    static CATALOG_CA_MAP: OnceLock<HashMap<&'static str, &'static str>> = OnceLock::new();
    match locale {
        Locale::En => CATALOG_EN_MAP.get_or_init(|| CATALOG_EN.iter().copied().collect()),
        Locale::Ca => CATALOG_CA_MAP.get_or_init(|| CATALOG_CA.iter().copied().collect()),
    }
}

// ============================================================================
// SECTION: Translation
// ============================================================================

/// Translates `key` using the selected locale while substituting `args`.
#[must_use]
pub fn translate(key: &str, args: Vec<MessageArg>) -> String {
    let template = catalog_for(current_locale())
        .get(key)
        .copied()
        .or_else(|| catalog_for(Locale::En).get(key).copied())
        .unwrap_or(key);
    let mut result = template.to_string();
    for arg in args {
        let placeholder = format!("{{{}}}", arg.key);
        result = result.replace(&placeholder, &arg.value);
    }
    result
}

// ============================================================================
// SECTION: Macro
// ============================================================================

/// Formats a localized message from a key and named arguments.
///
/// Named arguments are substituted into `{placeholder}` positions of the
/// catalog entry for `$key`.
#[macro_export]
macro_rules! t {
    ($key:literal $(, $name:ident = $value:expr )* $(,)?) => {{
        let args = ::std::vec![
            $(
                $crate::i18n::MessageArg::new(stringify!($name), $value.to_string()),
            )*
        ];
        $crate::i18n::translate($key, args)
    }};
}
