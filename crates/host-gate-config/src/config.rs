// crates/host-gate-config/src/config.rs
// ============================================================================
// Module: Host Gate Configuration
// Description: Configuration loading and validation for Host Gate.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: host-gate-core, host-gate-probes, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! The path comes from the caller, then `HOST_GATE_CONFIG`, then
//! `./host-gate.toml` when that file exists; with none of those the built-in
//! defaults apply. Every numeric limit is range-checked before use.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::env;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use host_gate_core::FileRunEventSink;
use host_gate_core::NoopRunEventSink;
use host_gate_core::RunEventSink;
use host_gate_core::StderrRunEventSink;
use host_gate_core::SubjectKind;
use host_gate_probes::BuiltinProbeConfigs;
use host_gate_probes::CommandProbeConfig;
use host_gate_probes::ContainerProbeConfig;
use host_gate_probes::ExecLimits;
use host_gate_probes::FileProbeConfig;
use host_gate_probes::PackageManager;
use host_gate_probes::PackageProbeConfig;
use host_gate_probes::PortProbeConfig;
use host_gate_probes::ProbeAccessPolicy;
use host_gate_probes::ServiceManager;
use host_gate_probes::ServiceProbeConfig;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::suites::read_bounded;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
pub const DEFAULT_CONFIG_NAME: &str = "host-gate.toml";
/// Environment variable naming the configuration file.
pub const CONFIG_ENV_VAR: &str = "HOST_GATE_CONFIG";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Smallest accepted probe timeout in milliseconds.
pub(crate) const MIN_TIMEOUT_MS: u64 = 1;
/// Largest accepted probe timeout in milliseconds.
pub(crate) const MAX_TIMEOUT_MS: u64 = 600_000;
/// Smallest accepted output or file byte limit.
pub(crate) const MIN_BYTE_LIMIT: usize = 1024;
/// Largest accepted command output limit.
pub(crate) const MAX_OUTPUT_BYTES: usize = 64 * 1024 * 1024;
/// Largest accepted file read limit.
pub(crate) const MAX_FILE_BYTES: usize = 256 * 1024 * 1024;
/// Largest accepted failure listing in summaries.
pub(crate) const MAX_REPORT_FAILURES: usize = 10_000;
/// Maximum shell argv entries.
pub(crate) const MAX_SHELL_ARGS: usize = 16;

// ============================================================================
// SECTION: Configuration Model
// ============================================================================

/// Host Gate configuration loaded from `host-gate.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostGateConfig {
    /// Probe limits and backends.
    #[serde(default)]
    pub probes: ProbesConfig,
    /// Report rendering defaults.
    #[serde(default)]
    pub report: ReportConfig,
    /// Run event logging.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl HostGateConfig {
    /// Loads configuration using the default resolution rules.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(resolved) = resolve_path(path)? else {
            let config = Self::default();
            config.validate()?;
            return Ok(config);
        };
        Self::load_file(&resolved)
    }

    /// Loads and validates a specific configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file cannot be read, parsed, or validated.
    pub fn load_file(path: &Path) -> Result<Self, ConfigError> {
        validate_path(path)?;
        let bytes = read_bounded(path, MAX_CONFIG_FILE_SIZE)
            .map_err(|err| ConfigError::Io(format!("{}: {err}", path.display())))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.probes.validate()?;
        self.report.validate()?;
        self.logging.validate()?;
        Ok(())
    }

    /// Builds the configuration bundle for the built-in probes.
    #[must_use]
    pub fn builtin_probe_configs(&self) -> BuiltinProbeConfigs {
        let probes = &self.probes;
        let limits = ExecLimits {
            timeout: Duration::from_millis(probes.timeout_ms),
            max_output_bytes: probes.max_output_bytes,
        };
        BuiltinProbeConfigs {
            package: PackageProbeConfig {
                manager: probes.package_manager,
                limits,
            },
            service: ServiceProbeConfig {
                manager: probes.service_manager,
                etc_root: probes.etc_root.clone(),
                limits,
            },
            file: FileProbeConfig {
                etc_root: probes.etc_root.clone(),
                max_file_bytes: probes.max_file_bytes,
            },
            port: PortProbeConfig {
                proc_root: probes.proc_root.clone(),
            },
            command: CommandProbeConfig {
                shell: probes.shell.clone(),
                limits,
                max_timeout: Duration::from_millis(probes.max_timeout_ms),
            },
            container: ContainerProbeConfig {
                docker_command: probes.docker_command.clone(),
                limits,
            },
        }
    }

    /// Builds the probe access policy.
    #[must_use]
    pub fn access_policy(&self) -> ProbeAccessPolicy {
        ProbeAccessPolicy {
            allowlist: self.probes.allowlist.clone(),
            denylist: self.probes.denylist.clone(),
        }
    }
}

// ============================================================================
// SECTION: Probes
// ============================================================================

/// Probe limits, backends, and access policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbesConfig {
    /// Default wall-clock budget per process-backed probe.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Cap for per-assertion `timeout_ms` params.
    #[serde(default = "default_max_timeout_ms")]
    pub max_timeout_ms: u64,
    /// Maximum bytes captured per output stream.
    #[serde(default = "default_max_output_bytes")]
    pub max_output_bytes: usize,
    /// Maximum bytes read for file content and digests.
    #[serde(default = "default_max_file_bytes")]
    pub max_file_bytes: usize,
    /// Package database backend.
    #[serde(default)]
    pub package_manager: PackageManager,
    /// Init system backend.
    #[serde(default)]
    pub service_manager: ServiceManager,
    /// Interpreter and leading arguments for command subjects.
    #[serde(default = "default_shell")]
    pub shell: Vec<String>,
    /// Docker-compatible CLI executable.
    #[serde(default = "default_docker_command")]
    pub docker_command: String,
    /// Root of the procfs mount.
    #[serde(default = "default_proc_root")]
    pub proc_root: PathBuf,
    /// Root of the configuration tree (`passwd`, `group`, `rc?.d`).
    #[serde(default = "default_etc_root")]
    pub etc_root: PathBuf,
    /// Optional allowlist of subject kinds.
    #[serde(default)]
    pub allowlist: Option<BTreeSet<SubjectKind>>,
    /// Subject kinds that may never be probed.
    #[serde(default)]
    pub denylist: BTreeSet<SubjectKind>,
}

impl Default for ProbesConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            max_timeout_ms: default_max_timeout_ms(),
            max_output_bytes: default_max_output_bytes(),
            max_file_bytes: default_max_file_bytes(),
            package_manager: PackageManager::default(),
            service_manager: ServiceManager::default(),
            shell: default_shell(),
            docker_command: default_docker_command(),
            proc_root: default_proc_root(),
            etc_root: default_etc_root(),
            allowlist: None,
            denylist: BTreeSet::new(),
        }
    }
}

impl ProbesConfig {
    /// Validates probe limits and paths.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_range("probes.timeout_ms", self.timeout_ms, MIN_TIMEOUT_MS, MAX_TIMEOUT_MS)?;
        validate_range("probes.max_timeout_ms", self.max_timeout_ms, MIN_TIMEOUT_MS, MAX_TIMEOUT_MS)?;
        validate_range(
            "probes.max_output_bytes",
            self.max_output_bytes,
            MIN_BYTE_LIMIT,
            MAX_OUTPUT_BYTES,
        )?;
        validate_range("probes.max_file_bytes", self.max_file_bytes, MIN_BYTE_LIMIT, MAX_FILE_BYTES)?;
        if self.shell.is_empty() || self.shell.len() > MAX_SHELL_ARGS {
            return Err(ConfigError::Invalid(format!(
                "probes.shell must have 1 to {MAX_SHELL_ARGS} entries"
            )));
        }
        if self.shell.iter().any(|arg| arg.trim().is_empty()) {
            return Err(ConfigError::Invalid("probes.shell entries must be non-empty".to_string()));
        }
        validate_path_string("probes.docker_command", &self.docker_command)?;
        validate_path_string("probes.proc_root", &self.proc_root.to_string_lossy())?;
        validate_path_string("probes.etc_root", &self.etc_root.to_string_lossy())?;
        if let Some(allowlist) = &self.allowlist
            && allowlist.is_empty()
        {
            return Err(ConfigError::Invalid(
                "probes.allowlist must name at least one kind when set".to_string(),
            ));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Report
// ============================================================================

/// Report output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportFormat {
    /// One line per verdict followed by a summary.
    #[default]
    Text,
    /// Full report and summary as JSON.
    Json,
}

/// Report rendering defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Default output format.
    #[serde(default)]
    pub format: ReportFormat,
    /// Non-passing verdicts listed in the summary.
    #[serde(default = "default_max_failures")]
    pub max_failures: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            format: ReportFormat::default(),
            max_failures: default_max_failures(),
        }
    }
}

impl ReportConfig {
    /// Validates report settings.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_range("report.max_failures", self.max_failures, 0, MAX_REPORT_FAILURES)
    }
}

// ============================================================================
// SECTION: Logging
// ============================================================================

/// Run event sink selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogSinkKind {
    /// Discard run events.
    #[default]
    None,
    /// JSON lines on stderr.
    Stderr,
    /// JSON lines appended to `path`.
    File,
}

/// Run event logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Sink for run events.
    #[serde(default)]
    pub sink: LogSinkKind,
    /// Event log path for the file sink (JSON lines).
    #[serde(default = "default_log_path")]
    pub path: PathBuf,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            sink: LogSinkKind::default(),
            path: default_log_path(),
        }
    }
}

impl LoggingConfig {
    /// Validates logging configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.sink == LogSinkKind::File {
            validate_path_string("logging.path", &self.path.to_string_lossy())?;
        }
        Ok(())
    }

    /// Opens the configured run event sink.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] when the event log cannot be opened.
    pub fn open_sink(&self) -> Result<Box<dyn RunEventSink>, ConfigError> {
        match self.sink {
            LogSinkKind::None => Ok(Box::new(NoopRunEventSink)),
            LogSinkKind::Stderr => Ok(Box::new(StderrRunEventSink)),
            LogSinkKind::File => {
                let sink = FileRunEventSink::new(&self.path)
                    .map_err(|err| ConfigError::Io(format!("{}: {err}", self.path.display())))?;
                Ok(Box::new(sink))
            }
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading or validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Defaults
// ============================================================================

/// Default probe timeout.
const fn default_timeout_ms() -> u64 {
    10_000
}

/// Default cap for per-assertion timeouts.
const fn default_max_timeout_ms() -> u64 {
    60_000
}

/// Default output limit per stream.
const fn default_max_output_bytes() -> usize {
    1024 * 1024
}

/// Default file read limit.
const fn default_max_file_bytes() -> usize {
    4 * 1024 * 1024
}

/// Default command shell.
fn default_shell() -> Vec<String> {
    vec!["/bin/sh".to_string(), "-c".to_string()]
}

/// Default Docker CLI.
fn default_docker_command() -> String {
    "docker".to_string()
}

/// Default procfs root.
fn default_proc_root() -> PathBuf {
    PathBuf::from("/proc")
}

/// Default configuration tree root.
fn default_etc_root() -> PathBuf {
    PathBuf::from("/etc")
}

/// Default summary failure listing.
const fn default_max_failures() -> usize {
    10
}

/// Default event log path.
fn default_log_path() -> PathBuf {
    PathBuf::from("host-gate-events.jsonl")
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from the caller, the environment, or the working
/// directory. Returns `None` when defaults apply.
fn resolve_path(path: Option<&Path>) -> Result<Option<PathBuf>, ConfigError> {
    if let Some(path) = path {
        return Ok(Some(path.to_path_buf()));
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(Some(PathBuf::from(env_path)));
    }
    let fallback = PathBuf::from(DEFAULT_CONFIG_NAME);
    Ok(fallback.is_file().then_some(fallback))
}

/// Validates the resolved path against length limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a path string against length constraints.
pub(crate) fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    for component in Path::new(trimmed).components() {
        if component.as_os_str().len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

/// Validates an inclusive numeric range.
fn validate_range<T>(field: &str, value: T, min: T, max: T) -> Result<(), ConfigError>
where
    T: PartialOrd + std::fmt::Display,
{
    if value < min || value > max {
        return Err(ConfigError::Invalid(format!("{field} must be between {min} and {max}")));
    }
    Ok(())
}
