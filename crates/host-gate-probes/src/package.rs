// crates/host-gate-probes/src/package.rs
// ============================================================================
// Module: Package Probe
// Description: Installed-package queries via dpkg or rpm.
// Purpose: Report whether a package is installed and at which version.
// Dependencies: host-gate-core, serde
// ============================================================================

//! ## Overview
//! The package probe asks the system package database about one package.
//! A package the database does not know, or knows only as removed, is an
//! observation (`installed = false`), not an error. Failing to run the
//! package manager at all is a probe error.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use host_gate_core::Observation;
use host_gate_core::ProbeError;
use host_gate_core::ProbeErrorKind;
use host_gate_core::ProbeRequest;
use host_gate_core::Prober;
use serde::Deserialize;
use serde::Serialize;

use crate::process::CommandOutput;
use crate::process::CommandRunner;
use crate::process::CommandSpec;
use crate::process::ExecLimits;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Package database backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PackageManager {
    /// Debian `dpkg-query`.
    #[default]
    Dpkg,
    /// RPM `rpm -q`.
    Rpm,
}

/// Configuration for the package probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PackageProbeConfig {
    /// Package database backend.
    pub manager: PackageManager,
    /// Command limits.
    pub limits: ExecLimits,
}

// ============================================================================
// SECTION: Probe Implementation
// ============================================================================

/// Probe for installed packages.
pub struct PackageProbe {
    /// Probe configuration.
    config: PackageProbeConfig,
    /// Command runner.
    runner: Arc<dyn CommandRunner>,
}

/// Package state parsed from the package database.
struct PackageState {
    /// True when the package is installed.
    installed: bool,
    /// Installed version, when installed.
    version: Option<String>,
}

impl PackageProbe {
    /// Creates a package probe.
    #[must_use]
    pub fn new(config: PackageProbeConfig, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            config,
            runner,
        }
    }

    /// Queries the package database.
    fn query(&self, name: &str) -> Result<PackageState, ProbeError> {
        match self.config.manager {
            PackageManager::Dpkg => {
                let spec = CommandSpec::new(
                    "dpkg-query",
                    ["-W", "-f", "${Status}\\t${Version}\\n", name],
                    self.config.limits,
                );
                parse_dpkg(&spec, &self.runner.run(&spec)?)
            }
            PackageManager::Rpm => {
                let spec = CommandSpec::new(
                    "rpm",
                    ["-q", "--qf", "%{VERSION}-%{RELEASE}\\n", name],
                    self.config.limits,
                );
                parse_rpm(&spec, &self.runner.run(&spec)?)
            }
        }
    }
}

impl Prober for PackageProbe {
    fn probe(&self, request: &ProbeRequest) -> Result<Observation, ProbeError> {
        let name = request.subject.identifier.as_str();
        let state = self.query(name)?;
        let mut observation = Observation::new();
        if request.wants("installed") {
            observation.insert("installed", state.installed);
        }
        if request.wants("version") {
            let Some(version) = state.version else {
                return Err(ProbeError::new(
                    ProbeErrorKind::NotFound,
                    format!("package not installed: {name}"),
                ));
            };
            observation.insert("version", version);
        }
        Ok(observation)
    }
}

// ============================================================================
// SECTION: Output Parsing
// ============================================================================

/// Parses `dpkg-query -W -f '${Status}\t${Version}\n'` output.
///
/// Only the first line is read (multi-arch packages print one per architecture).
/// Exit 1 with "no packages found" means the package is unknown.
fn parse_dpkg(spec: &CommandSpec, output: &CommandOutput) -> Result<PackageState, ProbeError> {
    if !output.success() {
        let stderr = output.stderr_text();
        if output.code == Some(1) && stderr.contains("no packages found") {
            return Ok(PackageState {
                installed: false,
                version: None,
            });
        }
        return Err(output.failure(spec));
    }
    let stdout = output.stdout_text();
    let line = stdout.lines().next().unwrap_or_default();
    let (status, version) = line.split_once('\t').unwrap_or((line, ""));
    let installed = status.split_whitespace().nth(2) == Some("installed");
    let version = version.trim();
    Ok(PackageState {
        installed,
        version: (installed && !version.is_empty()).then(|| version.to_string()),
    })
}

/// Parses `rpm -q --qf '%{VERSION}-%{RELEASE}\n'` output.
fn parse_rpm(spec: &CommandSpec, output: &CommandOutput) -> Result<PackageState, ProbeError> {
    let stdout = output.stdout_text();
    if !output.success() {
        if stdout.contains("is not installed") {
            return Ok(PackageState {
                installed: false,
                version: None,
            });
        }
        return Err(output.failure(spec));
    }
    let version = stdout.lines().next().map(str::trim).unwrap_or_default();
    Ok(PackageState {
        installed: true,
        version: (!version.is_empty()).then(|| version.to_string()),
    })
}
