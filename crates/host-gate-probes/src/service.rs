// crates/host-gate-probes/src/service.rs
// ============================================================================
// Module: Service Probe
// Description: Service enablement and run-state queries for systemd and SysV.
// Purpose: Report whether a service starts at boot and is currently running.
// Dependencies: host-gate-core, serde
// ============================================================================

//! ## Overview
//! With systemd the probe relies on `systemctl is-enabled` and
//! `systemctl is-active` exit codes. Their stdout must be a known state word;
//! anything else (no bus, not booted with systemd) is a probe error rather
//! than a false negative. With SysV init, enablement is read from
//! `S??<name>` start links in `rc2.d` through `rc5.d`, and run state from
//! `service <name> status`. Only the commands needed for the requested
//! fields are executed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use host_gate_core::Observation;
use host_gate_core::ProbeError;
use host_gate_core::ProbeErrorKind;
use host_gate_core::ProbeRequest;
use host_gate_core::Prober;
use serde::Deserialize;
use serde::Serialize;

use crate::process::CommandRunner;
use crate::process::CommandSpec;
use crate::process::ExecLimits;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// SysV runlevels that count as "enabled at boot".
const SYSV_RUNLEVELS: [u8; 4] = [2, 3, 4, 5];
/// Unit file states printed by `systemctl is-enabled`.
const ENABLEMENT_STATES: [&str; 14] = [
    "enabled",
    "enabled-runtime",
    "linked",
    "linked-runtime",
    "alias",
    "masked",
    "masked-runtime",
    "static",
    "indirect",
    "disabled",
    "generated",
    "transient",
    "bad",
    "not-found",
];
/// Active states printed by `systemctl is-active`.
const ACTIVE_STATES: [&str; 8] = [
    "active",
    "inactive",
    "failed",
    "activating",
    "deactivating",
    "reloading",
    "maintenance",
    "refreshing",
];

/// Init system backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceManager {
    /// systemd via `systemctl`.
    #[default]
    Systemd,
    /// SysV init via rc links and `service`.
    Sysv,
}

/// Configuration for the service probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceProbeConfig {
    /// Init system backend.
    pub manager: ServiceManager,
    /// Root of the configuration tree holding `rc?.d` directories.
    pub etc_root: PathBuf,
    /// Command limits.
    pub limits: ExecLimits,
}

impl Default for ServiceProbeConfig {
    fn default() -> Self {
        Self {
            manager: ServiceManager::default(),
            etc_root: PathBuf::from("/etc"),
            limits: ExecLimits::default(),
        }
    }
}

// ============================================================================
// SECTION: Probe Implementation
// ============================================================================

/// Probe for init-system services.
pub struct ServiceProbe {
    /// Probe configuration.
    config: ServiceProbeConfig,
    /// Command runner.
    runner: Arc<dyn CommandRunner>,
}

impl ServiceProbe {
    /// Creates a service probe.
    #[must_use]
    pub fn new(config: ServiceProbeConfig, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            config,
            runner,
        }
    }

    /// Runs `systemctl <verb> <name>` and returns (exit 0, state word).
    ///
    /// # Errors
    ///
    /// Returns [`ProbeErrorKind::Io`] carrying stderr when stdout is not one
    /// of the `known` state words.
    fn systemctl(&self, verb: &str, name: &str, known: &[&str]) -> Result<(bool, String), ProbeError> {
        let spec = CommandSpec::new("systemctl", [verb, name], self.config.limits);
        let output = self.runner.run(&spec)?;
        let stdout = output.stdout_text();
        let state = stdout.trim();
        if known.contains(&state) {
            return Ok((output.success(), state.to_string()));
        }
        if output.success() {
            return Err(ProbeError::new(
                ProbeErrorKind::Io,
                format!("{}: unrecognized state '{state}'", spec.display()),
            ));
        }
        Err(output.failure(&spec))
    }

    /// Returns true when a start link exists for the service in a boot runlevel.
    fn sysv_enabled(&self, name: &str) -> Result<bool, ProbeError> {
        for level in SYSV_RUNLEVELS {
            let dir = self.config.etc_root.join(format!("rc{level}.d"));
            let entries = match fs::read_dir(&dir) {
                Ok(entries) => entries,
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => continue,
                Err(err) => return Err(ProbeError::from_io(&dir.display().to_string(), &err)),
            };
            for entry in entries.flatten() {
                if is_start_link(&entry.file_name().to_string_lossy(), name) {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }

    /// Returns true when `service <name> status` exits 0.
    fn sysv_running(&self, name: &str) -> Result<bool, ProbeError> {
        let spec = CommandSpec::new("service", [name, "status"], self.config.limits);
        Ok(self.runner.run(&spec)?.success())
    }
}

impl Prober for ServiceProbe {
    fn probe(&self, request: &ProbeRequest) -> Result<Observation, ProbeError> {
        let name = request.subject.identifier.as_str();
        let mut observation = Observation::new();
        match self.config.manager {
            ServiceManager::Systemd => {
                if request.wants("enabled") {
                    let (enabled, _) = self.systemctl("is-enabled", name, &ENABLEMENT_STATES)?;
                    observation.insert("enabled", enabled);
                }
                if request.wants("running") || request.wants("state") {
                    let (running, state) = self.systemctl("is-active", name, &ACTIVE_STATES)?;
                    observation.insert("running", running);
                    observation.insert("state", state);
                }
            }
            ServiceManager::Sysv => {
                if request.wants("enabled") {
                    observation.insert("enabled", self.sysv_enabled(name)?);
                }
                if request.wants("running") || request.wants("state") {
                    let running = self.sysv_running(name)?;
                    observation.insert("running", running);
                    observation.insert("state", if running { "running" } else { "stopped" });
                }
            }
        }
        Ok(observation)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Matches `S<two digits><name>` start-link names.
fn is_start_link(file_name: &str, service: &str) -> bool {
    let Some(rest) = file_name.strip_prefix('S') else {
        return false;
    };
    let (Some(priority), Some(target)) = (rest.get(.. 2), rest.get(2 ..)) else {
        return false;
    };
    priority.bytes().all(|byte| byte.is_ascii_digit()) && target == service
}
