// crates/host-gate-probes/src/container.rs
// ============================================================================
// Module: Container Probe
// Description: Container state queries through the Docker CLI.
// Purpose: Report whether a container exists, runs, and which image it uses.
// Dependencies: host-gate-core, serde_json
// ============================================================================

//! ## Overview
//! The container probe runs `docker inspect --type container <name>` and
//! reads `State.Running`, `State.Status` and `Config.Image` from the JSON
//! document. An unknown container is observed as `exists = false`; fields
//! that describe the container then fail with `not_found`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use host_gate_core::Observation;
use host_gate_core::ProbeError;
use host_gate_core::ProbeErrorKind;
use host_gate_core::ProbeRequest;
use host_gate_core::Prober;
use serde_json::Value;

use crate::process::CommandRunner;
use crate::process::CommandSpec;
use crate::process::ExecLimits;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Daemon messages that mean the container does not exist.
const MISSING_MARKERS: [&str; 2] = ["No such container", "No such object"];

/// Configuration for the container probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerProbeConfig {
    /// Docker-compatible CLI executable.
    pub docker_command: String,
    /// Command limits.
    pub limits: ExecLimits,
}

impl Default for ContainerProbeConfig {
    fn default() -> Self {
        Self {
            docker_command: "docker".to_string(),
            limits: ExecLimits::default(),
        }
    }
}

// ============================================================================
// SECTION: Probe Implementation
// ============================================================================

/// Probe for containers.
pub struct ContainerProbe {
    /// Probe configuration.
    config: ContainerProbeConfig,
    /// Command runner.
    runner: Arc<dyn CommandRunner>,
}

impl ContainerProbe {
    /// Creates a container probe.
    #[must_use]
    pub fn new(config: ContainerProbeConfig, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            config,
            runner,
        }
    }
}

impl Prober for ContainerProbe {
    fn probe(&self, request: &ProbeRequest) -> Result<Observation, ProbeError> {
        let name = request.subject.identifier.as_str();
        let spec = CommandSpec::new(
            self.config.docker_command.as_str(),
            ["inspect", "--type", "container", name],
            self.config.limits,
        );
        let output = self.runner.run(&spec)?;
        let mut observation = Observation::new();

        if !output.success() {
            let stderr = output.stderr_text();
            if !MISSING_MARKERS.iter().any(|marker| stderr.contains(marker)) {
                return Err(output.failure(&spec));
            }
            if request.wants_any_except(&["exists"]) {
                return Err(ProbeError::new(
                    ProbeErrorKind::NotFound,
                    format!("container not found: {name}"),
                ));
            }
            observation.insert("exists", false);
            return Ok(observation);
        }

        let raw = output.stdout_text();
        let document: Value = serde_json::from_str(&raw).map_err(|err| {
            ProbeError::new(ProbeErrorKind::Io, format!("unparseable inspect output for {name}: {err}"))
        })?;
        let Some(container) = document.get(0) else {
            return Err(ProbeError::new(
                ProbeErrorKind::NotFound,
                format!("container not found: {name}"),
            ));
        };

        if request.wants("exists") {
            observation.insert("exists", true);
        }
        if request.wants("running") {
            let running = container.pointer("/State/Running").and_then(Value::as_bool);
            observation.insert("running", required(running, name, "State.Running")?);
        }
        if request.wants("status") {
            let status = container.pointer("/State/Status").and_then(Value::as_str);
            observation.insert("status", required(status, name, "State.Status")?);
        }
        if request.wants("image") {
            let image = container.pointer("/Config/Image").and_then(Value::as_str);
            observation.insert("image", required(image, name, "Config.Image")?);
        }
        if request.wants("inspect") {
            observation.insert("inspect", raw.trim().to_string());
        }
        Ok(observation)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Requires a value from the inspect document.
fn required<T>(value: Option<T>, name: &str, key: &str) -> Result<T, ProbeError> {
    value.ok_or_else(|| {
        ProbeError::new(ProbeErrorKind::Io, format!("inspect output for {name} lacks {key}"))
    })
}
