// crates/host-gate-probes/src/command.rs
// ============================================================================
// Module: Command Probe
// Description: Shell command execution with captured exit status and output.
// Purpose: Let suites assert on the result of arbitrary read-only commands.
// Dependencies: host-gate-core
// ============================================================================

//! ## Overview
//! The command probe hands the identifier to the configured shell and reports
//! `exit_status`, `stdout` and `stderr`. A non-zero exit is an observation,
//! not an error; only failing to run the command within its limits is.
//! Processes terminated by a signal report `128 + signal`, matching shells.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use host_gate_core::Observation;
use host_gate_core::ProbeError;
use host_gate_core::ProbeErrorKind;
use host_gate_core::ProbeRequest;
use host_gate_core::Prober;

use crate::process::CommandRunner;
use crate::process::CommandSpec;
use crate::process::ExecLimits;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Configuration for the command probe.
///
/// # Invariants
/// - `shell` names at least the interpreter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandProbeConfig {
    /// Interpreter and leading arguments; the identifier is appended.
    pub shell: Vec<String>,
    /// Default command limits.
    pub limits: ExecLimits,
    /// Cap applied to per-assertion `timeout_ms` params.
    pub max_timeout: Duration,
}

impl Default for CommandProbeConfig {
    fn default() -> Self {
        Self {
            shell: vec!["/bin/sh".to_string(), "-c".to_string()],
            limits: ExecLimits::default(),
            max_timeout: Duration::from_secs(60),
        }
    }
}

// ============================================================================
// SECTION: Probe Implementation
// ============================================================================

/// Probe for shell commands.
pub struct CommandProbe {
    /// Probe configuration.
    config: CommandProbeConfig,
    /// Command runner.
    runner: Arc<dyn CommandRunner>,
}

impl CommandProbe {
    /// Creates a command probe.
    #[must_use]
    pub fn new(config: CommandProbeConfig, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            config,
            runner,
        }
    }

    /// Builds the shell invocation for a command line.
    fn command_spec(&self, command_line: &str, timeout_ms: Option<u64>) -> Result<CommandSpec, ProbeError> {
        let Some((program, leading)) = self.config.shell.split_first() else {
            return Err(ProbeError::new(ProbeErrorKind::InvalidParams, "command shell is not configured"));
        };
        let mut limits = self.config.limits;
        if let Some(timeout_ms) = timeout_ms {
            limits.timeout = Duration::from_millis(timeout_ms).min(self.config.max_timeout);
        }
        let args = leading.iter().map(String::as_str).chain(std::iter::once(command_line));
        Ok(CommandSpec::new(program.as_str(), args, limits))
    }
}

impl Prober for CommandProbe {
    fn probe(&self, request: &ProbeRequest) -> Result<Observation, ProbeError> {
        let subject = &request.subject;
        let spec = self.command_spec(&subject.identifier, subject.param_u64("timeout_ms"))?;
        let output = self.runner.run(&spec)?;
        let mut observation = Observation::new();
        if request.wants("exit_status") {
            let status = output
                .code
                .or_else(|| output.signal.map(|signal| 128 + signal))
                .ok_or_else(|| {
                    ProbeError::new(ProbeErrorKind::Io, format!("{} reported no exit status", spec.display()))
                })?;
            observation.insert("exit_status", status);
        }
        if request.wants("stdout") {
            observation.insert("stdout", output.stdout_text());
        }
        if request.wants("stderr") {
            observation.insert("stderr", output.stderr_text());
        }
        Ok(observation)
    }
}
