// crates/host-gate-probes/tests/common/mod.rs
// ============================================================================
// Module: Common Probe Test Fixtures
// Description: Scripted command runner and request builders.
// Purpose: Exercise process-backed probes without touching the host.
// Dependencies: host-gate-core, host-gate-probes
// ============================================================================

//! ## Overview
//! [`ScriptedRunner`] answers commands from a table keyed by the rendered
//! command line and records every invocation, so tests can assert both the
//! observation and which commands a probe chose to run.

#![allow(dead_code, reason = "Shared test helpers may be unused in some cases.")]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Mutex;

use host_gate_core::ProbeError;
use host_gate_core::ProbeErrorKind;
use host_gate_core::ProbeRequest;
use host_gate_core::Subject;
use host_gate_core::SubjectKind;
use host_gate_probes::CommandOutput;
use host_gate_probes::CommandRunner;
use host_gate_probes::CommandSpec;

// ============================================================================
// SECTION: Scripted Runner
// ============================================================================

/// Command runner answering from a fixed script.
#[derive(Default)]
pub struct ScriptedRunner {
    /// Canned outputs keyed by rendered command line.
    script: BTreeMap<String, Result<CommandOutput, ProbeError>>,
    /// Command lines that were run, in order.
    calls: Mutex<Vec<CommandSpec>>,
}

impl ScriptedRunner {
    /// Creates an empty scripted runner.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts an exit code with stdout and stderr.
    #[must_use]
    pub fn on(mut self, command_line: &str, code: i32, stdout: &str, stderr: &str) -> Self {
        self.script.insert(command_line.to_string(), Ok(output(code, stdout, stderr)));
        self
    }

    /// Scripts a runner failure.
    #[must_use]
    pub fn failing(mut self, command_line: &str, error: ProbeError) -> Self {
        self.script.insert(command_line.to_string(), Err(error));
        self
    }

    /// Returns the rendered command lines that were run.
    #[must_use]
    pub fn command_lines(&self) -> Vec<String> {
        self.calls().iter().map(CommandSpec::display).collect()
    }

    /// Returns the command specs that were run.
    #[must_use]
    pub fn calls(&self) -> Vec<CommandSpec> {
        self.calls.lock().map(|calls| calls.clone()).unwrap_or_default()
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, ProbeError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(spec.clone());
        }
        let line = spec.display();
        self.script.get(&line).cloned().unwrap_or_else(|| {
            Err(ProbeError::new(
                ProbeErrorKind::CommandNotFound,
                format!("unscripted command: {line}"),
            ))
        })
    }
}

// ============================================================================
// SECTION: Builders
// ============================================================================

/// Builds a command output with an exit code.
#[must_use]
pub fn output(code: i32, stdout: &str, stderr: &str) -> CommandOutput {
    CommandOutput {
        code: Some(code),
        signal: None,
        stdout: stdout.as_bytes().to_vec(),
        stderr: stderr.as_bytes().to_vec(),
    }
}

/// Builds a probe request for the given fields.
#[must_use]
pub fn request(kind: SubjectKind, identifier: &str, fields: &[&str]) -> ProbeRequest {
    ProbeRequest::new(Subject::new(kind, identifier), fields.iter().copied())
}

/// Builds a probe request with params.
#[must_use]
pub fn request_with_params(
    kind: SubjectKind,
    identifier: &str,
    params: serde_json::Value,
    fields: &[&str],
) -> ProbeRequest {
    ProbeRequest::new(Subject::new(kind, identifier).with_params(params), fields.iter().copied())
}
