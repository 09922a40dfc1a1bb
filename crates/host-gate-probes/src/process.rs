// crates/host-gate-probes/src/process.rs
// ============================================================================
// Module: Bounded Process Execution
// Description: Command runner with output and time limits.
// Purpose: Run host query commands without letting them hang a run.
// Dependencies: host-gate-core, tokio
// ============================================================================

//! ## Overview
//! Probes that shell out go through [`CommandRunner`]. The system runner
//! drives a `tokio::process` child on a current-thread runtime: stdout and
//! stderr are drained concurrently through bounded reads while the exit
//! status is awaited, all under one `tokio::time::timeout`. Spawn failures
//! are classified so a missing package manager surfaces as
//! `command_not_found` instead of a false negative.
//!
//! Invariants:
//! - A child process never outlives [`SystemCommandRunner::run`] on the timeout
//!   or output-limit paths; it is killed and reaped before the error returns.
//! - Output beyond `max_output_bytes` fails the probe rather than being truncated.
//! - [`SystemCommandRunner::run`] blocks; async callers reach it through
//!   `spawn_blocking`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::process::ExitStatus;
use std::process::Stdio;
use std::time::Duration;

use host_gate_core::ProbeError;
use host_gate_core::ProbeErrorKind;
use tokio::io::AsyncRead;
use tokio::io::AsyncReadExt;
use tokio::process::Child;
use tokio::process::Command;
use tokio::time::timeout;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Time and output limits applied to one command.
///
/// # Invariants
/// - `timeout` is non-zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecLimits {
    /// Wall-clock budget for the command.
    pub timeout: Duration,
    /// Maximum bytes accepted on each of stdout and stderr.
    pub max_output_bytes: usize,
}

impl Default for ExecLimits {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            max_output_bytes: 1024 * 1024,
        }
    }
}

// ============================================================================
// SECTION: Command Types
// ============================================================================

/// Command invocation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    /// Program to execute (resolved via `PATH`).
    pub program: String,
    /// Program arguments.
    pub args: Vec<String>,
    /// Limits for this invocation.
    pub limits: ExecLimits,
}

impl CommandSpec {
    /// Creates a command request.
    #[must_use]
    pub fn new<I, S>(program: impl Into<String>, args: I, limits: ExecLimits) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            limits,
        }
    }

    /// Renders the command line for diagnostics.
    #[must_use]
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Captured command output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code; `None` when the process was terminated by a signal.
    pub code: Option<i32>,
    /// Terminating signal when the process did not exit normally.
    pub signal: Option<i32>,
    /// Captured stdout bytes.
    pub stdout: Vec<u8>,
    /// Captured stderr bytes.
    pub stderr: Vec<u8>,
}

impl CommandOutput {
    /// Returns true when the process exited with code 0.
    #[must_use]
    pub const fn success(&self) -> bool {
        matches!(self.code, Some(0))
    }

    /// Returns stdout as lossy UTF-8.
    #[must_use]
    pub fn stdout_text(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    /// Returns stderr as lossy UTF-8.
    #[must_use]
    pub fn stderr_text(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }

    /// Builds the probe error for an unexpected non-zero exit.
    #[must_use]
    pub fn failure(&self, spec: &CommandSpec) -> ProbeError {
        let status = self.code.map_or_else(
            || format!("signal {}", self.signal.unwrap_or_default()),
            |code| format!("exit {code}"),
        );
        let stderr = self.stderr_text();
        let detail = stderr.trim();
        let message = if detail.is_empty() {
            format!("{} failed ({status})", spec.display())
        } else {
            format!("{} failed ({status}): {detail}", spec.display())
        };
        ProbeError::new(ProbeErrorKind::Io, message)
    }
}

// ============================================================================
// SECTION: Command Runner
// ============================================================================

/// Executes host commands on behalf of probes.
pub trait CommandRunner: Send + Sync {
    /// Runs a command to completion within its limits.
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError`] when the command cannot be spawned, times out,
    /// or exceeds its output limit.
    fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, ProbeError>;
}

/// Command runner backed by `tokio::process`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemCommandRunner;

impl CommandRunner for SystemCommandRunner {
    fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, ProbeError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|err| ProbeError::from_io("command runtime", &err))?;
        runtime.block_on(run_bounded(spec))
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Spawns the command and collects its output within the spec limits.
async fn run_bounded(spec: &CommandSpec) -> Result<CommandOutput, ProbeError> {
    let mut command = Command::new(&spec.program);
    command.args(&spec.args);
    command.stdin(Stdio::null());
    command.stdout(Stdio::piped());
    command.stderr(Stdio::piped());
    command.kill_on_drop(true);
    let mut child = command.spawn().map_err(|err| spawn_error(&spec.program, &err))?;

    let collected = timeout(spec.limits.timeout, collect(&mut child, spec))
        .await
        .unwrap_or_else(|_| Err(timeout_error(spec)));
    match collected {
        Ok((status, stdout, stderr)) => Ok(CommandOutput {
            code: status.code(),
            signal: exit_signal(status),
            stdout,
            stderr,
        }),
        Err(err) => {
            let _ = child.kill().await;
            Err(err)
        }
    }
}

/// Drains both pipes and awaits the exit status, stopping at the first error.
async fn collect(
    child: &mut Child,
    spec: &CommandSpec,
) -> Result<(ExitStatus, Vec<u8>, Vec<u8>), ProbeError> {
    let stdout = child.stdout.take().ok_or_else(|| {
        ProbeError::new(ProbeErrorKind::Io, format!("{}: stdout unavailable", spec.program))
    })?;
    let stderr = child.stderr.take().ok_or_else(|| {
        ProbeError::new(ProbeErrorKind::Io, format!("{}: stderr unavailable", spec.program))
    })?;
    let status = async { child.wait().await.map_err(|err| ProbeError::from_io(&spec.program, &err)) };
    let (stdout, stderr, status) =
        tokio::try_join!(read_pipe(stdout, spec, "stdout"), read_pipe(stderr, spec, "stderr"), status)?;
    Ok((status, stdout, stderr))
}

/// Reads one pipe, failing once it yields more than `max_output_bytes`.
async fn read_pipe<R: AsyncRead + Unpin>(
    pipe: R,
    spec: &CommandSpec,
    stream: &str,
) -> Result<Vec<u8>, ProbeError> {
    let max_bytes = spec.limits.max_output_bytes;
    let limit = u64::try_from(max_bytes.saturating_add(1)).unwrap_or(u64::MAX);
    let mut bytes = Vec::new();
    pipe.take(limit)
        .read_to_end(&mut bytes)
        .await
        .map_err(|err| ProbeError::from_io(&spec.program, &err))?;
    if bytes.len() > max_bytes {
        return Err(ProbeError::new(
            ProbeErrorKind::OutputTooLarge,
            format!("{}: {stream} exceeded {max_bytes} bytes", spec.display()),
        ));
    }
    Ok(bytes)
}

/// Builds the timeout error for a command.
fn timeout_error(spec: &CommandSpec) -> ProbeError {
    ProbeError::new(
        ProbeErrorKind::Timeout,
        format!("{} exceeded {} ms", spec.display(), spec.limits.timeout.as_millis()),
    )
}

/// Classifies spawn failures.
fn spawn_error(program: &str, err: &std::io::Error) -> ProbeError {
    match err.kind() {
        std::io::ErrorKind::NotFound => {
            ProbeError::new(ProbeErrorKind::CommandNotFound, format!("executable not found: {program}"))
        }
        std::io::ErrorKind::PermissionDenied => ProbeError::new(
            ProbeErrorKind::PermissionDenied,
            format!("permission denied executing {program}"),
        ),
        _ => ProbeError::from_io(program, err),
    }
}

/// Returns the terminating signal, when any.
#[cfg(unix)]
fn exit_signal(status: ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal()
}

/// Returns the terminating signal, when any.
#[cfg(not(unix))]
const fn exit_signal(_status: ExitStatus) -> Option<i32> {
    None
}
