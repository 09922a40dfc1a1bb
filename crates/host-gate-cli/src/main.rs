// crates/host-gate-cli/src/main.rs
// ============================================================================
// Module: Host Gate CLI Entry Point
// Description: Command dispatcher for suite runs, validation, and single probes.
// Purpose: Provide a localized CLI that reports host state and exits with a verdict code.
// Dependencies: clap, host-gate-config, host-gate-core, host-gate-probes, thiserror, tokio.
// ============================================================================

//! ## Overview
//! The Host Gate CLI loads suite files, runs them against the local host, and
//! exits with `0` (pass), `1` (fail), `2` (error), or `3` (declarations or
//! configuration could not be loaded). Suites run on a blocking worker while
//! the async main task listens for Ctrl-C and, on Unix, SIGTERM; either marks
//! the remaining assertions as cancelled and the partial report is still
//! written. All
//! user-facing strings except verdict lines go through the i18n catalog.

// ============================================================================
// SECTION: Modules
// ============================================================================


// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

use clap::ArgAction;
use clap::Args;
use clap::CommandFactory;
use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use host_gate_cli::i18n::Locale;
use host_gate_cli::i18n::set_locale;
use host_gate_cli::render::render_json;
use host_gate_cli::render::render_text;
use host_gate_cli::t;
use host_gate_config::HostGateConfig;
use host_gate_config::ReportFormat;
use host_gate_config::load_suites;
use host_gate_core::EXIT_ERROR;
use host_gate_core::EXIT_INVALID_DECLARATIONS;
use host_gate_core::ProbeRequest;
use host_gate_core::Prober;
use host_gate_core::Report;
use host_gate_core::RunEventSink;
use host_gate_core::Subject;
use host_gate_core::SubjectKind;
use host_gate_core::SuiteRunner;
use host_gate_core::SuiteSpec;
use host_gate_core::fields_for;
use host_gate_probes::ProbeRegistry;
use serde_json::Value;
use thiserror::Error;
#[cfg(unix)]
use tokio::signal::unix::SignalKind;
#[cfg(unix)]
use tokio::signal::unix::signal;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Environment variable for CLI locale selection.
const LANG_ENV: &str = "HOST_GATE_LANG";
/// File fields left out of `probe` output unless requested explicitly.
const BULKY_FILE_FIELDS: [&str; 2] = ["content", "sha256"];

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "host-gate", disable_help_subcommand = true, disable_version_flag = true)]
struct Cli {
    /// Print version information and exit.
    #[arg(long = "version", action = ArgAction::SetTrue, global = true)]
    show_version: bool,
    /// Preferred output language (overrides `HOST_GATE_LANG`).
    #[arg(long, value_enum, value_name = "LANG", global = true)]
    lang: Option<LangArg>,
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run suites against this host and report verdicts.
    Run(RunCommand),
    /// Load and validate suites without probing.
    Validate(ValidateCommand),
    /// Probe a single subject and print the observation.
    Probe(ProbeCommand),
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

/// Arguments for `run`.
#[derive(Args, Debug)]
struct RunCommand {
    /// Suite files, merged in the order given.
    #[arg(long = "suite", value_name = "PATH", required = true)]
    suites: Vec<PathBuf>,
    /// Host roles to select; assertions without roles always apply.
    #[arg(long = "role", value_name = "ROLE")]
    roles: Vec<String>,
    /// Config file path (defaults to `HOST_GATE_CONFIG` or `./host-gate.toml`).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Report format (overrides `report.format`).
    #[arg(long, value_enum)]
    format: Option<FormatArg>,
    /// Maximum non-passing verdicts listed in the summary (overrides `report.max_failures`).
    #[arg(long, value_name = "N")]
    max_failures: Option<usize>,
}

/// Arguments for `validate`.
#[derive(Args, Debug)]
struct ValidateCommand {
    /// Suite files, merged in the order given.
    #[arg(long = "suite", value_name = "PATH", required = true)]
    suites: Vec<PathBuf>,
    /// Host roles to select.
    #[arg(long = "role", value_name = "ROLE")]
    roles: Vec<String>,
}

/// Arguments for `probe`.
#[derive(Args, Debug)]
struct ProbeCommand {
    /// Subject kind to probe.
    #[arg(long, value_enum)]
    kind: KindArg,
    /// Kind-specific identifier (package name, path, port, command line).
    #[arg(long, value_name = "ID")]
    identifier: String,
    /// Kind-specific params as a JSON object.
    #[arg(long, value_name = "JSON")]
    params: Option<String>,
    /// Fields to observe (defaults to every cheap field of the kind).
    #[arg(long = "field", value_name = "FIELD")]
    fields: Vec<String>,
    /// Config file path.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Load and validate the configuration.
    Validate(ConfigValidateCommand),
}

/// Arguments for `config validate`.
#[derive(Args, Debug)]
struct ConfigValidateCommand {
    /// Config file path.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Report format selector.
#[derive(ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
enum FormatArg {
    /// Verdict lines and a summary.
    Text,
    /// Canonical JSON report.
    Json,
}

impl From<FormatArg> for ReportFormat {
    fn from(value: FormatArg) -> Self {
        match value {
            FormatArg::Text => Self::Text,
            FormatArg::Json => Self::Json,
        }
    }
}

/// Subject kind selector.
#[derive(ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
enum KindArg {
    /// Installed package.
    Package,
    /// Init-system service.
    Service,
    /// Filesystem path.
    File,
    /// Local listening port.
    Port,
    /// Shell command.
    Command,
    /// Docker container.
    Container,
}

impl From<KindArg> for SubjectKind {
    fn from(value: KindArg) -> Self {
        match value {
            KindArg::Package => Self::Package,
            KindArg::Service => Self::Service,
            KindArg::File => Self::File,
            KindArg::Port => Self::Port,
            KindArg::Command => Self::Command,
            KindArg::Container => Self::Container,
        }
    }
}

/// Output language selector.
#[derive(ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
enum LangArg {
    /// English.
    En,
    /// Catalan.
    Ca,
}

impl From<LangArg> for Locale {
    fn from(value: LangArg) -> Self {
        match value {
            LangArg::En => Self::En,
            LangArg::Ca => Self::Ca,
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper for localized error messages.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
    /// Process exit code for the failure.
    exit_code: u8,
}

impl CliError {
    /// Error raised before any probing: bad declarations, config, or arguments.
    const fn invalid(message: String) -> Self {
        Self {
            message,
            exit_code: EXIT_INVALID_DECLARATIONS,
        }
    }

    /// Error raised while probing or writing output.
    const fn runtime(message: String) -> Self {
        Self {
            message,
            exit_code: EXIT_ERROR,
        }
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(err) => emit_error(&err),
    }
}

/// Executes the CLI command dispatcher.
async fn run() -> CliResult<ExitCode> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => return Ok(emit_usage(&err)),
    };
    let env_lang = std::env::var(LANG_ENV).ok();
    let locale = resolve_locale(cli.lang, env_lang.as_deref())?;
    set_locale(locale);
    if locale != Locale::En {
        write_stderr_line(&t!("i18n.disclaimer.machine_translated"))
            .map_err(|err| CliError::runtime(output_error("stderr", &err)))?;
    }

    if cli.show_version {
        let version = env!("CARGO_PKG_VERSION");
        write_stdout_line(&t!("main.version", version = version))
            .map_err(|err| CliError::runtime(output_error("stdout", &err)))?;
        return Ok(ExitCode::SUCCESS);
    }

    let Some(command) = cli.command else {
        show_help()?;
        return Ok(ExitCode::SUCCESS);
    };

    match command {
        Commands::Run(command) => command_run(command).await,
        Commands::Validate(command) => command_validate(&command),
        Commands::Probe(command) => command_probe(command).await,
        Commands::Config {
            command,
        } => match command {
            ConfigCommand::Validate(command) => command_config_validate(&command),
        },
    }
}

/// Prints the top-level help text.
fn show_help() -> CliResult<()> {
    let mut command = Cli::command();
    command.print_help().map_err(|err| CliError::runtime(output_error("stdout", &err)))?;
    write_stdout_line("").map_err(|err| CliError::runtime(output_error("stdout", &err)))?;
    Ok(())
}

/// Prints a clap parse outcome and maps it to an exit code.
fn emit_usage(err: &clap::Error) -> ExitCode {
    let _ = err.print();
    if err.use_stderr() { ExitCode::from(EXIT_INVALID_DECLARATIONS) } else { ExitCode::SUCCESS }
}

// ============================================================================
// SECTION: Run Command
// ============================================================================

/// Executes the suite run command.
async fn command_run(command: RunCommand) -> CliResult<ExitCode> {
    let config = load_config(command.config.as_deref())?;
    let roles: BTreeSet<String> = command.roles.into_iter().collect();
    let suite = load_suites(&command.suites, &roles)
        .map_err(|err| CliError::invalid(t!("suite.load_failed", error = err)))?;
    let registry = build_registry(&config)?;
    let sink = config
        .logging
        .open_sink()
        .map_err(|err| CliError::invalid(t!("config.sink_failed", error = err)))?;
    let format = command.format.map_or(config.report.format, ReportFormat::from);
    let max_failures = command.max_failures.unwrap_or(config.report.max_failures);

    let report = run_until_shutdown(registry, sink, suite, shutdown_signal()).await?;
    write_report(&report, format, max_failures)?;
    Ok(ExitCode::from(report.exit_code()))
}

/// Runs the suite on a blocking worker until it finishes or `shutdown` resolves.
///
/// A shutdown sets the cancel flag and still joins the worker, so the partial
/// report is returned rather than dropped.
async fn run_until_shutdown(
    registry: ProbeRegistry,
    sink: Box<dyn RunEventSink>,
    suite: SuiteSpec,
    shutdown: impl Future<Output = std::io::Result<()>>,
) -> CliResult<Report> {
    let cancel = Arc::new(AtomicBool::new(false));
    let worker_cancel = Arc::clone(&cancel);
    let mut worker = tokio::task::spawn_blocking(move || {
        SuiteRunner::new(&registry, sink.as_ref()).run(&suite, &worker_cancel)
    });
    let joined = tokio::select! {
        joined = &mut worker => joined,
        requested = shutdown => {
            if requested.is_ok() {
                cancel.store(true, Ordering::SeqCst);
                // The notice is best effort; the report must still be written.
                let _ = write_stderr_line(&t!("run.cancelling"));
            }
            worker.await
        }
    };
    joined
        .map_err(|err| CliError::runtime(t!("run.worker_failed", error = err)))?
        .map_err(|err| CliError::invalid(t!("run.preflight_failed", error = err)))
}

/// Resolves on Ctrl-C or SIGTERM.
#[cfg(unix)]
async fn shutdown_signal() -> std::io::Result<()> {
    let Ok(mut terminate) = signal(SignalKind::terminate()) else {
        return tokio::signal::ctrl_c().await;
    };
    tokio::select! {
        interrupted = tokio::signal::ctrl_c() => interrupted,
        _ = terminate.recv() => Ok(()),
    }
}

/// Resolves on Ctrl-C.
#[cfg(not(unix))]
async fn shutdown_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}

/// Writes the report in the selected format.
fn write_report(report: &Report, format: ReportFormat, max_failures: usize) -> CliResult<()> {
    let bytes = match format {
        ReportFormat::Text => render_text(report, max_failures).into_bytes(),
        ReportFormat::Json => render_json(report, max_failures)
            .map_err(|err| CliError::runtime(t!("report.serialize_failed", error = err)))?,
    };
    write_stdout_bytes(&bytes).map_err(|err| CliError::runtime(output_error("stdout", &err)))
}

// ============================================================================
// SECTION: Validate Command
// ============================================================================

/// Executes the suite validation command.
fn command_validate(command: &ValidateCommand) -> CliResult<ExitCode> {
    let roles: BTreeSet<String> = command.roles.iter().cloned().collect();
    let suite = load_suites(&command.suites, &roles)
        .map_err(|err| CliError::invalid(t!("suite.load_failed", error = err)))?;
    let hash = suite
        .canonical_hash()
        .map_err(|err| CliError::invalid(t!("suite.hash_failed", error = err)))?;
    write_stdout_line(&t!(
        "validate.ok",
        suite = suite.suite_id,
        count = suite.assertions.len(),
        algorithm = hash.algorithm.as_str(),
        hash = hash.value
    ))
    .map_err(|err| CliError::runtime(output_error("stdout", &err)))?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Probe Command
// ============================================================================

/// Executes a single probe on a blocking worker and prints the observation.
async fn command_probe(command: ProbeCommand) -> CliResult<ExitCode> {
    let config = load_config(command.config.as_deref())?;
    let registry = build_registry(&config)?;
    let kind = SubjectKind::from(command.kind);
    let mut subject = Subject::new(kind, command.identifier);
    if let Some(params) = parse_params(command.params.as_deref())? {
        subject = subject.with_params(params);
    }
    let fields = if command.fields.is_empty() { default_probe_fields(kind) } else { command.fields };
    let request = ProbeRequest::new(subject, fields);
    let observation = tokio::task::spawn_blocking(move || registry.probe(&request))
        .await
        .map_err(|err| CliError::runtime(t!("run.worker_failed", error = err)))?
        .map_err(|err| CliError::runtime(t!("probe.failed", error = err)))?;
    let mut bytes = serde_jcs::to_vec(&observation)
        .map_err(|err| CliError::runtime(t!("probe.serialize_failed", error = err)))?;
    bytes.push(b'\n');
    write_stdout_bytes(&bytes).map_err(|err| CliError::runtime(output_error("stdout", &err)))?;
    Ok(ExitCode::SUCCESS)
}

/// Parses the `--params` JSON object.
fn parse_params(raw: Option<&str>) -> CliResult<Option<Value>> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    let value: Value = serde_json::from_str(raw)
        .map_err(|err| CliError::invalid(t!("probe.params.invalid", error = err)))?;
    if !value.is_object() {
        return Err(CliError::invalid(t!("probe.params.not_object")));
    }
    Ok(Some(value))
}

/// Returns the fields observed when `--field` is omitted.
fn default_probe_fields(kind: SubjectKind) -> Vec<String> {
    fields_for(kind)
        .iter()
        .filter(|spec| kind != SubjectKind::File || !BULKY_FILE_FIELDS.contains(&spec.name))
        .map(|spec| spec.name.to_string())
        .collect()
}

// ============================================================================
// SECTION: Config Command
// ============================================================================

/// Executes the config validation command.
fn command_config_validate(command: &ConfigValidateCommand) -> CliResult<ExitCode> {
    let _config = load_config(command.config.as_deref())?;
    write_stdout_line(&t!("config.validate.ok"))
        .map_err(|err| CliError::runtime(output_error("stdout", &err)))?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Shared Helpers
// ============================================================================

/// Loads and validates the configuration.
fn load_config(path: Option<&Path>) -> CliResult<HostGateConfig> {
    HostGateConfig::load(path).map_err(|err| CliError::invalid(t!("config.load_failed", error = err)))
}

/// Builds the probe registry described by the configuration.
fn build_registry(config: &HostGateConfig) -> CliResult<ProbeRegistry> {
    ProbeRegistry::with_builtin_probes(config.builtin_probe_configs(), config.access_policy())
        .map_err(|err| CliError::invalid(t!("registry.build_failed", error = err)))
}

/// Resolves the output locale from the flag, then the environment.
fn resolve_locale(lang: Option<LangArg>, env_lang: Option<&str>) -> CliResult<Locale> {
    if let Some(lang) = lang {
        return Ok(lang.into());
    }
    if let Some(value) = env_lang {
        return Locale::parse(value).ok_or_else(|| {
            CliError::invalid(t!("i18n.lang.invalid_env", env = LANG_ENV, value = value))
        });
    }
    Ok(Locale::En)
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Writes a single line to stdout.
fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
}

/// Writes raw bytes to stdout without adding a newline.
fn write_stdout_bytes(bytes: &[u8]) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    stdout.write_all(bytes)?;
    stdout.flush()
}

/// Writes a single line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Formats a localized output error message.
fn output_error(stream: &str, error: &std::io::Error) -> String {
    let stream_label = match stream {
        "stdout" => t!("output.stream.stdout"),
        "stderr" => t!("output.stream.stderr"),
        _ => t!("output.stream.unknown"),
    };
    t!("output.write_failed", stream = stream_label, error = error)
}

/// Emits an error message to stderr and returns its exit code.
fn emit_error(err: &CliError) -> ExitCode {
    let _ = write_stderr_line(&err.message);
    ExitCode::from(err.exit_code)
}
