// crates/host-gate-probes/tests/process_probes.rs
// ============================================================================
// Module: Process-Backed Probe Tests
// Description: Package, service, command, and container probes over scripts.
// Purpose: Verify output parsing and not-found versus error classification.
// Dependencies: host-gate-core, host-gate-probes, serde_json
// ============================================================================
//! ## Overview
//! Each probe runs against a [`common::ScriptedRunner`] so the host's real
//! package manager, init system, and Docker daemon are never consulted.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

mod common;

use std::sync::Arc;
use std::time::Duration;

use host_gate_core::ProbeError;
use host_gate_core::ProbeErrorKind;
use host_gate_core::Prober;
use host_gate_core::SubjectKind;
use host_gate_probes::CommandOutput;
use host_gate_probes::CommandProbe;
use host_gate_probes::CommandProbeConfig;
use host_gate_probes::CommandRunner;
use host_gate_probes::CommandSpec;
use host_gate_probes::ContainerProbe;
use host_gate_probes::ContainerProbeConfig;
use host_gate_probes::PackageManager;
use host_gate_probes::PackageProbe;
use host_gate_probes::PackageProbeConfig;
use host_gate_probes::ServiceManager;
use host_gate_probes::ServiceProbe;
use host_gate_probes::ServiceProbeConfig;
use serde_json::json;

use crate::common::ScriptedRunner;
use crate::common::request;
use crate::common::request_with_params;

/// dpkg query line for `nginx`.
const DPKG_NGINX: &str = "dpkg-query -W -f ${Status}\\t${Version}\\n nginx";
/// rpm query line for `nginx`.
const RPM_NGINX: &str = "rpm -q --qf %{VERSION}-%{RELEASE}\\n nginx";

/// Builds a package probe over a script.
fn package_probe(manager: PackageManager, runner: ScriptedRunner) -> PackageProbe {
    let config = PackageProbeConfig {
        manager,
        ..PackageProbeConfig::default()
    };
    PackageProbe::new(config, Arc::new(runner))
}

// ============================================================================
// SECTION: Package Probe
// ============================================================================

/// Tests that an installed dpkg package reports its version.
#[test]
fn dpkg_installed_package_reports_version() {
    let runner =
        ScriptedRunner::new().on(DPKG_NGINX, 0, "install ok installed\t1.24.0-2ubuntu7\n", "");
    let probe = package_probe(PackageManager::Dpkg, runner);
    let observation =
        probe.probe(&request(SubjectKind::Package, "nginx", &["installed", "version"])).unwrap();
    assert_eq!(observation.get("installed"), Some(&json!(true)));
    assert_eq!(observation.get("version"), Some(&json!("1.24.0-2ubuntu7")));
}

/// Tests that a removed package with leftover config is not installed.
#[test]
fn dpkg_config_files_state_is_not_installed() {
    let runner = ScriptedRunner::new().on(DPKG_NGINX, 0, "deinstall ok config-files\t1.24.0\n", "");
    let probe = package_probe(PackageManager::Dpkg, runner);
    let observation = probe.probe(&request(SubjectKind::Package, "nginx", &["installed"])).unwrap();
    assert_eq!(observation.get("installed"), Some(&json!(false)));
}

/// Tests that an unknown dpkg package is observed as not installed.
#[test]
fn dpkg_unknown_package_is_observation() {
    let runner = ScriptedRunner::new().on(
        DPKG_NGINX,
        1,
        "",
        "dpkg-query: no packages found matching nginx\n",
    );
    let probe = package_probe(PackageManager::Dpkg, runner);
    let observation = probe.probe(&request(SubjectKind::Package, "nginx", &["installed"])).unwrap();
    assert_eq!(observation.get("installed"), Some(&json!(false)));
}

/// Tests that the version of an absent package is `not_found`.
#[test]
fn version_of_absent_package_is_not_found() {
    let runner = ScriptedRunner::new().on(RPM_NGINX, 1, "package nginx is not installed\n", "");
    let probe = package_probe(PackageManager::Rpm, runner);
    let err = probe
        .probe(&request(SubjectKind::Package, "nginx", &["installed", "version"]))
        .unwrap_err();
    assert_eq!(err.kind, ProbeErrorKind::NotFound);
}

/// Tests that rpm reports version-release.
#[test]
fn rpm_reports_version_release() {
    let runner = ScriptedRunner::new().on(RPM_NGINX, 0, "1.20.1-14.el9\n", "");
    let probe = package_probe(PackageManager::Rpm, runner);
    let observation = probe.probe(&request(SubjectKind::Package, "nginx", &["version"])).unwrap();
    assert_eq!(observation.get("version"), Some(&json!("1.20.1-14.el9")));
}

/// Tests that a missing package manager is an error, not a false negative.
#[test]
fn missing_package_manager_is_error() {
    let runner = ScriptedRunner::new().failing(
        DPKG_NGINX,
        ProbeError::new(ProbeErrorKind::CommandNotFound, "executable not found: dpkg-query"),
    );
    let probe = package_probe(PackageManager::Dpkg, runner);
    let err = probe.probe(&request(SubjectKind::Package, "nginx", &["installed"])).unwrap_err();
    assert_eq!(err.kind, ProbeErrorKind::CommandNotFound);
}

/// Tests that an unexpected dpkg failure surfaces stderr.
#[test]
fn dpkg_database_failure_is_error() {
    let runner = ScriptedRunner::new().on(DPKG_NGINX, 2, "", "dpkg: status database locked\n");
    let probe = package_probe(PackageManager::Dpkg, runner);
    let err = probe.probe(&request(SubjectKind::Package, "nginx", &["installed"])).unwrap_err();
    assert_eq!(err.kind, ProbeErrorKind::Io);
    assert!(err.message.contains("status database locked"));
}

// ============================================================================
// SECTION: Service Probe
// ============================================================================

/// Tests systemd enablement and state reporting.
#[test]
fn systemd_reports_enabled_and_state() {
    let runner = Arc::new(
        ScriptedRunner::new()
            .on("systemctl is-enabled sshd", 0, "enabled\n", "")
            .on("systemctl is-active sshd", 3, "inactive\n", ""),
    );
    let probe = ServiceProbe::new(ServiceProbeConfig::default(), runner.clone());
    let observation = probe
        .probe(&request(SubjectKind::Service, "sshd", &["enabled", "running", "state"]))
        .unwrap();
    assert_eq!(observation.get("enabled"), Some(&json!(true)));
    assert_eq!(observation.get("running"), Some(&json!(false)));
    assert_eq!(observation.get("state"), Some(&json!("inactive")));
    assert_eq!(runner.command_lines().len(), 2);
}

/// Tests that only the commands needed for requested fields run.
#[test]
fn systemd_skips_unrequested_queries() {
    let runner =
        Arc::new(ScriptedRunner::new().on("systemctl is-active cron", 0, "active\n", ""));
    let probe = ServiceProbe::new(ServiceProbeConfig::default(), runner.clone());
    let observation = probe.probe(&request(SubjectKind::Service, "cron", &["running"])).unwrap();
    assert_eq!(observation.get("running"), Some(&json!(true)));
    assert_eq!(runner.command_lines(), vec!["systemctl is-active cron".to_string()]);
}

/// Tests that a host without a running systemd is an error, not "disabled".
#[test]
fn systemd_not_booted_is_error() {
    let runner = ScriptedRunner::new().on(
        "systemctl is-enabled sshd",
        1,
        "",
        "System has not been booted with systemd as init system (PID 1). Can't operate.\n",
    );
    let service = ServiceProbe::new(ServiceProbeConfig::default(), Arc::new(runner));
    let err = service.probe(&request(SubjectKind::Service, "sshd", &["enabled"])).unwrap_err();
    assert_eq!(err.kind, ProbeErrorKind::Io);
    assert!(err.message.contains("System has not been booted with systemd"));
}

/// Tests that a bus connection failure is an error, not "stopped".
#[test]
fn systemd_bus_failure_is_error() {
    let runner = ScriptedRunner::new().on(
        "systemctl is-active sshd",
        1,
        "",
        "Failed to connect to bus: No such file or directory\n",
    );
    let service = ServiceProbe::new(ServiceProbeConfig::default(), Arc::new(runner));
    let err = service.probe(&request(SubjectKind::Service, "sshd", &["running", "state"])).unwrap_err();
    assert_eq!(err.kind, ProbeErrorKind::Io);
    assert!(err.message.contains("Failed to connect to bus"));
}

/// Tests that known non-zero states are observations.
#[test]
fn systemd_known_states_are_observed() {
    let runner = ScriptedRunner::new()
        .on("systemctl is-enabled telnet", 1, "not-found\n", "")
        .on("systemctl is-active telnet", 3, "failed\n", "");
    let service = ServiceProbe::new(ServiceProbeConfig::default(), Arc::new(runner));
    let observation = service
        .probe(&request(SubjectKind::Service, "telnet", &["enabled", "state"]))
        .unwrap();
    assert_eq!(observation.get("enabled"), Some(&json!(false)));
    assert_eq!(observation.get("state"), Some(&json!("failed")));
}

/// Tests that rc links with multibyte names are skipped without panicking.
#[test]
fn sysv_ignores_multibyte_rc_links() {
    let etc = tempfile::tempdir().unwrap();
    let rc2 = etc.path().join("rc2.d");
    std::fs::create_dir(&rc2).unwrap();
    std::fs::write(rc2.join("S1\u{e9}-nginx"), "").unwrap();
    std::fs::write(rc2.join("S\u{e9}"), "").unwrap();
    let config = ServiceProbeConfig {
        manager: ServiceManager::Sysv,
        etc_root: etc.path().to_path_buf(),
        ..ServiceProbeConfig::default()
    };
    let service = ServiceProbe::new(config, Arc::new(ScriptedRunner::new()));
    let observation = service.probe(&request(SubjectKind::Service, "nginx", &["enabled"])).unwrap();
    assert_eq!(observation.get("enabled"), Some(&json!(false)));

    std::fs::write(rc2.join("S20nginx"), "").unwrap();
    let observation = service.probe(&request(SubjectKind::Service, "nginx", &["enabled"])).unwrap();
    assert_eq!(observation.get("enabled"), Some(&json!(true)));
}

/// Tests SysV enablement from rc links and run state from `service`.
#[test]
fn sysv_reads_rc_links_and_status() {
    let etc = tempfile::tempdir().unwrap();
    std::fs::create_dir(etc.path().join("rc3.d")).unwrap();
    std::fs::write(etc.path().join("rc3.d").join("S20ntp"), "").unwrap();
    std::fs::write(etc.path().join("rc3.d").join("K01ntpdate"), "").unwrap();
    let runner = Arc::new(
        ScriptedRunner::new()
            .on("service ntp status", 0, "ntp is running\n", "")
            .on("service ntpdate status", 3, "", ""),
    );
    let config = ServiceProbeConfig {
        manager: ServiceManager::Sysv,
        etc_root: etc.path().to_path_buf(),
        ..ServiceProbeConfig::default()
    };
    let probe = ServiceProbe::new(config, runner);

    let ntp = probe
        .probe(&request(SubjectKind::Service, "ntp", &["enabled", "running", "state"]))
        .unwrap();
    assert_eq!(ntp.get("enabled"), Some(&json!(true)));
    assert_eq!(ntp.get("state"), Some(&json!("running")));

    let ntpdate =
        probe.probe(&request(SubjectKind::Service, "ntpdate", &["enabled", "state"])).unwrap();
    assert_eq!(ntpdate.get("enabled"), Some(&json!(false)));
    assert_eq!(ntpdate.get("state"), Some(&json!("stopped")));
}

// ============================================================================
// SECTION: Command Probe
// ============================================================================

/// Tests that a non-zero exit is observed rather than raised.
#[test]
fn command_reports_exit_status_and_output() {
    let runner = ScriptedRunner::new().on("/bin/sh -c grep -q foo /etc/x", 1, "", "no match\n");
    let probe = CommandProbe::new(CommandProbeConfig::default(), Arc::new(runner));
    let observation = probe
        .probe(&request(SubjectKind::Command, "grep -q foo /etc/x", &["exit_status", "stderr"]))
        .unwrap();
    assert_eq!(observation.get("exit_status"), Some(&json!(1)));
    assert_eq!(observation.get("stderr"), Some(&json!("no match\n")));
}

/// Tests that per-assertion timeouts are capped by the configured maximum.
#[test]
fn command_timeout_param_is_capped() {
    let runner = Arc::new(ScriptedRunner::new().on("/bin/sh -c true", 0, "", ""));
    let config = CommandProbeConfig {
        max_timeout: Duration::from_secs(2),
        ..CommandProbeConfig::default()
    };
    let probe = CommandProbe::new(config, runner.clone());
    probe
        .probe(&request_with_params(
            SubjectKind::Command,
            "true",
            json!({"timeout_ms": 900_000}),
            &["exit_status"],
        ))
        .unwrap();
    assert_eq!(runner.calls()[0].limits.timeout, Duration::from_secs(2));
}

/// Tests that signal termination reports 128 plus the signal.
#[test]
fn command_signal_maps_to_shell_status() {
    let probe = CommandProbe::new(CommandProbeConfig::default(), Arc::new(Killed));
    let observation =
        probe.probe(&request(SubjectKind::Command, "sleep 100", &["exit_status"])).unwrap();
    assert_eq!(observation.get("exit_status"), Some(&json!(137)));
}

/// Runner whose commands are always killed by SIGKILL.
struct Killed;

impl CommandRunner for Killed {
    fn run(&self, _spec: &CommandSpec) -> Result<CommandOutput, ProbeError> {
        Ok(CommandOutput {
            code: None,
            signal: Some(9),
            ..CommandOutput::default()
        })
    }
}

// ============================================================================
// SECTION: Container Probe
// ============================================================================

/// Inspect command line for `web`.
const INSPECT_WEB: &str = "docker inspect --type container web";

/// Tests that inspect JSON fields are extracted.
#[test]
fn container_reports_state_and_image() {
    let inspect = r#"[{"Id":"abc","State":{"Status":"running","Running":true},"Config":{"Image":"nginx:1.25"}}]"#;
    let runner = ScriptedRunner::new().on(INSPECT_WEB, 0, inspect, "");
    let probe = ContainerProbe::new(ContainerProbeConfig::default(), Arc::new(runner));
    let observation = probe
        .probe(&request(SubjectKind::Container, "web", &["exists", "running", "status", "image"]))
        .unwrap();
    assert_eq!(observation.get("exists"), Some(&json!(true)));
    assert_eq!(observation.get("running"), Some(&json!(true)));
    assert_eq!(observation.get("status"), Some(&json!("running")));
    assert_eq!(observation.get("image"), Some(&json!("nginx:1.25")));
}

/// Tests that an unknown container is observed as absent.
#[test]
fn unknown_container_is_absent() {
    let runner = Arc::new(ScriptedRunner::new().on(
        INSPECT_WEB,
        1,
        "[]\n",
        "Error: No such container: web\n",
    ));
    let probe = ContainerProbe::new(ContainerProbeConfig::default(), runner);
    let observation = probe.probe(&request(SubjectKind::Container, "web", &["exists"])).unwrap();
    assert_eq!(observation.get("exists"), Some(&json!(false)));
    let err = probe.probe(&request(SubjectKind::Container, "web", &["running"])).unwrap_err();
    assert_eq!(err.kind, ProbeErrorKind::NotFound);
}

/// Tests that a daemon failure is an error.
#[test]
fn docker_daemon_failure_is_error() {
    let runner = ScriptedRunner::new().on(
        INSPECT_WEB,
        1,
        "",
        "Cannot connect to the Docker daemon at unix:///var/run/docker.sock\n",
    );
    let probe = ContainerProbe::new(ContainerProbeConfig::default(), Arc::new(runner));
    let err = probe.probe(&request(SubjectKind::Container, "web", &["exists"])).unwrap_err();
    assert_eq!(err.kind, ProbeErrorKind::Io);
}
