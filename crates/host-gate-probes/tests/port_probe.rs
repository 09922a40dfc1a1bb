// crates/host-gate-probes/tests/port_probe.rs
// ============================================================================
// Module: Port Probe Tests
// Description: Listening socket detection over a fake procfs tree.
// Purpose: Verify protocol families, wildcard addresses, and socket states.
// Dependencies: host-gate-core, host-gate-probes, serde_json, tempfile
// ============================================================================
//! ## Overview
//! Socket tables are written in the kernel's text format under a temporary
//! proc root. Addresses are encoded with native byte order, as the kernel
//! prints them.

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

use std::fmt::Write as _;
use std::fs;
use std::net::Ipv4Addr;
use std::net::Ipv6Addr;

use host_gate_core::ProbeErrorKind;
use host_gate_core::Prober;
use host_gate_core::SubjectKind;
use host_gate_probes::PortProbe;
use host_gate_probes::PortProbeConfig;
use serde_json::json;
use tempfile::TempDir;

use crate::common::request;
use crate::common::request_with_params;

/// Socket table header line.
const HEADER: &str = "  sl  local_address rem_address   st tx_queue rx_queue tr tm->when retrnsmt   uid  timeout inode";

/// Encodes an IPv4 address the way procfs prints it.
fn hex_v4(address: Ipv4Addr) -> String {
    format!("{:08X}", u32::from_ne_bytes(address.octets()))
}

/// Encodes an IPv6 address the way procfs prints it.
fn hex_v6(address: Ipv6Addr) -> String {
    let octets = address.octets();
    let mut out = String::new();
    for word in octets.chunks_exact(4) {
        let word = u32::from_ne_bytes([word[0], word[1], word[2], word[3]]);
        write!(out, "{word:08X}").unwrap();
    }
    out
}

/// Renders one socket table row.
fn row(slot: usize, address: &str, port: u16, state: &str) -> String {
    format!("{slot:4}: {address}:{port:04X} 00000000:0000 {state} 00000000:00000000 00:00000000 00000000     0        0 {slot}")
}

/// Builds a proc root with tcp, tcp6 and udp tables (no udp6).
fn proc_root() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    let net = dir.path().join("net");
    fs::create_dir(&net).unwrap();
    let any_v4 = hex_v4(Ipv4Addr::UNSPECIFIED);
    let loopback = hex_v4(Ipv4Addr::LOCALHOST);
    let tcp = [
        HEADER.to_string(),
        row(0, &any_v4, 8080, "0A"),
        row(1, &loopback, 5432, "0A"),
        row(2, &hex_v4(Ipv4Addr::new(10, 0, 0, 5)), 9000, "01"),
    ];
    fs::write(net.join("tcp"), tcp.join("\n") + "\n").unwrap();
    let tcp6 = [HEADER.to_string(), row(0, &hex_v6(Ipv6Addr::UNSPECIFIED), 443, "0A")];
    fs::write(net.join("tcp6"), tcp6.join("\n") + "\n").unwrap();
    let udp = [HEADER.to_string(), row(0, &loopback, 53, "07"), row(1, &any_v4, 8080, "07")];
    fs::write(net.join("udp"), udp.join("\n") + "\n").unwrap();
    dir
}

/// Returns a probe over the fake proc root.
fn probe(root: &TempDir) -> PortProbe {
    PortProbe::new(PortProbeConfig {
        proc_root: root.path().to_path_buf(),
    })
}

/// Probes `listening` with params.
fn listening(root: &TempDir, port: &str, params: serde_json::Value) -> serde_json::Value {
    let observation = probe(root)
        .probe(&request_with_params(SubjectKind::Port, port, params, &["listening"]))
        .unwrap();
    observation.get("listening").cloned().unwrap()
}

// ============================================================================
// SECTION: Tests
// ============================================================================

/// Tests that a wildcard listener serves every IPv4 address.
#[test]
fn wildcard_listener_matches_any_v4_address() {
    let root = proc_root();
    assert_eq!(listening(&root, "8080", json!({})), json!(true));
    assert_eq!(listening(&root, "8080", json!({"address": "10.0.0.5"})), json!(true));
    assert_eq!(listening(&root, "8080", json!({"address": "::1"})), json!(false));
}

/// Tests that loopback listeners only serve loopback.
#[test]
fn loopback_listener_is_address_specific() {
    let root = proc_root();
    assert_eq!(listening(&root, "5432", json!({"address": "127.0.0.1"})), json!(true));
    assert_eq!(listening(&root, "5432", json!({"address": "10.0.0.5"})), json!(false));
}

/// Tests that established connections are not listeners.
#[test]
fn established_socket_is_not_listening() {
    let root = proc_root();
    assert_eq!(listening(&root, "9000", json!({})), json!(false));
}

/// Tests protocol family filtering.
#[test]
fn protocol_param_filters_families() {
    let root = proc_root();
    assert_eq!(listening(&root, "443", json!({"protocol": "tcp"})), json!(true));
    assert_eq!(listening(&root, "443", json!({"protocol": "tcp6"})), json!(true));
    assert_eq!(listening(&root, "443", json!({"protocol": "udp"})), json!(false));
    assert_eq!(listening(&root, "443", json!({"address": "192.168.1.1"})), json!(true));
    assert_eq!(listening(&root, "53", json!({"protocol": "udp"})), json!(true));
    assert_eq!(listening(&root, "53", json!({"protocol": "tcp"})), json!(false));
}

/// Tests the protocol and address summaries.
#[test]
fn reports_protocols_and_addresses() {
    let root = proc_root();
    let observation = probe(&root)
        .probe(&request(SubjectKind::Port, "8080", &["protocols", "addresses"]))
        .unwrap();
    assert_eq!(observation.get("protocols"), Some(&json!(["tcp", "udp"])));
    assert_eq!(observation.get("addresses"), Some(&json!(["0.0.0.0"])));
}

/// Tests that an unused port is not listening.
#[test]
fn unused_port_is_not_listening() {
    let root = proc_root();
    assert_eq!(listening(&root, "8888", json!({"protocol": "tcp"})), json!(false));
}

/// Tests that a non-numeric identifier is rejected.
#[test]
fn invalid_port_identifier_is_error() {
    let root = proc_root();
    let err = probe(&root).probe(&request(SubjectKind::Port, "http", &["listening"])).unwrap_err();
    assert_eq!(err.kind, ProbeErrorKind::InvalidParams);
}
