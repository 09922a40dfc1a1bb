// crates/host-gate-probes/src/port.rs
// ============================================================================
// Module: Port Probe
// Description: Listening socket discovery from procfs socket tables.
// Purpose: Report whether anything listens on a port, and how.
// Dependencies: host-gate-core
// ============================================================================

//! ## Overview
//! The port probe reads `net/tcp`, `net/tcp6`, `net/udp` and `net/udp6`
//! under the configured proc root. TCP sockets count when in `LISTEN`; UDP
//! sockets count when bound and unconnected. The `listening` field honours
//! the optional `protocol` and `address` params, while `protocols` and
//! `addresses` describe every listener on the port.
//!
//! Invariants:
//! - A missing socket table is skipped (the family is not configured).
//! - Wildcard listeners (`0.0.0.0`, `::`) satisfy any requested address of
//!   their reach.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::fs;
use std::net::IpAddr;
use std::net::Ipv4Addr;
use std::net::Ipv6Addr;
use std::path::PathBuf;

use host_gate_core::Observation;
use host_gate_core::ProbeError;
use host_gate_core::ProbeErrorKind;
use host_gate_core::ProbeRequest;
use host_gate_core::Prober;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Socket tables read by the probe, with their listening state code.
const SOCKET_TABLES: [(&str, &str); 4] =
    [("tcp", "0A"), ("tcp6", "0A"), ("udp", "07"), ("udp6", "07")];

/// Configuration for the port probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortProbeConfig {
    /// Root of the procfs mount.
    pub proc_root: PathBuf,
}

impl Default for PortProbeConfig {
    fn default() -> Self {
        Self {
            proc_root: PathBuf::from("/proc"),
        }
    }
}

// ============================================================================
// SECTION: Probe Implementation
// ============================================================================

/// One listening socket.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Listener {
    /// Socket table the entry came from.
    family: &'static str,
    /// Local bound address.
    address: IpAddr,
}

impl Listener {
    /// Returns true when the listener matches the protocol filter.
    fn matches_protocol(&self, protocol: Option<&str>) -> bool {
        match protocol {
            None => true,
            Some("tcp") => self.family.starts_with("tcp"),
            Some("udp") => self.family.starts_with("udp"),
            Some(exact) => self.family == exact,
        }
    }

    /// Returns true when the listener accepts traffic for the address.
    fn serves(&self, wanted: IpAddr) -> bool {
        if self.address == wanted {
            return true;
        }
        match self.address {
            IpAddr::V4(bound) => bound.is_unspecified() && wanted.is_ipv4(),
            IpAddr::V6(bound) => bound.is_unspecified(),
        }
    }
}

/// Probe for listening ports.
pub struct PortProbe {
    /// Probe configuration.
    config: PortProbeConfig,
}

impl PortProbe {
    /// Creates a port probe.
    #[must_use]
    pub const fn new(config: PortProbeConfig) -> Self {
        Self {
            config,
        }
    }

    /// Collects every listener bound to the port.
    fn listeners(&self, port: u16) -> Result<Vec<Listener>, ProbeError> {
        let mut listeners = Vec::new();
        for (family, listen_state) in SOCKET_TABLES {
            let path = self.config.proc_root.join("net").join(family);
            let table = match fs::read_to_string(&path) {
                Ok(table) => table,
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => continue,
                Err(err) => return Err(ProbeError::from_io(&path.display().to_string(), &err)),
            };
            for line in table.lines().skip(1) {
                let Some(entry) = parse_socket_line(line) else {
                    continue;
                };
                if entry.port == port && entry.state == listen_state {
                    listeners.push(Listener {
                        family,
                        address: entry.address,
                    });
                }
            }
        }
        Ok(listeners)
    }
}

impl Prober for PortProbe {
    fn probe(&self, request: &ProbeRequest) -> Result<Observation, ProbeError> {
        let subject = &request.subject;
        let port = subject.identifier.parse::<u16>().ok().filter(|port| *port != 0).ok_or_else(|| {
            ProbeError::new(
                ProbeErrorKind::InvalidParams,
                format!("invalid port identifier: {}", subject.identifier),
            )
        })?;
        let address = subject
            .param_str("address")
            .map(|raw| {
                raw.parse::<IpAddr>().map_err(|_| {
                    ProbeError::new(ProbeErrorKind::InvalidParams, format!("invalid address: {raw}"))
                })
            })
            .transpose()?;
        let protocol = subject.param_str("protocol");

        let listeners = self.listeners(port)?;
        let mut observation = Observation::new();
        if request.wants("listening") {
            let listening = listeners.iter().any(|listener| {
                listener.matches_protocol(protocol)
                    && address.is_none_or(|wanted| listener.serves(wanted))
            });
            observation.insert("listening", listening);
        }
        if request.wants("protocols") {
            let families: BTreeSet<&str> = listeners.iter().map(|listener| listener.family).collect();
            observation.insert("protocols", families.into_iter().collect::<Vec<_>>());
        }
        if request.wants("addresses") {
            let addresses: BTreeSet<String> =
                listeners.iter().map(|listener| listener.address.to_string()).collect();
            observation.insert("addresses", addresses.into_iter().collect::<Vec<_>>());
        }
        Ok(observation)
    }
}

// ============================================================================
// SECTION: Socket Table Parsing
// ============================================================================

/// Parsed fields of one socket table row.
struct SocketEntry {
    /// Local address.
    address: IpAddr,
    /// Local port.
    port: u16,
    /// Hex socket state code.
    state: String,
}

/// Parses `sl local_address rem_address st ...`.
fn parse_socket_line(line: &str) -> Option<SocketEntry> {
    let mut columns = line.split_whitespace();
    let _slot = columns.next()?;
    let local = columns.next()?;
    let _remote = columns.next()?;
    let state = columns.next()?;
    let (address, port) = local.split_once(':')?;
    Some(SocketEntry {
        address: parse_hex_address(address)?,
        port: u16::from_str_radix(port, 16).ok()?,
        state: state.to_ascii_uppercase(),
    })
}

/// Decodes a procfs hex address.
///
/// The kernel prints each 32-bit word in host byte order, so the bytes of
/// every word are recovered with native-endian conversion.
fn parse_hex_address(hex: &str) -> Option<IpAddr> {
    match hex.len() {
        8 => {
            let word = u32::from_str_radix(hex, 16).ok()?;
            Some(IpAddr::V4(Ipv4Addr::from(word.to_ne_bytes())))
        }
        32 => {
            let mut bytes = [0u8; 16];
            for (index, chunk) in bytes.chunks_exact_mut(4).enumerate() {
                let start = index * 8;
                let word = u32::from_str_radix(hex.get(start .. start + 8)?, 16).ok()?;
                chunk.copy_from_slice(&word.to_ne_bytes());
            }
            Some(IpAddr::V6(Ipv6Addr::from(bytes)))
        }
        _ => None,
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
