// crates/host-gate-probes/src/lib.rs
// ============================================================================
// Module: Host Gate Probes
// Description: Built-in resource probes and registry utilities.
// Purpose: Observe live host state for Host Gate assertions.
// Dependencies: host-gate-core, serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! This crate ships the built-in resource probes (package, service, file,
//! port, command, container) and a registry that routes probe requests by
//! subject kind. Probes are read-only: they query package databases, init
//! systems, the filesystem, procfs and the Docker CLI, and never change them.
//! Invariants:
//! - Probe requests are routed via [`ProbeRegistry`] by subject kind.
//! - Process-backed probes run under [`ExecLimits`] and fail closed on
//!   timeout or oversized output.
//! - Failing to query the host is a [`host_gate_core::ProbeError`], never a
//!   silent `false`.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod command;
pub mod container;
pub mod file;
pub mod package;
pub mod port;
pub mod process;
pub mod registry;
pub mod service;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use command::CommandProbe;
pub use command::CommandProbeConfig;
pub use container::ContainerProbe;
pub use container::ContainerProbeConfig;
pub use file::FileProbe;
pub use file::FileProbeConfig;
pub use package::PackageManager;
pub use package::PackageProbe;
pub use package::PackageProbeConfig;
pub use port::PortProbe;
pub use port::PortProbeConfig;
pub use process::CommandOutput;
pub use process::CommandRunner;
pub use process::CommandSpec;
pub use process::ExecLimits;
pub use process::SystemCommandRunner;
pub use registry::BuiltinProbeConfigs;
pub use registry::ProbeAccessPolicy;
pub use registry::ProbeRegistry;
pub use registry::RegistryError;
pub use service::ServiceManager;
pub use service::ServiceProbe;
pub use service::ServiceProbeConfig;
