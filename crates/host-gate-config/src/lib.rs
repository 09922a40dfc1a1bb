// crates/host-gate-config/src/lib.rs
// ============================================================================
// Module: Host Gate Config Library
// Description: Canonical config model, validation, and suite loading.
// Purpose: Single source of truth for host-gate.toml and suite file semantics.
// Dependencies: host-gate-core, host-gate-probes, serde, toml, serde_yaml
// ============================================================================

//! ## Overview
//! `host-gate-config` defines the configuration model for Host Gate and the
//! loaders for suite files. Both fail closed: oversized, non-UTF-8, or
//! out-of-range input is rejected before any probe runs.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;
pub mod suites;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
pub use suites::*;
