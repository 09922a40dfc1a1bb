// crates/host-gate-cli/src/lib.rs
// ============================================================================
// Module: Host Gate CLI Library
// Description: Shared helpers for the Host Gate command-line interface.
// Purpose: Provide reusable components (i18n, report rendering) for the binary and tests.
// Dependencies: host-gate-core, serde, serde_jcs
// ============================================================================

//! ## Overview
//! This library houses the CLI message catalog and the report renderers. The
//! binary entry point (`src/main.rs`) imports these helpers to keep all
//! user-facing output consistent.

// ============================================================================
// SECTION: Modules
// ============================================================================

/// Internationalization helpers and message catalog.
pub mod i18n;
/// Text and JSON report rendering.
pub mod render;
