// crates/host-gate-core/src/lib.rs
// ============================================================================
// Module: Host Gate Core Library
// Description: Public API surface for the Host Gate core.
// Purpose: Expose core types, interfaces, and runtime helpers.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! Host Gate core evaluates declarative assertions about host state. It owns
//! the assertion and report model, the matcher engine, and the sequential
//! suite runner, and it reaches the host only through the [`Prober`]
//! interface so probes and test fakes are interchangeable.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use crate::core::*;

pub use interfaces::Prober;
pub use runtime::Evaluation;
pub use runtime::FileRunEventSink;
pub use runtime::Matcher;
pub use runtime::NoopRunEventSink;
pub use runtime::RunError;
pub use runtime::RunEvent;
pub use runtime::RunEventSink;
pub use runtime::StderrRunEventSink;
pub use runtime::SuiteRunner;
