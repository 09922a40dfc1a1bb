// crates/host-gate-core/src/runtime/mod.rs
// ============================================================================
// Module: Host Gate Runtime
// Description: Matcher engine, suite runner, and run events.
// Purpose: Evaluate suites against a probe backend.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! The runtime turns a validated suite plus a [`crate::Prober`] into a
//! [`crate::Report`]. Evaluation is sequential and deterministic for a
//! deterministic prober.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod events;
pub mod matcher;
pub mod runner;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use events::FileRunEventSink;
pub use events::NoopRunEventSink;
pub use events::RunEvent;
pub use events::RunEventSink;
pub use events::StderrRunEventSink;
pub use matcher::Evaluation;
pub use matcher::Matcher;
pub use runner::RunError;
pub use runner::SuiteRunner;
pub use runner::evaluate_assertion;
