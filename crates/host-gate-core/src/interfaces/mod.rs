// crates/host-gate-core/src/interfaces/mod.rs
// ============================================================================
// Module: Host Gate Interfaces
// Description: Backend-agnostic probe interface.
// Purpose: Define the contract between the runner and host probes.
// Dependencies: crate::core
// ============================================================================

//! ## Overview
//! The runner depends only on [`Prober`]; concrete probes, registries, and
//! test fakes all implement it. Implementations must be read-only with
//! respect to host state and must report every requested field or fail.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::core::Observation;
use crate::core::ProbeError;
use crate::core::ProbeMissingError;
use crate::core::ProbeRequest;
use crate::core::SuiteSpec;

// ============================================================================
// SECTION: Prober
// ============================================================================

/// Read-only source of host state.
pub trait Prober {
    /// Observes the requested fields of a subject.
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError`] when the host cannot be queried or the subject
    /// is absent and the requested fields require it.
    fn probe(&self, request: &ProbeRequest) -> Result<Observation, ProbeError>;

    /// Validates that every subject kind referenced by the suite can be served.
    ///
    /// Single-kind probes accept any suite; registries override this to
    /// report missing or blocked kinds.
    ///
    /// # Errors
    ///
    /// Returns [`ProbeMissingError`] when required probes are missing or blocked.
    fn validate_suite(&self, suite: &SuiteSpec) -> Result<(), ProbeMissingError> {
        let _ = suite;
        Ok(())
    }
}
