// crates/host-gate-probes/src/registry.rs
// ============================================================================
// Module: Probe Registry
// Description: Registry for built-in and custom resource probes.
// Purpose: Route probe requests by subject kind with policy checks.
// Dependencies: host-gate-core, thiserror
// ============================================================================

//! ## Overview
//! The probe registry resolves requests by subject kind and enforces
//! allowlist and denylist policies. It implements the core
//! [`host_gate_core::Prober`] interface, so the suite runner sees one prober
//! regardless of how many kinds are registered.
//!
//! Invariants:
//! - Each subject kind has at most one registered probe.
//! - Access policy is checked on every request and during suite preflight.
//! - Requested fields must belong to the kind's catalog before a probe runs.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::sync::Arc;

use host_gate_core::Observation;
use host_gate_core::ProbeError;
use host_gate_core::ProbeErrorKind;
use host_gate_core::ProbeMissingError;
use host_gate_core::ProbeRequest;
use host_gate_core::Prober;
use host_gate_core::SubjectKind;
use host_gate_core::SuiteSpec;
use host_gate_core::field_spec;
use thiserror::Error;

use crate::CommandProbe;
use crate::CommandProbeConfig;
use crate::ContainerProbe;
use crate::ContainerProbeConfig;
use crate::FileProbe;
use crate::FileProbeConfig;
use crate::PackageProbe;
use crate::PackageProbeConfig;
use crate::PortProbe;
use crate::PortProbeConfig;
use crate::ServiceProbe;
use crate::ServiceProbeConfig;
use crate::process::CommandRunner;
use crate::process::SystemCommandRunner;

// ============================================================================
// SECTION: Built-in Config
// ============================================================================

/// Configuration bundle for built-in probes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuiltinProbeConfigs {
    /// Configuration for the package probe.
    pub package: PackageProbeConfig,
    /// Configuration for the service probe.
    pub service: ServiceProbeConfig,
    /// Configuration for the file probe.
    pub file: FileProbeConfig,
    /// Configuration for the port probe.
    pub port: PortProbeConfig,
    /// Configuration for the command probe.
    pub command: CommandProbeConfig,
    /// Configuration for the container probe.
    pub container: ContainerProbeConfig,
}

// ============================================================================
// SECTION: Access Policy
// ============================================================================

/// Access policy controlling which subject kinds may be probed.
///
/// # Invariants
/// - `denylist` overrides `allowlist` when both are present.
/// - If `allowlist` is `None`, all kinds are allowed unless denied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProbeAccessPolicy {
    /// Optional allowlist of subject kinds.
    pub allowlist: Option<BTreeSet<SubjectKind>>,
    /// Explicit denylist of subject kinds.
    pub denylist: BTreeSet<SubjectKind>,
}

impl ProbeAccessPolicy {
    /// Returns a policy that permits all kinds.
    #[must_use]
    pub const fn allow_all() -> Self {
        Self {
            allowlist: None,
            denylist: BTreeSet::new(),
        }
    }

    /// Returns true when the kind is allowed by policy.
    #[must_use]
    pub fn is_allowed(&self, kind: SubjectKind) -> bool {
        if self.denylist.contains(&kind) {
            return false;
        }
        self.allowlist.as_ref().is_none_or(|allowlist| allowlist.contains(&kind))
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while assembling a registry.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// A probe is already registered for the kind.
    #[error("probe already registered: {0}")]
    Duplicate(SubjectKind),
}

// ============================================================================
// SECTION: Probe Registry
// ============================================================================

/// Resource probe registry with policy enforcement.
pub struct ProbeRegistry {
    /// Probe implementations keyed by subject kind.
    probes: BTreeMap<SubjectKind, Box<dyn Prober + Send + Sync>>,
    /// Access control policy for probe usage.
    policy: ProbeAccessPolicy,
}

impl ProbeRegistry {
    /// Creates an empty registry with the provided policy.
    #[must_use]
    pub fn new(policy: ProbeAccessPolicy) -> Self {
        Self {
            probes: BTreeMap::new(),
            policy,
        }
    }

    /// Creates a registry with every built-in probe backed by host processes.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] when registration fails.
    pub fn with_builtin_probes(
        configs: BuiltinProbeConfigs,
        policy: ProbeAccessPolicy,
    ) -> Result<Self, RegistryError> {
        Self::with_builtin_probes_and_runner(configs, policy, Arc::new(SystemCommandRunner))
    }

    /// Creates a registry with every built-in probe using the given runner.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] when registration fails.
    pub fn with_builtin_probes_and_runner(
        configs: BuiltinProbeConfigs,
        policy: ProbeAccessPolicy,
        runner: Arc<dyn CommandRunner>,
    ) -> Result<Self, RegistryError> {
        let mut registry = Self::new(policy);
        registry.register_probe(
            SubjectKind::Package,
            PackageProbe::new(configs.package, Arc::clone(&runner)),
        )?;
        registry.register_probe(
            SubjectKind::Service,
            ServiceProbe::new(configs.service, Arc::clone(&runner)),
        )?;
        registry.register_probe(SubjectKind::File, FileProbe::new(configs.file))?;
        registry.register_probe(SubjectKind::Port, PortProbe::new(configs.port))?;
        registry.register_probe(
            SubjectKind::Command,
            CommandProbe::new(configs.command, Arc::clone(&runner)),
        )?;
        registry
            .register_probe(SubjectKind::Container, ContainerProbe::new(configs.container, runner))?;
        Ok(registry)
    }

    /// Registers a probe for a subject kind.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Duplicate`] when the kind is already registered.
    pub fn register_probe(
        &mut self,
        kind: SubjectKind,
        probe: impl Prober + Send + Sync + 'static,
    ) -> Result<(), RegistryError> {
        if self.probes.contains_key(&kind) {
            return Err(RegistryError::Duplicate(kind));
        }
        self.probes.insert(kind, Box::new(probe));
        Ok(())
    }

    /// Returns the configured policy.
    #[must_use]
    pub const fn policy(&self) -> &ProbeAccessPolicy {
        &self.policy
    }
}

impl Prober for ProbeRegistry {
    fn probe(&self, request: &ProbeRequest) -> Result<Observation, ProbeError> {
        let kind = request.subject.kind;
        if !self.policy.is_allowed(kind) {
            return Err(ProbeError::new(
                ProbeErrorKind::PolicyDenied,
                format!("probe blocked by policy: {kind}"),
            ));
        }
        let Some(probe) = self.probes.get(&kind) else {
            return Err(ProbeError::new(
                ProbeErrorKind::Unsupported,
                format!("probe not registered: {kind}"),
            ));
        };
        if let Some(unknown) = request.fields.iter().find(|field| field_spec(kind, field).is_none()) {
            return Err(ProbeError::new(
                ProbeErrorKind::InvalidParams,
                format!("unknown {kind} field: {unknown}"),
            ));
        }
        probe.probe(request)
    }

    fn validate_suite(&self, suite: &SuiteSpec) -> Result<(), ProbeMissingError> {
        let mut missing = BTreeSet::new();
        let mut blocked_by_policy = false;

        for assertion in &suite.assertions {
            let kind = assertion.subject.kind;
            let exists = self.probes.contains_key(&kind);
            let allowed = self.policy.is_allowed(kind);
            if !exists || !allowed {
                missing.insert(kind.as_str().to_string());
                if exists && !allowed {
                    blocked_by_policy = true;
                }
            }
        }

        if missing.is_empty() {
            for probe in self.probes.values() {
                probe.validate_suite(suite)?;
            }
            return Ok(());
        }

        Err(ProbeMissingError {
            missing_kinds: missing.into_iter().collect(),
            blocked_by_policy,
        })
    }
}
