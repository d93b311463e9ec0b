//! Skip policy for steps backed by optional collaborators.

use std::collections::HashSet;
use std::sync::Arc;

/// Reports whether an optional collaborator is installed.
pub trait CapabilityProbe: Send + Sync {
    /// Returns true if the named capability can be used.
    fn is_available(&self, capability: &str) -> bool;
}

/// A fixed set of available capabilities.
#[derive(Debug, Clone, Default)]
pub struct StaticCapabilities {
    available: HashSet<String>,
}

impl StaticCapabilities {
    /// Creates an empty set: every capability is unavailable.
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks a capability as available.
    pub fn with(mut self, capability: impl Into<String>) -> Self {
        self.available.insert(capability.into());
        self
    }
}

impl CapabilityProbe for StaticCapabilities {
    fn is_available(&self, capability: &str) -> bool {
        self.available.contains(capability)
    }
}

/// Decides, per phase call, whether a guarded step becomes a no-op.
///
/// The probe is consulted on every call; nothing is cached between the
/// invoke and compensate phases.
#[derive(Clone)]
pub struct CapabilityGuard {
    probe: Arc<dyn CapabilityProbe>,
}

impl CapabilityGuard {
    /// Creates a guard backed by the given probe.
    pub fn new(probe: impl CapabilityProbe + 'static) -> Self {
        Self {
            probe: Arc::new(probe),
        }
    }

    /// Creates a guard from a shared probe.
    pub fn from_shared(probe: Arc<dyn CapabilityProbe>) -> Self {
        Self { probe }
    }

    /// Returns true if the capability is available.
    pub fn is_available(&self, capability: &str) -> bool {
        self.probe.is_available(capability)
    }

    /// Returns true, and warns, if `step` must be skipped.
    pub fn should_skip(&self, capability: &str, step: &str) -> bool {
        if self.probe.is_available(capability) {
            return false;
        }
        tracing::warn!(
            capability,
            step,
            "capability '{capability}' is not available; step '{step}' will be skipped"
        );
        metrics::counter!("saga_capability_skips_total", "capability" => capability.to_string())
            .increment(1);
        true
    }
}

impl std::fmt::Debug for CapabilityGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapabilityGuard").finish_non_exhaustive()
    }
}
