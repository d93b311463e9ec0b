//! Handler table keyed by step identifier and phase.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{ActionError, DefinitionError};
use crate::workflow::{Phase, StepId, Workflow};

/// Forward action of a step.
#[async_trait]
pub trait Invoke<W: Workflow>: Send + Sync {
    /// Runs the step and returns its result.
    async fn invoke(&self, input: &W::Input, context: &W::Context)
    -> Result<W::Output, ActionError>;
}

/// What a compensate handler did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compensation {
    /// The step's effect was reversed.
    Undone,
    /// There was nothing to reverse, e.g. the invoke phase was a guarded no-op.
    Skipped,
}

/// Undo action of a step.
#[async_trait]
pub trait Compensate<W: Workflow>: Send + Sync {
    /// Reverses the effect of a completed invoke.
    async fn compensate(&self, input: &W::Input, context: &W::Context)
    -> Result<Compensation, ActionError>;
}

struct Handlers<W: Workflow> {
    invoke: Option<Arc<dyn Invoke<W>>>,
    compensate: Option<Arc<dyn Compensate<W>>>,
}

impl<W: Workflow> Default for Handlers<W> {
    fn default() -> Self {
        Self {
            invoke: None,
            compensate: None,
        }
    }
}

/// Immutable mapping from `(step, phase)` to a handler.
///
/// Holds no execution state, so one registry serves concurrent executions.
pub struct ActionRegistry<W: Workflow> {
    handlers: HashMap<W::Step, Handlers<W>>,
}

impl<W: Workflow> ActionRegistry<W> {
    /// Starts building a registry.
    pub fn builder() -> ActionRegistryBuilder<W> {
        ActionRegistryBuilder {
            handlers: HashMap::new(),
            duplicate: None,
        }
    }

    /// Returns true if a handler is registered for the phase.
    pub fn has(&self, step: W::Step, phase: Phase) -> bool {
        self.handlers.get(&step).is_some_and(|h| match phase {
            Phase::Invoke => h.invoke.is_some(),
            Phase::Compensate => h.compensate.is_some(),
        })
    }

    /// Returns every step with at least one handler.
    pub fn steps(&self) -> impl Iterator<Item = W::Step> + '_ {
        self.handlers.keys().copied()
    }

    /// Looks up the invoke handler of a step.
    pub fn invoker(&self, step: W::Step) -> Result<&dyn Invoke<W>, ActionError> {
        self.handlers
            .get(&step)
            .and_then(|h| h.invoke.as_deref())
            .ok_or(ActionError::NotRegistered {
                step: step.as_str(),
                phase: Phase::Invoke,
            })
    }

    /// Looks up the compensate handler of a step.
    pub fn compensator(&self, step: W::Step) -> Result<&dyn Compensate<W>, ActionError> {
        self.handlers
            .get(&step)
            .and_then(|h| h.compensate.as_deref())
            .ok_or(ActionError::NotRegistered {
                step: step.as_str(),
                phase: Phase::Compensate,
            })
    }
}

impl<W: Workflow> std::fmt::Debug for ActionRegistry<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut map = f.debug_map();
        for (step, h) in &self.handlers {
            map.entry(
                &step.as_str(),
                &(h.invoke.is_some(), h.compensate.is_some()),
            );
        }
        map.finish()
    }
}

/// Builder for [`ActionRegistry`].
pub struct ActionRegistryBuilder<W: Workflow> {
    handlers: HashMap<W::Step, Handlers<W>>,
    duplicate: Option<(W::Step, Phase)>,
}

impl<W: Workflow> ActionRegistryBuilder<W> {
    /// Registers the invoke handler of a step.
    pub fn invoke(mut self, step: W::Step, handler: impl Invoke<W> + 'static) -> Self {
        self.set_invoke(step, Arc::new(handler));
        self
    }

    /// Registers the compensate handler of a step.
    pub fn compensate(mut self, step: W::Step, handler: impl Compensate<W> + 'static) -> Self {
        self.set_compensate(step, Arc::new(handler));
        self
    }

    /// Registers one handler for both phases of a step.
    pub fn action<H>(mut self, step: W::Step, handler: H) -> Self
    where
        H: Invoke<W> + Compensate<W> + 'static,
    {
        let handler = Arc::new(handler);
        self.set_invoke(step, handler.clone());
        self.set_compensate(step, handler);
        self
    }

    /// Finishes the registry; fails if a phase was registered twice.
    pub fn build(self) -> Result<ActionRegistry<W>, DefinitionError> {
        if let Some((step, phase)) = self.duplicate {
            return Err(DefinitionError::DuplicateHandler {
                step: step.as_str(),
                phase,
            });
        }
        Ok(ActionRegistry {
            handlers: self.handlers,
        })
    }

    fn set_invoke(&mut self, step: W::Step, handler: Arc<dyn Invoke<W>>) {
        let slot = &mut self.handlers.entry(step).or_default().invoke;
        if slot.replace(handler).is_some() {
            self.duplicate.get_or_insert((step, Phase::Invoke));
        }
    }

    fn set_compensate(&mut self, step: W::Step, handler: Arc<dyn Compensate<W>>) {
        let slot = &mut self.handlers.entry(step).or_default().compensate;
        if slot.replace(handler).is_some() {
            self.duplicate.get_or_insert((step, Phase::Compensate));
        }
    }
}
