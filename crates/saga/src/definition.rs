//! Validated pairing of a step graph with its handlers.

use crate::error::DefinitionError;
use crate::graph::StepGraph;
use crate::registry::ActionRegistry;
use crate::workflow::{Phase, StepId, Workflow};

/// Immutable definition of an operation, shared by all of its executions.
pub struct OperationDefinition<W: Workflow> {
    graph: StepGraph<W::Step>,
    registry: ActionRegistry<W>,
}

impl<W: Workflow> OperationDefinition<W> {
    /// Builds a definition, checking that graph and registry agree.
    ///
    /// Fails if a step has no invoke handler, a compensable step has no
    /// compensate handler, a handler targets a step outside the graph, a
    /// declared dependency is not a saved ancestor, or the terminal step does
    /// not save its response.
    pub fn new(
        graph: StepGraph<W::Step>,
        registry: ActionRegistry<W>,
    ) -> Result<Self, DefinitionError> {
        for &step in graph.steps() {
            if !registry.has(step, Phase::Invoke) {
                return Err(DefinitionError::MissingInvokeHandler(step.as_str()));
            }
            if graph.requires_compensation(step) && !registry.has(step, Phase::Compensate) {
                return Err(DefinitionError::MissingCompensationHandler(step.as_str()));
            }
            for &dependency in W::dependencies(step) {
                if !graph.is_ancestor(dependency, step) || !graph.saves_response(dependency) {
                    return Err(DefinitionError::UnsatisfiedDependency {
                        step: step.as_str(),
                        requires: dependency.as_str(),
                    });
                }
            }
        }

        if let Some(step) = registry.steps().find(|step| !graph.contains(*step)) {
            return Err(DefinitionError::UnknownAction(step.as_str()));
        }

        let terminal = graph.terminal();
        if !graph.saves_response(terminal) {
            return Err(DefinitionError::TerminalNotSaved(terminal.as_str()));
        }

        Ok(Self { graph, registry })
    }

    /// Returns the operation name.
    pub fn name(&self) -> &'static str {
        W::NAME
    }

    /// Returns the step graph.
    pub fn graph(&self) -> &StepGraph<W::Step> {
        &self.graph
    }

    /// Returns the handler table.
    pub fn registry(&self) -> &ActionRegistry<W> {
        &self.registry
    }
}

impl<W: Workflow> std::fmt::Debug for OperationDefinition<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperationDefinition")
            .field("name", &W::NAME)
            .field("steps", &self.graph.steps())
            .field("registry", &self.registry)
            .finish()
    }
}
