//! Saga-style workflow orchestration.
//!
//! An operation is described by a tree of steps ([`StepGraph`]) and a table
//! of handlers ([`ActionRegistry`]). Each step has an invoke action and,
//! unless marked otherwise, a compensating action. The [`SagaCoordinator`]
//! runs the tree forward, starting sibling branches concurrently; if any
//! invoke fails, every completed step is compensated in reverse completion
//! order and the caller receives the original failure together with a
//! [`RollbackReport`].
//!
//! Steps that depend on an optional collaborator consult a
//! [`CapabilityGuard`] and become no-ops in both phases when it is absent.

pub mod capability;
pub mod coordinator;
pub mod definition;
pub mod error;
pub mod events;
pub mod graph;
pub mod record;
pub mod registry;
pub mod runtime;
pub mod state;
pub mod workflow;

#[cfg(test)]
mod testing;

pub use capability::{CapabilityGuard, CapabilityProbe, StaticCapabilities};
pub use coordinator::SagaCoordinator;
pub use definition::OperationDefinition;
pub use error::{ActionError, CompensationFailure, DefinitionError, RollbackReport, SagaError};
pub use events::TransactionEvent;
pub use graph::{Next, StepGraph, StepNode};
pub use record::TransactionRecord;
pub use registry::{ActionRegistry, ActionRegistryBuilder, Compensate, Compensation, Invoke};
pub use runtime::{TransactionResult, TransactionState};
pub use state::{StepStatus, TransactionStatus};
pub use workflow::{Phase, StepId, Workflow};
