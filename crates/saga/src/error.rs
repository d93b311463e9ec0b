//! Saga error types.

use common::TransactionId;
use thiserror::Error;

use crate::events::TransactionEvent;
use crate::state::TransactionStatus;
use crate::workflow::Phase;

/// A failure reported by a step's invoke or compensate handler.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError {
    /// The operation input was rejected.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A collaborator service reported a failure.
    #[error("{service} service error: {reason}")]
    Collaborator {
        service: &'static str,
        reason: String,
    },

    /// A step read a result that an earlier step did not save.
    #[error("Result of step '{0}' is not available")]
    MissingResult(&'static str),

    /// No handler is registered for the requested phase.
    #[error("No {phase} handler registered for step '{step}'")]
    NotRegistered { step: &'static str, phase: Phase },

    /// Any other domain failure.
    #[error("{0}")]
    Failed(String),
}

/// Integrity errors raised while building an operation definition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DefinitionError {
    /// The step tree has no root.
    #[error("Step graph is empty")]
    EmptyGraph,

    /// The step tree must have exactly one root.
    #[error("Step graph has {0} roots, expected exactly one")]
    MultipleRoots(usize),

    /// A step identifier appears more than once in the tree.
    #[error("Step '{0}' appears more than once in the step graph")]
    DuplicateAction(&'static str),

    /// A handler was registered twice for the same phase.
    #[error("Step '{step}' has more than one {phase} handler")]
    DuplicateHandler { step: &'static str, phase: Phase },

    /// A step in the graph has no invoke handler.
    #[error("Step '{0}' has no invoke handler")]
    MissingInvokeHandler(&'static str),

    /// A compensable step has no compensate handler.
    #[error("Step '{0}' requires compensation but has no compensate handler")]
    MissingCompensationHandler(&'static str),

    /// A handler was registered for a step that is not in the graph.
    #[error("Handler registered for step '{0}' which is not in the step graph")]
    UnknownAction(&'static str),

    /// A step reads a result that no ancestor saves.
    #[error("Step '{step}' reads the result of '{requires}', which is not a saved ancestor")]
    UnsatisfiedDependency {
        step: &'static str,
        requires: &'static str,
    },

    /// The terminal step must save its response.
    #[error("Terminal step '{0}' does not save its response")]
    TerminalNotSaved(&'static str),
}

/// A compensate handler that failed during rollback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompensationFailure {
    /// The step whose compensation failed.
    pub step: &'static str,
    /// The reported failure.
    pub error: ActionError,
}

/// Outcome of the backward pass.
#[derive(Debug, Clone)]
pub struct RollbackReport {
    /// `Compensated` or `CompensationFailed`.
    pub status: TransactionStatus,
    /// Steps whose invoke phase had completed, in completion order.
    pub completed_steps: Vec<&'static str>,
    /// Steps compensated successfully, in the order compensation ran.
    pub compensated: Vec<&'static str>,
    /// Completed steps exempt from compensation or with nothing to undo.
    pub skipped: Vec<&'static str>,
    /// Compensations that failed; the walk continued past each of them.
    pub failures: Vec<CompensationFailure>,
    /// Full journal of the execution.
    pub events: Vec<TransactionEvent>,
}

impl RollbackReport {
    /// Returns true if every attempted compensation succeeded.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

impl std::fmt::Display for RollbackReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.failures.is_empty() {
            return write!(f, "compensated {} step(s)", self.compensated.len());
        }
        let failed: Vec<&str> = self.failures.iter().map(|failure| failure.step).collect();
        write!(
            f,
            "compensation failed for {} of {} step(s): {}",
            failed.len(),
            failed.len() + self.compensated.len(),
            failed.join(", ")
        )
    }
}

/// Errors returned by a saga execution.
#[derive(Debug, Error)]
pub enum SagaError {
    /// A step's invoke handler failed and the completed steps were unwound.
    #[error("Saga step '{step}' failed: {source} ({rollback})")]
    StepFailed {
        transaction_id: TransactionId,
        step: &'static str,
        source: ActionError,
        rollback: RollbackReport,
    },

    /// Every step succeeded but the terminal result was not recorded.
    #[error("Operation '{operation}' finished without a response from step '{terminal}'")]
    MissingResponse {
        transaction_id: TransactionId,
        operation: &'static str,
        terminal: &'static str,
    },
}

impl SagaError {
    /// Returns the transaction this error belongs to.
    pub fn transaction_id(&self) -> TransactionId {
        match self {
            SagaError::StepFailed { transaction_id, .. }
            | SagaError::MissingResponse { transaction_id, .. } => *transaction_id,
        }
    }

    /// Returns the step whose failure triggered the rollback, if any.
    pub fn failed_step(&self) -> Option<&'static str> {
        match self {
            SagaError::StepFailed { step, .. } => Some(step),
            SagaError::MissingResponse { .. } => None,
        }
    }

    /// Returns the rollback report, if a rollback ran.
    pub fn rollback(&self) -> Option<&RollbackReport> {
        match self {
            SagaError::StepFailed { rollback, .. } => Some(rollback),
            SagaError::MissingResponse { .. } => None,
        }
    }
}

/// Convenience type alias for saga results.
pub type Result<T> = std::result::Result<T, SagaError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn report(failures: Vec<CompensationFailure>) -> RollbackReport {
        RollbackReport {
            status: if failures.is_empty() {
                TransactionStatus::Compensated
            } else {
                TransactionStatus::CompensationFailed
            },
            completed_steps: vec!["a", "b", "c"],
            compensated: vec!["c", "a"],
            skipped: vec![],
            failures,
            events: vec![],
        }
    }

    #[test]
    fn test_report_display_complete() {
        let report = report(vec![]);
        assert!(report.is_complete());
        assert_eq!(report.to_string(), "compensated 2 step(s)");
    }

    #[test]
    fn test_report_display_partial() {
        let report = report(vec![CompensationFailure {
            step: "b",
            error: ActionError::Failed("timeout".into()),
        }]);
        assert!(!report.is_complete());
        assert_eq!(report.to_string(), "compensation failed for 1 of 3 step(s): b");
    }

    #[test]
    fn test_step_failed_message_and_source() {
        let err = SagaError::StepFailed {
            transaction_id: TransactionId::new(),
            step: "charge",
            source: ActionError::Collaborator {
                service: "payment",
                reason: "declined".into(),
            },
            rollback: report(vec![]),
        };
        assert_eq!(
            err.to_string(),
            "Saga step 'charge' failed: payment service error: declined (compensated 2 step(s))"
        );
        assert_eq!(err.failed_step(), Some("charge"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_missing_response_has_no_rollback() {
        let err = SagaError::MissingResponse {
            transaction_id: TransactionId::new(),
            operation: "op",
            terminal: "done",
        };
        assert!(err.rollback().is_none());
        assert!(err.failed_step().is_none());
    }
}
