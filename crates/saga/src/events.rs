//! Execution journal events.

use chrono::{DateTime, Utc};
use common::TransactionId;
use serde::{Deserialize, Serialize};

/// Facts recorded while a transaction executes.
///
/// The journal is append-only; folding it with
/// [`TransactionRecord::apply`](crate::record::TransactionRecord::apply)
/// reproduces the outcome of the execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum TransactionEvent {
    /// Execution started.
    TransactionStarted(TransactionStartedData),

    /// A step's invoke handler was called.
    StepStarted(StepData),

    /// A step's invoke handler succeeded.
    StepCompleted(StepCompletedData),

    /// A step's invoke handler failed.
    StepFailed(StepFailedData),

    /// A step was not started because the execution had already failed.
    StepNotStarted(StepData),

    /// The backward pass started.
    CompensationStarted(CompensationData),

    /// A step was compensated successfully.
    CompensationStepCompleted(StepData),

    /// A completed step is exempt from compensation.
    CompensationStepSkipped(StepData),

    /// A compensation failed (logged, compensation continues).
    CompensationStepFailed(StepFailedData),

    /// Execution succeeded.
    TransactionSucceeded(TransactionFinishedData),

    /// Execution failed and every compensation succeeded.
    TransactionCompensated(TransactionFailedData),

    /// Execution failed and at least one compensation failed.
    TransactionCompensationFailed(TransactionFailedData),
}

impl TransactionEvent {
    /// Returns the event type name.
    pub fn event_type(&self) -> &'static str {
        match self {
            TransactionEvent::TransactionStarted(_) => "TransactionStarted",
            TransactionEvent::StepStarted(_) => "StepStarted",
            TransactionEvent::StepCompleted(_) => "StepCompleted",
            TransactionEvent::StepFailed(_) => "StepFailed",
            TransactionEvent::StepNotStarted(_) => "StepNotStarted",
            TransactionEvent::CompensationStarted(_) => "CompensationStarted",
            TransactionEvent::CompensationStepCompleted(_) => "CompensationStepCompleted",
            TransactionEvent::CompensationStepSkipped(_) => "CompensationStepSkipped",
            TransactionEvent::CompensationStepFailed(_) => "CompensationStepFailed",
            TransactionEvent::TransactionSucceeded(_) => "TransactionSucceeded",
            TransactionEvent::TransactionCompensated(_) => "TransactionCompensated",
            TransactionEvent::TransactionCompensationFailed(_) => "TransactionCompensationFailed",
        }
    }
}

/// Data for TransactionStarted event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionStartedData {
    /// The execution ID.
    pub transaction_id: TransactionId,
    /// The operation being executed (e.g., "create-products").
    pub operation: String,
    /// When the execution started.
    pub started_at: DateTime<Utc>,
}

/// Data for events that only name a step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepData {
    /// The step name.
    pub step_name: String,
}

/// Data for StepCompleted event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepCompletedData {
    /// The step name.
    pub step_name: String,
    /// Whether the result was kept for downstream steps.
    pub saved_response: bool,
}

/// Data for step failure events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepFailedData {
    /// The step that failed.
    pub step_name: String,
    /// Error message describing the failure.
    pub error: String,
}

/// Data for CompensationStarted event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompensationData {
    /// The step that triggered compensation.
    pub from_step: String,
}

/// Data for TransactionSucceeded event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionFinishedData {
    /// When the execution finished.
    pub finished_at: DateTime<Utc>,
}

/// Data for failed-transaction events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionFailedData {
    /// Reason for failure.
    pub reason: String,
    /// When the rollback finished.
    pub finished_at: DateTime<Utc>,
}

// Convenience constructors
impl TransactionEvent {
    /// Creates a TransactionStarted event.
    pub fn transaction_started(
        transaction_id: TransactionId,
        operation: impl Into<String>,
    ) -> Self {
        TransactionEvent::TransactionStarted(TransactionStartedData {
            transaction_id,
            operation: operation.into(),
            started_at: Utc::now(),
        })
    }

    /// Creates a StepStarted event.
    pub fn step_started(step_name: impl Into<String>) -> Self {
        TransactionEvent::StepStarted(StepData {
            step_name: step_name.into(),
        })
    }

    /// Creates a StepCompleted event.
    pub fn step_completed(step_name: impl Into<String>, saved_response: bool) -> Self {
        TransactionEvent::StepCompleted(StepCompletedData {
            step_name: step_name.into(),
            saved_response,
        })
    }

    /// Creates a StepFailed event.
    pub fn step_failed(step_name: impl Into<String>, error: impl Into<String>) -> Self {
        TransactionEvent::StepFailed(StepFailedData {
            step_name: step_name.into(),
            error: error.into(),
        })
    }

    /// Creates a StepNotStarted event.
    pub fn step_not_started(step_name: impl Into<String>) -> Self {
        TransactionEvent::StepNotStarted(StepData {
            step_name: step_name.into(),
        })
    }

    /// Creates a CompensationStarted event.
    pub fn compensation_started(from_step: impl Into<String>) -> Self {
        TransactionEvent::CompensationStarted(CompensationData {
            from_step: from_step.into(),
        })
    }

    /// Creates a CompensationStepCompleted event.
    pub fn compensation_step_completed(step_name: impl Into<String>) -> Self {
        TransactionEvent::CompensationStepCompleted(StepData {
            step_name: step_name.into(),
        })
    }

    /// Creates a CompensationStepSkipped event.
    pub fn compensation_step_skipped(step_name: impl Into<String>) -> Self {
        TransactionEvent::CompensationStepSkipped(StepData {
            step_name: step_name.into(),
        })
    }

    /// Creates a CompensationStepFailed event.
    pub fn compensation_step_failed(
        step_name: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        TransactionEvent::CompensationStepFailed(StepFailedData {
            step_name: step_name.into(),
            error: error.into(),
        })
    }

    /// Creates a TransactionSucceeded event.
    pub fn transaction_succeeded() -> Self {
        TransactionEvent::TransactionSucceeded(TransactionFinishedData {
            finished_at: Utc::now(),
        })
    }

    /// Creates a TransactionCompensated event.
    pub fn transaction_compensated(reason: impl Into<String>) -> Self {
        TransactionEvent::TransactionCompensated(TransactionFailedData {
            reason: reason.into(),
            finished_at: Utc::now(),
        })
    }

    /// Creates a TransactionCompensationFailed event.
    pub fn transaction_compensation_failed(reason: impl Into<String>) -> Self {
        TransactionEvent::TransactionCompensationFailed(TransactionFailedData {
            reason: reason.into(),
            finished_at: Utc::now(),
        })
    }
}
