//! Transaction record rebuilt from the journal.

use common::TransactionId;
use serde::{Deserialize, Serialize};

use crate::events::TransactionEvent;
use crate::state::TransactionStatus;

/// Outcome of one execution, rebuilt by replaying its journal.
///
/// Lets the surrounding infrastructure persist the journal and later inspect
/// which steps ran, which were unwound and why the execution failed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    id: Option<TransactionId>,
    operation: String,
    status: TransactionStatus,
    started_steps: usize,
    completed_steps: Vec<String>,
    not_started_steps: Vec<String>,
    compensated_steps: Vec<String>,
    skipped_compensations: Vec<String>,
    /// (step, error) pairs for failed compensations.
    compensation_failures: Vec<(String, String)>,
    failed_step: Option<String>,
    /// Reason for failure, if any.
    failure_reason: Option<String>,
}

impl TransactionRecord {
    /// Rebuilds a record by applying events in order.
    pub fn from_events(events: impl IntoIterator<Item = TransactionEvent>) -> Self {
        let mut record = Self::default();
        for event in events {
            record.apply(event);
        }
        record
    }

    /// Applies an event, updating the record.
    pub fn apply(&mut self, event: TransactionEvent) {
        match event {
            TransactionEvent::TransactionStarted(data) => {
                self.id = Some(data.transaction_id);
                self.operation = data.operation;
                self.status = TransactionStatus::Running;
            }
            TransactionEvent::StepStarted(_) => {
                self.started_steps += 1;
            }
            TransactionEvent::StepCompleted(data) => {
                self.completed_steps.push(data.step_name);
            }
            TransactionEvent::StepFailed(data) => {
                // Only the first failure triggers the rollback.
                if self.failed_step.is_none() {
                    self.failed_step = Some(data.step_name);
                    self.failure_reason = Some(data.error);
                }
                self.status = TransactionStatus::Failed;
            }
            TransactionEvent::StepNotStarted(data) => {
                self.not_started_steps.push(data.step_name);
            }
            TransactionEvent::CompensationStarted(_) => {
                self.status = TransactionStatus::Compensating;
            }
            TransactionEvent::CompensationStepCompleted(data) => {
                self.compensated_steps.push(data.step_name);
            }
            TransactionEvent::CompensationStepSkipped(data) => {
                self.skipped_compensations.push(data.step_name);
            }
            TransactionEvent::CompensationStepFailed(data) => {
                self.compensation_failures
                    .push((data.step_name, data.error));
            }
            TransactionEvent::TransactionSucceeded(_) => {
                self.status = TransactionStatus::Succeeded;
            }
            TransactionEvent::TransactionCompensated(_) => {
                self.status = TransactionStatus::Compensated;
            }
            TransactionEvent::TransactionCompensationFailed(_) => {
                self.status = TransactionStatus::CompensationFailed;
            }
        }
    }
}

// Query methods
impl TransactionRecord {
    /// Returns the transaction ID, once started.
    pub fn id(&self) -> Option<TransactionId> {
        self.id
    }

    /// Returns the operation name.
    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// Returns the transaction status.
    pub fn status(&self) -> TransactionStatus {
        self.status
    }

    /// Returns how many invoke handlers were called.
    pub fn started_steps(&self) -> usize {
        self.started_steps
    }

    /// Returns the completed step names, in completion order.
    pub fn completed_steps(&self) -> &[String] {
        &self.completed_steps
    }

    /// Returns the steps that were never started.
    pub fn not_started_steps(&self) -> &[String] {
        &self.not_started_steps
    }

    /// Returns the compensated step names, in compensation order.
    pub fn compensated_steps(&self) -> &[String] {
        &self.compensated_steps
    }

    /// Returns the steps exempt from compensation that were passed over.
    pub fn skipped_compensations(&self) -> &[String] {
        &self.skipped_compensations
    }

    /// Returns the failed compensations as (step, error) pairs.
    pub fn compensation_failures(&self) -> &[(String, String)] {
        &self.compensation_failures
    }

    /// Returns the step whose failure triggered the rollback.
    pub fn failed_step(&self) -> Option<&str> {
        self.failed_step.as_deref()
    }

    /// Returns the failure reason, if any.
    pub fn failure_reason(&self) -> Option<&str> {
        self.failure_reason.as_deref()
    }
}
