//! Transaction and step state machines.

use serde::{Deserialize, Serialize};

/// The state of one execution in its lifecycle.
///
/// State transitions:
/// ```text
/// Running ──┬──► Succeeded
///           └──► Failed ──► Compensating ──┬──► Compensated
///                                          └──► CompensationFailed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    /// Steps are being invoked.
    #[default]
    Running,

    /// Every step was invoked successfully (terminal state).
    Succeeded,

    /// A step failed; in-flight branches are draining.
    Failed,

    /// Completed steps are being compensated in reverse order.
    Compensating,

    /// Every attempted compensation succeeded (terminal state).
    Compensated,

    /// At least one compensation failed (terminal state).
    CompensationFailed,
}

impl TransactionStatus {
    /// Returns true if new steps may still be started.
    pub fn can_start_steps(&self) -> bool {
        matches!(self, TransactionStatus::Running)
    }

    /// Returns true if the backward pass can begin.
    pub fn can_compensate(&self) -> bool {
        matches!(self, TransactionStatus::Failed)
    }

    /// Returns true if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TransactionStatus::Succeeded
                | TransactionStatus::Compensated
                | TransactionStatus::CompensationFailed
        )
    }

    /// Returns the state name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Running => "running",
            TransactionStatus::Succeeded => "succeeded",
            TransactionStatus::Failed => "failed",
            TransactionStatus::Compensating => "compensating",
            TransactionStatus::Compensated => "compensated",
            TransactionStatus::CompensationFailed => "compensation-failed",
        }
    }
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The state of a single step within one execution.
///
/// ```text
/// Pending ──┬──► Invoked ──┬──► Compensated
///           │              ├──► CompensationFailed
///           │              └──► Skipped
///           └──► Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    /// Not started (or never started because the execution failed first).
    #[default]
    Pending,

    /// Invoke phase finished successfully.
    Invoked,

    /// Invoke phase reported a failure.
    Failed,

    /// Compensate phase finished successfully.
    Compensated,

    /// Compensate phase reported a failure.
    CompensationFailed,

    /// Exempt from compensation, or its compensation had nothing to undo.
    Skipped,
}

impl StepStatus {
    /// Returns true if the step's effect is in place and may need undoing.
    pub fn is_invoked(&self) -> bool {
        matches!(self, StepStatus::Invoked)
    }

    /// Returns the state name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            StepStatus::Pending => "pending",
            StepStatus::Invoked => "invoked",
            StepStatus::Failed => "failed",
            StepStatus::Compensated => "compensated",
            StepStatus::CompensationFailed => "compensation-failed",
            StepStatus::Skipped => "skipped",
        }
    }
}

impl std::fmt::Display for StepStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
