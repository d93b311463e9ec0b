//! Per-execution runtime state.

use std::collections::HashMap;

use common::TransactionId;

use crate::error::{ActionError, CompensationFailure, RollbackReport, SagaError};
use crate::events::TransactionEvent;
use crate::record::TransactionRecord;
use crate::state::{StepStatus, TransactionStatus};
use crate::workflow::{StepId, Workflow};

/// Mutable record of one execution.
///
/// Owned by the coordinator for the lifetime of the execution and shared
/// between fan-out branches behind a lock. Handlers never see it directly;
/// they receive a snapshot of the context.
pub struct TransactionState<W: Workflow> {
    id: TransactionId,
    status: TransactionStatus,
    context: W::Context,
    completed: Vec<W::Step>,
    steps: HashMap<W::Step, StepStatus>,
    failure: Option<(W::Step, ActionError)>,
    compensated: Vec<W::Step>,
    skipped: Vec<W::Step>,
    compensation_failures: Vec<CompensationFailure>,
    events: Vec<TransactionEvent>,
}

impl<W: Workflow> TransactionState<W> {
    /// Starts a new execution.
    pub fn new(id: TransactionId) -> Self {
        Self {
            id,
            status: TransactionStatus::Running,
            context: W::Context::default(),
            completed: Vec::new(),
            steps: HashMap::new(),
            failure: None,
            compensated: Vec::new(),
            skipped: Vec::new(),
            compensation_failures: Vec::new(),
            events: vec![TransactionEvent::transaction_started(id, W::NAME)],
        }
    }

    /// Returns the execution ID.
    pub fn id(&self) -> TransactionId {
        self.id
    }

    /// Returns the execution status.
    pub fn status(&self) -> TransactionStatus {
        self.status
    }

    /// Returns the saved results.
    pub fn context(&self) -> &W::Context {
        &self.context
    }

    /// Returns the steps whose invoke completed, in completion order.
    pub fn completed_order(&self) -> &[W::Step] {
        &self.completed
    }

    /// Returns the status of a step.
    pub fn step_status(&self, step: W::Step) -> StepStatus {
        self.steps.get(&step).copied().unwrap_or_default()
    }

    /// Returns the journal so far.
    pub fn events(&self) -> &[TransactionEvent] {
        &self.events
    }

    /// Returns true once any invoke has failed.
    pub fn is_failed(&self) -> bool {
        self.failure.is_some()
    }

    /// Folds the journal into a record.
    pub fn record(&self) -> TransactionRecord {
        TransactionRecord::from_events(self.events.iter().cloned())
    }

    pub(crate) fn record_started(&mut self, step: W::Step) {
        self.events.push(TransactionEvent::step_started(step.as_str()));
    }

    pub(crate) fn record_invoked(&mut self, step: W::Step, output: W::Output, save: bool) {
        if save {
            W::save(&mut self.context, step, output);
        }
        self.completed.push(step);
        self.steps.insert(step, StepStatus::Invoked);
        self.events
            .push(TransactionEvent::step_completed(step.as_str(), save));
    }

    /// Records an invoke failure; the first one becomes the rollback trigger.
    pub(crate) fn record_failure(&mut self, step: W::Step, error: ActionError) {
        self.steps.insert(step, StepStatus::Failed);
        self.events
            .push(TransactionEvent::step_failed(step.as_str(), error.to_string()));
        if self.failure.is_none() {
            self.failure = Some((step, error));
            self.status = TransactionStatus::Failed;
        }
    }

    pub(crate) fn record_not_started(&mut self, step: W::Step) {
        self.events
            .push(TransactionEvent::step_not_started(step.as_str()));
    }

    /// Enters the backward pass and returns the triggering step.
    pub(crate) fn begin_compensation(&mut self) -> Option<W::Step> {
        if !self.status.can_compensate() {
            return None;
        }
        let (step, _) = self.failure.as_ref()?;
        let step = *step;
        self.status = TransactionStatus::Compensating;
        self.events
            .push(TransactionEvent::compensation_started(step.as_str()));
        Some(step)
    }

    pub(crate) fn record_compensated(&mut self, step: W::Step) {
        self.compensated.push(step);
        self.steps.insert(step, StepStatus::Compensated);
        self.events
            .push(TransactionEvent::compensation_step_completed(step.as_str()));
    }

    pub(crate) fn record_compensation_skipped(&mut self, step: W::Step) {
        self.skipped.push(step);
        self.steps.insert(step, StepStatus::Skipped);
        self.events
            .push(TransactionEvent::compensation_step_skipped(step.as_str()));
    }

    pub(crate) fn record_compensation_failed(&mut self, step: W::Step, error: ActionError) {
        self.steps.insert(step, StepStatus::CompensationFailed);
        self.events.push(TransactionEvent::compensation_step_failed(
            step.as_str(),
            error.to_string(),
        ));
        self.compensation_failures.push(CompensationFailure {
            step: step.as_str(),
            error,
        });
    }

    /// Closes a successful execution.
    pub(crate) fn into_result<R>(mut self, response: R) -> TransactionResult<R> {
        self.status = TransactionStatus::Succeeded;
        self.events.push(TransactionEvent::transaction_succeeded());
        TransactionResult {
            transaction_id: self.id,
            response,
            completed_steps: names(&self.completed),
            events: self.events,
        }
    }

    /// Closes a rolled-back execution, or returns the state unchanged if no
    /// invoke failed.
    pub(crate) fn into_error(mut self) -> Result<SagaError, Self> {
        let Some((step, source)) = self.failure.take() else {
            return Err(self);
        };

        let reason = format!("Step failed: {}", step.as_str());
        if self.compensation_failures.is_empty() {
            self.status = TransactionStatus::Compensated;
            self.events
                .push(TransactionEvent::transaction_compensated(reason));
        } else {
            self.status = TransactionStatus::CompensationFailed;
            self.events
                .push(TransactionEvent::transaction_compensation_failed(reason));
        }

        Ok(SagaError::StepFailed {
            transaction_id: self.id,
            step: step.as_str(),
            source,
            rollback: RollbackReport {
                status: self.status,
                completed_steps: names(&self.completed),
                compensated: names(&self.compensated),
                skipped: names(&self.skipped),
                failures: self.compensation_failures,
                events: self.events,
            },
        })
    }
}

fn names<S: StepId>(steps: &[S]) -> Vec<&'static str> {
    steps.iter().map(StepId::as_str).collect()
}

/// Outcome of a successful execution.
#[derive(Debug, Clone)]
pub struct TransactionResult<R> {
    /// The execution ID.
    pub transaction_id: TransactionId,
    /// The terminal step's response.
    pub response: R,
    /// Every step, in completion order.
    pub completed_steps: Vec<&'static str>,
    /// Full journal of the execution.
    pub events: Vec<TransactionEvent>,
}

impl<R> TransactionResult<R> {
    /// Folds the journal into a record.
    pub fn record(&self) -> TransactionRecord {
        TransactionRecord::from_events(self.events.iter().cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Provision, Step};

    fn state() -> TransactionState<Provision> {
        TransactionState::new(TransactionId::new())
    }

    #[test]
    fn test_new_state() {
        let state = state();
        assert_eq!(state.status(), TransactionStatus::Running);
        assert!(state.completed_order().is_empty());
        assert_eq!(state.step_status(Step::Validate), StepStatus::Pending);
        assert_eq!(state.events().len(), 1);
        assert_eq!(state.record().operation(), "provision");
    }

    #[test]
    fn test_saved_and_discarded_results() {
        let mut state = state();
        state.record_started(Step::Validate);
        state.record_invoked(Step::Validate, 7, true);
        state.record_started(Step::Reserve);
        state.record_invoked(Step::Reserve, 8, false);

        assert_eq!(state.context().get(Step::Validate), Some(7));
        assert_eq!(state.context().get(Step::Reserve), None);
        assert_eq!(state.completed_order(), &[Step::Validate, Step::Reserve]);
        assert_eq!(state.step_status(Step::Reserve), StepStatus::Invoked);
    }

    #[test]
    fn test_first_failure_triggers_rollback() {
        let mut state = state();
        state.record_invoked(Step::Validate, 1, true);
        state.record_failure(Step::Notify, ActionError::Failed("first".into()));
        state.record_failure(Step::Charge, ActionError::Failed("second".into()));

        assert!(state.is_failed());
        assert_eq!(state.status(), TransactionStatus::Failed);
        assert_eq!(state.step_status(Step::Charge), StepStatus::Failed);
        assert_eq!(state.begin_compensation(), Some(Step::Notify));
        assert_eq!(state.status(), TransactionStatus::Compensating);
        // Only once.
        assert_eq!(state.begin_compensation(), None);
    }

    #[test]
    fn test_into_error_with_partial_compensation() {
        let mut state = state();
        state.record_invoked(Step::Validate, 1, true);
        state.record_invoked(Step::Reserve, 2, false);
        state.record_invoked(Step::Notify, 3, false);
        state.record_failure(Step::Charge, ActionError::Failed("declined".into()));
        state.begin_compensation();
        state.record_compensation_failed(Step::Notify, ActionError::Failed("smtp".into()));
        state.record_compensated(Step::Reserve);
        state.record_compensation_skipped(Step::Validate);

        let Ok(SagaError::StepFailed {
            step,
            source,
            rollback,
            ..
        }) = state.into_error()
        else {
            panic!("expected a rollback error");
        };
        assert_eq!(step, "charge");
        assert_eq!(source, ActionError::Failed("declined".into()));
        assert_eq!(rollback.status, TransactionStatus::CompensationFailed);
        assert_eq!(rollback.completed_steps, vec!["validate", "reserve", "notify"]);
        assert_eq!(rollback.compensated, vec!["reserve"]);
        assert_eq!(rollback.skipped, vec!["validate"]);
        assert_eq!(rollback.failures[0].step, "notify");

        let record = TransactionRecord::from_events(rollback.events.clone());
        assert_eq!(record.status(), TransactionStatus::CompensationFailed);
        assert_eq!(record.failed_step(), Some("charge"));
    }

    #[test]
    fn test_into_error_without_failure_returns_state() {
        let state = state();
        assert!(state.into_error().is_err());
    }

    #[test]
    fn test_into_result() {
        let mut state = state();
        state.record_invoked(Step::Validate, 1, true);
        let result = state.into_result(42u32);

        assert_eq!(result.response, 42);
        assert_eq!(result.completed_steps, vec!["validate"]);
        assert_eq!(result.record().status(), TransactionStatus::Succeeded);
    }
}
