//! Saga coordinator: drives invoke phases forward and compensations backward.

use std::sync::Arc;
use std::time::Instant;

use common::TransactionId;
use futures_util::FutureExt;
use futures_util::future::{BoxFuture, join_all};
use tokio::sync::RwLock;

use crate::definition::OperationDefinition;
use crate::error::{Result, SagaError};
use crate::graph::StepNode;
use crate::registry::Compensation;
use crate::runtime::{TransactionResult, TransactionState};
use crate::workflow::{StepId, Workflow};

type SharedState<W> = RwLock<TransactionState<W>>;

/// Orchestrates executions of one operation definition.
///
/// The forward pass walks the step tree from the root; a node with several
/// children starts one branch per child, and every branch is awaited before
/// the execution resolves. Once any invoke fails no new step is started, and
/// the completed steps are compensated in reverse completion order.
pub struct SagaCoordinator<W: Workflow> {
    definition: Arc<OperationDefinition<W>>,
}

impl<W: Workflow> Clone for SagaCoordinator<W> {
    fn clone(&self) -> Self {
        Self {
            definition: Arc::clone(&self.definition),
        }
    }
}

impl<W: Workflow> SagaCoordinator<W> {
    /// Creates a coordinator for the given definition.
    pub fn new(definition: OperationDefinition<W>) -> Self {
        Self::from_shared(Arc::new(definition))
    }

    /// Creates a coordinator sharing an existing definition.
    pub fn from_shared(definition: Arc<OperationDefinition<W>>) -> Self {
        Self { definition }
    }

    /// Returns the definition being executed.
    pub fn definition(&self) -> &OperationDefinition<W> {
        &self.definition
    }

    /// Executes the operation once.
    ///
    /// Returns the terminal step's response, or a [`SagaError`] naming the
    /// failed step together with the outcome of the rollback.
    #[tracing::instrument(skip_all, fields(operation = W::NAME, transaction_id = tracing::field::Empty))]
    pub async fn execute(&self, input: W::Input) -> Result<TransactionResult<W::Response>> {
        metrics::counter!("saga_executions_total", "operation" => W::NAME).increment(1);
        let saga_start = Instant::now();

        let transaction_id = TransactionId::new();
        tracing::Span::current().record("transaction_id", tracing::field::display(transaction_id));
        let state: SharedState<W> = RwLock::new(TransactionState::new(transaction_id));

        self.run_branch(self.definition.graph().root(), &input, &state)
            .await;

        let failed = state.read().await.is_failed();
        if failed {
            self.compensate(&input, &state).await;
        }

        let duration = saga_start.elapsed().as_secs_f64();
        metrics::histogram!("saga_duration_seconds", "operation" => W::NAME).record(duration);

        let state = match state.into_inner().into_error() {
            Ok(err) => {
                metrics::counter!("saga_failed", "operation" => W::NAME).increment(1);
                tracing::warn!(%transaction_id, duration, error = %err, "saga failed");
                return Err(err);
            }
            Err(state) => state,
        };

        let terminal = self.definition.graph().terminal();
        let Some(response) = W::respond(state.context()) else {
            tracing::error!(%transaction_id, terminal = terminal.as_str(), "saga finished without a response");
            return Err(SagaError::MissingResponse {
                transaction_id,
                operation: W::NAME,
                terminal: terminal.as_str(),
            });
        };

        metrics::counter!("saga_completed", "operation" => W::NAME).increment(1);
        tracing::info!(%transaction_id, duration, "saga completed successfully");
        Ok(state.into_result(response))
    }

    /// Runs one node and then, concurrently, every branch below it.
    fn run_branch<'a>(
        &'a self,
        node: &'a StepNode<W::Step>,
        input: &'a W::Input,
        state: &'a SharedState<W>,
    ) -> BoxFuture<'a, ()> {
        async move {
            let step = node.action();

            // Check-and-start under one lock so no step starts after a failure.
            let context = {
                let mut state = state.write().await;
                if !state.status().can_start_steps() {
                    tracing::debug!(step = step.as_str(), "saga step not started");
                    state.record_not_started(step);
                    return;
                }
                state.record_started(step);
                state.context().clone()
            };

            tracing::info!(step = step.as_str(), "saga step started");
            metrics::counter!("saga_steps_invoked_total", "operation" => W::NAME, "step" => step.as_str())
                .increment(1);

            let result = match self.definition.registry().invoker(step) {
                Ok(handler) => handler.invoke(input, &context).await,
                Err(err) => Err(err),
            };
            drop(context);

            match result {
                Ok(output) => {
                    state
                        .write()
                        .await
                        .record_invoked(step, output, node.saves_response());
                    tracing::info!(step = step.as_str(), "saga step completed");
                }
                Err(error) => {
                    tracing::warn!(step = step.as_str(), %error, "saga step failed");
                    metrics::counter!("saga_step_failures_total", "operation" => W::NAME, "step" => step.as_str())
                        .increment(1);
                    state.write().await.record_failure(step, error);
                    return;
                }
            }

            join_all(
                node.children()
                    .iter()
                    .map(|child| self.run_branch(child, input, state)),
            )
            .await;
        }
        .boxed()
    }

    /// Compensates completed steps in strict reverse completion order.
    ///
    /// A failed compensation is recorded and the walk continues.
    #[tracing::instrument(skip_all)]
    async fn compensate(&self, input: &W::Input, state: &SharedState<W>) {
        let (failed_step, completed, context) = {
            let mut state = state.write().await;
            let Some(failed_step) = state.begin_compensation() else {
                return;
            };
            (
                failed_step,
                state.completed_order().to_vec(),
                state.context().clone(),
            )
        };
        tracing::info!(from_step = failed_step.as_str(), steps = completed.len(), "compensation started");

        let graph = self.definition.graph();
        for step in completed.into_iter().rev() {
            if !graph.requires_compensation(step) {
                state.write().await.record_compensation_skipped(step);
                continue;
            }

            let result = match self.definition.registry().compensator(step) {
                Ok(handler) => handler.compensate(input, &context).await,
                Err(err) => Err(err),
            };
            metrics::counter!("saga_compensations_total", "operation" => W::NAME, "step" => step.as_str())
                .increment(1);

            match result {
                Ok(Compensation::Undone) => {
                    tracing::info!(step = step.as_str(), "compensation step completed");
                    state.write().await.record_compensated(step);
                }
                Ok(Compensation::Skipped) => {
                    tracing::info!(step = step.as_str(), "compensation step skipped");
                    state.write().await.record_compensation_skipped(step);
                }
                Err(error) => {
                    tracing::error!(step = step.as_str(), %error, "compensation step failed");
                    metrics::counter!("saga_compensation_failures_total", "operation" => W::NAME, "step" => step.as_str())
                        .increment(1);
                    state.write().await.record_compensation_failed(step, error);
                }
            }
        }
    }
}
