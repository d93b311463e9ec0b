//! A small workflow used by unit tests.
//!
//! ```text
//! validate ─► reserve ─┬─► notify
//!                      └─► charge ─► ship ─► done
//! ```

use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::definition::OperationDefinition;
use crate::error::ActionError;
use crate::graph::{StepGraph, StepNode};
use crate::registry::{ActionRegistry, Compensate, Compensation, Invoke};
use crate::workflow::{StepId, Workflow};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Step {
    Validate,
    Reserve,
    Notify,
    Charge,
    Ship,
    Done,
}

impl StepId for Step {
    fn all() -> &'static [Self] {
        &[
            Step::Validate,
            Step::Reserve,
            Step::Notify,
            Step::Charge,
            Step::Ship,
            Step::Done,
        ]
    }

    fn as_str(&self) -> &'static str {
        match self {
            Step::Validate => "validate",
            Step::Reserve => "reserve",
            Step::Notify => "notify",
            Step::Charge => "charge",
            Step::Ship => "ship",
            Step::Done => "done",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ProvisionContext(BTreeMap<Step, u32>);

impl ProvisionContext {
    pub fn get(&self, step: Step) -> Option<u32> {
        self.0.get(&step).copied()
    }
}

pub struct Provision;

impl Workflow for Provision {
    type Step = Step;
    type Input = u32;
    type Output = u32;
    type Context = ProvisionContext;
    type Response = u32;

    const NAME: &'static str = "provision";

    fn save(context: &mut Self::Context, step: Self::Step, output: Self::Output) {
        context.0.insert(step, output);
    }

    fn respond(context: &Self::Context) -> Option<Self::Response> {
        context.get(Step::Done)
    }

    fn dependencies(step: Self::Step) -> &'static [Self::Step] {
        match step {
            Step::Ship => &[Step::Charge],
            Step::Done => &[Step::Validate],
            _ => &[],
        }
    }
}

/// Shared, ordered log of handler calls.
#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    pub fn push(&self, entry: String) {
        self.0.lock().unwrap().push(entry);
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn compensations(&self) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter_map(|e| e.strip_prefix("compensate:").map(str::to_string))
            .collect()
    }
}

/// Logs every call; returns `input + 1`, or fails when told to.
pub struct Recorder {
    step: Step,
    log: CallLog,
    fail_invoke: bool,
    fail_compensate: bool,
    skip_compensate: bool,
}

impl Recorder {
    pub fn new(step: Step, log: &CallLog) -> Self {
        Self {
            step,
            log: log.clone(),
            fail_invoke: false,
            fail_compensate: false,
            skip_compensate: false,
        }
    }

    /// Invoke reports a failure.
    pub fn failing_invoke(mut self) -> Self {
        self.fail_invoke = true;
        self
    }

    /// Compensation reports that there was nothing to undo.
    pub fn skipping_compensation(mut self) -> Self {
        self.skip_compensate = true;
        self
    }
}

#[async_trait]
impl Invoke<Provision> for Recorder {
    async fn invoke(&self, input: &u32, _context: &ProvisionContext) -> Result<u32, ActionError> {
        self.log.push(format!("invoke:{}", self.step.as_str()));
        if self.fail_invoke {
            return Err(ActionError::Failed(format!("{} failed", self.step.as_str())));
        }
        Ok(input + 1)
    }
}

#[async_trait]
impl Compensate<Provision> for Recorder {
    async fn compensate(
        &self,
        _input: &u32,
        _context: &ProvisionContext,
    ) -> Result<Compensation, ActionError> {
        if self.skip_compensate {
            return Ok(Compensation::Skipped);
        }
        self.log.push(format!("compensate:{}", self.step.as_str()));
        if self.fail_compensate {
            return Err(ActionError::Failed(format!(
                "{} compensation failed",
                self.step.as_str()
            )));
        }
        Ok(Compensation::Undone)
    }
}

pub fn provision_graph() -> StepGraph<Step> {
    StepGraph::from_root(
        StepNode::new(Step::Validate)
            .save_response()
            .no_compensation()
            .then(StepNode::new(Step::Reserve).fan_out([
                StepNode::new(Step::Notify),
                StepNode::new(Step::Charge).save_response().then(
                    StepNode::new(Step::Ship)
                        .then(StepNode::new(Step::Done).save_response().no_compensation()),
                ),
            ])),
    )
    .unwrap()
}

pub fn provision_registry(log: &CallLog) -> ActionRegistry<Provision> {
    failing_registry(log, &[], &[])
}

/// Every step compensable except validate/done, with selected failures.
pub fn failing_registry(
    log: &CallLog,
    fail_invoke: &[Step],
    fail_compensate: &[Step],
) -> ActionRegistry<Provision> {
    let fail_invoke: HashSet<_> = fail_invoke.iter().copied().collect();
    let fail_compensate: HashSet<_> = fail_compensate.iter().copied().collect();
    let recorder = |step: Step| Recorder {
        fail_invoke: fail_invoke.contains(&step),
        fail_compensate: fail_compensate.contains(&step),
        ..Recorder::new(step, log)
    };

    ActionRegistry::builder()
        .invoke(Step::Validate, recorder(Step::Validate))
        .action(Step::Reserve, recorder(Step::Reserve))
        .action(Step::Notify, recorder(Step::Notify))
        .action(Step::Charge, recorder(Step::Charge))
        .action(Step::Ship, recorder(Step::Ship))
        .action(Step::Done, recorder(Step::Done))
        .build()
        .unwrap()
}

pub fn provision_definition(
    log: &CallLog,
    fail_invoke: &[Step],
    fail_compensate: &[Step],
) -> OperationDefinition<Provision> {
    OperationDefinition::new(
        provision_graph(),
        failing_registry(log, fail_invoke, fail_compensate),
    )
    .unwrap()
}
