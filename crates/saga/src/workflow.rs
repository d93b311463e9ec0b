//! Per-operation type bindings.

use std::fmt::Debug;
use std::hash::Hash;

use serde::{Deserialize, Serialize};

/// Identifier of a step within one operation definition.
///
/// Implemented by a closed enum per operation, so handler tables are keyed by
/// variants and an unknown identifier is a compile error.
pub trait StepId: Copy + Eq + Hash + Debug + Send + Sync + 'static {
    /// Every identifier of the operation, in declaration order.
    fn all() -> &'static [Self];

    /// Stable name used in logs, metrics and the journal.
    fn as_str(&self) -> &'static str;

    /// Looks up an identifier by its stable name.
    fn parse(name: &str) -> Option<Self> {
        Self::all().iter().copied().find(|step| step.as_str() == name)
    }
}

/// The handler phase being dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Forward action.
    Invoke,
    /// Undo action run during rollback.
    Compensate,
}

impl Phase {
    /// Returns the phase name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Invoke => "invoke",
            Phase::Compensate => "compensate",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Binds together the types of one saga-style operation.
///
/// Step results are not kept in an untyped bag: each invoke handler returns a
/// `Self::Output`, and [`Workflow::save`] folds the outputs of steps flagged
/// `save_response` into the typed `Self::Context` that downstream handlers read.
pub trait Workflow: Send + Sync + Sized + 'static {
    /// Closed set of step identifiers.
    type Step: StepId;

    /// Operation input, shared read-only by every handler.
    type Input: Send + Sync + 'static;

    /// Result of a single invoke handler.
    type Output: Send + 'static;

    /// Results of earlier steps, populated as the execution progresses.
    type Context: Default + Clone + Send + Sync + 'static;

    /// Externally visible result, produced by the terminal step.
    type Response: Send + 'static;

    /// Operation name used in logs, metrics and the journal.
    const NAME: &'static str;

    /// Records a saved invoke result into the context.
    fn save(context: &mut Self::Context, step: Self::Step, output: Self::Output);

    /// Extracts the response once every branch has finished.
    fn respond(context: &Self::Context) -> Option<Self::Response>;

    /// Steps whose saved results `step` reads.
    ///
    /// Checked when the definition is built: each dependency must be an
    /// ancestor of `step` that saves its response.
    fn dependencies(_step: Self::Step) -> &'static [Self::Step] {
        &[]
    }
}
