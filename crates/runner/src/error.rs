//! Runner error types.

use std::path::PathBuf;

use saga::{DefinitionError, SagaError};
use thiserror::Error;

/// Errors that can stop a run.
#[derive(Debug, Error)]
pub enum RunnerError {
    /// The input file could not be read.
    #[error("Failed to read input file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The input file is not a valid payload.
    #[error("Invalid input payload: {0}")]
    Json(#[from] serde_json::Error),

    /// `FAIL_STEP` does not name a step.
    #[error("Unknown step '{0}'")]
    UnknownStep(String),

    /// The operation definition failed validation.
    #[error("Invalid operation definition: {0}")]
    Definition(#[from] DefinitionError),

    /// The saga failed and was rolled back.
    #[error(transparent)]
    Saga(#[from] SagaError),
}
