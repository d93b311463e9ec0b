//! Collaborator error types.

use saga::ActionError;
use thiserror::Error;

/// Errors reported by catalog collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    /// A product with the same handle already exists.
    #[error("Product with handle '{0}' already exists")]
    DuplicateHandle(String),

    /// The requested entity does not exist.
    #[error("{entity} '{id}' not found")]
    NotFound { entity: &'static str, id: String },

    /// The collaborator could not serve the request.
    #[error("{service} service unavailable: {reason}")]
    Unavailable {
        service: &'static str,
        reason: String,
    },
}

impl ServiceError {
    /// Creates an `Unavailable` error.
    pub fn unavailable(service: &'static str, reason: impl Into<String>) -> Self {
        Self::Unavailable {
            service,
            reason: reason.into(),
        }
    }

    /// Returns the name of the collaborator that failed.
    pub fn service(&self) -> &'static str {
        match self {
            ServiceError::DuplicateHandle(_) => "product",
            ServiceError::NotFound { entity, .. } => entity,
            ServiceError::Unavailable { service, .. } => service,
        }
    }
}

impl From<ServiceError> for ActionError {
    fn from(err: ServiceError) -> Self {
        ActionError::Collaborator {
            service: err.service(),
            reason: err.to_string(),
        }
    }
}

/// Result type for collaborator calls.
pub type Result<T> = std::result::Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ServiceError::DuplicateHandle("hat".into());
        assert_eq!(err.to_string(), "Product with handle 'hat' already exists");

        let err = ServiceError::NotFound {
            entity: "product",
            id: "prod_1".into(),
        };
        assert_eq!(err.to_string(), "product 'prod_1' not found");
    }

    #[test]
    fn test_into_action_error() {
        let err: ActionError = ServiceError::unavailable("pricing", "timeout").into();
        assert_eq!(
            err,
            ActionError::Collaborator {
                service: "pricing",
                reason: "pricing service unavailable: timeout".into()
            }
        );
    }
}
