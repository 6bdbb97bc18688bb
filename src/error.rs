use thiserror::Error;

use crate::backend::BackendError;

#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error("invalid submission: {0}")]
    Validation(#[from] ValidationError),

    #[error("backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("Job not found: {0}")]
    JobNotFound(String),

    #[error("Job already tracked: {0}")]
    DuplicateJob(String),
}

/// User-correctable problems with a generation form. Raised before any
/// network call or persisted state is touched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("no model selected")]
    MissingModel,

    #[error("unknown model `{0}`")]
    UnknownModel(String),

    #[error("prompt must not be empty")]
    EmptyPrompt,

    #[error("{field} must be {expected}, got `{value}`")]
    InvalidNumber {
        field: &'static str,
        expected: &'static str,
        value: String,
    },

    #[error("resolution must look like WIDTHxHEIGHT, got `{0}`")]
    InvalidResolution(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_display() {
        let err = ValidationError::InvalidNumber {
            field: "fps",
            expected: "a whole number",
            value: "fast".into(),
        };
        assert_eq!(err.to_string(), "fps must be a whole number, got `fast`");
    }

    #[test]
    fn validation_wraps_into_coordinator_error() {
        let err: CoordinatorError = ValidationError::MissingModel.into();
        assert_eq!(err.to_string(), "invalid submission: no model selected");
    }

    #[test]
    fn backend_wraps_into_coordinator_error() {
        let err: CoordinatorError = BackendError::Timeout.into();
        assert!(matches!(err, CoordinatorError::Backend(BackendError::Timeout)));
        assert_eq!(err.to_string(), "backend error: request timed out");
    }
}
