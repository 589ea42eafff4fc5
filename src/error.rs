// src/error.rs
use thiserror::Error;

use crate::types::RequestId;

pub type CoreResult<T> = Result<T, CoreError>;

/// Failures reported upward to the UI. None of them is fatal.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoreError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The request is no longer the one in the slot; nothing was done.
    #[error("request {requested} is not the surfaced request (slot holds {current:?})")]
    StaleRequest {
        requested: RequestId,
        current: Option<RequestId>,
    },

    #[error("background unavailable: {0}")]
    CollaboratorUnavailable(String),

    #[error("background rejected the request: {0}")]
    CollaboratorRejected(String),
}

impl CoreError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, CoreError::CollaboratorUnavailable(_))
    }
}

/// Errors returned by the background process across the message boundary.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CollaboratorError {
    #[error("unavailable: {0}")]
    Unavailable(String),
    #[error("rejected: {0}")]
    Rejected(String),
}

impl From<CollaboratorError> for CoreError {
    fn from(err: CollaboratorError) -> Self {
        match err {
            CollaboratorError::Unavailable(reason) => CoreError::CollaboratorUnavailable(reason),
            CollaboratorError::Rejected(reason) => CoreError::CollaboratorRejected(reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collaborator_errors_keep_their_reason() {
        let err: CoreError = CollaboratorError::Rejected("insufficient funds".into()).into();
        assert_eq!(err, CoreError::CollaboratorRejected("insufficient funds".into()));
        assert!(!err.is_retryable());

        let err: CoreError = CollaboratorError::Unavailable("port closed".into()).into();
        assert!(err.is_retryable());
    }
}
