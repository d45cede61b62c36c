use thiserror::Error;

use crate::domain::actor::UserId;
use crate::domain::request::{LifecycleOperation, RequestId, RequestStatus};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("operation {} not allowed while request is {}", operation.as_str(), status.as_str())]
    InvalidTransition { status: RequestStatus, operation: LifecycleOperation },
}

/// The full failure taxonomy of the lifecycle orchestrator. Deterministic
/// failures (everything except `Conflict` and `Persistence`) are not worth
/// retrying with the same input.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum WorkflowError {
    #[error("request {0} not found")]
    NotFound(RequestId),
    #[error("actor {actor_id} may not {} this request", operation.as_str())]
    Forbidden { actor_id: UserId, operation: LifecycleOperation },
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("request {request_id} was modified by another writer (expected version {expected_version})")]
    Conflict { request_id: RequestId, expected_version: u32 },
    #[error("invalid command payload: {0}")]
    Validation(String),
    #[error("persistence failure: {0}")]
    Persistence(String),
}

/// Stable message classes for the presentation layer: each failure kind maps
/// to exactly one, so callers can tell "you can't do that" from "try again"
/// from "that no longer exists" without matching on variants.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorClass {
    NotPermitted,
    Retryable,
    Gone,
    InvalidInput,
}

impl WorkflowError {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Forbidden { .. } | Self::Domain(DomainError::InvalidTransition { .. }) => {
                ErrorClass::NotPermitted
            }
            Self::Conflict { .. } | Self::Persistence(_) => ErrorClass::Retryable,
            Self::NotFound(_) => ErrorClass::Gone,
            Self::Validation(_) => ErrorClass::InvalidInput,
        }
    }

    pub fn user_message(&self) -> &'static str {
        match self.class() {
            ErrorClass::NotPermitted => "You can't do that with this request.",
            ErrorClass::Retryable => "The request could not be saved. Reload and try again.",
            ErrorClass::Gone => "That request no longer exists.",
            ErrorClass::InvalidInput => "The command input is invalid. Check it and resubmit.",
        }
    }
}
