use serde::{Deserialize, Serialize};

use greenlight_core::audit::RequestContext;
use greenlight_core::domain::actor::{Actor, UserId};
use greenlight_core::domain::request::{Priority, RequestId, RequestType};
use greenlight_core::errors::WorkflowError;

const MAX_TITLE_LEN: usize = 200;

/// Who is calling and under which session. Carried unchanged into the audit
/// metadata of every entry the command produces.
#[derive(Clone, Debug)]
pub struct CommandContext {
    pub actor: Actor,
    pub request_context: RequestContext,
}

impl CommandContext {
    pub fn new(actor: Actor) -> Self {
        Self { actor, request_context: RequestContext::default() }
    }

    pub fn with_request_context(mut self, request_context: RequestContext) -> Self {
        self.request_context = request_context;
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateRequest {
    pub title: String,
    pub description: String,
    pub request_type: RequestType,
    pub priority: Priority,
}

impl CreateRequest {
    pub fn validate(&self) -> Result<(), WorkflowError> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(WorkflowError::Validation("title must not be empty".to_string()));
        }
        if title.len() > MAX_TITLE_LEN {
            return Err(WorkflowError::Validation(format!(
                "title must be at most {MAX_TITLE_LEN} characters"
            )));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitRequest {
    pub request_id: RequestId,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeginReview {
    pub request_id: RequestId,
    /// Omitted means the caller picks the request up themselves.
    pub assignee_id: Option<UserId>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApproveRequest {
    pub request_id: RequestId,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectRequest {
    pub request_id: RequestId,
    pub reason: String,
}

impl RejectRequest {
    pub fn validate(&self) -> Result<(), WorkflowError> {
        if self.reason.trim().is_empty() {
            return Err(WorkflowError::Validation(
                "a rejection requires a non-empty reason".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelRequest {
    pub request_id: RequestId,
    pub reason: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReopenRequest {
    pub request_id: RequestId,
}
