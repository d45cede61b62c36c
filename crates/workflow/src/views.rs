use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use greenlight_core::audit::{AuditRecorder, DisplayEvent, ENTITY_REQUEST};
use greenlight_core::domain::actor::UserId;
use greenlight_core::domain::request::{
    Priority, Request, RequestId, RequestStatus, RequestType,
};
use greenlight_core::errors::WorkflowError;
use greenlight_db::repositories::AuditLogRepository;

/// Resolves user ids to display names. The identity provider behind it is
/// an external collaborator; this trait is the whole surface the views need.
pub trait DirectoryClient {
    fn display_name(&self, user_id: &UserId) -> Option<String>;
}

#[derive(Clone, Debug, Default)]
pub struct InMemoryDirectoryClient {
    names: HashMap<String, String>,
}

impl InMemoryDirectoryClient {
    pub fn with_names(entries: Vec<(String, String)>) -> Self {
        Self { names: entries.into_iter().collect() }
    }
}

impl DirectoryClient for InMemoryDirectoryClient {
    fn display_name(&self, user_id: &UserId) -> Option<String> {
        self.names.get(user_id.as_str()).cloned()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorRef {
    pub id: UserId,
    pub display_name: String,
}

/// What the presentation layer renders for one request: current status,
/// timestamps, and actor names resolved from ids.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestDetailView {
    pub id: RequestId,
    pub title: String,
    pub description: String,
    pub request_type: RequestType,
    pub priority: Priority,
    pub status: RequestStatus,
    pub requester: ActorRef,
    pub assignee: Option<ActorRef>,
    pub reviewer: Option<ActorRef>,
    pub attachment_ids: Vec<String>,
    pub version: u32,
    pub submitted_at: Option<DateTime<Utc>>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub fn detail_view(request: &Request, directory: &impl DirectoryClient) -> RequestDetailView {
    let resolve = |user_id: &UserId| ActorRef {
        id: user_id.clone(),
        display_name: directory
            .display_name(user_id)
            .unwrap_or_else(|| user_id.as_str().to_string()),
    };

    RequestDetailView {
        id: request.id.clone(),
        title: request.title.clone(),
        description: request.description.clone(),
        request_type: request.request_type,
        priority: request.priority,
        status: request.status,
        requester: resolve(&request.requester_id),
        assignee: request.assignee_id.as_ref().map(&resolve),
        reviewer: request.reviewer_id.as_ref().map(&resolve),
        attachment_ids: request.attachment_ids.clone(),
        version: request.version,
        submitted_at: request.submitted_at,
        reviewed_at: request.reviewed_at,
        created_at: request.created_at,
        updated_at: request.updated_at,
    }
}

/// The rendered history of one request, oldest first, rebuilt from the
/// stored audit trail.
pub async fn request_history<A>(
    audit_repository: &A,
    request_id: &RequestId,
) -> Result<Vec<DisplayEvent>, WorkflowError>
where
    A: AuditLogRepository,
{
    let recorder = AuditRecorder;
    let entries = audit_repository
        .list_for_entity(ENTITY_REQUEST, request_id.as_str())
        .await
        .map_err(|error| WorkflowError::Persistence(error.to_string()))?;

    Ok(entries.iter().map(|entry| recorder.reconstruct(entry)).collect())
}
