use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::actor::UserId;
use crate::domain::request::RequestId;

/// Fine-grained event vocabulary shared by the audit trail and the
/// notification feed. Wider than the set the aggregate itself emits:
/// comment/mention kinds arrive from collaborators outside the lifecycle
/// core, and `SystemError` is the explicit "unknown" used when an audit
/// entry can no longer name its origin.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    RequestCreated,
    RequestUpdated,
    RequestSubmitted,
    RequestAssigned,
    RequestApproved,
    RequestRejected,
    RequestCancelled,
    RequestReopened,
    CommentAdded,
    CommentDeleted,
    Mention,
    SystemError,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RequestCreated => "request_created",
            Self::RequestUpdated => "request_updated",
            Self::RequestSubmitted => "request_submitted",
            Self::RequestAssigned => "request_assigned",
            Self::RequestApproved => "request_approved",
            Self::RequestRejected => "request_rejected",
            Self::RequestCancelled => "request_cancelled",
            Self::RequestReopened => "request_reopened",
            Self::CommentAdded => "comment_added",
            Self::CommentDeleted => "comment_deleted",
            Self::Mention => "mention",
            Self::SystemError => "system_error",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "request_created" => Some(Self::RequestCreated),
            "request_updated" => Some(Self::RequestUpdated),
            "request_submitted" => Some(Self::RequestSubmitted),
            "request_assigned" => Some(Self::RequestAssigned),
            "request_approved" => Some(Self::RequestApproved),
            "request_rejected" => Some(Self::RequestRejected),
            "request_cancelled" => Some(Self::RequestCancelled),
            "request_reopened" => Some(Self::RequestReopened),
            "comment_added" => Some(Self::CommentAdded),
            "comment_deleted" => Some(Self::CommentDeleted),
            "mention" => Some(Self::Mention),
            "system_error" => Some(Self::SystemError),
            _ => None,
        }
    }
}

/// An immutable fact describing one completed aggregate transition.
///
/// Events are held in the aggregate's pending queue until the orchestrator
/// commits them; they are never persisted themselves. Audit entries and
/// notifications are derived from them, then the queue is cleared.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DomainEvent {
    RequestCreated {
        event_id: String,
        request_id: RequestId,
        requester_id: UserId,
        occurred_at: DateTime<Utc>,
    },
    RequestSubmitted {
        event_id: String,
        request_id: RequestId,
        requester_id: UserId,
        assignee_id: Option<UserId>,
        submitted_at: DateTime<Utc>,
    },
    RequestAssigned {
        event_id: String,
        request_id: RequestId,
        assignee_id: UserId,
        assigned_by: UserId,
        occurred_at: DateTime<Utc>,
    },
    RequestApproved {
        event_id: String,
        request_id: RequestId,
        reviewer_id: UserId,
        requester_id: UserId,
        approved_at: DateTime<Utc>,
    },
    RequestRejected {
        event_id: String,
        request_id: RequestId,
        reviewer_id: UserId,
        requester_id: UserId,
        rejected_at: DateTime<Utc>,
        reason: Option<String>,
    },
    RequestCancelled {
        event_id: String,
        request_id: RequestId,
        cancelled_by: UserId,
        assignee_id: Option<UserId>,
        reason: Option<String>,
        occurred_at: DateTime<Utc>,
    },
    RequestReopened {
        event_id: String,
        request_id: RequestId,
        reopened_by: UserId,
        occurred_at: DateTime<Utc>,
    },
}

impl DomainEvent {
    pub(crate) fn next_event_id() -> String {
        Uuid::new_v4().to_string()
    }

    pub fn kind(&self) -> EventKind {
        match self {
            Self::RequestCreated { .. } => EventKind::RequestCreated,
            Self::RequestSubmitted { .. } => EventKind::RequestSubmitted,
            Self::RequestAssigned { .. } => EventKind::RequestAssigned,
            Self::RequestApproved { .. } => EventKind::RequestApproved,
            Self::RequestRejected { .. } => EventKind::RequestRejected,
            Self::RequestCancelled { .. } => EventKind::RequestCancelled,
            Self::RequestReopened { .. } => EventKind::RequestReopened,
        }
    }

    pub fn event_id(&self) -> &str {
        match self {
            Self::RequestCreated { event_id, .. }
            | Self::RequestSubmitted { event_id, .. }
            | Self::RequestAssigned { event_id, .. }
            | Self::RequestApproved { event_id, .. }
            | Self::RequestRejected { event_id, .. }
            | Self::RequestCancelled { event_id, .. }
            | Self::RequestReopened { event_id, .. } => event_id,
        }
    }

    pub fn request_id(&self) -> &RequestId {
        match self {
            Self::RequestCreated { request_id, .. }
            | Self::RequestSubmitted { request_id, .. }
            | Self::RequestAssigned { request_id, .. }
            | Self::RequestApproved { request_id, .. }
            | Self::RequestRejected { request_id, .. }
            | Self::RequestCancelled { request_id, .. }
            | Self::RequestReopened { request_id, .. } => request_id,
        }
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            Self::RequestCreated { occurred_at, .. }
            | Self::RequestAssigned { occurred_at, .. }
            | Self::RequestCancelled { occurred_at, .. }
            | Self::RequestReopened { occurred_at, .. } => *occurred_at,
            Self::RequestSubmitted { submitted_at, .. } => *submitted_at,
            Self::RequestApproved { approved_at, .. } => *approved_at,
            Self::RequestRejected { rejected_at, .. } => *rejected_at,
        }
    }

    /// The user the transition is attributed to in audit entries.
    pub fn actor_id(&self) -> &UserId {
        match self {
            Self::RequestCreated { requester_id, .. }
            | Self::RequestSubmitted { requester_id, .. } => requester_id,
            Self::RequestAssigned { assigned_by, .. } => assigned_by,
            Self::RequestApproved { reviewer_id, .. }
            | Self::RequestRejected { reviewer_id, .. } => reviewer_id,
            Self::RequestCancelled { cancelled_by, .. } => cancelled_by,
            Self::RequestReopened { reopened_by, .. } => reopened_by,
        }
    }
}
