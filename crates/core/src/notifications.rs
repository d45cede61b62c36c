use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::audit::ENTITY_REQUEST;
use crate::domain::actor::UserId;
use crate::domain::event::DomainEvent;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    RequestSubmitted,
    RequestApproved,
    RequestRejected,
    RequestAssigned,
    CommentAdded,
    Mention,
    System,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RequestSubmitted => "request_submitted",
            Self::RequestApproved => "request_approved",
            Self::RequestRejected => "request_rejected",
            Self::RequestAssigned => "request_assigned",
            Self::CommentAdded => "comment_added",
            Self::Mention => "mention",
            Self::System => "system",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "request_submitted" => Some(Self::RequestSubmitted),
            "request_approved" => Some(Self::RequestApproved),
            "request_rejected" => Some(Self::RequestRejected),
            "request_assigned" => Some(Self::RequestAssigned),
            "comment_added" => Some(Self::CommentAdded),
            "mention" => Some(Self::Mention),
            "system" => Some(Self::System),
            _ => None,
        }
    }
}

/// One feed item for one recipient. Only the recipient flips the read flag;
/// nothing else rewrites a notification after insert.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub recipient_id: UserId,
    pub entity_type: String,
    pub entity_id: String,
    pub read: bool,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn mark_read(&mut self, now: DateTime<Utc>) {
        if !self.read {
            self.read = true;
            self.read_at = Some(now);
        }
    }
}

/// Derives recipient notifications from domain events. Pure: the orchestrator
/// calls it exactly once per queued event before the queue is cleared, which
/// is what keeps retries from duplicating deliveries.
#[derive(Clone, Debug, Default)]
pub struct NotificationDispatcher;

impl NotificationDispatcher {
    pub fn derive(&self, event: &DomainEvent) -> Vec<Notification> {
        match event {
            DomainEvent::RequestSubmitted { request_id, assignee_id, requester_id, .. } => {
                match assignee_id {
                    Some(assignee) => vec![notification(
                        NotificationKind::RequestSubmitted,
                        "Request awaiting review",
                        format!(
                            "Request {request_id} from {requester_id} was submitted and awaits your review."
                        ),
                        assignee.clone(),
                        request_id.0.clone(),
                        event.occurred_at(),
                    )],
                    // Nobody to notify until review pickup names an assignee.
                    None => Vec::new(),
                }
            }
            DomainEvent::RequestAssigned { request_id, assignee_id, assigned_by, .. } => {
                vec![notification(
                    NotificationKind::RequestAssigned,
                    "Request assigned to you",
                    format!("Request {request_id} was assigned to you by {assigned_by}."),
                    assignee_id.clone(),
                    request_id.0.clone(),
                    event.occurred_at(),
                )]
            }
            DomainEvent::RequestApproved { request_id, requester_id, reviewer_id, .. } => {
                vec![notification(
                    NotificationKind::RequestApproved,
                    "Request approved",
                    format!("Your request {request_id} was approved by {reviewer_id}."),
                    requester_id.clone(),
                    request_id.0.clone(),
                    event.occurred_at(),
                )]
            }
            DomainEvent::RequestRejected { request_id, requester_id, reviewer_id, reason, .. } => {
                let message = match reason {
                    Some(reason) => format!(
                        "Your request {request_id} was rejected by {reviewer_id}: {reason}"
                    ),
                    None => format!("Your request {request_id} was rejected by {reviewer_id}."),
                };
                vec![notification(
                    NotificationKind::RequestRejected,
                    "Request rejected",
                    message,
                    requester_id.clone(),
                    request_id.0.clone(),
                    event.occurred_at(),
                )]
            }
            DomainEvent::RequestCancelled { request_id, cancelled_by, assignee_id, .. } => {
                match assignee_id {
                    Some(assignee) if assignee != cancelled_by => vec![notification(
                        NotificationKind::System,
                        "Request cancelled",
                        format!("Request {request_id} was cancelled by {cancelled_by}."),
                        assignee.clone(),
                        request_id.0.clone(),
                        event.occurred_at(),
                    )],
                    _ => Vec::new(),
                }
            }
            DomainEvent::RequestCreated { .. } | DomainEvent::RequestReopened { .. } => Vec::new(),
        }
    }
}

fn notification(
    kind: NotificationKind,
    title: &str,
    message: String,
    recipient_id: UserId,
    entity_id: String,
    created_at: DateTime<Utc>,
) -> Notification {
    Notification {
        id: Uuid::new_v4().to_string(),
        kind,
        title: title.to_string(),
        message,
        recipient_id,
        entity_type: ENTITY_REQUEST.to_string(),
        entity_id,
        read: false,
        read_at: None,
        created_at,
    }
}
