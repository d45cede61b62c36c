use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::actor::UserId;
use crate::domain::event::{DomainEvent, EventKind};
use crate::domain::request::RequestStatus;

/// Coarse audit vocabulary persisted on every entry. The projection from
/// [`EventKind`] is many-to-one; the fine-grained kind survives in entry
/// metadata so history reconstruction stays exact.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Create,
    Update,
    Delete,
    View,
    Submit,
    Approve,
    Reject,
    Cancel,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::View => "view",
            Self::Submit => "submit",
            Self::Approve => "approve",
            Self::Reject => "reject",
            Self::Cancel => "cancel",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "create" => Some(Self::Create),
            "update" => Some(Self::Update),
            "delete" => Some(Self::Delete),
            "view" => Some(Self::View),
            "submit" => Some(Self::Submit),
            "approve" => Some(Self::Approve),
            "reject" => Some(Self::Reject),
            "cancel" => Some(Self::Cancel),
            _ => None,
        }
    }
}

/// Forward table: fine-grained event kind to the coarse action stored on the
/// entry. Unclassified kinds land on `View`, the safe read-only default.
pub fn action_for(kind: EventKind) -> AuditAction {
    match kind {
        EventKind::RequestCreated => AuditAction::Create,
        EventKind::RequestUpdated | EventKind::RequestAssigned | EventKind::RequestReopened => {
            AuditAction::Update
        }
        EventKind::CommentDeleted => AuditAction::Delete,
        EventKind::RequestSubmitted => AuditAction::Submit,
        EventKind::RequestApproved => AuditAction::Approve,
        EventKind::RequestRejected => AuditAction::Reject,
        EventKind::RequestCancelled => AuditAction::Cancel,
        EventKind::CommentAdded | EventKind::Mention | EventKind::SystemError => AuditAction::View,
    }
}

/// Reverse table used only when an entry carries no metadata. It picks *a*
/// representative kind per action and is deliberately lossy: `Update` cannot
/// know whether it was an assignment or a reopen, and `View` entries come
/// back as `SystemError`, the explicit unknown. Old or hand-edited rows
/// still render instead of failing.
pub fn fallback_kind_for(action: AuditAction) -> EventKind {
    match action {
        AuditAction::Create => EventKind::RequestCreated,
        AuditAction::Update => EventKind::RequestUpdated,
        AuditAction::Delete => EventKind::CommentDeleted,
        AuditAction::Submit => EventKind::RequestSubmitted,
        AuditAction::Approve => EventKind::RequestApproved,
        AuditAction::Reject => EventKind::RequestRejected,
        AuditAction::Cancel => EventKind::RequestCancelled,
        AuditAction::View => EventKind::SystemError,
    }
}

/// Caller-supplied context captured alongside each entry.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestContext {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub session_id: Option<String>,
}

/// The typed payload preserved in entry metadata, one variant per
/// fine-grained event the lifecycle produces. `Unclassified` is the generic
/// fallback for kinds recorded by other subsystems.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EventDetail {
    Created {
        requester_id: UserId,
    },
    Submitted {
        requester_id: UserId,
        submitted_at: DateTime<Utc>,
    },
    Assigned {
        assignee_id: UserId,
        assigned_by: UserId,
    },
    Approved {
        reviewer_id: UserId,
        requester_id: UserId,
    },
    Rejected {
        reviewer_id: UserId,
        requester_id: UserId,
        reason: Option<String>,
    },
    Cancelled {
        cancelled_by: UserId,
        reason: Option<String>,
    },
    Reopened {
        reopened_by: UserId,
    },
    Unclassified {
        event_kind: Option<String>,
        detail: BTreeMap<String, String>,
    },
}

impl EventDetail {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Created { .. } => EventKind::RequestCreated,
            Self::Submitted { .. } => EventKind::RequestSubmitted,
            Self::Assigned { .. } => EventKind::RequestAssigned,
            Self::Approved { .. } => EventKind::RequestApproved,
            Self::Rejected { .. } => EventKind::RequestRejected,
            Self::Cancelled { .. } => EventKind::RequestCancelled,
            Self::Reopened { .. } => EventKind::RequestReopened,
            Self::Unclassified { event_kind, .. } => event_kind
                .as_deref()
                .and_then(EventKind::parse)
                .unwrap_or(EventKind::SystemError),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditMetadata {
    pub detail: EventDetail,
    pub description: String,
    pub context: RequestContext,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldChange {
    pub field: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
}

/// One persisted, append-only audit row. Never mutated after insert.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub id: String,
    pub action: AuditAction,
    pub entity_type: String,
    pub entity_id: String,
    pub actor_id: Option<UserId>,
    pub changes: Vec<FieldChange>,
    pub metadata: Option<AuditMetadata>,
    pub created_at: DateTime<Utc>,
}

/// History item handed to the presentation layer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayEvent {
    pub kind: EventKind,
    pub description: String,
    pub entity_id: String,
    pub actor_id: Option<UserId>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum AuditError {
    #[error("audit log entries are append-only and cannot be deleted")]
    Unsupported,
}

pub const ENTITY_REQUEST: &str = "request";

/// Status values observed around a transition, recorded as the entry's
/// change set.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StatusChange {
    pub from: RequestStatus,
    pub to: RequestStatus,
}

/// Maps domain events to audit entries and entries back to display events.
/// Pure construction both ways; persistence belongs to the orchestrator.
#[derive(Clone, Debug, Default)]
pub struct AuditRecorder;

impl AuditRecorder {
    pub fn record(
        &self,
        event: &DomainEvent,
        status_change: Option<StatusChange>,
        context: RequestContext,
    ) -> AuditLogEntry {
        let kind = event.kind();
        let changes = status_change
            .map(|change| {
                vec![FieldChange {
                    field: "status".to_string(),
                    old_value: Some(change.from.as_str().to_string()),
                    new_value: Some(change.to.as_str().to_string()),
                }]
            })
            .unwrap_or_default();

        AuditLogEntry {
            id: Uuid::new_v4().to_string(),
            action: action_for(kind),
            entity_type: ENTITY_REQUEST.to_string(),
            entity_id: event.request_id().0.clone(),
            actor_id: Some(event.actor_id().clone()),
            changes,
            metadata: Some(AuditMetadata {
                detail: detail_for(event),
                description: describe(event),
                context,
            }),
            created_at: event.occurred_at(),
        }
    }

    /// Rebuild the display event. Prefers the fine-grained metadata; only
    /// entries stripped of metadata go through the lossy reverse table.
    pub fn reconstruct(&self, entry: &AuditLogEntry) -> DisplayEvent {
        match &entry.metadata {
            Some(metadata) => DisplayEvent {
                kind: metadata.detail.kind(),
                description: metadata.description.clone(),
                entity_id: entry.entity_id.clone(),
                actor_id: entry.actor_id.clone(),
                occurred_at: entry.created_at,
            },
            None => {
                let kind = fallback_kind_for(entry.action);
                DisplayEvent {
                    kind,
                    description: format!(
                        "{} action on {} {}",
                        entry.action.as_str(),
                        entry.entity_type,
                        entry.entity_id
                    ),
                    entity_id: entry.entity_id.clone(),
                    actor_id: entry.actor_id.clone(),
                    occurred_at: entry.created_at,
                }
            }
        }
    }

    /// The audit trail is append-only. Deletion is refused unconditionally.
    pub fn delete(&self, _entry_id: &str) -> Result<(), AuditError> {
        Err(AuditError::Unsupported)
    }
}

fn detail_for(event: &DomainEvent) -> EventDetail {
    match event {
        DomainEvent::RequestCreated { requester_id, .. } => {
            EventDetail::Created { requester_id: requester_id.clone() }
        }
        DomainEvent::RequestSubmitted { requester_id, submitted_at, .. } => {
            EventDetail::Submitted {
                requester_id: requester_id.clone(),
                submitted_at: *submitted_at,
            }
        }
        DomainEvent::RequestAssigned { assignee_id, assigned_by, .. } => EventDetail::Assigned {
            assignee_id: assignee_id.clone(),
            assigned_by: assigned_by.clone(),
        },
        DomainEvent::RequestApproved { reviewer_id, requester_id, .. } => EventDetail::Approved {
            reviewer_id: reviewer_id.clone(),
            requester_id: requester_id.clone(),
        },
        DomainEvent::RequestRejected { reviewer_id, requester_id, reason, .. } => {
            EventDetail::Rejected {
                reviewer_id: reviewer_id.clone(),
                requester_id: requester_id.clone(),
                reason: reason.clone(),
            }
        }
        DomainEvent::RequestCancelled { cancelled_by, reason, .. } => EventDetail::Cancelled {
            cancelled_by: cancelled_by.clone(),
            reason: reason.clone(),
        },
        DomainEvent::RequestReopened { reopened_by, .. } => {
            EventDetail::Reopened { reopened_by: reopened_by.clone() }
        }
    }
}

fn describe(event: &DomainEvent) -> String {
    match event {
        DomainEvent::RequestCreated { requester_id, .. } => {
            format!("request created by {requester_id}")
        }
        DomainEvent::RequestSubmitted { requester_id, .. } => {
            format!("request submitted for review by {requester_id}")
        }
        DomainEvent::RequestAssigned { assignee_id, .. } => {
            format!("request assigned to {assignee_id} for review")
        }
        DomainEvent::RequestApproved { reviewer_id, .. } => {
            format!("request approved by {reviewer_id}")
        }
        DomainEvent::RequestRejected { reviewer_id, reason, .. } => match reason {
            Some(reason) => format!("request rejected by {reviewer_id}: {reason}"),
            None => format!("request rejected by {reviewer_id}"),
        },
        DomainEvent::RequestCancelled { cancelled_by, reason, .. } => match reason {
            Some(reason) => format!("request cancelled by {cancelled_by}: {reason}"),
            None => format!("request cancelled by {cancelled_by}"),
        },
        DomainEvent::RequestReopened { reopened_by, .. } => {
            format!("request reopened as draft by {reopened_by}")
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::{
        action_for, fallback_kind_for, AuditAction, AuditError, AuditRecorder, EventDetail,
        RequestContext, StatusChange,
    };
    use crate::domain::actor::UserId;
    use crate::domain::event::{DomainEvent, EventKind};
    use crate::domain::request::{RequestId, RequestStatus};

    fn rejected_event() -> DomainEvent {
        DomainEvent::RequestRejected {
            event_id: "evt-1".to_string(),
            request_id: RequestId("REQ-7".to_string()),
            reviewer_id: UserId("u-reviewer".to_string()),
            requester_id: UserId("u-requester".to_string()),
            rejected_at: Utc::now(),
            reason: Some("insufficient budget".to_string()),
        }
    }

    #[test]
    fn forward_table_projects_every_kind() {
        assert_eq!(action_for(EventKind::RequestCreated), AuditAction::Create);
        assert_eq!(action_for(EventKind::RequestUpdated), AuditAction::Update);
        assert_eq!(action_for(EventKind::RequestAssigned), AuditAction::Update);
        assert_eq!(action_for(EventKind::RequestReopened), AuditAction::Update);
        assert_eq!(action_for(EventKind::CommentDeleted), AuditAction::Delete);
        assert_eq!(action_for(EventKind::RequestSubmitted), AuditAction::Submit);
        assert_eq!(action_for(EventKind::RequestApproved), AuditAction::Approve);
        assert_eq!(action_for(EventKind::RequestRejected), AuditAction::Reject);
        assert_eq!(action_for(EventKind::RequestCancelled), AuditAction::Cancel);
        assert_eq!(action_for(EventKind::CommentAdded), AuditAction::View);
        assert_eq!(action_for(EventKind::Mention), AuditAction::View);
        assert_eq!(action_for(EventKind::SystemError), AuditAction::View);
    }

    #[test]
    fn reverse_table_yields_a_representative_kind_per_action() {
        assert_eq!(fallback_kind_for(AuditAction::Create), EventKind::RequestCreated);
        assert_eq!(fallback_kind_for(AuditAction::Update), EventKind::RequestUpdated);
        assert_eq!(fallback_kind_for(AuditAction::Delete), EventKind::CommentDeleted);
        assert_eq!(fallback_kind_for(AuditAction::Submit), EventKind::RequestSubmitted);
        assert_eq!(fallback_kind_for(AuditAction::Approve), EventKind::RequestApproved);
        assert_eq!(fallback_kind_for(AuditAction::Reject), EventKind::RequestRejected);
        assert_eq!(fallback_kind_for(AuditAction::Cancel), EventKind::RequestCancelled);
        assert_eq!(fallback_kind_for(AuditAction::View), EventKind::SystemError);
    }

    #[test]
    fn record_preserves_reason_and_status_change() {
        let recorder = AuditRecorder;
        let entry = recorder.record(
            &rejected_event(),
            Some(StatusChange { from: RequestStatus::InReview, to: RequestStatus::Rejected }),
            RequestContext {
                ip_address: Some("10.0.0.9".to_string()),
                user_agent: None,
                session_id: Some("sess-12".to_string()),
            },
        );

        assert_eq!(entry.action, AuditAction::Reject);
        assert_eq!(entry.entity_id, "REQ-7");
        assert_eq!(entry.actor_id.as_ref().map(UserId::as_str), Some("u-reviewer"));
        assert_eq!(entry.changes.len(), 1);
        assert_eq!(entry.changes[0].old_value.as_deref(), Some("in_review"));
        assert_eq!(entry.changes[0].new_value.as_deref(), Some("rejected"));

        let metadata = entry.metadata.expect("metadata is always recorded");
        assert!(metadata.description.contains("insufficient budget"));
        assert_eq!(metadata.context.session_id.as_deref(), Some("sess-12"));
        assert!(matches!(
            metadata.detail,
            EventDetail::Rejected { ref reason, .. } if reason.as_deref() == Some("insufficient budget")
        ));
    }

    #[test]
    fn reconstruct_round_trips_the_fine_grained_kind() {
        let recorder = AuditRecorder;
        let events = [
            rejected_event(),
            DomainEvent::RequestReopened {
                event_id: "evt-2".to_string(),
                request_id: RequestId("REQ-7".to_string()),
                reopened_by: UserId("u-requester".to_string()),
                occurred_at: Utc::now(),
            },
            DomainEvent::RequestAssigned {
                event_id: "evt-3".to_string(),
                request_id: RequestId("REQ-7".to_string()),
                assignee_id: UserId("u-reviewer".to_string()),
                assigned_by: UserId("u-lead".to_string()),
                occurred_at: Utc::now(),
            },
        ];

        for event in &events {
            let entry = recorder.record(event, None, RequestContext::default());
            let display = recorder.reconstruct(&entry);
            assert_eq!(display.kind, event.kind(), "round trip for {:?}", event.kind());
            assert_eq!(display.entity_id, "REQ-7");
        }
    }

    #[test]
    fn entries_without_metadata_fall_back_lossily_but_render() {
        let recorder = AuditRecorder;
        let mut entry = recorder.record(
            &DomainEvent::RequestReopened {
                event_id: "evt-4".to_string(),
                request_id: RequestId("REQ-9".to_string()),
                reopened_by: UserId("u-requester".to_string()),
                occurred_at: Utc::now(),
            },
            None,
            RequestContext::default(),
        );
        entry.metadata = None;

        let display = recorder.reconstruct(&entry);
        // Reopened was stored as the coarse `update`; without metadata the
        // reverse table can only say "updated".
        assert_eq!(display.kind, EventKind::RequestUpdated);
        assert!(display.description.contains("update"));
    }

    #[test]
    fn unclassified_metadata_with_unknown_kind_reads_as_system_error() {
        let detail = EventDetail::Unclassified {
            event_kind: Some("legacy.webhook".to_string()),
            detail: Default::default(),
        };
        assert_eq!(detail.kind(), EventKind::SystemError);

        let recognized = EventDetail::Unclassified {
            event_kind: Some("comment_added".to_string()),
            detail: Default::default(),
        };
        assert_eq!(recognized.kind(), EventKind::CommentAdded);
    }

    #[test]
    fn delete_is_always_unsupported() {
        let recorder = AuditRecorder;
        assert_eq!(recorder.delete("any-entry"), Err(AuditError::Unsupported));
    }
}
