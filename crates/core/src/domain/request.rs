use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::actor::UserId;
use crate::domain::event::DomainEvent;
use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(pub String);

impl RequestId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestType {
    Leave,
    Equipment,
    Expense,
    Access,
    Other,
}

impl RequestType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Leave => "leave",
            Self::Equipment => "equipment",
            Self::Expense => "expense",
            Self::Access => "access",
            Self::Other => "other",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "leave" => Some(Self::Leave),
            "equipment" => Some(Self::Equipment),
            "expense" => Some(Self::Expense),
            "access" => Some(Self::Access),
            "other" => Some(Self::Other),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
    Urgent,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Urgent => "urgent",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            "urgent" => Some(Self::Urgent),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Draft,
    Submitted,
    InReview,
    Approved,
    Rejected,
    Cancelled,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Submitted => "submitted",
            Self::InReview => "in_review",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "draft" => Some(Self::Draft),
            "submitted" => Some(Self::Submitted),
            "in_review" => Some(Self::InReview),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleOperation {
    Submit,
    BeginReview,
    Approve,
    Reject,
    Cancel,
    Reopen,
}

impl LifecycleOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Submit => "submit",
            Self::BeginReview => "begin_review",
            Self::Approve => "approve",
            Self::Reject => "reject",
            Self::Cancel => "cancel",
            Self::Reopen => "reopen",
        }
    }

    /// The full precondition table for the lifecycle. Decisions are accepted
    /// straight from `Submitted`: explicit review pickup pins an assignee but
    /// is not required before approving or rejecting.
    pub fn accepts(&self, status: RequestStatus) -> bool {
        matches!(
            (self, status),
            (Self::Submit, RequestStatus::Draft)
                | (Self::BeginReview, RequestStatus::Submitted)
                | (Self::Approve, RequestStatus::Submitted | RequestStatus::InReview)
                | (Self::Reject, RequestStatus::Submitted | RequestStatus::InReview)
                | (
                    Self::Cancel,
                    RequestStatus::Draft | RequestStatus::Submitted | RequestStatus::InReview
                )
                | (Self::Reopen, RequestStatus::Rejected | RequestStatus::Cancelled)
        )
    }
}

/// The aggregate root of the approval workflow.
///
/// All mutations go through the named transition operations below. Each
/// successful operation bumps the version counter, applies its effects, and
/// appends exactly one event to the pending queue. The queue is drained by
/// the orchestrator after a confirmed durable write; the aggregate never
/// clears it on its own.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    pub id: RequestId,
    pub title: String,
    pub description: String,
    pub request_type: RequestType,
    pub priority: Priority,
    pub status: RequestStatus,
    pub requester_id: UserId,
    pub assignee_id: Option<UserId>,
    pub reviewer_id: Option<UserId>,
    pub attachment_ids: Vec<String>,
    pub version: u32,
    pub submitted_at: Option<DateTime<Utc>>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip)]
    pending_events: Vec<DomainEvent>,
}

impl Request {
    pub fn create(
        title: impl Into<String>,
        description: impl Into<String>,
        request_type: RequestType,
        priority: Priority,
        requester_id: UserId,
    ) -> Self {
        let now = Utc::now();
        let id = RequestId::generate();
        let created = DomainEvent::RequestCreated {
            event_id: DomainEvent::next_event_id(),
            request_id: id.clone(),
            requester_id: requester_id.clone(),
            occurred_at: now,
        };

        Self {
            id,
            title: title.into(),
            description: description.into(),
            request_type,
            priority,
            status: RequestStatus::Draft,
            requester_id,
            assignee_id: None,
            reviewer_id: None,
            attachment_ids: Vec::new(),
            version: 1,
            submitted_at: None,
            reviewed_at: None,
            created_at: now,
            updated_at: now,
            pending_events: vec![created],
        }
    }

    /// Hydrate from storage without queuing any event.
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        id: RequestId,
        title: String,
        description: String,
        request_type: RequestType,
        priority: Priority,
        status: RequestStatus,
        requester_id: UserId,
        assignee_id: Option<UserId>,
        reviewer_id: Option<UserId>,
        attachment_ids: Vec<String>,
        version: u32,
        submitted_at: Option<DateTime<Utc>>,
        reviewed_at: Option<DateTime<Utc>>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            title,
            description,
            request_type,
            priority,
            status,
            requester_id,
            assignee_id,
            reviewer_id,
            attachment_ids,
            version,
            submitted_at,
            reviewed_at,
            created_at,
            updated_at,
            pending_events: Vec::new(),
        }
    }

    pub fn submit(&mut self) -> Result<(), DomainError> {
        self.guard(LifecycleOperation::Submit)?;

        let now = Utc::now();
        self.status = RequestStatus::Submitted;
        if self.submitted_at.is_none() {
            self.submitted_at = Some(now);
        }
        self.touch(now);

        let submitted_at = self.submitted_at.unwrap_or(now);
        self.pending_events.push(DomainEvent::RequestSubmitted {
            event_id: DomainEvent::next_event_id(),
            request_id: self.id.clone(),
            requester_id: self.requester_id.clone(),
            assignee_id: self.assignee_id.clone(),
            submitted_at,
        });
        Ok(())
    }

    pub fn begin_review(
        &mut self,
        assignee_id: UserId,
        assigned_by: UserId,
    ) -> Result<(), DomainError> {
        self.guard(LifecycleOperation::BeginReview)?;

        let now = Utc::now();
        self.status = RequestStatus::InReview;
        self.assignee_id = Some(assignee_id.clone());
        self.touch(now);

        self.pending_events.push(DomainEvent::RequestAssigned {
            event_id: DomainEvent::next_event_id(),
            request_id: self.id.clone(),
            assignee_id,
            assigned_by,
            occurred_at: now,
        });
        Ok(())
    }

    pub fn approve(&mut self, reviewer_id: UserId) -> Result<(), DomainError> {
        self.guard(LifecycleOperation::Approve)?;

        let now = Utc::now();
        self.status = RequestStatus::Approved;
        self.reviewer_id = Some(reviewer_id.clone());
        self.reviewed_at = Some(now);
        self.touch(now);

        self.pending_events.push(DomainEvent::RequestApproved {
            event_id: DomainEvent::next_event_id(),
            request_id: self.id.clone(),
            reviewer_id,
            requester_id: self.requester_id.clone(),
            approved_at: now,
        });
        Ok(())
    }

    pub fn reject(
        &mut self,
        reviewer_id: UserId,
        reason: Option<String>,
    ) -> Result<(), DomainError> {
        self.guard(LifecycleOperation::Reject)?;

        let now = Utc::now();
        self.status = RequestStatus::Rejected;
        self.reviewer_id = Some(reviewer_id.clone());
        self.reviewed_at = Some(now);
        self.touch(now);

        self.pending_events.push(DomainEvent::RequestRejected {
            event_id: DomainEvent::next_event_id(),
            request_id: self.id.clone(),
            reviewer_id,
            requester_id: self.requester_id.clone(),
            rejected_at: now,
            reason,
        });
        Ok(())
    }

    pub fn cancel(
        &mut self,
        cancelled_by: UserId,
        reason: Option<String>,
    ) -> Result<(), DomainError> {
        self.guard(LifecycleOperation::Cancel)?;

        let now = Utc::now();
        self.status = RequestStatus::Cancelled;
        self.touch(now);

        self.pending_events.push(DomainEvent::RequestCancelled {
            event_id: DomainEvent::next_event_id(),
            request_id: self.id.clone(),
            cancelled_by,
            assignee_id: self.assignee_id.clone(),
            reason,
            occurred_at: now,
        });
        Ok(())
    }

    pub fn reopen(&mut self, reopened_by: UserId) -> Result<(), DomainError> {
        self.guard(LifecycleOperation::Reopen)?;

        let now = Utc::now();
        self.status = RequestStatus::Draft;
        self.reviewer_id = None;
        self.reviewed_at = None;
        self.submitted_at = None;
        self.touch(now);

        self.pending_events.push(DomainEvent::RequestReopened {
            event_id: DomainEvent::next_event_id(),
            request_id: self.id.clone(),
            reopened_by,
            occurred_at: now,
        });
        Ok(())
    }

    pub fn pending_events(&self) -> &[DomainEvent] {
        &self.pending_events
    }

    /// Drain the pending queue. Called by the orchestrator only after the
    /// durable write succeeded, so a transition can never double-derive its
    /// projections or silently drop them.
    pub fn take_pending_events(&mut self) -> Vec<DomainEvent> {
        std::mem::take(&mut self.pending_events)
    }

    fn guard(&self, operation: LifecycleOperation) -> Result<(), DomainError> {
        if operation.accepts(self.status) {
            return Ok(());
        }
        Err(DomainError::InvalidTransition { status: self.status, operation })
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.version = self.version.saturating_add(1);
        self.updated_at = now;
    }
}
