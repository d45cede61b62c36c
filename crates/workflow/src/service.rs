use std::sync::Arc;

use tracing::{info, warn};

use greenlight_core::audit::{AuditRecorder, StatusChange};
use greenlight_core::domain::request::{LifecycleOperation, Request, RequestId};
use greenlight_core::errors::{DomainError, WorkflowError};
use greenlight_core::notifications::NotificationDispatcher;
use greenlight_db::repositories::{RepositoryError, RequestRepository};

use crate::authz::authorize;
use crate::commands::{
    ApproveRequest, BeginReview, CancelRequest, CommandContext, CreateRequest, RejectRequest,
    ReopenRequest, SubmitRequest,
};

/// The single entry point for lifecycle commands and the transactional
/// boundary around them: load, authorize, mutate, derive projections,
/// persist atomically, then clear the aggregate's pending queue.
///
/// The service never retries. Deterministic failures go straight back to
/// the caller; a `Conflict` means another writer advanced the request and
/// the caller should reload before resubmitting.
pub struct LifecycleService<R> {
    repository: Arc<R>,
    recorder: AuditRecorder,
    dispatcher: NotificationDispatcher,
}

impl<R> LifecycleService<R>
where
    R: RequestRepository,
{
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository, recorder: AuditRecorder, dispatcher: NotificationDispatcher }
    }

    pub async fn create(
        &self,
        command: CreateRequest,
        ctx: &CommandContext,
    ) -> Result<Request, WorkflowError> {
        command.validate()?;

        let mut request = Request::create(
            command.title.trim(),
            command.description,
            command.request_type,
            command.priority,
            ctx.actor.id.clone(),
        );

        let audit_entries: Vec<_> = request
            .pending_events()
            .iter()
            .map(|event| self.recorder.record(event, None, ctx.request_context.clone()))
            .collect();

        self.repository
            .create(&request, &audit_entries)
            .await
            .map_err(|error| map_repository_error(error, &request.id, request.version))?;

        let committed = request.take_pending_events();
        info!(
            event_name = "workflow.request_created",
            request_id = %request.id,
            actor_id = %ctx.actor.id,
            events = committed.len(),
            "request created as draft"
        );
        Ok(request)
    }

    pub async fn submit(
        &self,
        command: SubmitRequest,
        ctx: &CommandContext,
    ) -> Result<Request, WorkflowError> {
        self.apply(&command.request_id, LifecycleOperation::Submit, ctx, |request| {
            request.submit()
        })
        .await
    }

    pub async fn begin_review(
        &self,
        command: BeginReview,
        ctx: &CommandContext,
    ) -> Result<Request, WorkflowError> {
        let assignee_id = command.assignee_id.unwrap_or_else(|| ctx.actor.id.clone());
        let assigned_by = ctx.actor.id.clone();
        self.apply(&command.request_id, LifecycleOperation::BeginReview, ctx, move |request| {
            request.begin_review(assignee_id, assigned_by)
        })
        .await
    }

    pub async fn approve(
        &self,
        command: ApproveRequest,
        ctx: &CommandContext,
    ) -> Result<Request, WorkflowError> {
        let reviewer_id = ctx.actor.id.clone();
        self.apply(&command.request_id, LifecycleOperation::Approve, ctx, move |request| {
            request.approve(reviewer_id)
        })
        .await
    }

    pub async fn reject(
        &self,
        command: RejectRequest,
        ctx: &CommandContext,
    ) -> Result<Request, WorkflowError> {
        command.validate()?;
        let reviewer_id = ctx.actor.id.clone();
        let reason = command.reason.trim().to_string();
        self.apply(&command.request_id, LifecycleOperation::Reject, ctx, move |request| {
            request.reject(reviewer_id, Some(reason))
        })
        .await
    }

    pub async fn cancel(
        &self,
        command: CancelRequest,
        ctx: &CommandContext,
    ) -> Result<Request, WorkflowError> {
        let cancelled_by = ctx.actor.id.clone();
        self.apply(&command.request_id, LifecycleOperation::Cancel, ctx, move |request| {
            request.cancel(cancelled_by, command.reason)
        })
        .await
    }

    pub async fn reopen(
        &self,
        command: ReopenRequest,
        ctx: &CommandContext,
    ) -> Result<Request, WorkflowError> {
        let reopened_by = ctx.actor.id.clone();
        self.apply(&command.request_id, LifecycleOperation::Reopen, ctx, move |request| {
            request.reopen(reopened_by)
        })
        .await
    }

    /// The shared command pipeline. Steps 1-3 have no observable side
    /// effects, so a failure there leaves nothing to undo; only the
    /// conditional write in step 5 touches storage.
    async fn apply<F>(
        &self,
        request_id: &RequestId,
        operation: LifecycleOperation,
        ctx: &CommandContext,
        mutate: F,
    ) -> Result<Request, WorkflowError>
    where
        F: FnOnce(&mut Request) -> Result<(), DomainError>,
    {
        let mut request = self
            .repository
            .find_by_id(request_id)
            .await
            .map_err(|error| map_repository_error(error, request_id, 0))?
            .ok_or_else(|| WorkflowError::NotFound(request_id.clone()))?;

        authorize(operation, &ctx.actor, &request)?;

        let prior_status = request.status;
        let expected_version = request.version;
        mutate(&mut request)?;

        let events = request.pending_events().to_vec();
        let status_change = StatusChange { from: prior_status, to: request.status };
        let audit_entries: Vec<_> = events
            .iter()
            .map(|event| {
                self.recorder.record(event, Some(status_change), ctx.request_context.clone())
            })
            .collect();
        let notifications: Vec<_> =
            events.iter().flat_map(|event| self.dispatcher.derive(event)).collect();

        if let Err(error) = self
            .repository
            .save_transaction(&request, expected_version, &audit_entries, &notifications)
            .await
        {
            let mapped = map_repository_error(error, request_id, expected_version);
            if matches!(mapped, WorkflowError::Conflict { .. }) {
                warn!(
                    event_name = "workflow.transition_conflict",
                    request_id = %request_id,
                    operation = operation.as_str(),
                    actor_id = %ctx.actor.id,
                    expected_version,
                    "conditional write lost to a concurrent writer"
                );
            }
            return Err(mapped);
        }

        // Queue cleared only after the write is durable: derivation never
        // double-fires for one transition and never silently drops one.
        let committed = request.take_pending_events();
        info!(
            event_name = "workflow.transition_applied",
            request_id = %request.id,
            operation = operation.as_str(),
            actor_id = %ctx.actor.id,
            from = prior_status.as_str(),
            to = request.status.as_str(),
            events = committed.len(),
            notifications = notifications.len(),
            "lifecycle transition committed"
        );
        Ok(request)
    }
}

fn map_repository_error(
    error: RepositoryError,
    request_id: &RequestId,
    expected_version: u32,
) -> WorkflowError {
    match error {
        RepositoryError::Conflict { .. } => {
            WorkflowError::Conflict { request_id: request_id.clone(), expected_version }
        }
        other => WorkflowError::Persistence(other.to_string()),
    }
}
