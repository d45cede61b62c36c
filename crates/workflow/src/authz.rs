use greenlight_core::domain::actor::{Actor, Role};
use greenlight_core::domain::request::{LifecycleOperation, Request};
use greenlight_core::errors::WorkflowError;

/// Role gate applied before any aggregate operation runs. Requester-owned
/// operations stay with the requester; review operations require the
/// reviewer role and, once an assignee is pinned, narrow to that assignee.
/// Admins pass every gate.
pub fn authorize(
    operation: LifecycleOperation,
    actor: &Actor,
    request: &Request,
) -> Result<(), WorkflowError> {
    if actor.is_admin() {
        return Ok(());
    }

    let allowed = match operation {
        LifecycleOperation::Submit | LifecycleOperation::Cancel | LifecycleOperation::Reopen => {
            actor.id == request.requester_id
        }
        LifecycleOperation::BeginReview => {
            actor.has_role(Role::Reviewer) && actor.id != request.requester_id
        }
        LifecycleOperation::Approve | LifecycleOperation::Reject => {
            actor.has_role(Role::Reviewer)
                && actor.id != request.requester_id
                && request.assignee_id.as_ref().map_or(true, |assignee| assignee == &actor.id)
        }
    };

    if allowed {
        Ok(())
    } else {
        Err(WorkflowError::Forbidden { actor_id: actor.id.clone(), operation })
    }
}
