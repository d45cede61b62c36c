use std::sync::Arc;

use greenlight_core::domain::actor::UserId;
use greenlight_core::domain::request::{Priority, RequestId, RequestType};
use greenlight_core::errors::{ErrorClass, WorkflowError};
use greenlight_db::repositories::SqlRequestRepository;
use greenlight_workflow::{
    detail_view, ApproveRequest, BeginReview, CancelRequest, CommandContext, CreateRequest,
    InMemoryDirectoryClient, LifecycleService, RejectRequest, ReopenRequest, SubmitRequest,
};

use crate::commands::{parse_actor, run_with_pool, CommandResult};

#[derive(Debug, Clone)]
pub struct ActorSpec {
    pub id: String,
    pub roles: String,
}

#[derive(Debug, Clone)]
pub enum LifecycleCommand {
    Create { title: String, description: String, request_type: String, priority: String },
    Submit { id: String },
    Assign { id: String, to: Option<String> },
    Approve { id: String },
    Reject { id: String, reason: String },
    Cancel { id: String, reason: Option<String> },
    Reopen { id: String },
}

impl LifecycleCommand {
    fn name(&self) -> &'static str {
        match self {
            Self::Create { .. } => "create",
            Self::Submit { .. } => "submit",
            Self::Assign { .. } => "assign",
            Self::Approve { .. } => "approve",
            Self::Reject { .. } => "reject",
            Self::Cancel { .. } => "cancel",
            Self::Reopen { .. } => "reopen",
        }
    }
}

pub fn run(command: LifecycleCommand, actor: ActorSpec) -> CommandResult {
    let name = command.name();
    let ctx = match parse_actor(name, &actor.id, &actor.roles) {
        Ok(actor) => CommandContext::new(actor),
        Err(failure) => return failure,
    };

    run_with_pool(name, |_config, pool| async move {
        let service = LifecycleService::new(Arc::new(SqlRequestRepository::new(pool)));

        let outcome = match command {
            LifecycleCommand::Create { title, description, request_type, priority } => {
                let Some(request_type) = RequestType::parse(&request_type) else {
                    return CommandResult::failure(
                        name,
                        "bad_input",
                        format!(
                            "unknown request type `{request_type}` (expected leave|equipment|expense|access|other)"
                        ),
                        2,
                    );
                };
                let Some(priority) = Priority::parse(&priority) else {
                    return CommandResult::failure(
                        name,
                        "bad_input",
                        format!("unknown priority `{priority}` (expected low|medium|high|urgent)"),
                        2,
                    );
                };
                service
                    .create(CreateRequest { title, description, request_type, priority }, &ctx)
                    .await
            }
            LifecycleCommand::Submit { id } => {
                service.submit(SubmitRequest { request_id: RequestId(id) }, &ctx).await
            }
            LifecycleCommand::Assign { id, to } => {
                service
                    .begin_review(
                        BeginReview { request_id: RequestId(id), assignee_id: to.map(UserId) },
                        &ctx,
                    )
                    .await
            }
            LifecycleCommand::Approve { id } => {
                service.approve(ApproveRequest { request_id: RequestId(id) }, &ctx).await
            }
            LifecycleCommand::Reject { id, reason } => {
                service.reject(RejectRequest { request_id: RequestId(id), reason }, &ctx).await
            }
            LifecycleCommand::Cancel { id, reason } => {
                service.cancel(CancelRequest { request_id: RequestId(id), reason }, &ctx).await
            }
            LifecycleCommand::Reopen { id } => {
                service.reopen(ReopenRequest { request_id: RequestId(id) }, &ctx).await
            }
        };

        match outcome {
            Ok(request) => {
                let view = detail_view(&request, &InMemoryDirectoryClient::default());
                let data = serde_json::to_value(&view).unwrap_or(serde_json::Value::Null);
                CommandResult::success_with_data(
                    name,
                    format!("request {} is now {}", request.id, request.status.as_str()),
                    data,
                )
            }
            Err(error) => workflow_failure(name, &error),
        }
    })
}

pub(crate) fn workflow_failure(command: &str, error: &WorkflowError) -> CommandResult {
    let (error_class, exit_code) = match error.class() {
        ErrorClass::InvalidInput => ("invalid_input", 2),
        ErrorClass::NotPermitted => ("not_permitted", 6),
        ErrorClass::Gone => ("not_found", 7),
        ErrorClass::Retryable => ("retryable", 8),
    };
    CommandResult::failure(
        command,
        error_class,
        format!("{} ({})", error, error.user_message()),
        exit_code,
    )
}

#[cfg(test)]
mod tests {
    use greenlight_core::domain::request::{LifecycleOperation, RequestId, RequestStatus};
    use greenlight_core::errors::{DomainError, WorkflowError};

    use super::workflow_failure;

    #[test]
    fn workflow_failures_map_to_stable_classes_and_exit_codes() {
        let not_found = workflow_failure("submit", &WorkflowError::NotFound(RequestId("x".into())));
        assert_eq!(not_found.exit_code, 7);
        assert!(not_found.output.contains("not_found"));

        let invalid = workflow_failure(
            "approve",
            &WorkflowError::from(DomainError::InvalidTransition {
                status: RequestStatus::Draft,
                operation: LifecycleOperation::Approve,
            }),
        );
        assert_eq!(invalid.exit_code, 6);
        assert!(invalid.output.contains("not_permitted"));

        let conflict = workflow_failure(
            "cancel",
            &WorkflowError::Conflict {
                request_id: RequestId("x".into()),
                expected_version: 2,
            },
        );
        assert_eq!(conflict.exit_code, 8);
        assert!(conflict.output.contains("retryable"));
    }
}
