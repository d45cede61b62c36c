use greenlight_core::domain::request::RequestId;
use greenlight_core::errors::WorkflowError;
use greenlight_db::repositories::{
    RequestRepository, SqlAuditLogRepository, SqlRequestRepository,
};
use greenlight_workflow::{detail_view, request_history, InMemoryDirectoryClient};

use crate::commands::{run_with_pool, CommandResult};

use super::request::workflow_failure;

pub fn run(id: String) -> CommandResult {
    run_with_pool("show", |_config, pool| async move {
        let request_id = RequestId(id);
        let repo = SqlRequestRepository::new(pool.clone());

        let request = match repo.find_by_id(&request_id).await {
            Ok(Some(request)) => request,
            Ok(None) => {
                return workflow_failure("show", &WorkflowError::NotFound(request_id));
            }
            Err(error) => {
                return workflow_failure(
                    "show",
                    &WorkflowError::Persistence(error.to_string()),
                );
            }
        };

        let audit_repo = SqlAuditLogRepository::new(pool);
        let history = match request_history(&audit_repo, &request_id).await {
            Ok(history) => history,
            Err(error) => return workflow_failure("show", &error),
        };

        let view = detail_view(&request, &InMemoryDirectoryClient::default());
        let data = serde_json::json!({
            "request": view,
            "history": history,
        });
        CommandResult::success_with_data(
            "show",
            format!("request {} ({} history events)", request.id, history.len()),
            data,
        )
    })
}
