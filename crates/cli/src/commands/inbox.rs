use greenlight_core::domain::actor::UserId;
use greenlight_db::repositories::{
    NotificationFilter, NotificationRepository, SqlNotificationRepository,
};

use crate::commands::{run_with_pool, CommandResult};

pub fn run(user: String, unread_only: bool, mark_read: Option<String>) -> CommandResult {
    run_with_pool("inbox", |_config, pool| async move {
        let recipient = UserId(user);
        let repo = SqlNotificationRepository::new(pool);

        if let Some(notification_id) = mark_read {
            return match repo.mark_read(&notification_id, &recipient).await {
                Ok(true) => CommandResult::success(
                    "inbox",
                    format!("notification {notification_id} marked read"),
                ),
                Ok(false) => CommandResult::failure(
                    "inbox",
                    "not_found",
                    format!(
                        "notification {notification_id} does not exist, is already read, or belongs to someone else"
                    ),
                    7,
                ),
                Err(error) => {
                    CommandResult::failure("inbox", "retryable", error.to_string(), 8)
                }
            };
        }

        let filter = NotificationFilter { unread_only, kind: None, limit: Some(50) };
        let feed = match repo.list_for_recipient(&recipient, filter).await {
            Ok(feed) => feed,
            Err(error) => {
                return CommandResult::failure("inbox", "retryable", error.to_string(), 8);
            }
        };
        let unread = match repo.unread_count(&recipient).await {
            Ok(unread) => unread,
            Err(error) => {
                return CommandResult::failure("inbox", "retryable", error.to_string(), 8);
            }
        };

        let message = format!("{} notifications ({} unread)", feed.len(), unread);
        let data = serde_json::json!({
            "unread": unread,
            "notifications": feed,
        });
        CommandResult::success_with_data("inbox", message, data)
    })
}
