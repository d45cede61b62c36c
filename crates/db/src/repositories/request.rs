use chrono::{DateTime, Utc};
use sqlx::Row;

use greenlight_core::audit::{AuditLogEntry, AuditMetadata, FieldChange};
use greenlight_core::domain::actor::UserId;
use greenlight_core::domain::request::{
    Priority, Request, RequestId, RequestStatus, RequestType,
};
use greenlight_core::notifications::Notification;

use super::{RepositoryError, RequestRepository};
use crate::DbPool;

pub struct SqlRequestRepository {
    pool: DbPool,
}

impl SqlRequestRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn decode_err(error: impl std::fmt::Display) -> RepositoryError {
    RepositoryError::Decode(error.to_string())
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|error| decode_err(format!("bad timestamp `{raw}`: {error}")))
}

fn parse_optional_timestamp(
    raw: Option<String>,
) -> Result<Option<DateTime<Utc>>, RepositoryError> {
    raw.map(|value| parse_timestamp(&value)).transpose()
}

fn row_to_request(row: &sqlx::sqlite::SqliteRow) -> Result<Request, RepositoryError> {
    let id: String = row.try_get("id").map_err(decode_err)?;
    let title: String = row.try_get("title").map_err(decode_err)?;
    let description: String = row.try_get("description").map_err(decode_err)?;
    let request_type_str: String = row.try_get("request_type").map_err(decode_err)?;
    let priority_str: String = row.try_get("priority").map_err(decode_err)?;
    let status_str: String = row.try_get("status").map_err(decode_err)?;
    let requester_id: String = row.try_get("requester_id").map_err(decode_err)?;
    let assignee_id: Option<String> = row.try_get("assignee_id").map_err(decode_err)?;
    let reviewer_id: Option<String> = row.try_get("reviewer_id").map_err(decode_err)?;
    let attachment_ids_json: String = row.try_get("attachment_ids").map_err(decode_err)?;
    let version: i64 = row.try_get("version").map_err(decode_err)?;
    let submitted_at: Option<String> = row.try_get("submitted_at").map_err(decode_err)?;
    let reviewed_at: Option<String> = row.try_get("reviewed_at").map_err(decode_err)?;
    let created_at: String = row.try_get("created_at").map_err(decode_err)?;
    let updated_at: String = row.try_get("updated_at").map_err(decode_err)?;

    let request_type = RequestType::parse(&request_type_str)
        .ok_or_else(|| decode_err(format!("unknown request_type `{request_type_str}`")))?;
    let priority = Priority::parse(&priority_str)
        .ok_or_else(|| decode_err(format!("unknown priority `{priority_str}`")))?;
    let status = RequestStatus::parse(&status_str)
        .ok_or_else(|| decode_err(format!("unknown status `{status_str}`")))?;
    let attachment_ids: Vec<String> =
        serde_json::from_str(&attachment_ids_json).map_err(decode_err)?;
    let version = u32::try_from(version).map_err(decode_err)?;

    Ok(Request::from_parts(
        RequestId(id),
        title,
        description,
        request_type,
        priority,
        status,
        UserId(requester_id),
        assignee_id.map(UserId),
        reviewer_id.map(UserId),
        attachment_ids,
        version,
        parse_optional_timestamp(submitted_at)?,
        parse_optional_timestamp(reviewed_at)?,
        parse_timestamp(&created_at)?,
        parse_timestamp(&updated_at)?,
    ))
}

async fn insert_audit_entry(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    entry: &AuditLogEntry,
) -> Result<(), RepositoryError> {
    let changes = serde_json::to_string::<Vec<FieldChange>>(&entry.changes).map_err(decode_err)?;
    let metadata = entry
        .metadata
        .as_ref()
        .map(serde_json::to_string::<AuditMetadata>)
        .transpose()
        .map_err(decode_err)?;

    sqlx::query(
        "INSERT INTO audit_log (id, action, entity_type, entity_id, actor_id, changes, metadata, created_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&entry.id)
    .bind(entry.action.as_str())
    .bind(&entry.entity_type)
    .bind(&entry.entity_id)
    .bind(entry.actor_id.as_ref().map(|actor| actor.0.as_str()))
    .bind(changes)
    .bind(metadata)
    .bind(entry.created_at.to_rfc3339())
    .execute(&mut **tx)
    .await?;

    Ok(())
}

async fn insert_notification(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    notification: &Notification,
) -> Result<(), RepositoryError> {
    sqlx::query(
        "INSERT INTO notification (id, kind, title, message, recipient_id, entity_type, entity_id, is_read, read_at, created_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&notification.id)
    .bind(notification.kind.as_str())
    .bind(&notification.title)
    .bind(&notification.message)
    .bind(notification.recipient_id.as_str())
    .bind(&notification.entity_type)
    .bind(&notification.entity_id)
    .bind(i64::from(notification.read))
    .bind(notification.read_at.map(|at| at.to_rfc3339()))
    .bind(notification.created_at.to_rfc3339())
    .execute(&mut **tx)
    .await?;

    Ok(())
}

#[async_trait::async_trait]
impl RequestRepository for SqlRequestRepository {
    async fn find_by_id(&self, id: &RequestId) -> Result<Option<Request>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, title, description, request_type, priority, status, requester_id,
                    assignee_id, reviewer_id, attachment_ids, version, submitted_at,
                    reviewed_at, created_at, updated_at
             FROM request WHERE id = ?",
        )
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_request(r)?)),
            None => Ok(None),
        }
    }

    async fn create(
        &self,
        request: &Request,
        audit_entries: &[AuditLogEntry],
    ) -> Result<(), RepositoryError> {
        let attachment_ids = serde_json::to_string(&request.attachment_ids).map_err(decode_err)?;
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO request (id, title, description, request_type, priority, status,
                                  requester_id, assignee_id, reviewer_id, attachment_ids,
                                  version, submitted_at, reviewed_at, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&request.id.0)
        .bind(&request.title)
        .bind(&request.description)
        .bind(request.request_type.as_str())
        .bind(request.priority.as_str())
        .bind(request.status.as_str())
        .bind(request.requester_id.as_str())
        .bind(request.assignee_id.as_ref().map(UserId::as_str))
        .bind(request.reviewer_id.as_ref().map(UserId::as_str))
        .bind(attachment_ids)
        .bind(i64::from(request.version))
        .bind(request.submitted_at.map(|at| at.to_rfc3339()))
        .bind(request.reviewed_at.map(|at| at.to_rfc3339()))
        .bind(request.created_at.to_rfc3339())
        .bind(request.updated_at.to_rfc3339())
        .execute(&mut *tx)
        .await?;

        for entry in audit_entries {
            insert_audit_entry(&mut tx, entry).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn save_transaction(
        &self,
        request: &Request,
        expected_version: u32,
        audit_entries: &[AuditLogEntry],
        notifications: &[Notification],
    ) -> Result<(), RepositoryError> {
        let attachment_ids = serde_json::to_string(&request.attachment_ids).map_err(decode_err)?;
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "UPDATE request
             SET title = ?, description = ?, request_type = ?, priority = ?, status = ?,
                 assignee_id = ?, reviewer_id = ?, attachment_ids = ?, version = ?,
                 submitted_at = ?, reviewed_at = ?, updated_at = ?
             WHERE id = ? AND version = ?",
        )
        .bind(&request.title)
        .bind(&request.description)
        .bind(request.request_type.as_str())
        .bind(request.priority.as_str())
        .bind(request.status.as_str())
        .bind(request.assignee_id.as_ref().map(UserId::as_str))
        .bind(request.reviewer_id.as_ref().map(UserId::as_str))
        .bind(attachment_ids)
        .bind(i64::from(request.version))
        .bind(request.submitted_at.map(|at| at.to_rfc3339()))
        .bind(request.reviewed_at.map(|at| at.to_rfc3339()))
        .bind(request.updated_at.to_rfc3339())
        .bind(&request.id.0)
        .bind(i64::from(expected_version))
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(RepositoryError::Conflict {
                entity_id: request.id.0.clone(),
                expected_version,
            });
        }

        for entry in audit_entries {
            insert_audit_entry(&mut tx, entry).await?;
        }
        for notification in notifications {
            insert_notification(&mut tx, notification).await?;
        }

        tx.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use greenlight_core::audit::{AuditRecorder, RequestContext, StatusChange};
    use greenlight_core::domain::actor::UserId;
    use greenlight_core::domain::request::{Priority, Request, RequestId, RequestStatus, RequestType};
    use greenlight_core::notifications::NotificationDispatcher;

    use super::SqlRequestRepository;
    use crate::repositories::{
        AuditLogRepository, NotificationFilter, NotificationRepository, RepositoryError,
        RequestRepository, SqlAuditLogRepository, SqlNotificationRepository,
    };
    use crate::{connect_with_settings, migrations};

    async fn setup() -> sqlx::SqlitePool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        pool
    }

    fn sample_request() -> Request {
        let mut request = Request::create(
            "Badge access to lab 3",
            "Need after-hours access for the duration of the project",
            RequestType::Access,
            Priority::Medium,
            UserId("u-alice".to_string()),
        );
        request.attachment_ids.push("att-1".to_string());
        request
    }

    async fn persist_draft(pool: &sqlx::SqlitePool, request: &mut Request) {
        let recorder = AuditRecorder;
        let entries: Vec<_> = request
            .take_pending_events()
            .iter()
            .map(|event| recorder.record(event, None, RequestContext::default()))
            .collect();
        SqlRequestRepository::new(pool.clone()).create(request, &entries).await.expect("create");
    }

    #[tokio::test]
    async fn create_and_find_round_trips_all_fields() {
        let pool = setup().await;
        let mut request = sample_request();
        persist_draft(&pool, &mut request).await;

        let repo = SqlRequestRepository::new(pool);
        let found = repo.find_by_id(&request.id).await.expect("find").expect("exists");

        assert_eq!(found.title, request.title);
        assert_eq!(found.request_type, RequestType::Access);
        assert_eq!(found.priority, Priority::Medium);
        assert_eq!(found.status, RequestStatus::Draft);
        assert_eq!(found.attachment_ids, vec!["att-1".to_string()]);
        assert_eq!(found.version, 1);
        assert!(found.pending_events().is_empty());
    }

    #[tokio::test]
    async fn find_missing_request_returns_none() {
        let pool = setup().await;
        let repo = SqlRequestRepository::new(pool);

        let found =
            repo.find_by_id(&RequestId("no-such-request".to_string())).await.expect("query");
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn save_transaction_commits_state_audit_and_notifications_together() {
        let pool = setup().await;
        let mut request = sample_request();
        persist_draft(&pool, &mut request).await;

        let expected_version = request.version;
        request.submit().expect("submit");
        request
            .begin_review(UserId("u-bob".to_string()), UserId("u-bob".to_string()))
            .expect("begin review");

        let recorder = AuditRecorder;
        let dispatcher = NotificationDispatcher;
        let events = request.take_pending_events();
        let entries: Vec<_> = events
            .iter()
            .map(|event| recorder.record(event, None, RequestContext::default()))
            .collect();
        let notifications: Vec<_> = events.iter().flat_map(|event| dispatcher.derive(event)).collect();

        let repo = SqlRequestRepository::new(pool.clone());
        repo.save_transaction(&request, expected_version, &entries, &notifications)
            .await
            .expect("save");

        let found = repo.find_by_id(&request.id).await.expect("find").expect("exists");
        assert_eq!(found.status, RequestStatus::InReview);
        assert_eq!(found.version, 3);

        let audit = SqlAuditLogRepository::new(pool.clone());
        let trail = audit.list_for_entity("request", request.id.as_str()).await.expect("trail");
        // create + submit + assign
        assert_eq!(trail.len(), 3);

        let inbox = SqlNotificationRepository::new(pool);
        let for_bob = inbox
            .list_for_recipient(&UserId("u-bob".to_string()), NotificationFilter::default())
            .await
            .expect("inbox");
        assert_eq!(for_bob.len(), 1);
    }

    #[tokio::test]
    async fn stale_version_yields_conflict_and_persists_nothing() {
        let pool = setup().await;
        let mut request = sample_request();
        persist_draft(&pool, &mut request).await;

        let repo = SqlRequestRepository::new(pool.clone());
        let recorder = AuditRecorder;

        // Writer one advances the row.
        let mut first = repo.find_by_id(&request.id).await.expect("find").expect("exists");
        let first_expected = first.version;
        first.submit().expect("submit");
        let first_events = first.take_pending_events();
        let first_entries: Vec<_> = first_events
            .iter()
            .map(|event| {
                recorder.record(
                    event,
                    Some(StatusChange {
                        from: RequestStatus::Draft,
                        to: RequestStatus::Submitted,
                    }),
                    RequestContext::default(),
                )
            })
            .collect();
        repo.save_transaction(&first, first_expected, &first_entries, &[])
            .await
            .expect("first writer wins");

        // Writer two held the same loaded version and must lose.
        let mut second = sample_request();
        second.id = request.id.clone();
        second.version = first_expected;
        second.cancel(UserId("u-alice".to_string()), None).expect("cancel");
        let second_events = second.take_pending_events();
        let second_entries: Vec<_> = second_events
            .iter()
            .map(|event| recorder.record(event, None, RequestContext::default()))
            .collect();

        let error = repo
            .save_transaction(&second, first_expected, &second_entries, &[])
            .await
            .expect_err("stale writer must conflict");
        assert!(matches!(error, RepositoryError::Conflict { .. }));

        let found = repo.find_by_id(&request.id).await.expect("find").expect("exists");
        assert_eq!(found.status, RequestStatus::Submitted);

        let audit = SqlAuditLogRepository::new(pool);
        let trail = audit.list_for_entity("request", request.id.as_str()).await.expect("trail");
        // create + submit only; the losing cancel left no audit row behind.
        assert_eq!(trail.len(), 2);
    }
}
