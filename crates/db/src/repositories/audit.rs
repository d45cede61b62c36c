use chrono::{DateTime, Utc};
use sqlx::Row;

use greenlight_core::audit::{AuditAction, AuditLogEntry, AuditMetadata, FieldChange};
use greenlight_core::domain::actor::UserId;

use super::{AuditLogRepository, RepositoryError};
use crate::DbPool;

pub struct SqlAuditLogRepository {
    pool: DbPool,
}

impl SqlAuditLogRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn decode_err(error: impl std::fmt::Display) -> RepositoryError {
    RepositoryError::Decode(error.to_string())
}

fn row_to_entry(row: &sqlx::sqlite::SqliteRow) -> Result<AuditLogEntry, RepositoryError> {
    let id: String = row.try_get("id").map_err(decode_err)?;
    let action_str: String = row.try_get("action").map_err(decode_err)?;
    let entity_type: String = row.try_get("entity_type").map_err(decode_err)?;
    let entity_id: String = row.try_get("entity_id").map_err(decode_err)?;
    let actor_id: Option<String> = row.try_get("actor_id").map_err(decode_err)?;
    let changes_json: String = row.try_get("changes").map_err(decode_err)?;
    let metadata_json: Option<String> = row.try_get("metadata").map_err(decode_err)?;
    let created_at_str: String = row.try_get("created_at").map_err(decode_err)?;

    let action = AuditAction::parse(&action_str)
        .ok_or_else(|| decode_err(format!("unknown audit action `{action_str}`")))?;
    let changes: Vec<FieldChange> = serde_json::from_str(&changes_json).map_err(decode_err)?;
    // Metadata that fails to decode is treated as absent so old rows still
    // render through the lossy fallback path rather than blocking history.
    let metadata: Option<AuditMetadata> =
        metadata_json.and_then(|raw| serde_json::from_str(&raw).ok());
    let created_at = DateTime::parse_from_rfc3339(&created_at_str)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|error| decode_err(format!("bad timestamp `{created_at_str}`: {error}")))?;

    Ok(AuditLogEntry {
        id,
        action,
        entity_type,
        entity_id,
        actor_id: actor_id.map(UserId),
        changes,
        metadata,
        created_at,
    })
}

#[async_trait::async_trait]
impl AuditLogRepository for SqlAuditLogRepository {
    async fn list_for_entity(
        &self,
        entity_type: &str,
        entity_id: &str,
    ) -> Result<Vec<AuditLogEntry>, RepositoryError> {
        let rows: Vec<sqlx::sqlite::SqliteRow> = sqlx::query(
            "SELECT id, action, entity_type, entity_id, actor_id, changes, metadata, created_at
             FROM audit_log
             WHERE entity_type = ? AND entity_id = ?
             ORDER BY created_at ASC, id ASC",
        )
        .bind(entity_type)
        .bind(entity_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_entry).collect::<Result<Vec<_>, _>>()
    }

    async fn delete(&self, _entry_id: &str) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unsupported("audit log entries are append-only"))
    }
}

#[cfg(test)]
mod tests {
    use greenlight_core::audit::{AuditRecorder, RequestContext};
    use greenlight_core::domain::actor::UserId;
    use greenlight_core::domain::event::EventKind;
    use greenlight_core::domain::request::{Priority, Request, RequestType};

    use super::SqlAuditLogRepository;
    use crate::repositories::{
        AuditLogRepository, RepositoryError, RequestRepository, SqlRequestRepository,
    };
    use crate::{connect_with_settings, migrations};

    async fn setup() -> sqlx::SqlitePool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        pool
    }

    #[tokio::test]
    async fn trail_lists_in_insertion_order_and_round_trips_metadata() {
        let pool = setup().await;
        let recorder = AuditRecorder;

        let mut request = Request::create(
            "Parental leave",
            "Six weeks starting in October",
            RequestType::Leave,
            Priority::High,
            UserId("u-alice".to_string()),
        );
        request.submit().expect("submit");
        request
            .reject(UserId("u-bob".to_string()), Some("dates clash with release".to_string()))
            .expect("reject");

        let entries: Vec<_> = request
            .take_pending_events()
            .iter()
            .map(|event| recorder.record(event, None, RequestContext::default()))
            .collect();

        SqlRequestRepository::new(pool.clone())
            .create(&request, &entries)
            .await
            .expect("persist");

        let repo = SqlAuditLogRepository::new(pool);
        let trail = repo.list_for_entity("request", request.id.as_str()).await.expect("trail");

        assert_eq!(trail.len(), 3);
        let kinds: Vec<_> = trail
            .iter()
            .map(|entry| recorder.reconstruct(entry).kind)
            .collect();
        assert_eq!(
            kinds,
            vec![
                EventKind::RequestCreated,
                EventKind::RequestSubmitted,
                EventKind::RequestRejected,
            ]
        );

        let rejected = recorder.reconstruct(&trail[2]);
        assert!(rejected.description.contains("dates clash with release"));
    }

    #[tokio::test]
    async fn delete_is_refused() {
        let pool = setup().await;
        let repo = SqlAuditLogRepository::new(pool);

        let error = repo.delete("entry-1").await.expect_err("delete must be refused");
        assert!(matches!(error, RepositoryError::Unsupported(_)));
    }
}
