use chrono::{DateTime, Utc};
use sqlx::Row;

use greenlight_core::domain::actor::UserId;
use greenlight_core::notifications::{Notification, NotificationKind};

use super::{NotificationFilter, NotificationRepository, RepositoryError};
use crate::DbPool;

pub struct SqlNotificationRepository {
    pool: DbPool,
}

impl SqlNotificationRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn decode_err(error: impl std::fmt::Display) -> RepositoryError {
    RepositoryError::Decode(error.to_string())
}

fn row_to_notification(row: &sqlx::sqlite::SqliteRow) -> Result<Notification, RepositoryError> {
    let id: String = row.try_get("id").map_err(decode_err)?;
    let kind_str: String = row.try_get("kind").map_err(decode_err)?;
    let title: String = row.try_get("title").map_err(decode_err)?;
    let message: String = row.try_get("message").map_err(decode_err)?;
    let recipient_id: String = row.try_get("recipient_id").map_err(decode_err)?;
    let entity_type: String = row.try_get("entity_type").map_err(decode_err)?;
    let entity_id: String = row.try_get("entity_id").map_err(decode_err)?;
    let is_read: i64 = row.try_get("is_read").map_err(decode_err)?;
    let read_at: Option<String> = row.try_get("read_at").map_err(decode_err)?;
    let created_at_str: String = row.try_get("created_at").map_err(decode_err)?;

    let kind = NotificationKind::parse(&kind_str)
        .ok_or_else(|| decode_err(format!("unknown notification kind `{kind_str}`")))?;
    let parse_ts = |raw: &str| {
        DateTime::parse_from_rfc3339(raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|error| decode_err(format!("bad timestamp `{raw}`: {error}")))
    };

    Ok(Notification {
        id,
        kind,
        title,
        message,
        recipient_id: UserId(recipient_id),
        entity_type,
        entity_id,
        read: is_read != 0,
        read_at: read_at.as_deref().map(parse_ts).transpose()?,
        created_at: parse_ts(&created_at_str)?,
    })
}

#[async_trait::async_trait]
impl NotificationRepository for SqlNotificationRepository {
    async fn list_for_recipient(
        &self,
        recipient_id: &UserId,
        filter: NotificationFilter,
    ) -> Result<Vec<Notification>, RepositoryError> {
        let mut sql = String::from(
            "SELECT id, kind, title, message, recipient_id, entity_type, entity_id,
                    is_read, read_at, created_at
             FROM notification
             WHERE recipient_id = ?",
        );
        if filter.unread_only {
            sql.push_str(" AND is_read = 0");
        }
        if filter.kind.is_some() {
            sql.push_str(" AND kind = ?");
        }
        sql.push_str(" ORDER BY created_at DESC, id DESC");
        if filter.limit.is_some() {
            sql.push_str(" LIMIT ?");
        }

        let mut query = sqlx::query(&sql).bind(recipient_id.as_str());
        if let Some(kind) = filter.kind {
            query = query.bind(kind.as_str());
        }
        if let Some(limit) = filter.limit {
            query = query.bind(limit);
        }

        let rows: Vec<sqlx::sqlite::SqliteRow> = query.fetch_all(&self.pool).await?;
        rows.iter().map(row_to_notification).collect::<Result<Vec<_>, _>>()
    }

    async fn unread_count(&self, recipient_id: &UserId) -> Result<u64, RepositoryError> {
        let count: i64 = sqlx::query(
            "SELECT COUNT(*) AS count FROM notification WHERE recipient_id = ? AND is_read = 0",
        )
        .bind(recipient_id.as_str())
        .fetch_one(&self.pool)
        .await?
        .get("count");

        Ok(u64::try_from(count).unwrap_or_default())
    }

    async fn mark_read(
        &self,
        notification_id: &str,
        recipient_id: &UserId,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "UPDATE notification
             SET is_read = 1, read_at = ?
             WHERE id = ? AND recipient_id = ? AND is_read = 0",
        )
        .bind(Utc::now().to_rfc3339())
        .bind(notification_id)
        .bind(recipient_id.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
