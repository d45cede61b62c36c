use std::collections::HashMap;

use tokio::sync::RwLock;

use chrono::Utc;
use greenlight_core::audit::AuditLogEntry;
use greenlight_core::domain::actor::UserId;
use greenlight_core::domain::request::{Request, RequestId};
use greenlight_core::notifications::Notification;

use super::{
    AuditLogRepository, NotificationFilter, NotificationRepository, RepositoryError,
    RequestRepository,
};

#[derive(Default)]
struct StoreInner {
    requests: HashMap<String, Request>,
    audit_entries: Vec<AuditLogEntry>,
    notifications: Vec<Notification>,
}

/// One store backing all three repository traits, so the transactional
/// contract (state + audit + notifications land together or not at all) can
/// be exercised without a database. Mirrors the SQL repositories' version
/// check exactly.
#[derive(Default)]
pub struct InMemoryWorkflowStore {
    inner: RwLock<StoreInner>,
}

impl InMemoryWorkflowStore {
    fn normalized(request: &Request) -> Request {
        let mut stored = request.clone();
        stored.take_pending_events();
        stored
    }
}

#[async_trait::async_trait]
impl RequestRepository for InMemoryWorkflowStore {
    async fn find_by_id(&self, id: &RequestId) -> Result<Option<Request>, RepositoryError> {
        let inner = self.inner.read().await;
        Ok(inner.requests.get(&id.0).cloned())
    }

    async fn create(
        &self,
        request: &Request,
        audit_entries: &[AuditLogEntry],
    ) -> Result<(), RepositoryError> {
        let mut inner = self.inner.write().await;
        inner.requests.insert(request.id.0.clone(), Self::normalized(request));
        inner.audit_entries.extend_from_slice(audit_entries);
        Ok(())
    }

    async fn save_transaction(
        &self,
        request: &Request,
        expected_version: u32,
        audit_entries: &[AuditLogEntry],
        notifications: &[Notification],
    ) -> Result<(), RepositoryError> {
        let mut inner = self.inner.write().await;
        let stored_version = inner.requests.get(&request.id.0).map(|stored| stored.version);

        if stored_version != Some(expected_version) {
            return Err(RepositoryError::Conflict {
                entity_id: request.id.0.clone(),
                expected_version,
            });
        }

        inner.requests.insert(request.id.0.clone(), Self::normalized(request));
        inner.audit_entries.extend_from_slice(audit_entries);
        inner.notifications.extend_from_slice(notifications);
        Ok(())
    }
}

#[async_trait::async_trait]
impl AuditLogRepository for InMemoryWorkflowStore {
    async fn list_for_entity(
        &self,
        entity_type: &str,
        entity_id: &str,
    ) -> Result<Vec<AuditLogEntry>, RepositoryError> {
        let inner = self.inner.read().await;
        Ok(inner
            .audit_entries
            .iter()
            .filter(|entry| entry.entity_type == entity_type && entry.entity_id == entity_id)
            .cloned()
            .collect())
    }

    async fn delete(&self, _entry_id: &str) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unsupported("audit log entries are append-only"))
    }
}

#[async_trait::async_trait]
impl NotificationRepository for InMemoryWorkflowStore {
    async fn list_for_recipient(
        &self,
        recipient_id: &UserId,
        filter: NotificationFilter,
    ) -> Result<Vec<Notification>, RepositoryError> {
        let inner = self.inner.read().await;
        let mut matches: Vec<Notification> = inner
            .notifications
            .iter()
            .filter(|notification| &notification.recipient_id == recipient_id)
            .filter(|notification| !filter.unread_only || !notification.read)
            .filter(|notification| filter.kind.map_or(true, |kind| notification.kind == kind))
            .cloned()
            .collect();
        matches.sort_by(|left, right| right.created_at.cmp(&left.created_at));
        if let Some(limit) = filter.limit {
            matches.truncate(limit as usize);
        }
        Ok(matches)
    }

    async fn unread_count(&self, recipient_id: &UserId) -> Result<u64, RepositoryError> {
        let inner = self.inner.read().await;
        Ok(inner
            .notifications
            .iter()
            .filter(|notification| &notification.recipient_id == recipient_id && !notification.read)
            .count() as u64)
    }

    async fn mark_read(
        &self,
        notification_id: &str,
        recipient_id: &UserId,
    ) -> Result<bool, RepositoryError> {
        let mut inner = self.inner.write().await;
        let Some(notification) = inner
            .notifications
            .iter_mut()
            .find(|notification| notification.id == notification_id)
        else {
            return Ok(false);
        };

        if &notification.recipient_id != recipient_id || notification.read {
            return Ok(false);
        }

        notification.mark_read(Utc::now());
        Ok(true)
    }
}
