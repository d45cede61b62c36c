use async_trait::async_trait;
use thiserror::Error;

use greenlight_core::audit::AuditLogEntry;
use greenlight_core::domain::actor::UserId;
use greenlight_core::domain::request::{Request, RequestId};
use greenlight_core::notifications::{Notification, NotificationKind};

pub mod audit;
pub mod memory;
pub mod notification;
pub mod request;

pub use audit::SqlAuditLogRepository;
pub use memory::InMemoryWorkflowStore;
pub use notification::SqlNotificationRepository;
pub use request::SqlRequestRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("conflicting write on {entity_id}: expected version {expected_version}")]
    Conflict { entity_id: String, expected_version: u32 },
    #[error("unsupported operation: {0}")]
    Unsupported(&'static str),
}

#[async_trait]
pub trait RequestRepository: Send + Sync {
    async fn find_by_id(&self, id: &RequestId) -> Result<Option<Request>, RepositoryError>;

    /// Insert a fresh draft together with its creation audit entries.
    async fn create(
        &self,
        request: &Request,
        audit_entries: &[AuditLogEntry],
    ) -> Result<(), RepositoryError>;

    /// The transactional write at the heart of the lifecycle: the new
    /// aggregate row state, the audit entries, and the notifications all
    /// commit together or not at all. The row update is conditional on
    /// `expected_version`; a stale version yields `Conflict` and persists
    /// nothing.
    async fn save_transaction(
        &self,
        request: &Request,
        expected_version: u32,
        audit_entries: &[AuditLogEntry],
        notifications: &[Notification],
    ) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait AuditLogRepository: Send + Sync {
    async fn list_for_entity(
        &self,
        entity_type: &str,
        entity_id: &str,
    ) -> Result<Vec<AuditLogEntry>, RepositoryError>;

    /// Audit rows are append-only; every implementation refuses deletion.
    async fn delete(&self, entry_id: &str) -> Result<(), RepositoryError>;
}

#[derive(Clone, Debug, Default)]
pub struct NotificationFilter {
    pub unread_only: bool,
    pub kind: Option<NotificationKind>,
    pub limit: Option<u32>,
}

#[async_trait]
pub trait NotificationRepository: Send + Sync {
    async fn list_for_recipient(
        &self,
        recipient_id: &UserId,
        filter: NotificationFilter,
    ) -> Result<Vec<Notification>, RepositoryError>;

    async fn unread_count(&self, recipient_id: &UserId) -> Result<u64, RepositoryError>;

    /// Returns `false` when the notification does not exist or belongs to a
    /// different recipient; ownership is enforced here, not in the caller.
    async fn mark_read(
        &self,
        notification_id: &str,
        recipient_id: &UserId,
    ) -> Result<bool, RepositoryError>;
}
