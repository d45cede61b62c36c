pub mod audit;
pub mod config;
pub mod domain;
pub mod errors;
pub mod notifications;

pub use audit::{
    action_for, fallback_kind_for, AuditAction, AuditError, AuditLogEntry, AuditMetadata,
    AuditRecorder, DisplayEvent, EventDetail, FieldChange, RequestContext, StatusChange,
};
pub use domain::actor::{Actor, Role, UserId};
pub use domain::event::{DomainEvent, EventKind};
pub use domain::request::{
    LifecycleOperation, Priority, Request, RequestId, RequestStatus, RequestType,
};
pub use errors::{DomainError, ErrorClass, WorkflowError};
pub use notifications::{Notification, NotificationDispatcher, NotificationKind};
