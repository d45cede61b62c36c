pub mod authz;
pub mod commands;
pub mod service;
pub mod views;

pub use authz::authorize;
pub use commands::{
    ApproveRequest, BeginReview, CancelRequest, CommandContext, CreateRequest, RejectRequest,
    ReopenRequest, SubmitRequest,
};
pub use service::LifecycleService;
pub use views::{
    detail_view, request_history, ActorRef, DirectoryClient, InMemoryDirectoryClient,
    RequestDetailView,
};
