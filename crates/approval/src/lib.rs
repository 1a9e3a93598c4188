//! Sanchay Approval - request queue and approval engine
//!
//! Users submit requests; admins approve or reject them. Approval applies
//! the request's financial effect in one guarded store commit, so a
//! request is applied exactly once even under racing admins. Rejection
//! never touches a balance.

pub mod config;
pub mod engine;
pub mod error;
pub mod queue;
pub mod request;
pub mod validate;

pub use config::EngineConfig;
pub use engine::{ApprovalEngine, ApprovalOutcome};
pub use error::ApprovalError;
pub use queue::RequestQueue;
pub use request::{Request, RequestKind, RequestStatus};
