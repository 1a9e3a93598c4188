//! Approval errors

use sanchay_ledger::LedgerError;
use sanchay_store::StoreError;
use thiserror::Error;

use crate::request::RequestStatus;

/// Errors from the request queue and the approval engine
#[derive(Debug, Error)]
pub enum ApprovalError {
    /// A request payload failed validation at submission
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    /// No request with this id exists
    #[error("request not found: {0}")]
    NotFound(String),

    /// The request has already been resolved
    #[error("request {id} is already {status}")]
    InvalidState { id: String, status: RequestStatus },

    /// Racing commits kept invalidating the version guards
    #[error("approval of {id} conflicted {attempts} times, giving up")]
    Conflict { id: String, attempts: u32 },

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ApprovalError {
    /// Build a validation error for a named field
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ApprovalError::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for ApprovalError {
    fn from(err: serde_json::Error) -> Self {
        ApprovalError::Store(StoreError::Serialization(err))
    }
}
