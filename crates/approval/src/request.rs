//! Request records
//!
//! Every user-initiated action is a request waiting in `requests/{id}` for
//! an admin decision. The payload is a tagged union; the status transition
//! `Pending -> Approved | Rejected` is terminal and guarded by the store
//! version, so a request is resolved at most once.

use chrono::{DateTime, Utc};
use sanchay_core::{AccountNo, Amount, TransferCode};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// Lifecycle of a request
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
}

/// The payload of a request, one variant per supported action
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RequestKind {
    /// Open a new account (submitted anonymously at signup)
    NewAccount {
        name: String,
        display: String,
        email: String,
        phone: String,
        password: String,
    },
    /// Deposit money sent via a payment method
    Add {
        amount: Amount,
        method: String,
        phone_number: String,
    },
    /// Withdraw money to a payment method
    Withdraw {
        amount: Amount,
        method: String,
        note: Option<String>,
    },
    /// Send money to another account
    Transfer {
        to: AccountNo,
        amount: Amount,
        code: TransferCode,
    },
    /// Donate to the configured beneficiary account
    Donate {
        amount: Amount,
        note: Option<String>,
    },
    /// Change profile fields; only the present ones are applied
    ProfileUpdate {
        name: Option<String>,
        phone: Option<String>,
        email: Option<String>,
        password: Option<String>,
    },
    /// Issue a temporary password
    ForgotPassword,
}

impl RequestKind {
    /// Human-readable label used in notifications
    pub fn label(&self) -> &'static str {
        match self {
            RequestKind::NewAccount { .. } => "new account",
            RequestKind::Add { .. } => "add money",
            RequestKind::Withdraw { .. } => "withdraw",
            RequestKind::Transfer { .. } => "transfer",
            RequestKind::Donate { .. } => "donation",
            RequestKind::ProfileUpdate { .. } => "profile update",
            RequestKind::ForgotPassword => "forgot password",
        }
    }

    /// The money amount carried by this request, if any
    pub fn amount(&self) -> Option<Amount> {
        match self {
            RequestKind::Add { amount, .. }
            | RequestKind::Withdraw { amount, .. }
            | RequestKind::Transfer { amount, .. }
            | RequestKind::Donate { amount, .. } => Some(*amount),
            _ => None,
        }
    }
}

/// A pending (or resolved) user request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    /// Unique identifier (REQ-XXXXXXXXXXXX)
    pub id: String,

    /// The submitting account; absent for anonymous signup requests
    pub requester: Option<AccountNo>,

    #[serde(flatten)]
    pub kind: RequestKind,

    pub status: RequestStatus,

    pub created_at: DateTime<Utc>,

    /// Set exactly once, when the request leaves `Pending`
    pub resolved_at: Option<DateTime<Utc>>,

    /// Optional admin-supplied reason attached on rejection
    pub rejection_reason: Option<String>,
}

impl Request {
    /// Create a pending request
    pub fn new(requester: Option<AccountNo>, kind: RequestKind) -> Self {
        Self {
            id: format!("REQ-{}", &uuid::Uuid::new_v4().simple().to_string()[..12].to_uppercase()),
            requester,
            kind,
            status: RequestStatus::Pending,
            created_at: Utc::now(),
            resolved_at: None,
            rejection_reason: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == RequestStatus::Pending
    }

    /// Mark this request approved, stamping the resolution time
    pub fn approved(mut self) -> Self {
        self.status = RequestStatus::Approved;
        self.resolved_at = Some(Utc::now());
        self
    }

    /// Mark this request rejected with an optional reason
    pub fn rejected(mut self, reason: Option<String>) -> Self {
        self.status = RequestStatus::Rejected;
        self.resolved_at = Some(Utc::now());
        self.rejection_reason = reason;
        self
    }

    /// Storage path of this request
    pub fn path(&self) -> String {
        request_path(&self.id)
    }
}

/// Storage path for a request document
pub fn request_path(id: &str) -> String {
    format!("requests/{}", id)
}
