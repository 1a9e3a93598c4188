//! Notification records
//!
//! A notification targets either one account or everyone. Records live
//! under `notifications/{id}` and are deleted by the owning user (or an
//! admin for broadcasts).

use chrono::{DateTime, Utc};
use sanchay_core::AccountNo;
use sanchay_store::{LedgerStore, StoreError, Versioned};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

/// Who a notification is for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scope", content = "account_no", rename_all = "lowercase")]
pub enum Target {
    /// A single account
    Personal(AccountNo),
    /// Every account
    Global,
}

/// A message delivered to one account or broadcast to all
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub message: String,
    pub target: Target,
    pub read: bool,
    pub timestamp: DateTime<Utc>,
}

impl Notification {
    /// Build a personal notification for one account
    pub fn personal(account_no: AccountNo, message: impl Into<String>) -> Self {
        Self::new(Target::Personal(account_no), message)
    }

    /// Build a broadcast notification
    pub fn global(message: impl Into<String>) -> Self {
        Self::new(Target::Global, message)
    }

    fn new(target: Target, message: impl Into<String>) -> Self {
        Self {
            id: format!("NTF-{}", &uuid::Uuid::new_v4().simple().to_string()[..12].to_uppercase()),
            message: message.into(),
            target,
            read: false,
            timestamp: Utc::now(),
        }
    }

    /// Whether this notification should be shown to the given account
    pub fn is_for(&self, account_no: &AccountNo) -> bool {
        match &self.target {
            Target::Global => true,
            Target::Personal(no) => no == account_no,
        }
    }

    /// Storage path of this notification
    pub fn path(&self) -> String {
        format!("notifications/{}", self.id)
    }
}

/// Read/maintenance operations over the `notifications/` subtree
pub struct NotificationLog {
    store: Arc<LedgerStore>,
}

impl NotificationLog {
    pub fn new(store: Arc<LedgerStore>) -> Self {
        Self { store }
    }

    /// Notifications visible to an account (personal + global), newest first
    pub fn list_for(&self, account_no: &AccountNo) -> Result<Vec<Notification>, StoreError> {
        let rows: Vec<(String, Versioned<Notification>)> = self.store.list("notifications")?;
        let mut visible: Vec<Notification> = rows
            .into_iter()
            .map(|(_, doc)| doc.value)
            .filter(|n| n.is_for(account_no))
            .collect();
        visible.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(visible)
    }

    /// Mark a notification as read
    pub fn mark_read(&self, id: &str) -> Result<(), StoreError> {
        let path = format!("notifications/{}", id);
        self.store.get_required::<Notification>(&path)?;
        self.store.merge(&path, json!({ "read": true }))
    }

    /// Delete a notification (owner or admin action)
    pub fn delete(&self, id: &str) -> Result<(), StoreError> {
        let path = format!("notifications/{}", id);
        self.store.get_required::<Notification>(&path)?;
        self.store.delete(&path)
    }
}
