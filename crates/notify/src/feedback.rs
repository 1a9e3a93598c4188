//! User feedback
//!
//! Members can leave free-text feedback for the operators. Submissions
//! notify every admin; admins list and delete entries.

use chrono::{DateTime, Utc};
use sanchay_core::AccountNo;
use sanchay_store::{LedgerStore, StoreError, Versioned};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

use crate::fanout::Notifier;

#[derive(Debug, Error)]
pub enum FeedbackError {
    #[error("feedback text must not be empty")]
    EmptyText,
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<serde_json::Error> for FeedbackError {
    fn from(err: serde_json::Error) -> Self {
        FeedbackError::Store(StoreError::Serialization(err))
    }
}

/// One feedback entry left by a member
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feedback {
    pub id: String,
    pub from: AccountNo,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl Feedback {
    pub fn path(&self) -> String {
        format!("feedbacks/{}", self.id)
    }
}

/// Submit/list/delete operations over the `feedbacks/` subtree
pub struct FeedbackBox {
    store: Arc<LedgerStore>,
}

impl FeedbackBox {
    pub fn new(store: Arc<LedgerStore>) -> Self {
        Self { store }
    }

    /// Record a feedback entry and notify the given admins
    pub fn submit(
        &self,
        from: AccountNo,
        text: &str,
        admins: &[AccountNo],
        notifier: &dyn Notifier,
    ) -> Result<Feedback, FeedbackError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(FeedbackError::EmptyText);
        }
        let entry = Feedback {
            id: format!("FBK-{}", &uuid::Uuid::new_v4().simple().to_string()[..12].to_uppercase()),
            from: from.clone(),
            text: text.to_string(),
            timestamp: Utc::now(),
        };
        self.store.put(&entry.path(), serde_json::to_value(&entry)?)?;
        notifier.notify_each(admins, &format!("New feedback from {}", from));
        Ok(entry)
    }

    /// All feedback entries, newest first
    pub fn list(&self) -> Result<Vec<Feedback>, FeedbackError> {
        let rows: Vec<(String, Versioned<Feedback>)> = self.store.list("feedbacks")?;
        let mut entries: Vec<Feedback> = rows.into_iter().map(|(_, doc)| doc.value).collect();
        entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(entries)
    }

    /// Remove a feedback entry (admin action)
    pub fn delete(&self, id: &str) -> Result<(), FeedbackError> {
        let path = format!("feedbacks/{}", id);
        self.store.get_required::<Feedback>(&path)?;
        Ok(self.store.delete(&path)?)
    }
}
