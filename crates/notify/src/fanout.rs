//! Best-effort notification delivery
//!
//! Delivery is fire-and-forget: a failed write is logged and swallowed,
//! never surfaced to the caller. A balance mutation must not fail (or be
//! rolled back) because a notification could not be stored.

use sanchay_core::AccountNo;
use sanchay_store::LedgerStore;
use std::sync::Arc;
use tracing::warn;

use crate::notification::{Notification, Target};

/// Sink for notifications produced by request processing
pub trait Notifier: Send + Sync {
    /// Deliver a message to a target. Must not fail; implementations
    /// swallow and log their own errors.
    fn deliver(&self, target: &Target, message: &str);

    /// Deliver a personal message to one account
    fn notify(&self, account_no: &AccountNo, message: &str) {
        self.deliver(&Target::Personal(account_no.clone()), message);
    }

    /// Deliver the same personal message to each listed account
    fn notify_each(&self, accounts: &[AccountNo], message: &str) {
        for no in accounts {
            self.notify(no, message);
        }
    }

    /// Deliver a broadcast visible to every account
    fn broadcast(&self, message: &str) {
        self.deliver(&Target::Global, message);
    }
}

/// Notifier writing notification documents into the store
pub struct StoreNotifier {
    store: Arc<LedgerStore>,
}

impl StoreNotifier {
    pub fn new(store: Arc<LedgerStore>) -> Self {
        Self { store }
    }
}

impl Notifier for StoreNotifier {
    fn deliver(&self, target: &Target, message: &str) {
        let record = match target {
            Target::Personal(no) => Notification::personal(no.clone(), message),
            Target::Global => Notification::global(message),
        };
        let value = match serde_json::to_value(&record) {
            Ok(value) => value,
            Err(err) => {
                warn!(id = %record.id, error = %err, "failed to serialize notification");
                return;
            }
        };
        if let Err(err) = self.store.put(&record.path(), value) {
            warn!(id = %record.id, error = %err, "failed to store notification");
        }
    }
}

/// Notifier that drops everything; useful in tests and batch tooling
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn deliver(&self, _target: &Target, _message: &str) {}
}
