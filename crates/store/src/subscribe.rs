//! Change subscriptions
//!
//! A subscriber registers a path prefix and receives the full current
//! snapshot of that subtree after every commit that touches it. The
//! subscription is torn down when the returned guard drops, so its lifetime
//! follows the consuming component.

use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Callback receiving the new subtree snapshot
pub type SnapshotFn = dyn Fn(&Value) + Send + Sync;

struct Subscriber {
    id: u64,
    prefix: String,
    callback: Arc<SnapshotFn>,
}

/// Registry of active subscriptions, shared by the store and the guards.
#[derive(Clone, Default)]
pub(crate) struct SubscriberRegistry {
    entries: Arc<Mutex<Vec<Subscriber>>>,
    next_id: Arc<AtomicU64>,
}

impl SubscriberRegistry {
    pub(crate) fn register(&self, prefix: String, callback: Arc<SnapshotFn>) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.push(Subscriber {
            id,
            prefix,
            callback,
        });
        Subscription {
            id,
            entries: Arc::clone(&self.entries),
        }
    }

    /// Prefixes of subscribers interested in any of the touched paths.
    ///
    /// Deduplicated so each subtree snapshot is computed once per commit.
    pub(crate) fn interested(&self, touched: &[String]) -> Vec<String> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let mut prefixes: Vec<String> = entries
            .iter()
            .filter(|s| touched.iter().any(|path| covers(&s.prefix, path)))
            .map(|s| s.prefix.clone())
            .collect();
        prefixes.sort();
        prefixes.dedup();
        prefixes
    }

    /// Deliver a snapshot to every subscriber registered on `prefix`.
    pub(crate) fn deliver(&self, prefix: &str, snapshot: &Value) {
        let callbacks: Vec<Arc<SnapshotFn>> = {
            let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
            entries
                .iter()
                .filter(|s| s.prefix == prefix)
                .map(|s| Arc::clone(&s.callback))
                .collect()
        };
        for callback in callbacks {
            callback(snapshot);
        }
    }
}

/// Whether a subscription on `prefix` covers `path`
fn covers(prefix: &str, path: &str) -> bool {
    path == prefix || path.strip_prefix(prefix).is_some_and(|rest| rest.starts_with('/'))
}

/// RAII handle for an active subscription; dropping it unsubscribes.
pub struct Subscription {
    id: u64,
    entries: Arc<Mutex<Vec<Subscriber>>>,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.retain(|s| s.id != self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_covers_prefix_boundaries() {
        assert!(covers("requests", "requests/REQ-1"));
        assert!(covers("requests", "requests"));
        assert!(!covers("requests", "requests-archive/REQ-1"));
        assert!(!covers("requests", "accounts/SNCY0001"));
    }

    #[test]
    fn test_deliver_and_teardown() {
        let registry = SubscriberRegistry::default();
        let hits = Arc::new(AtomicUsize::new(0));

        let hits_clone = Arc::clone(&hits);
        let sub = registry.register(
            "requests".to_string(),
            Arc::new(move |_| {
                hits_clone.fetch_add(1, Ordering::SeqCst);
            }),
        );

        let touched = vec!["requests/REQ-1".to_string()];
        for prefix in registry.interested(&touched) {
            registry.deliver(&prefix, &json!({}));
        }
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        drop(sub);
        assert!(registry.interested(&touched).is_empty());
    }
}
