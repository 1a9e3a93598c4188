//! Sanchay Store - versioned keyed JSON documents over SQLite
//!
//! The durable collaborator every other crate builds on:
//! - keyed JSON documents addressed by slash-separated paths
//! - per-document versions with guarded multi-key commits (compare-and-swap)
//! - shallow merge updates and push-with-generated-id appends
//! - prefix subscriptions delivering the new subtree snapshot per commit

pub mod error;
pub mod store;
pub mod subscribe;
pub mod txn;

pub use error::StoreError;
pub use store::{LedgerStore, Versioned};
pub use subscribe::Subscription;
pub use txn::{Txn, VersionGuard, WriteOp};
