//! Multi-key transactions with version guards
//!
//! A `Txn` collects writes against several document paths plus the version
//! guards that must hold for the commit to apply. The store executes the
//! whole set inside one SQL transaction: either every write lands or none
//! does, and any failed guard aborts with `StoreError::Conflict`.

use serde_json::Value;

/// A single write against a document path
#[derive(Debug, Clone)]
pub enum WriteOp {
    /// Replace (or create) the document at `path`
    Put { path: String, value: Value },
    /// Shallow-merge `value` into the object at `path`, creating it if absent
    Merge { path: String, value: Value },
    /// Remove the document at `path`
    Delete { path: String },
}

impl WriteOp {
    /// The path this write touches
    pub fn path(&self) -> &str {
        match self {
            WriteOp::Put { path, .. } | WriteOp::Merge { path, .. } | WriteOp::Delete { path } => {
                path
            }
        }
    }
}

/// A compare-and-swap precondition on a document version.
///
/// `expected = Some(v)` requires the document to exist at exactly version
/// `v`; `expected = None` requires the document to be absent.
#[derive(Debug, Clone)]
pub struct VersionGuard {
    pub path: String,
    pub expected: Option<u64>,
}

/// An atomic multi-key commit: writes plus the guards they depend on.
#[derive(Debug, Clone, Default)]
pub struct Txn {
    pub(crate) ops: Vec<WriteOp>,
    pub(crate) guards: Vec<VersionGuard>,
}

impl Txn {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the document at `path` with `value`
    pub fn put(mut self, path: impl Into<String>, value: Value) -> Self {
        self.ops.push(WriteOp::Put {
            path: path.into(),
            value,
        });
        self
    }

    /// Shallow-merge `value` into the document at `path`
    pub fn merge(mut self, path: impl Into<String>, value: Value) -> Self {
        self.ops.push(WriteOp::Merge {
            path: path.into(),
            value,
        });
        self
    }

    /// Delete the document at `path`
    pub fn delete(mut self, path: impl Into<String>) -> Self {
        self.ops.push(WriteOp::Delete { path: path.into() });
        self
    }

    /// Require the document at `path` to be at exactly `version`
    pub fn guard(mut self, path: impl Into<String>, version: u64) -> Self {
        self.guards.push(VersionGuard {
            path: path.into(),
            expected: Some(version),
        });
        self
    }

    /// Require the document at `path` to be absent
    pub fn guard_absent(mut self, path: impl Into<String>) -> Self {
        self.guards.push(VersionGuard {
            path: path.into(),
            expected: None,
        });
        self
    }

    /// True if the transaction contains no writes
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Paths touched by the writes, in op order
    pub fn touched_paths(&self) -> Vec<String> {
        self.ops.iter().map(|op| op.path().to_string()).collect()
    }
}
