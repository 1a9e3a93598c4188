//! SQLite-backed keyed document store
//!
//! Documents are JSON values addressed by slash-separated paths
//! (`accounts/SNCY0001`, `requests/REQ-1A2B3C4D`, ...). Every document
//! carries a version that increments on each write; commits can attach
//! version guards, which is the compare-and-swap primitive the approval
//! workflow builds on.

use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::error::StoreError;
use crate::subscribe::{SnapshotFn, SubscriberRegistry, Subscription};
use crate::txn::{Txn, WriteOp};

/// How long a store call may wait on a locked database before surfacing
/// `StoreError::Unavailable` instead of hanging.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// A document value together with its current version
#[derive(Debug, Clone, PartialEq)]
pub struct Versioned<T> {
    pub value: T,
    pub version: u64,
}

/// Keyed JSON document store with versioned atomic commits.
pub struct LedgerStore {
    conn: Mutex<Connection>,
    subscribers: SubscriberRegistry,
}

impl LedgerStore {
    /// Open (or create) a store at the given database path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        Self::from_connection(Connection::open(path)?)
    }

    /// Create an in-memory store (for testing)
    pub fn in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS documents (
                path TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                version INTEGER NOT NULL
            )",
            [],
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
            subscribers: SubscriberRegistry::default(),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Read the document at `path`
    pub fn get<T: DeserializeOwned>(&self, path: &str) -> Result<Option<Versioned<T>>, StoreError> {
        let conn = self.lock();
        let row: Option<(String, u64)> = conn
            .query_row(
                "SELECT value, version FROM documents WHERE path = ?1",
                params![path],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        match row {
            Some((json, version)) => {
                let value = serde_json::from_str(&json)?;
                Ok(Some(Versioned { value, version }))
            }
            None => Ok(None),
        }
    }

    /// Read the document at `path`, failing with `NotFound` if absent
    pub fn get_required<T: DeserializeOwned>(&self, path: &str) -> Result<Versioned<T>, StoreError> {
        self.get(path)?
            .ok_or_else(|| StoreError::NotFound(path.to_string()))
    }

    /// List the direct children of `prefix`, keyed by their last path segment.
    ///
    /// Documents nested deeper than one level (e.g. per-account transaction
    /// records under an account) are not included.
    pub fn list<T: DeserializeOwned>(
        &self,
        prefix: &str,
    ) -> Result<Vec<(String, Versioned<T>)>, StoreError> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT path, value, version FROM documents
             WHERE path LIKE ?1 || '/%'
               AND instr(substr(path, length(?1) + 2), '/') = 0
             ORDER BY path",
        )?;

        let rows = stmt.query_map(params![prefix], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, u64>(2)?,
            ))
        })?;

        let mut out = Vec::new();
        for row in rows {
            let (path, json, version) = row?;
            let key = path[prefix.len() + 1..].to_string();
            let value = serde_json::from_str(&json)?;
            out.push((key, Versioned { value, version }));
        }
        Ok(out)
    }

    /// Replace the document at `path` (single-op commit)
    pub fn put(&self, path: &str, value: Value) -> Result<(), StoreError> {
        self.commit(Txn::new().put(path, value))
    }

    /// Shallow-merge fields into the document at `path` (single-op commit)
    pub fn merge(&self, path: &str, value: Value) -> Result<(), StoreError> {
        self.commit(Txn::new().merge(path, value))
    }

    /// Delete the document at `path` (single-op commit)
    pub fn delete(&self, path: &str) -> Result<(), StoreError> {
        self.commit(Txn::new().delete(path))
    }

    /// Append a document under `prefix` with a generated key, returning the key
    pub fn push(&self, prefix: &str, value: Value) -> Result<String, StoreError> {
        let key = uuid::Uuid::new_v4().simple().to_string();
        self.commit(Txn::new().put(format!("{}/{}", prefix, key), value))?;
        Ok(key)
    }

    /// Apply a multi-key transaction atomically.
    ///
    /// Guards are checked and writes applied inside one SQL transaction; a
    /// failed guard aborts the whole commit with `StoreError::Conflict`.
    /// Subscribers of touched subtrees are notified after the commit.
    pub fn commit(&self, txn: Txn) -> Result<(), StoreError> {
        if txn.is_empty() {
            return Ok(());
        }
        let touched = txn.touched_paths();

        {
            let mut conn = self.lock();
            let tx = conn.transaction()?;

            for guard in &txn.guards {
                let found: Option<u64> = tx
                    .query_row(
                        "SELECT version FROM documents WHERE path = ?1",
                        params![&guard.path],
                        |row| row.get(0),
                    )
                    .optional()?;
                if found != guard.expected {
                    return Err(StoreError::Conflict {
                        path: guard.path.clone(),
                        expected: guard.expected,
                        found,
                    });
                }
            }

            for op in &txn.ops {
                match op {
                    WriteOp::Put { path, value } => {
                        upsert(&tx, path, value)?;
                    }
                    WriteOp::Merge { path, value } => {
                        let current: Option<String> = tx
                            .query_row(
                                "SELECT value FROM documents WHERE path = ?1",
                                params![path],
                                |row| row.get(0),
                            )
                            .optional()?;
                        let merged = match current {
                            Some(json) => merge_objects(path, serde_json::from_str(&json)?, value)?,
                            None => value.clone(),
                        };
                        upsert(&tx, path, &merged)?;
                    }
                    WriteOp::Delete { path } => {
                        tx.execute("DELETE FROM documents WHERE path = ?1", params![path])?;
                    }
                }
            }

            tx.commit()?;
        }

        // Fan out snapshots outside the connection lock.
        for prefix in self.subscribers.interested(&touched) {
            match self.snapshot(&prefix) {
                Ok(snapshot) => self.subscribers.deliver(&prefix, &snapshot),
                Err(err) => {
                    tracing::warn!(prefix = %prefix, error = %err, "snapshot delivery failed")
                }
            }
        }

        Ok(())
    }

    /// Materialize the subtree under `prefix` as a nested JSON object.
    pub fn snapshot(&self, prefix: &str) -> Result<Value, StoreError> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT path, value FROM documents WHERE path LIKE ?1 || '/%' ORDER BY path",
        )?;
        let rows = stmt.query_map(params![prefix], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut root = Map::new();
        for row in rows {
            let (path, json) = row?;
            let relative = &path[prefix.len() + 1..];
            let value: Value = serde_json::from_str(&json)?;
            insert_nested(&mut root, relative, value);
        }
        Ok(Value::Object(root))
    }

    /// Subscribe to changes under `prefix`.
    ///
    /// The callback receives the full new snapshot of the subtree after
    /// every commit touching it. The subscription ends when the returned
    /// guard is dropped.
    pub fn subscribe<F>(&self, prefix: impl Into<String>, callback: F) -> Subscription
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        let callback: Arc<SnapshotFn> = Arc::new(callback);
        self.subscribers.register(prefix.into(), callback)
    }
}

fn upsert(tx: &rusqlite::Transaction<'_>, path: &str, value: &Value) -> Result<(), StoreError> {
    tx.execute(
        "INSERT INTO documents (path, value, version) VALUES (?1, ?2, 1)
         ON CONFLICT(path) DO UPDATE SET value = excluded.value, version = version + 1",
        params![path, serde_json::to_string(value)?],
    )?;
    Ok(())
}

fn merge_objects(path: &str, current: Value, incoming: &Value) -> Result<Value, StoreError> {
    match (current, incoming) {
        (Value::Object(mut base), Value::Object(fields)) => {
            for (k, v) in fields {
                base.insert(k.clone(), v.clone());
            }
            Ok(Value::Object(base))
        }
        _ => Err(StoreError::NotAnObject(path.to_string())),
    }
}

fn insert_nested(root: &mut Map<String, Value>, relative: &str, value: Value) {
    match relative.split_once('/') {
        None => {
            root.insert(relative.to_string(), value);
        }
        Some((head, rest)) => {
            let entry = root
                .entry(head.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if let Value::Object(map) = entry {
                insert_nested(map, rest, value);
            }
        }
    }
}
