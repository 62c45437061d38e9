//! Storage and history sinks for the view state.

/// SQLite-backed key-value store.
pub mod sqlite;

use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex},
};

/// Failure while reading or writing persisted view state.
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    /// SQLite failure.
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// JSON encoding failure.
    #[error("json: {0}")]
    Serde(#[from] serde_json::Error),
    /// Anything else (worker join errors, poisoned locks).
    #[error("{0}")]
    Message(String),
}

/// Result alias for persistence operations.
pub type PersistResult<T> = Result<T, PersistError>;

/// String key-value storage, the local-storage stand-in.
pub trait KeyValueStore: Send {
    /// Reads `key`.
    fn get(&self, key: &str) -> PersistResult<Option<String>>;
    /// Writes `key`.
    fn set(&mut self, key: &str, value: &str) -> PersistResult<()>;
    /// Deletes `key`; absent keys are not an error.
    fn remove(&mut self, key: &str) -> PersistResult<()>;
    /// Makes previous writes durable.
    fn flush(&mut self) -> PersistResult<()> {
        Ok(())
    }
    /// Drops writes made since the last flush, where the store can.
    fn rollback(&mut self) -> PersistResult<()> {
        Ok(())
    }
}

/// Receives the encoded view query on each coalesced write, standing in for
/// a non-reloading history replace.
pub trait HistorySink: Send {
    /// Replaces the current document query with `query` (no leading `?`).
    fn replace_query(&mut self, query: &str) -> PersistResult<()>;
}

/// In-memory store; clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<BTreeMap<String, String>>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every entry, for assertions.
    pub fn entries(&self) -> BTreeMap<String, String> {
        self.entries.lock().map(|m| m.clone()).unwrap_or_default()
    }

    fn lock(&self) -> PersistResult<std::sync::MutexGuard<'_, BTreeMap<String, String>>> {
        self.entries
            .lock()
            .map_err(|_| PersistError::Message("memory store lock poisoned".to_string()))
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> PersistResult<Option<String>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> PersistResult<()> {
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> PersistResult<()> {
        self.lock()?.remove(key);
        Ok(())
    }
}

/// Records every replaced query; clones share the log.
#[derive(Debug, Clone, Default)]
pub struct MemoryHistory {
    queries: Arc<Mutex<Vec<String>>>,
}

impl MemoryHistory {
    /// Creates an empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// All queries written so far, oldest first.
    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().map(|q| q.clone()).unwrap_or_default()
    }

    /// The current query, if any was written.
    pub fn current(&self) -> Option<String> {
        self.queries().pop()
    }
}

impl HistorySink for MemoryHistory {
    fn replace_query(&mut self, query: &str) -> PersistResult<()> {
        self.queries
            .lock()
            .map_err(|_| PersistError::Message("history lock poisoned".to_string()))?
            .push(query.to_string());
        Ok(())
    }
}
