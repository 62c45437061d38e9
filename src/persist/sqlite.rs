//! SQLite-backed key-value store standing in for browser local storage.
//!
//! Writes are grouped into one transaction that [`KeyValueStore::flush`]
//! commits, so a coalesced view-state write lands atomically.

use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use rusqlite::{Connection, OptionalExtension, params};

use super::{KeyValueStore, PersistResult};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS kv (
    key        TEXT PRIMARY KEY NOT NULL,
    value      TEXT NOT NULL,
    updated_ms INTEGER NOT NULL
);
";

const PREFIX_MATCH: &str = "substr(key, 1, length(?1)) = ?1";

/// SQLite implementation of [`crate::persist::KeyValueStore`].
pub struct SqliteStore {
    conn: Connection,
    in_tx: bool,
}

impl SqliteStore {
    /// Opens or creates a store file, in WAL mode with `synchronous=NORMAL`.
    pub fn open(path: impl AsRef<Path>) -> PersistResult<Self> {
        Self::with_connection(Connection::open(path)?)
    }

    /// Store that lives as long as the value.
    pub fn open_in_memory() -> PersistResult<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> PersistResult<Self> {
        conn.execute_batch(SCHEMA)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        Ok(Self { conn, in_tx: false })
    }

    /// Keys starting with `prefix`, sorted.
    pub fn keys_with_prefix(&self, prefix: &str) -> PersistResult<Vec<String>> {
        let sql = format!("SELECT key FROM kv WHERE {PREFIX_MATCH} ORDER BY key ASC");
        let mut stmt = self.conn.prepare(&sql)?;
        let keys = stmt
            .query_map(params![prefix], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(keys)
    }

    /// Deletes every key starting with `prefix`; returns how many went.
    pub fn remove_prefix(&mut self, prefix: &str) -> PersistResult<usize> {
        self.begin()?;
        let sql = format!("DELETE FROM kv WHERE {PREFIX_MATCH}");
        Ok(self.conn.execute(&sql, params![prefix])?)
    }

    /// Milliseconds since the epoch of the last write to `key`.
    pub fn updated_ms(&self, key: &str) -> PersistResult<Option<u64>> {
        let ms = self
            .conn
            .query_row("SELECT updated_ms FROM kv WHERE key = ?1", params![key], |row| {
                row.get::<_, i64>(0)
            })
            .optional()?;
        Ok(ms.map(|v| u64::try_from(v).unwrap_or(0)))
    }

    fn begin(&mut self) -> PersistResult<()> {
        if !self.in_tx {
            self.conn.execute_batch("BEGIN IMMEDIATE")?;
            self.in_tx = true;
        }
        Ok(())
    }

    fn commit(&mut self) -> PersistResult<()> {
        if self.in_tx {
            self.conn.execute_batch("COMMIT")?;
            self.in_tx = false;
        }
        Ok(())
    }
}

impl KeyValueStore for SqliteStore {
    fn get(&self, key: &str) -> PersistResult<Option<String>> {
        let value = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| row.get(0))
            .optional()?;
        Ok(value)
    }

    fn set(&mut self, key: &str, value: &str) -> PersistResult<()> {
        self.begin()?;
        self.conn.execute(
            "INSERT INTO kv(key, value, updated_ms) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_ms = excluded.updated_ms",
            params![key, value, unix_ms()],
        )?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> PersistResult<()> {
        self.begin()?;
        self.conn.execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(())
    }

    fn flush(&mut self) -> PersistResult<()> {
        self.commit()
    }

    fn rollback(&mut self) -> PersistResult<()> {
        if self.in_tx {
            let result = self.conn.execute_batch("ROLLBACK");
            self.in_tx = !self.conn.is_autocommit();
            result?;
        }
        Ok(())
    }
}

impl Drop for SqliteStore {
    fn drop(&mut self) {
        if let Err(err) = self.commit() {
            tracing::warn!(error = %err, "uncommitted storage writes lost");
        }
    }
}

fn unix_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .ok()
        .and_then(|d| i64::try_from(d.as_millis()).ok())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_are_visible_before_commit_and_durable_after() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("kv.db");

        let mut store = SqliteStore::open(&path).expect("open");
        store.set("a.basemap", "osm-hot").expect("set");
        assert_eq!(store.get("a.basemap").expect("get").as_deref(), Some("osm-hot"));
        store.flush().expect("commit");
        assert!(store.updated_ms("a.basemap").expect("updated").is_some());
        drop(store);

        let reopened = SqliteStore::open(&path).expect("reopen");
        assert_eq!(reopened.get("a.basemap").expect("get").as_deref(), Some("osm-hot"));
    }

    #[test]
    fn rollback_discards_pending_writes() {
        let mut store = SqliteStore::open_in_memory().expect("open");
        store.set("a.basemap", "osm-hot").expect("set");
        store.flush().expect("commit");

        store.set("a.basemap", "opentopomap").expect("set");
        store.set("a.overlays", "[]").expect("set");
        store.rollback().expect("rollback");
        store.rollback().expect("second rollback is a no-op");
        store.flush().expect("commit");

        assert_eq!(store.get("a.basemap").expect("get").as_deref(), Some("osm-hot"));
        assert_eq!(store.get("a.overlays").expect("get"), None);
    }

    #[test]
    fn prefix_removal_is_scoped() {
        let mut store = SqliteStore::open_in_memory().expect("open");
        for key in ["a.basemap", "a.overlays", "ab.basemap", "b.basemap"] {
            store.set(key, "x").expect("set");
        }
        assert_eq!(store.remove_prefix("a.").expect("remove"), 2);
        store.flush().expect("commit");
        assert_eq!(
            store.keys_with_prefix("").expect("keys"),
            vec!["ab.basemap".to_string(), "b.basemap".to_string()]
        );
    }
}
