//! SQLite adapter (via rusqlite).
//!
//! A fixed set of connections to one database file, handed out through a
//! bounded channel. Configuration: WAL mode, NORMAL synchronous, busy timeout
//! equal to the pool acquisition timeout.

use super::{Store, StoreKind, TABLE_NAME, pick_key, pick_window, random_val, wide_title};
use crate::error::StoreError;
use crossbeam_channel::{Receiver, Sender};
use rusqlite::{Connection, OptionalExtension, params};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Database file name inside the configured directory.
pub const DATABASE_FILE: &str = "demo.sqlite3";

/// Pool of SQLite connections sharing one database file.
pub struct SqliteStore {
    path: PathBuf,
    idle_tx: Sender<Connection>,
    idle_rx: Receiver<Connection>,
    acquire_timeout: Duration,
    closed: AtomicBool,
}

impl SqliteStore {
    /// Open `pool_size` connections to `<dir>/demo.sqlite3`, creating `dir` if needed.
    pub fn open(dir: &Path, pool_size: u32, acquire_timeout: Duration) -> Result<Self, StoreError> {
        let path = dir.join(DATABASE_FILE);
        let connect_err = |reason: String| StoreError::Connect {
            kind: StoreKind::Sqlite,
            target: path.display().to_string(),
            reason,
        };

        if pool_size == 0 {
            return Err(connect_err("pool size must be at least 1".to_string()));
        }
        std::fs::create_dir_all(dir).map_err(|e| connect_err(e.to_string()))?;

        let (idle_tx, idle_rx) = crossbeam_channel::bounded(pool_size as usize);
        for _ in 0..pool_size {
            let conn = open_connection(&path, acquire_timeout).map_err(|e| connect_err(e.to_string()))?;
            idle_tx
                .try_send(conn)
                .map_err(|_| connect_err("connection pool overflow".to_string()))?;
        }

        tracing::debug!("Opened SQLite pool of {} at {}", pool_size, path.display());

        Ok(Self {
            path,
            idle_tx,
            idle_rx,
            acquire_timeout,
            closed: AtomicBool::new(false),
        })
    }

    /// Path of the database file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn checkout(&self) -> Option<Connection> {
        if self.closed.load(Ordering::Acquire) {
            return None;
        }
        self.idle_rx.recv_timeout(self.acquire_timeout).ok()
    }

    /// Hand a connection back; after close it is dropped instead.
    fn checkin(&self, conn: Connection) {
        if !self.closed.load(Ordering::Acquire) {
            // The channel holds exactly pool_size slots, so this never blocks.
            let _ = self.idle_tx.try_send(conn);
        }
    }

    /// Run `f` on a pooled connection, folding every failure into `false`.
    fn attempt<F>(&self, f: F) -> bool
    where
        F: FnOnce(&Connection) -> rusqlite::Result<bool>,
    {
        let Some(conn) = self.checkout() else {
            return false;
        };
        let result = f(&conn);
        self.checkin(conn);
        match result {
            Ok(ok) => ok,
            Err(e) => {
                tracing::trace!("SQLite operation failed: {}", e);
                false
            }
        }
    }
}

fn open_connection(path: &Path, busy_timeout: Duration) -> rusqlite::Result<Connection> {
    let conn = Connection::open(path)?;
    conn.busy_timeout(busy_timeout)?;
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA synchronous = NORMAL;
         PRAGMA temp_store = MEMORY;",
    )?;
    Ok(conn)
}

impl Store for SqliteStore {
    fn kind(&self) -> StoreKind {
        StoreKind::Sqlite
    }

    fn init(&self) -> Result<(), StoreError> {
        let conn = self.checkout().ok_or_else(|| StoreError::Init {
            kind: StoreKind::Sqlite,
            reason: "no connection available".to_string(),
        })?;
        let result = conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {TABLE_NAME} (
                id    INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT    NULL,
                val   INTEGER NOT NULL DEFAULT 0
            );
            CREATE INDEX IF NOT EXISTS i_{TABLE_NAME}_title ON {TABLE_NAME}(title);
            CREATE INDEX IF NOT EXISTS i_{TABLE_NAME}_val   ON {TABLE_NAME}(val);"
        ));
        self.checkin(conn);
        result.map_err(|e| StoreError::Init {
            kind: StoreKind::Sqlite,
            reason: e.to_string(),
        })
    }

    fn insert(&self) -> bool {
        self.attempt(|conn| {
            let mut stmt =
                conn.prepare_cached(&format!("INSERT INTO {TABLE_NAME} (title, val) VALUES (?1, ?2)"))?;
            stmt.execute(params![wide_title(), random_val()])?;
            Ok(true)
        })
    }

    fn update_tiny(&self, range_from: u32, range_to: u32) -> bool {
        let Some(id) = pick_key(range_from, range_to) else {
            return false;
        };
        self.attempt(|conn| {
            let mut stmt = conn.prepare_cached(&format!("UPDATE {TABLE_NAME} SET val = ?1 WHERE id = ?2"))?;
            stmt.execute(params![random_val(), id])?;
            Ok(true)
        })
    }

    fn update_wide(&self, range_from: u32, range_to: u32) -> bool {
        let Some(id) = pick_key(range_from, range_to) else {
            return false;
        };
        self.attempt(|conn| {
            let mut stmt = conn.prepare_cached(&format!("UPDATE {TABLE_NAME} SET title = ?1 WHERE id = ?2"))?;
            stmt.execute(params![wide_title(), id])?;
            Ok(true)
        })
    }

    fn select_lite(&self, range_from: u32, range_to: u32) -> bool {
        let Some(id) = pick_key(range_from, range_to) else {
            return false;
        };
        self.attempt(|conn| {
            let mut stmt = conn.prepare_cached(&format!("SELECT val FROM {TABLE_NAME} WHERE id = ?1"))?;
            let val: Option<i64> = stmt.query_row(params![id], |row| row.get(0)).optional()?;
            Ok(val.is_some())
        })
    }

    fn select_heavy(&self, range_from: u32, range_to: u32, size: u32) -> bool {
        let Some((start, end)) = pick_window(range_from, range_to, size) else {
            return false;
        };
        self.attempt(|conn| {
            let mut stmt = conn.prepare_cached(&format!(
                "SELECT avg(val) FROM {TABLE_NAME} WHERE id BETWEEN ?1 AND ?2"
            ))?;
            // avg over an empty window is NULL, which is still a successful read.
            let _avg: Option<f64> = stmt.query_row(params![start, end], |row| row.get(0))?;
            Ok(true)
        })
    }

    fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        let mut released = 0usize;
        while let Ok(conn) = self.idle_rx.try_recv() {
            drop(conn);
            released += 1;
        }
        tracing::debug!("Closed SQLite pool at {} ({} idle connections released)", self.path.display(), released);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn open_store(pool_size: u32) -> (TempDir, SqliteStore) {
        let dir = TempDir::new().unwrap();
        let store = SqliteStore::open(dir.path(), pool_size, Duration::from_millis(200)).unwrap();
        store.init().unwrap();
        (dir, store)
    }

    #[test]
    fn test_zero_pool_size_is_rejected() {
        let dir = TempDir::new().unwrap();
        let err = SqliteStore::open(dir.path(), 0, Duration::from_millis(10))
            .err()
            .unwrap();
        assert!(matches!(err, StoreError::Connect { kind: StoreKind::Sqlite, .. }));
    }

    #[test]
    fn test_init_is_idempotent() {
        let (_dir, store) = open_store(2);
        store.init().unwrap();
        store.init().unwrap();
    }

    #[test]
    fn test_operations_against_populated_table() {
        let (_dir, store) = open_store(2);
        for _ in 0..20 {
            assert!(store.insert());
        }
        assert!(store.select_lite(1, 21));
        assert!(store.update_tiny(1, 21));
        assert!(store.update_wide(1, 21));
        assert!(store.select_heavy(1, 21, 5));
    }

    #[test]
    fn test_select_lite_on_empty_table_fails() {
        let (_dir, store) = open_store(1);
        assert!(!store.select_lite(1, 100));
        // An empty aggregate window is still a successful read.
        assert!(store.select_heavy(1, 100, 10));
    }

    #[test]
    fn test_connections_return_to_pool() {
        let (_dir, store) = open_store(1);
        // With a single connection, every call after the first only succeeds
        // if the previous one handed its connection back.
        for _ in 0..10 {
            assert!(store.insert());
        }
    }

    #[test]
    fn test_exhausted_pool_times_out() {
        let (_dir, store) = open_store(1);
        let held = store.checkout().unwrap();
        assert!(!store.insert());
        store.checkin(held);
        assert!(store.insert());
    }

    #[test]
    fn test_closed_store_fails_operations() {
        let (_dir, store) = open_store(2);
        store.close();
        store.close();
        assert!(!store.insert());
        assert!(!store.select_lite(1, 2));
        assert!(store.init().is_err());
    }

    #[test]
    fn test_database_file_created_in_dir() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("nested");
        let store = SqliteStore::open(&nested, 1, Duration::from_millis(50)).unwrap();
        assert_eq!(store.path(), nested.join(DATABASE_FILE));
        assert!(store.path().exists());
    }
}
