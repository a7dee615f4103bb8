//! Store adapters.
//!
//! Every backing store exposes the same capability set through [`Store`].
//! Data operations return `true`/`false` instead of errors: constraint
//! violations, timeouts and disconnects are caught inside the adapter and
//! counted as failed attempts by the caller, which never inspects the cause.

mod memory;
mod sqlite;
#[cfg(feature = "mysql")]
mod mysql;
#[cfg(feature = "postgres")]
mod postgres;
#[cfg(any(feature = "postgres", feature = "mysql"))]
mod runtime;

pub use memory::{MemoryStore, MemoryTable};
pub use sqlite::SqliteStore;
#[cfg(feature = "mysql")]
pub use mysql::MySqlStore;
#[cfg(feature = "postgres")]
pub use postgres::PostgresStore;

use crate::error::StoreError;
use rand::Rng;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Table every adapter reads and writes.
pub const TABLE_NAME: &str = "hikari";

/// How many times the random 8-digit fragment repeats in a wide title.
pub const TITLE_REPEAT: usize = 64;

/// Default time to wait for a pooled connection before failing an attempt.
pub const DEFAULT_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(1);

/// Backing store families the harness can drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    /// In-process table, never blocks on I/O.
    Memory,
    /// Embedded SQLite database file.
    Sqlite,
    /// PostgreSQL server.
    Postgres,
    /// MySQL server.
    MySql,
}

impl StoreKind {
    /// All store kinds, in sweep order.
    pub const ALL: [StoreKind; 4] = [Self::Memory, Self::Sqlite, Self::Postgres, Self::MySql];

    /// Stable lowercase name, used in artifact paths.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Sqlite => "sqlite",
            Self::Postgres => "postgres",
            Self::MySql => "mysql",
        }
    }
}

impl std::fmt::Display for StoreKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for StoreKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "memory" | "mem" | "mock" => Ok(Self::Memory),
            "sqlite" | "sqlite3" => Ok(Self::Sqlite),
            "postgres" | "postgresql" | "pg" => Ok(Self::Postgres),
            "mysql" => Ok(Self::MySql),
            _ => Err(format!(
                "Unknown store: {s}. Valid options: memory, sqlite, postgres, mysql"
            )),
        }
    }
}

/// Capability set the load generator drives.
///
/// Implementations are shared by many worker threads at once, so every method
/// takes `&self`. Key ranges are half-open: `[range_from, range_to)`.
pub trait Store: Send + Sync {
    /// Which store family this handle talks to.
    fn kind(&self) -> StoreKind;

    /// Create the table and indexes if they are missing.
    ///
    /// Must be idempotent: a second call against an initialized store succeeds.
    fn init(&self) -> Result<(), StoreError>;

    /// Insert one row with a random wide title and a random value.
    fn insert(&self) -> bool;

    /// Overwrite the narrow `val` column of one random row.
    fn update_tiny(&self, range_from: u32, range_to: u32) -> bool;

    /// Overwrite the wide `title` column of one random row.
    fn update_wide(&self, range_from: u32, range_to: u32) -> bool;

    /// Point lookup of one random row. A missing row counts as a failure.
    fn select_lite(&self, range_from: u32, range_to: u32) -> bool;

    /// Aggregate over `size + 1` consecutive ids starting at a random offset.
    fn select_heavy(&self, range_from: u32, range_to: u32, size: u32) -> bool;

    /// Release every pooled connection. Later operations report failure.
    fn close(&self);
}

/// Provisions store handles for a given kind and pool size.
///
/// The load generator only ever goes through this trait, which keeps it
/// testable with fault-injecting or call-counting factories.
pub trait StoreFactory: Send + Sync {
    fn open(&self, kind: StoreKind, pool_size: u32) -> Result<Arc<dyn Store>, StoreError>;
}

impl<F: StoreFactory + ?Sized> StoreFactory for Arc<F> {
    fn open(&self, kind: StoreKind, pool_size: u32) -> Result<Arc<dyn Store>, StoreError> {
        (**self).open(kind, pool_size)
    }
}

/// Connection targets for the store kinds that need one.
///
/// URLs may contain a `{host}` placeholder which is replaced with the sweep's
/// host identifier.
#[derive(Debug, Clone)]
pub struct ConnectionSettings {
    /// Directory holding the SQLite database file.
    pub sqlite_dir: PathBuf,
    /// PostgreSQL connection URL.
    pub postgres_url: String,
    /// MySQL connection URL.
    pub mysql_url: String,
    /// Maximum wait for a pooled connection.
    pub acquire_timeout: Duration,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            sqlite_dir: PathBuf::from("sqlite"),
            postgres_url: "postgres://postgres:postgres@{host}/demo".to_string(),
            mysql_url: "mysql://root:123@{host}:3306/demo".to_string(),
            acquire_timeout: DEFAULT_ACQUIRE_TIMEOUT,
        }
    }
}

/// Factory that opens real adapters keyed by [`StoreKind`].
///
/// Every memory handle it opens shares one [`MemoryTable`], the in-process
/// counterpart of a database that outlives its pools.
#[derive(Debug, Clone)]
pub struct DefaultStoreFactory {
    host: String,
    settings: ConnectionSettings,
    memory: Arc<MemoryTable>,
}

impl DefaultStoreFactory {
    pub fn new(host: &str, settings: ConnectionSettings) -> Self {
        Self {
            host: host.to_string(),
            settings,
            memory: Arc::new(MemoryTable::new()),
        }
    }

    /// The table behind every memory handle this factory opens.
    pub fn memory_table(&self) -> &Arc<MemoryTable> {
        &self.memory
    }

    /// Resolve the `{host}` placeholder in a connection URL.
    pub fn resolve_url(&self, template: &str) -> String {
        template.replace("{host}", &self.host)
    }
}

impl StoreFactory for DefaultStoreFactory {
    fn open(&self, kind: StoreKind, pool_size: u32) -> Result<Arc<dyn Store>, StoreError> {
        tracing::debug!("Opening {} pool of {} for host {}", kind, pool_size, self.host);

        match kind {
            StoreKind::Memory => Ok(Arc::new(MemoryStore::attach(Arc::clone(&self.memory)))),
            StoreKind::Sqlite => {
                let store = SqliteStore::open(
                    &self.settings.sqlite_dir,
                    pool_size,
                    self.settings.acquire_timeout,
                )?;
                Ok(Arc::new(store))
            }
            #[cfg(feature = "postgres")]
            StoreKind::Postgres => {
                let url = self.resolve_url(&self.settings.postgres_url);
                let store = PostgresStore::connect(&url, pool_size, self.settings.acquire_timeout)?;
                Ok(Arc::new(store))
            }
            #[cfg(feature = "mysql")]
            StoreKind::MySql => {
                let url = self.resolve_url(&self.settings.mysql_url);
                let store = MySqlStore::connect(&url, pool_size, self.settings.acquire_timeout)?;
                Ok(Arc::new(store))
            }
            #[allow(unreachable_patterns)]
            other => Err(StoreError::Unsupported(other)),
        }
    }
}

/// Pick a random key in `[from, to)`, or `None` when the range is empty.
pub(crate) fn pick_key(from: u32, to: u32) -> Option<u32> {
    if from >= to {
        return None;
    }
    Some(rand::rng().random_range(from..to))
}

/// Pick the window `[start, start + size]` for an aggregate read.
///
/// `start` is drawn from `[from, to - size)`; `None` when that range is empty.
pub(crate) fn pick_window(from: u32, to: u32, size: u32) -> Option<(u32, u32)> {
    let upper = to.checked_sub(size)?;
    let start = pick_key(from, upper)?;
    Some((start, start + size))
}

/// Random 8-digit fragment used for titles.
pub(crate) fn title_fragment() -> String {
    format!("{:08}", rand::rng().random_range(0..100_000_000u32))
}

/// A full wide title: the fragment repeated [`TITLE_REPEAT`] times.
pub(crate) fn wide_title() -> String {
    title_fragment().repeat(TITLE_REPEAT)
}

/// Random non-negative column value.
pub(crate) fn random_val() -> i32 {
    rand::rng().random_range(0..1_000_000_000)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_kind_round_trips_through_name() {
        for kind in StoreKind::ALL {
            assert_eq!(kind.name().parse::<StoreKind>().unwrap(), kind);
        }
        assert_eq!("PG".parse::<StoreKind>().unwrap(), StoreKind::Postgres);
        assert!("mongo".parse::<StoreKind>().is_err());
    }

    #[test]
    fn test_pick_key_stays_in_half_open_range() {
        for _ in 0..1000 {
            let key = pick_key(1, 5).unwrap();
            assert!((1..5).contains(&key));
        }
        assert_eq!(pick_key(5, 5), None);
        assert_eq!(pick_key(6, 5), None);
    }

    #[test]
    fn test_pick_window_requires_room_for_size() {
        for _ in 0..1000 {
            let (start, end) = pick_window(1, 100, 10).unwrap();
            assert!((1..90).contains(&start));
            assert_eq!(end, start + 10);
        }
        assert_eq!(pick_window(1, 10, 9), None);
        assert_eq!(pick_window(1, 10, 20), None);
    }

    #[test]
    fn test_wide_title_shape() {
        let title = wide_title();
        assert_eq!(title.len(), 8 * TITLE_REPEAT);
        assert_eq!(&title[..8], &title[8..16]);
    }

    #[test]
    fn test_resolve_url_substitutes_host() {
        let factory = DefaultStoreFactory::new("db.internal", ConnectionSettings::default());
        assert_eq!(
            factory.resolve_url("postgres://u:p@{host}/demo"),
            "postgres://u:p@db.internal/demo"
        );
    }

    #[test]
    fn test_default_factory_opens_memory_store() {
        let factory = DefaultStoreFactory::new("localhost", ConnectionSettings::default());
        let store = factory.open(StoreKind::Memory, 4).unwrap();
        assert_eq!(store.kind(), StoreKind::Memory);
        store.init().unwrap();
        assert!(store.insert());
        store.close();
    }

    #[test]
    fn test_memory_handles_from_one_factory_share_rows() {
        let factory = DefaultStoreFactory::new("localhost", ConnectionSettings::default());
        let shared = factory.open(StoreKind::Memory, 4).unwrap();
        let write = factory.open(StoreKind::Memory, 2).unwrap();
        shared.init().unwrap();

        for _ in 0..10 {
            assert!(write.insert());
        }
        let hits = (0..100).filter(|_| shared.select_lite(1, 11)).count();
        assert_eq!(hits, 100);

        write.close();
        shared.close();
        assert_eq!(factory.memory_table().len(), 10);

        let next_run = factory.open(StoreKind::Memory, 4).unwrap();
        assert!(next_run.select_lite(1, 11));
    }
}
