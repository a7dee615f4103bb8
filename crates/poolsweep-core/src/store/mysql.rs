//! MySQL adapter (via sqlx).
//!
//! MySQL has no `CREATE INDEX IF NOT EXISTS`, so initialization checks
//! `information_schema` first and only creates the table and its indexes when
//! the table is missing. Wide titles use `VARCHAR(1024)` with a prefix index.

#![allow(clippy::cast_possible_truncation)] // TITLE_REPEAT fits in u32

use super::runtime::{BlockingRuntime, redact_url};
use super::{Store, StoreKind, TABLE_NAME, TITLE_REPEAT, pick_key, pick_window, random_val, title_fragment};
use crate::error::StoreError;
use sqlx::MySqlPool;
use sqlx::mysql::MySqlPoolOptions;
use std::time::Duration;

const IDLE_TIMEOUT: Duration = Duration::from_secs(5 * 60);
const MAX_LIFETIME: Duration = Duration::from_secs(60 * 60);

/// Pooled connections to a MySQL database.
pub struct MySqlStore {
    pool: MySqlPool,
    runtime: BlockingRuntime,
    target: String,
}

impl MySqlStore {
    /// Connect and eagerly open `pool_size` connections.
    pub fn connect(url: &str, pool_size: u32, acquire_timeout: Duration) -> Result<Self, StoreError> {
        let target = redact_url(url);
        if pool_size == 0 {
            return Err(StoreError::Connect {
                kind: StoreKind::MySql,
                target,
                reason: "pool size must be at least 1".to_string(),
            });
        }

        let runtime = BlockingRuntime::new(StoreKind::MySql)?;
        let pool = runtime
            .block_on(
                MySqlPoolOptions::new()
                    .max_connections(pool_size)
                    .min_connections(pool_size)
                    .acquire_timeout(acquire_timeout)
                    .idle_timeout(IDLE_TIMEOUT)
                    .max_lifetime(MAX_LIFETIME)
                    .connect(url),
            )
            .map_err(|e| StoreError::Connect {
                kind: StoreKind::MySql,
                target: target.clone(),
                reason: e.to_string(),
            })?;

        tracing::debug!("Opened MySQL pool of {} at {}", pool_size, target);
        Ok(Self { pool, runtime, target })
    }

    fn attempt<F>(&self, op: &str, future: F) -> bool
    where
        F: Future<Output = Result<bool, sqlx::Error>>,
    {
        match self.runtime.block_on(future) {
            Ok(ok) => ok,
            Err(e) => {
                tracing::trace!("MySQL {} failed: {}", op, e);
                false
            }
        }
    }

    async fn create_schema(&self) -> Result<(), sqlx::Error> {
        let existing: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM information_schema.tables
              WHERE table_schema = DATABASE() AND table_name = ?",
        )
        .bind(TABLE_NAME)
        .fetch_one(&self.pool)
        .await?;
        if existing > 0 {
            return Ok(());
        }

        tracing::debug!("Creating {} table on {}", TABLE_NAME, self.target);
        sqlx::query(&format!(
            "CREATE TABLE {TABLE_NAME} (
                id    SERIAL        NOT NULL PRIMARY KEY,
                title VARCHAR(1024) NULL,
                val   INTEGER       NOT NULL DEFAULT 0
            )"
        ))
        .execute(&self.pool)
        .await?;
        sqlx::query(&format!("CREATE INDEX i_{TABLE_NAME}_title ON {TABLE_NAME}(title(255))"))
            .execute(&self.pool)
            .await?;
        sqlx::query(&format!("CREATE INDEX i_{TABLE_NAME}_val ON {TABLE_NAME}(val)"))
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

impl Store for MySqlStore {
    fn kind(&self) -> StoreKind {
        StoreKind::MySql
    }

    fn init(&self) -> Result<(), StoreError> {
        self.runtime
            .block_on(self.create_schema())
            .map_err(|e| StoreError::Init {
                kind: StoreKind::MySql,
                reason: format!("{}: {e}", self.target),
            })
    }

    fn insert(&self) -> bool {
        let sql = format!("INSERT INTO {TABLE_NAME} (title, val) VALUES (REPEAT(?, ?), ?)");
        self.attempt("insert", async {
            sqlx::query(&sql)
                .bind(title_fragment())
                .bind(TITLE_REPEAT as u32)
                .bind(random_val())
                .execute(&self.pool)
                .await?;
            Ok(true)
        })
    }

    fn update_tiny(&self, range_from: u32, range_to: u32) -> bool {
        let Some(id) = pick_key(range_from, range_to) else {
            return false;
        };
        let sql = format!("UPDATE {TABLE_NAME} SET val = ? WHERE id = ?");
        self.attempt("update_tiny", async {
            sqlx::query(&sql)
                .bind(random_val())
                .bind(id)
                .execute(&self.pool)
                .await?;
            Ok(true)
        })
    }

    fn update_wide(&self, range_from: u32, range_to: u32) -> bool {
        let Some(id) = pick_key(range_from, range_to) else {
            return false;
        };
        let sql = format!("UPDATE {TABLE_NAME} SET title = REPEAT(?, ?) WHERE id = ?");
        self.attempt("update_wide", async {
            sqlx::query(&sql)
                .bind(title_fragment())
                .bind(TITLE_REPEAT as u32)
                .bind(id)
                .execute(&self.pool)
                .await?;
            Ok(true)
        })
    }

    fn select_lite(&self, range_from: u32, range_to: u32) -> bool {
        let Some(id) = pick_key(range_from, range_to) else {
            return false;
        };
        let sql = format!("SELECT val FROM {TABLE_NAME} WHERE id = ?");
        self.attempt("select_lite", async {
            let row = sqlx::query(&sql).bind(id).fetch_optional(&self.pool).await?;
            Ok(row.is_some())
        })
    }

    fn select_heavy(&self, range_from: u32, range_to: u32, size: u32) -> bool {
        let Some((start, end)) = pick_window(range_from, range_to, size) else {
            return false;
        };
        let sql = format!("SELECT avg(val) FROM {TABLE_NAME} WHERE id BETWEEN ? AND ?");
        self.attempt("select_heavy", async {
            sqlx::query(&sql)
                .bind(start)
                .bind(end)
                .fetch_one(&self.pool)
                .await?;
            Ok(true)
        })
    }

    fn close(&self) {
        if self.pool.is_closed() {
            return;
        }
        self.runtime.block_on(self.pool.close());
        tracing::debug!("Closed MySQL pool at {}", self.target);
    }
}
