//! PostgreSQL adapter (via sqlx).

#![allow(clippy::cast_possible_wrap, clippy::cast_possible_truncation)] // keys and repeat counts are far below i32::MAX

use super::runtime::{BlockingRuntime, redact_url};
use super::{Store, StoreKind, TABLE_NAME, TITLE_REPEAT, pick_key, pick_window, random_val, title_fragment};
use crate::error::StoreError;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::time::Duration;

const IDLE_TIMEOUT: Duration = Duration::from_secs(5 * 60);
const MAX_LIFETIME: Duration = Duration::from_secs(60 * 60);

/// Pooled connections to a PostgreSQL database.
pub struct PostgresStore {
    pool: PgPool,
    runtime: BlockingRuntime,
    target: String,
}

impl PostgresStore {
    /// Connect and eagerly open `pool_size` connections.
    pub fn connect(url: &str, pool_size: u32, acquire_timeout: Duration) -> Result<Self, StoreError> {
        let target = redact_url(url);
        if pool_size == 0 {
            return Err(StoreError::Connect {
                kind: StoreKind::Postgres,
                target,
                reason: "pool size must be at least 1".to_string(),
            });
        }

        let runtime = BlockingRuntime::new(StoreKind::Postgres)?;
        let pool = runtime
            .block_on(
                PgPoolOptions::new()
                    .max_connections(pool_size)
                    .min_connections(pool_size)
                    .acquire_timeout(acquire_timeout)
                    .idle_timeout(IDLE_TIMEOUT)
                    .max_lifetime(MAX_LIFETIME)
                    .connect(url),
            )
            .map_err(|e| StoreError::Connect {
                kind: StoreKind::Postgres,
                target: target.clone(),
                reason: e.to_string(),
            })?;

        tracing::debug!("Opened PostgreSQL pool of {} at {}", pool_size, target);
        Ok(Self { pool, runtime, target })
    }

    fn attempt<F>(&self, op: &str, future: F) -> bool
    where
        F: Future<Output = Result<bool, sqlx::Error>>,
    {
        match self.runtime.block_on(future) {
            Ok(ok) => ok,
            Err(e) => {
                tracing::trace!("PostgreSQL {} failed: {}", op, e);
                false
            }
        }
    }
}

impl Store for PostgresStore {
    fn kind(&self) -> StoreKind {
        StoreKind::Postgres
    }

    fn init(&self) -> Result<(), StoreError> {
        let ddl = format!(
            "CREATE TABLE IF NOT EXISTS {TABLE_NAME} (
                id    SERIAL  NOT NULL PRIMARY KEY,
                title TEXT    NULL,
                val   INTEGER NOT NULL DEFAULT 0
            )"
        );
        self.runtime
            .block_on(sqlx::query(&ddl).execute(&self.pool))
            .map(|_| ())
            .map_err(|e| StoreError::Init {
                kind: StoreKind::Postgres,
                reason: format!("{}: {e}", self.target),
            })
    }

    fn insert(&self) -> bool {
        let sql = format!("INSERT INTO {TABLE_NAME} (title, val) VALUES (repeat($1, $2), $3)");
        self.attempt("insert", async {
            sqlx::query(&sql)
                .bind(title_fragment())
                .bind(TITLE_REPEAT as i32)
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
        let sql = format!("UPDATE {TABLE_NAME} SET val = $1 WHERE id = $2");
        self.attempt("update_tiny", async {
            sqlx::query(&sql)
                .bind(random_val())
                .bind(id as i32)
                .execute(&self.pool)
                .await?;
            Ok(true)
        })
    }

    fn update_wide(&self, range_from: u32, range_to: u32) -> bool {
        let Some(id) = pick_key(range_from, range_to) else {
            return false;
        };
        let sql = format!("UPDATE {TABLE_NAME} SET title = repeat($1, $2) WHERE id = $3");
        self.attempt("update_wide", async {
            sqlx::query(&sql)
                .bind(title_fragment())
                .bind(TITLE_REPEAT as i32)
                .bind(id as i32)
                .execute(&self.pool)
                .await?;
            Ok(true)
        })
    }

    fn select_lite(&self, range_from: u32, range_to: u32) -> bool {
        let Some(id) = pick_key(range_from, range_to) else {
            return false;
        };
        let sql = format!("SELECT val FROM {TABLE_NAME} WHERE id = $1");
        self.attempt("select_lite", async {
            let row = sqlx::query(&sql)
                .bind(id as i32)
                .fetch_optional(&self.pool)
                .await?;
            Ok(row.is_some())
        })
    }

    fn select_heavy(&self, range_from: u32, range_to: u32, size: u32) -> bool {
        let Some((start, end)) = pick_window(range_from, range_to, size) else {
            return false;
        };
        let sql = format!("SELECT avg(val) FROM {TABLE_NAME} WHERE id BETWEEN $1 AND $2");
        self.attempt("select_heavy", async {
            sqlx::query(&sql)
                .bind(start as i32)
                .bind(end as i32)
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
        tracing::debug!("Closed PostgreSQL pool at {}", self.target);
    }
}
