//! SQLite-backed key-value store for single-host deployments.
//!
//! Rows carry an absolute `expires_at` (unix ms). Expired rows are invisible
//! to reads and removed by [`SqliteStore::purge_expired`].

use std::{
    str::FromStr,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use {
    async_trait::async_trait,
    sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    tracing::debug,
};

use crate::{error::Result, kv::KeyValueStore};

/// Whole milliseconds in `d`, saturating at `i64::MAX`.
fn millis(d: Duration) -> i64 {
    i64::try_from(d.as_millis()).unwrap_or(i64::MAX)
}

fn now_ms() -> i64 {
    millis(
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default(),
    )
}

pub struct SqliteStore {
    pool: sqlx::SqlitePool,
}

impl SqliteStore {
    /// Open (creating if needed) the database file at `path`.
    pub async fn open(path: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(&format!("sqlite://{path}"))?
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new().connect_with(options).await?;
        debug!(path, "opened sqlite session store");
        Self::with_pool(pool).await
    }

    /// Wrap an existing pool, creating the table if needed.
    pub async fn with_pool(pool: sqlx::SqlitePool) -> Result<Self> {
        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS kv (
                key        TEXT PRIMARY KEY NOT NULL,
                value      TEXT NOT NULL,
                expires_at INTEGER NOT NULL
            )"#,
        )
        .execute(&pool)
        .await?;
        Ok(Self { pool })
    }

    /// Delete every expired row. Returns the number removed.
    pub async fn purge_expired(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM kv WHERE expires_at <= ?")
            .bind(now_ms())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn set_until(&self, key: &str, value: &str, expires_at: i64) -> Result<()> {
        sqlx::query(
            r#"INSERT INTO kv (key, value, expires_at)
               VALUES (?, ?, ?)
               ON CONFLICT(key) DO UPDATE SET
                 value = excluded.value,
                 expires_at = excluded.expires_at"#,
        )
        .bind(key)
        .bind(value)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for SqliteStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let row = sqlx::query_scalar::<_, String>(
            "SELECT value FROM kv WHERE key = ? AND expires_at > ?",
        )
        .bind(key)
        .bind(now_ms())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let expires_at = now_ms().saturating_add(millis(ttl));
        self.set_until(key, value, expires_at).await
    }
}
