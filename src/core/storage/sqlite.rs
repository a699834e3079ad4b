//! SQLite-backed draft store.
//!
//! A single `drafts` key-value table, written with `INSERT OR REPLACE`.

use std::path::Path;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;

use super::{check_quota, DraftStore, StoreResult};

const CREATE_DRAFTS: &str = r#"
CREATE TABLE IF NOT EXISTS drafts (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
)
"#;

pub struct SqliteStore {
    pool: SqlitePool,
    quota: usize,
}

impl SqliteStore {
    /// Open (creating if needed) the database file at `path`.
    pub async fn open(path: &Path, quota: usize) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await?;
        Self::with_pool(pool, quota).await
    }

    /// Private in-memory database.
    pub async fn in_memory(quota: usize) -> StoreResult<Self> {
        // Each connection to :memory: is its own database, so keep exactly one.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        Self::with_pool(pool, quota).await
    }

    async fn with_pool(pool: SqlitePool, quota: usize) -> StoreResult<Self> {
        sqlx::query(CREATE_DRAFTS).execute(&pool).await?;
        Ok(Self { pool, quota })
    }
}

#[async_trait]
impl DraftStore for SqliteStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let row = sqlx::query("SELECT value FROM drafts WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| r.get("value")))
    }

    async fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        check_quota(value, self.quota)?;
        sqlx::query(
            "INSERT OR REPLACE INTO drafts (key, value, updated_at) VALUES (?, ?, datetime('now'))",
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> StoreResult<()> {
        sqlx::query("DELETE FROM drafts WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
