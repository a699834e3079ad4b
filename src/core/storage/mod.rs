//! Draft storage.
//!
//! A small string key-value store the current draft is mirrored into. Every
//! backend enforces a per-value quota and reports a full store as
//! [`StoreError::QuotaExceeded`] rather than truncating.
//!
//! # Modules
//!
//! - `error` - Error types for store operations
//! - `file` - One file per key under a data directory
//! - `sqlite` - Key-value table in a SQLite database

pub mod error;
pub mod file;
pub mod sqlite;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::config::{AppConfig, StoreBackend};

pub use error::{StoreError, StoreResult};
pub use file::FileStore;
pub use sqlite::SqliteStore;

pub const DEFAULT_QUOTA_BYTES: usize = 5 * 1024 * 1024;

/// Device-local string storage.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DraftStore: Send + Sync {
    async fn get(&self, key: &str) -> StoreResult<Option<String>>;
    async fn set(&self, key: &str, value: &str) -> StoreResult<()>;
    async fn remove(&self, key: &str) -> StoreResult<()>;
}

#[async_trait]
impl<S: DraftStore + ?Sized> DraftStore for Arc<S> {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        (**self).get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        (**self).set(key, value).await
    }

    async fn remove(&self, key: &str) -> StoreResult<()> {
        (**self).remove(key).await
    }
}

pub(crate) fn check_quota(value: &str, limit: usize) -> StoreResult<()> {
    if value.len() > limit {
        return Err(StoreError::QuotaExceeded {
            size: value.len(),
            limit,
        });
    }
    Ok(())
}

/// In-process store. Contents are lost when dropped.
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
    quota: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_quota(DEFAULT_QUOTA_BYTES)
    }

    pub fn with_quota(quota: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            quota,
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DraftStore for MemoryStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        check_quota(value, self.quota)?;
        self.entries
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> StoreResult<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}

/// Open the backend named in the configuration.
pub async fn open_store(config: &AppConfig) -> StoreResult<Arc<dyn DraftStore>> {
    let quota = config.mirror.quota_bytes;
    let store: Arc<dyn DraftStore> = match config.data.backend {
        StoreBackend::Memory => Arc::new(MemoryStore::with_quota(quota)),
        StoreBackend::File => {
            Arc::new(FileStore::open(config.data_dir().join("drafts"), quota).await?)
        }
        StoreBackend::Sqlite => {
            Arc::new(SqliteStore::open(&config.data_dir().join("tripkit.db"), quota).await?)
        }
    };
    log::debug!("Opened {:?} draft store", config.data.backend);
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_memory_store_crud() {
        let store = MemoryStore::new();
        assert_eq!(store.get("draft").await.unwrap(), None);

        store.set("draft", "{\"a\":1}").await.unwrap();
        assert_eq!(store.get("draft").await.unwrap().as_deref(), Some("{\"a\":1}"));

        store.set("draft", "{\"a\":2}").await.unwrap();
        assert_eq!(store.get("draft").await.unwrap().as_deref(), Some("{\"a\":2}"));

        store.remove("draft").await.unwrap();
        assert_eq!(store.get("draft").await.unwrap(), None);
        store.remove("draft").await.unwrap();
    }

    #[tokio::test]
    async fn test_memory_store_quota_keeps_previous_value() {
        let store = MemoryStore::with_quota(8);
        store.set("k", "short").await.unwrap();

        let err = store.set("k", "much too long").await.unwrap_err();
        assert!(matches!(err, StoreError::QuotaExceeded { size: 13, limit: 8 }));
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("short"));
    }

    #[tokio::test]
    async fn test_open_store_per_backend() {
        let dir = TempDir::new().unwrap();
        for backend in [StoreBackend::Memory, StoreBackend::File, StoreBackend::Sqlite] {
            let mut config = AppConfig::default();
            config.data.data_dir = Some(dir.path().to_path_buf());
            config.data.backend = backend;

            let store = open_store(&config).await.unwrap();
            store.set("tripkit.draft", "{}").await.unwrap();
            assert_eq!(store.get("tripkit.draft").await.unwrap().as_deref(), Some("{}"));
        }
    }
}
