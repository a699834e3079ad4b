//! File-backed draft store: one file per key.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;

use super::{check_quota, DraftStore, StoreError, StoreResult};

pub struct FileStore {
    dir: PathBuf,
    quota: usize,
}

impl FileStore {
    /// Open (creating if needed) a store rooted at `dir`.
    pub async fn open(dir: impl Into<PathBuf>, quota: usize) -> StoreResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).await?;
        Ok(Self { dir, quota })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> StoreResult<PathBuf> {
        let valid = !key.is_empty()
            && !key.starts_with('.')
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
        if !valid {
            return Err(StoreError::invalid_key(key));
        }
        Ok(self.dir.join(key))
    }
}

#[async_trait]
impl DraftStore for FileStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path).await {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        check_quota(value, self.quota)?;
        let path = self.path_for(key)?;

        // Write beside the target and rename so readers never see a partial draft.
        // Keys never start with '.', so the temp name cannot be another key's.
        let tmp = self.dir.join(format!(".{key}.tmp"));
        fs::write(&tmp, value).await?;
        fs::rename(&tmp, &path).await?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> StoreResult<()> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
