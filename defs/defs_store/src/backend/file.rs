//! File-based storage backend.
//!
//! Each key maps to a file below the base directory, with `/` separating
//! directories. Writes go to a temporary file in the same directory that is
//! synced and then renamed over the target.

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use defs_core::error::{Result, StoreError};
use tracing::trace;

use super::StorageBackend;

const TEMP_PREFIX: &str = ".tmp-";

/// A store rooted at a directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    /// Base directory for storage
    base_dir: PathBuf,
}

impl FileStorage {
    /// Create a file storage backend rooted at `base_dir`.
    ///
    /// The directory is created lazily on the first write.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// The base directory.
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Get the full path for a key, rejecting keys that could escape the base directory.
    fn path_for(&self, key: &str) -> Result<PathBuf> {
        let mut path = self.base_dir.clone();
        for segment in key.split('/') {
            let valid = !segment.is_empty()
                && segment != "."
                && segment != ".."
                && !segment.starts_with(TEMP_PREFIX)
                && !segment.contains(['\\', '\0']);
            if !valid {
                return Err(StoreError::InvalidKey(key.to_string()).into());
            }
            path.push(segment);
        }
        Ok(path)
    }
}

#[async_trait]
impl StorageBackend for FileStorage {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path_for(key)?;

        match tokio::fs::read(&path).await {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn set(&self, key: &str, data: &[u8]) -> Result<()> {
        let path = self.path_for(key)?;
        let (Some(parent), Some(file_name)) = (path.parent(), path.file_name()) else {
            return Err(StoreError::InvalidKey(key.to_string()).into());
        };
        tokio::fs::create_dir_all(parent).await?;

        // Write atomically using a temporary file
        let temp_path = parent.join(format!(
            "{}{}-{}",
            TEMP_PREFIX,
            file_name.to_string_lossy(),
            uuid::Uuid::new_v4().simple()
        ));
        tokio::fs::write(&temp_path, data).await?;

        let file = tokio::fs::File::open(&temp_path).await?;
        file.sync_all().await?;

        if let Err(e) = tokio::fs::rename(&temp_path, &path).await {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        trace!(key, bytes = data.len(), "Stored key");
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let path = self.path_for(key)?;

        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn keys(&self, prefix: &str) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        let mut pending = vec![(self.base_dir.clone(), String::new())];

        while let Some((dir, relative)) = pending.pop() {
            let mut entries = match tokio::fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };

            while let Some(entry) = entries.next_entry().await? {
                let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                    continue;
                };
                if name.starts_with(TEMP_PREFIX) {
                    continue;
                }
                let key = format!("{}{}", relative, name);
                let file_type = entry.file_type().await?;
                if file_type.is_dir() {
                    pending.push((entry.path(), format!("{}/", key)));
                } else if file_type.is_file() && key.starts_with(prefix) {
                    keys.push(key);
                }
            }
        }

        keys.sort();
        Ok(keys)
    }
}
