//! Local JSON file persistence
//!
//! Notices and contacts are small lists that are read fully into memory at
//! startup and rewritten as a whole after every change. Writes go to a
//! sibling temp file that is synced and renamed over the target, so a crash mid-write
//! leaves the previous version intact.

use crate::errors::{AppError, Result};
use serde::{de::DeserializeOwned, Serialize};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// A JSON array of `T` stored in a single file
#[derive(Debug, Clone)]
pub struct JsonFileStore<T> {
    path: PathBuf,
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonFileStore<T>
where
    T: Serialize + DeserializeOwned,
{
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            _marker: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read all items; `None` when the file does not exist yet
    pub async fn read(&self) -> Result<Option<Vec<T>>> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(AppError::Storage {
                    message: format!("cannot read {}: {}", self.path.display(), e),
                })
            }
        };

        let items = serde_json::from_str(&raw).map_err(|e| AppError::Storage {
            message: format!("corrupt store file {}: {}", self.path.display(), e),
        })?;

        Ok(Some(items))
    }

    /// Replace the file contents with `items`
    pub async fn write(&self, items: &[T]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let body = serde_json::to_vec_pretty(items)?;
        let tmp = self.path.with_extension("json.tmp");

        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(&body).await?;
        file.sync_all().await?;
        drop(file);
        tokio::fs::rename(&tmp, &self.path).await?;

        debug!(
            path = %self.path.display(),
            items = items.len(),
            bytes = body.len(),
            "Store file written"
        );
        Ok(())
    }

    /// Load the stored items, seeding the file with `seed()` on first use
    pub async fn load_or_seed<F>(&self, seed: F) -> Result<Vec<T>>
    where
        F: FnOnce() -> Vec<T>,
    {
        match self.read().await? {
            Some(items) => Ok(items),
            None => {
                let items = seed();
                self.write(&items).await?;
                tracing::info!(
                    path = %self.path.display(),
                    items = items.len(),
                    "Store file seeded"
                );
                Ok(items)
            }
        }
    }

    /// Whether the backing directory exists and accepts writes
    pub async fn is_writable(&self) -> bool {
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        match tokio::fs::metadata(&dir).await {
            Ok(meta) => meta.is_dir() && !meta.permissions().readonly(),
            Err(_) => false,
        }
    }
}
