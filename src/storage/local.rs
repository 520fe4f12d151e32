//! Local filesystem storage backend.

use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Path, PathBuf};
use tokio::fs;

use super::backend::{StorageBackend, StorageError, StorageResult};

/// Resources stored as plain files under `{base_path}/{namespace}/`,
/// sharded into subdirectories named after the first two key characters.
pub struct LocalStorage {
    base_path: PathBuf,
}

impl LocalStorage {
    /// Create a new local storage backend
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    /// Get the full path for a key
    fn key_path(&self, namespace: &str, key: &str) -> StorageResult<PathBuf> {
        if key.is_empty() || key.contains(['/', '\\']) || key.starts_with('.') {
            return Err(StorageError::InvalidKey(key.to_string()));
        }

        // Keys are ASCII (uuid hex), so byte slicing stays on char boundaries
        if key.len() >= 2 && key.is_ascii() {
            Ok(self.base_path.join(namespace).join(&key[..2]).join(&key[2..]))
        } else {
            Ok(self.base_path.join(namespace).join(key))
        }
    }

    /// Ensure parent directory exists
    async fn ensure_parent(&self, path: &Path) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }
}

fn not_found_or_io(namespace: &str, key: &str, e: std::io::Error) -> StorageError {
    if e.kind() == std::io::ErrorKind::NotFound {
        StorageError::NotFound(format!("{}/{}", namespace, key))
    } else {
        StorageError::Io(e)
    }
}

#[async_trait]
impl StorageBackend for LocalStorage {
    async fn put(&self, namespace: &str, key: &str, data: Bytes) -> StorageResult<()> {
        let path = self.key_path(namespace, key)?;
        self.ensure_parent(&path).await?;
        fs::write(&path, &data).await?;
        tracing::debug!("Stored {} bytes at {}/{}", data.len(), namespace, key);
        Ok(())
    }

    async fn delete(&self, namespace: &str, key: &str) -> StorageResult<()> {
        let path = self.key_path(namespace, key)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()), // Already deleted
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    async fn exists(&self, namespace: &str, key: &str) -> StorageResult<bool> {
        let path = self.key_path(namespace, key)?;
        Ok(fs::try_exists(&path).await?)
    }

    async fn get_stream(
        &self,
        namespace: &str,
        key: &str,
    ) -> StorageResult<Box<dyn tokio::io::AsyncRead + Unpin + Send>> {
        let path = self.key_path(namespace, key)?;
        let file = fs::File::open(&path)
            .await
            .map_err(|e| not_found_or_io(namespace, key, e))?;
        Ok(Box::new(file))
    }
}
