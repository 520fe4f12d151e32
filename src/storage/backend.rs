//! Storage backend trait definition.

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

/// Storage error types
#[derive(Debug, Error)]
pub enum StorageError {
    /// Object not found
    #[error("Object not found: {0}")]
    NotFound(String),
    /// Key that would escape the namespace directory
    #[error("Invalid key: {0}")]
    InvalidKey(String),
    /// IO error
    #[error("IO error: {0}")]
    Io(std::io::Error),
}

impl From<std::io::Error> for StorageError {
    fn from(e: std::io::Error) -> Self {
        if e.kind() == std::io::ErrorKind::NotFound {
            StorageError::NotFound(e.to_string())
        } else {
            StorageError::Io(e)
        }
    }
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Storage backend trait for pluggable storage.
///
/// Keys are organized by namespace so that public and private resources
/// can be served (or hidden) with different policies.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Put an object by namespace and key
    async fn put(&self, namespace: &str, key: &str, data: Bytes) -> StorageResult<()>;

    /// Delete an object by namespace and key. Deleting a missing object is not an error.
    async fn delete(&self, namespace: &str, key: &str) -> StorageResult<()>;

    /// Check if an object exists
    async fn exists(&self, namespace: &str, key: &str) -> StorageResult<bool>;

    /// Open a reader over a stored resource
    async fn get_stream(
        &self,
        namespace: &str,
        key: &str,
    ) -> StorageResult<Box<dyn tokio::io::AsyncRead + Unpin + Send>>;
}

/// Storage namespaces
pub mod namespaces {
    /// Resources of public assets
    pub const PUBLIC: &str = "assets-public";
    /// Resources of private assets
    pub const PRIVATE: &str = "assets-private";
}
