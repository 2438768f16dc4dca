mod error;
mod s3;

pub use error::StorageError;
pub use s3::S3ObjectStorage;

use async_trait::async_trait;
use std::path::Path;

/// A blob the storage adapter knows about, as surfaced by `List`.
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub key: String,
    pub size_bytes: i64,
    pub last_modified: Option<chrono::DateTime<chrono::Utc>>,
}

/// Capability set every storage provider (S3, R2, generic-S3-compatible)
/// implements identically -- they differ only in endpoint and path-style
/// configuration, modeled as construction parameters, not distinct types.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn upload(&self, local_path: &Path, key: &str, metadata: &[(&str, &str)]) -> Result<(), StorageError>;
    async fn download(&self, key: &str, local_path: &Path) -> Result<(), StorageError>;
    async fn delete(&self, key: &str) -> Result<(), StorageError>;
    async fn list(&self, prefix: &str) -> Result<Vec<StoredObject>, StorageError>;
}
