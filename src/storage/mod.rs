//! Object storage gateway.
//!
//! Buckets hold flat keys. Every backend reports failures through
//! [`StorageError`] so callers can tell a missing object from an outage.

mod local;
mod retry;
mod s3;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

pub use local::LocalObjectStore;
pub use retry::{RetryPolicy, RetryingObjectStore};
pub use s3::S3ObjectStore;

use crate::config::{AppConfig, StorageBackendKind};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("bucket already exists: {0}")]
    BucketAlreadyExists(String),

    #[error("object already exists: {0}")]
    ObjectExists(String),

    #[error("bucket not empty: {0}")]
    BucketNotEmpty(String),

    #[error("invalid name: {0}")]
    InvalidName(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("backend error: {message}")]
    Backend { message: String, transient: bool },
}

impl StorageError {
    /// Whether retrying the same call may succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            StorageError::Backend { transient, .. } => *transient,
            StorageError::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::Interrupted
                    | std::io::ErrorKind::TimedOut
                    | std::io::ErrorKind::WouldBlock
            ),
            _ => false,
        }
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound(_))
    }
}

pub type StorageResult<T> = Result<T, StorageError>;

#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn create_bucket(&self, bucket: &str) -> StorageResult<()>;

    /// Fails with `BucketNotEmpty` unless every object was removed first.
    async fn delete_bucket(&self, bucket: &str) -> StorageResult<()>;

    async fn bucket_exists(&self, bucket: &str) -> StorageResult<bool>;

    /// Stores a new object. Never replaces one: an existing key fails with
    /// `ObjectExists` and keeps its content.
    async fn put_object(&self, bucket: &str, key: &str, data: Bytes) -> StorageResult<()>;

    async fn get_object(&self, bucket: &str, key: &str) -> StorageResult<Bytes>;

    /// Lists every key in the bucket.
    async fn list_objects(&self, bucket: &str) -> StorageResult<Vec<String>>;

    async fn delete_object(&self, bucket: &str, key: &str) -> StorageResult<()>;
}

/// Builds the configured backend wrapped in the retry policy.
pub async fn from_config(config: &AppConfig) -> StorageResult<Arc<dyn ObjectStore>> {
    let storage = &config.storage;

    let backend: Arc<dyn ObjectStore> = match storage.backend {
        StorageBackendKind::Local => {
            Arc::new(LocalObjectStore::new(&config.local_storage_root()).await?)
        }
        StorageBackendKind::S3 => Arc::new(S3ObjectStore::new(storage).await),
    };

    let policy = RetryPolicy::new(
        storage.retry_attempts,
        Duration::from_millis(storage.retry_base_delay_ms),
    );

    Ok(Arc::new(RetryingObjectStore::new(backend, policy)))
}
