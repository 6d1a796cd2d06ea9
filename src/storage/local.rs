use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use super::{ObjectStore, StorageError, StorageResult};

const TEMP_DIR: &str = ".tmp";

/// Filesystem object store: one directory per bucket, one file per key.
pub struct LocalObjectStore {
    base_path: PathBuf,
}

impl LocalObjectStore {
    pub async fn new(root: &Path) -> StorageResult<Self> {
        fs::create_dir_all(root.join(TEMP_DIR)).await?;
        Ok(Self {
            base_path: root.to_path_buf(),
        })
    }

    fn bucket_path(&self, bucket: &str) -> StorageResult<PathBuf> {
        validate_bucket(bucket)?;
        Ok(self.base_path.join(bucket))
    }

    fn object_path(&self, bucket: &str, key: &str) -> StorageResult<PathBuf> {
        validate_key(key)?;
        Ok(self.bucket_path(bucket)?.join(key))
    }

    fn temp_path(&self) -> PathBuf {
        self.base_path
            .join(TEMP_DIR)
            .join(Uuid::new_v4().to_string())
    }

    async fn require_bucket(&self, bucket: &str) -> StorageResult<PathBuf> {
        let path = self.bucket_path(bucket)?;
        if !fs::try_exists(&path).await? {
            return Err(StorageError::NotFound(bucket.to_string()));
        }
        Ok(path)
    }
}

fn not_found_or(e: std::io::Error, what: String) -> StorageError {
    if e.kind() == ErrorKind::NotFound {
        StorageError::NotFound(what)
    } else {
        StorageError::Io(e)
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn create_bucket(&self, bucket: &str) -> StorageResult<()> {
        let path = self.bucket_path(bucket)?;
        match fs::create_dir(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                Err(StorageError::BucketAlreadyExists(bucket.to_string()))
            }
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    async fn delete_bucket(&self, bucket: &str) -> StorageResult<()> {
        let path = self.require_bucket(bucket).await?;

        let mut entries = fs::read_dir(&path).await?;
        if entries.next_entry().await?.is_some() {
            return Err(StorageError::BucketNotEmpty(bucket.to_string()));
        }

        fs::remove_dir(&path)
            .await
            .map_err(|e| not_found_or(e, bucket.to_string()))
    }

    async fn bucket_exists(&self, bucket: &str) -> StorageResult<bool> {
        let path = self.bucket_path(bucket)?;
        Ok(fs::try_exists(&path).await?)
    }

    async fn put_object(&self, bucket: &str, key: &str, data: Bytes) -> StorageResult<()> {
        let final_path = self.object_path(bucket, key)?;
        self.require_bucket(bucket).await?;

        let temp_path = self.temp_path();
        let mut temp_file = File::create(&temp_path).await?;
        temp_file.write_all(&data).await?;
        temp_file.sync_all().await?;

        // Linking fails when the key exists, so a complete file appears
        // under the key or nothing changes.
        let linked = fs::hard_link(&temp_path, &final_path).await;
        if let Err(e) = fs::remove_file(&temp_path).await {
            tracing::warn!("Failed to remove temp file {}: {e}", temp_path.display());
        }

        match linked {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                Err(StorageError::ObjectExists(format!("{bucket}/{key}")))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn get_object(&self, bucket: &str, key: &str) -> StorageResult<Bytes> {
        let path = self.object_path(bucket, key)?;
        let data = fs::read(&path)
            .await
            .map_err(|e| not_found_or(e, format!("{bucket}/{key}")))?;
        Ok(Bytes::from(data))
    }

    async fn list_objects(&self, bucket: &str) -> StorageResult<Vec<String>> {
        let path = self.require_bucket(bucket).await?;

        let mut keys = Vec::new();
        let mut entries = fs::read_dir(&path).await?;
        while let Some(entry) = entries.next_entry().await? {
            if let Some(name) = entry.file_name().to_str() {
                keys.push(name.to_string());
            }
        }
        keys.sort();

        Ok(keys)
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> StorageResult<()> {
        let path = self.object_path(bucket, key)?;
        fs::remove_file(&path)
            .await
            .map_err(|e| not_found_or(e, format!("{bucket}/{key}")))
    }
}

/// Bucket names follow the S3 rules: 3-63 chars of `[a-z0-9.-]`,
/// starting and ending with a letter or digit.
fn validate_bucket(bucket: &str) -> StorageResult<()> {
    let valid = (3..=63).contains(&bucket.len())
        && bucket
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '.')
        && bucket.starts_with(|c: char| c.is_ascii_alphanumeric())
        && bucket.ends_with(|c: char| c.is_ascii_alphanumeric());

    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidName(bucket.to_string()))
    }
}

/// Keys are flat: no separators, no dot segments.
fn validate_key(key: &str) -> StorageResult<()> {
    const INVALID_CHARS: &[char] = &['/', '\\', '\0', '\n', '\r'];

    if key.is_empty()
        || key.len() > 255
        || key == "."
        || key == ".."
        || key.chars().any(|c| INVALID_CHARS.contains(&c))
    {
        return Err(StorageError::InvalidName(key.to_string()));
    }

    Ok(())
}
