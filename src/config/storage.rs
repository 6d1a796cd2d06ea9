use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackendKind {
    /// Buckets are directories under `<data_dir>/objects`.
    #[default]
    Local,
    /// Any S3-compatible service (AWS, MinIO, R2, ...).
    S3,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackendKind,
    /// Prepended to the slug of every repository name to form its bucket name.
    pub bucket_prefix: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    pub region: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_key_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret_access_key: Option<String>,
    /// Required by MinIO and most self-hosted S3 implementations.
    pub force_path_style: bool,
    pub retry_attempts: u32,
    pub retry_base_delay_ms: u64,
}

impl StorageConfig {
    pub fn validate(&self) -> Result<()> {
        let prefix_ok = !self.bucket_prefix.is_empty()
            && self.bucket_prefix.len() <= 40
            && self
                .bucket_prefix
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
            && self.bucket_prefix.starts_with(|c: char| c.is_ascii_alphanumeric());
        if !prefix_ok {
            return Err(Error::Config(format!(
                "storage.bucket_prefix '{}' must be 1-40 lowercase alphanumerics or hyphens",
                self.bucket_prefix
            )));
        }
        if self.retry_attempts == 0 {
            return Err(Error::Config(
                "storage.retry_attempts must be at least 1".to_string(),
            ));
        }
        if self.access_key_id.is_some() != self.secret_access_key.is_some() {
            return Err(Error::Config(
                "storage.access_key_id and storage.secret_access_key must be set together"
                    .to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackendKind::Local,
            bucket_prefix: "filehosting-".to_string(),
            endpoint: None,
            region: "us-east-1".to_string(),
            access_key_id: None,
            secret_access_key: None,
            force_path_style: true,
            retry_attempts: 3,
            retry_base_delay_ms: 100,
        }
    }
}
