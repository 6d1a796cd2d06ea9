//! Process-wide configuration.
//!
//! Built once at startup from an optional TOML file, environment variables and
//! command line flags, then shared read-only.

mod auth;
mod server;
mod storage;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub use auth::{AuthConfig, DEFAULT_TOKEN_TTL_DAYS};
pub use server::ServerConfig;
pub use storage::{StorageBackendKind, StorageConfig};

use crate::error::{Error, Result};

pub const SECRET_ENV: &str = "FILEHOST_SECRET";
pub const ACCESS_KEY_ENV: &str = "AWS_ACCESS_KEY_ID";
pub const SECRET_KEY_ENV: &str = "AWS_SECRET_ACCESS_KEY";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub storage: StorageConfig,
}

impl AppConfig {
    /// Reads the TOML file at `path` (if any) and applies environment overrides.
    /// The result is not validated; call [`AppConfig::validate`] once all
    /// overrides are in place.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                let content = std::fs::read_to_string(path).map_err(|e| {
                    Error::Config(format!("failed to read {}: {e}", path.display()))
                })?;
                Self::from_toml(&content)?
            }
            None => Self::default(),
        };

        config.apply_env(|name| std::env::var(name).ok());
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("invalid config file: {e}")))
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("failed to serialize config: {e}")))
    }

    /// Environment values win over the file.
    pub fn apply_env<F>(&mut self, var: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(secret) = var(SECRET_ENV).filter(|s| !s.is_empty()) {
            self.auth.secret = secret;
        }
        if let Some(key) = var(ACCESS_KEY_ENV).filter(|s| !s.is_empty()) {
            self.storage.access_key_id = Some(key);
        }
        if let Some(key) = var(SECRET_KEY_ENV).filter(|s| !s.is_empty()) {
            self.storage.secret_access_key = Some(key);
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.auth.validate()?;
        self.storage.validate()?;
        Ok(())
    }

    #[must_use]
    pub fn local_storage_root(&self) -> PathBuf {
        self.server.data_dir.join("objects")
    }
}
