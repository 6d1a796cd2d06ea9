use jsonwebtoken::Algorithm;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const DEFAULT_TOKEN_TTL_DAYS: i64 = 14;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Symmetric signing secret for session tokens.
    pub secret: String,
    pub algorithm: Algorithm,
    pub token_ttl_days: i64,
    /// Marks the session cookie `Secure`. Enable behind HTTPS.
    pub cookie_secure: bool,
}

impl AuthConfig {
    pub fn validate(&self) -> Result<()> {
        if self.secret.trim().is_empty() {
            return Err(Error::Config(
                "auth.secret must be set (or FILEHOST_SECRET)".to_string(),
            ));
        }
        if !matches!(
            self.algorithm,
            Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512
        ) {
            return Err(Error::Config(format!(
                "auth.algorithm must be HS256, HS384 or HS512, got {:?}",
                self.algorithm
            )));
        }
        if self.token_ttl_days <= 0 {
            return Err(Error::Config(
                "auth.token_ttl_days must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
            algorithm: Algorithm::HS256,
            token_ttl_days: DEFAULT_TOKEN_TTL_DAYS,
            cookie_secure: false,
        }
    }
}
