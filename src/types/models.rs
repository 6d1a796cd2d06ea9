use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(skip)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// A named container owned by one user and backed by one storage bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    pub id: String,
    pub user_id: String,
    /// Name as typed by the owner.
    pub view_name: String,
    /// Storage bucket name, derived from `view_name`.
    pub name: String,
    /// Public read-only link token.
    pub link: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoFile {
    pub id: String,
    pub rep_id: String,
    /// File name as uploaded.
    pub view_name: String,
    /// Object key inside the repository bucket.
    pub name: String,
    pub download_link: String,
    pub created_at: DateTime<Utc>,
}
