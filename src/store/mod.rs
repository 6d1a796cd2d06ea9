mod schema;
mod sqlite;

pub use sqlite::SqliteStore;

use chrono::{DateTime, SubsecRound, Utc};

use crate::error::Result;
use crate::types::*;

/// The current time at the precision timestamps are stored with, so a row
/// reads back equal to the value that was written.
#[must_use]
pub fn timestamp_now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Store defines the metadata database interface.
pub trait Store: Send + Sync {
    fn initialize(&self) -> Result<()>;

    // User operations
    fn create_user(&self, user: &User) -> Result<()>;
    fn get_user(&self, id: &str) -> Result<Option<User>>;
    fn get_user_by_name(&self, name: &str) -> Result<Option<User>>;
    fn get_user_by_email(&self, email: &str) -> Result<Option<User>>;

    // Repository operations
    /// Fails with `Error::LinkCollision` when the link token is taken and
    /// `Error::Conflict` when the bucket name is taken.
    fn create_repository(&self, repository: &Repository) -> Result<()>;
    fn get_repository(&self, id: &str) -> Result<Option<Repository>>;
    fn get_repository_by_link(&self, link: &str) -> Result<Option<Repository>>;
    fn get_repository_by_bucket(&self, bucket: &str) -> Result<Option<Repository>>;
    /// Newest first.
    fn list_user_repositories(&self, user_id: &str) -> Result<Vec<Repository>>;
    /// Deletes the repository and all of its file rows in one transaction.
    fn delete_repository(&self, id: &str) -> Result<bool>;

    // File operations
    fn create_file(&self, file: &RepoFile) -> Result<()>;
    fn get_file(&self, rep_id: &str, name: &str) -> Result<Option<RepoFile>>;
    fn list_files(&self, rep_id: &str) -> Result<Vec<RepoFile>>;
    fn delete_file(&self, id: &str) -> Result<bool>;
}
