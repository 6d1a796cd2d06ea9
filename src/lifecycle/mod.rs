//! Repository and file lifecycle.
//!
//! Every operation here touches both the metadata store and object storage.
//! The ordering between the two is fixed per operation:
//!
//! - create repository: bucket first, then the row
//! - delete repository: rows in one transaction, then the bucket
//! - add file: object first, then the row
//! - remove file: object first, then the row
//!
//! Ownership is checked before any side effect.

mod link;
mod slug;

use std::sync::Arc;

use bytes::Bytes;
use serde::Serialize;
use uuid::Uuid;

pub use link::{LINK_LENGTH, generate_link};
pub use slug::{MAX_BUCKET_LEN, base_name, bucket_name, file_key, slugify};

use crate::error::{Error, Result};
use crate::storage::{ObjectStore, StorageError};
use crate::store::{Store, timestamp_now};
use crate::types::{Access, RepoFile, Repository, User};
use crate::validation::{validate_file_name, validate_repository_name};

const LINK_ATTEMPTS: usize = 5;

/// Result of a repository deletion. The rows are always gone; the bucket may
/// not be.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DeleteOutcome {
    Complete,
    StorageLeftovers { bucket: String, detail: String },
}

impl DeleteOutcome {
    #[must_use]
    pub fn is_complete(&self) -> bool {
        matches!(self, DeleteOutcome::Complete)
    }
}

/// What a viewer sees at a repository link.
#[derive(Debug, Serialize)]
pub struct RepositoryView {
    pub access: Access,
    pub editable: bool,
    pub repository: Repository,
    pub files: Vec<RepoFile>,
    /// The owner's repositories, newest first. Empty for readers.
    pub repositories: Vec<Repository>,
}

/// Query string path for downloading `key` from `bucket`.
#[must_use]
pub fn download_link(bucket: &str, key: &str) -> String {
    format!(
        "/file/read?bucket_name={}&key={}",
        urlencoding::encode(bucket),
        urlencoding::encode(key)
    )
}

fn require_owner(requester: &User, repository: &Repository) -> Result<()> {
    if Access::for_viewer(Some(requester), repository).can_mutate() {
        Ok(())
    } else {
        tracing::warn!(
            "User '{}' denied access to repository '{}'",
            requester.name,
            repository.name
        );
        Err(Error::Forbidden)
    }
}

pub struct Lifecycle {
    store: Arc<dyn Store>,
    objects: Arc<dyn ObjectStore>,
    bucket_prefix: String,
    links: fn() -> String,
}

impl Lifecycle {
    pub fn new(
        store: Arc<dyn Store>,
        objects: Arc<dyn ObjectStore>,
        bucket_prefix: impl Into<String>,
    ) -> Self {
        Self {
            store,
            objects,
            bucket_prefix: bucket_prefix.into(),
            links: generate_link,
        }
    }

    /// Replaces the link token source.
    #[must_use]
    pub fn with_link_generator(mut self, links: fn() -> String) -> Self {
        self.links = links;
        self
    }

    pub fn list_repositories(&self, owner: &User) -> Result<Vec<Repository>> {
        self.store.list_user_repositories(&owner.id)
    }

    pub async fn create_repository(&self, owner: &User, display_name: &str) -> Result<Repository> {
        let display_name = display_name.trim();
        validate_repository_name(display_name)?;

        let bucket = bucket_name(&self.bucket_prefix, display_name).ok_or_else(|| {
            Error::Validation(format!(
                "Repository name '{display_name}' has no usable characters"
            ))
        })?;

        if self.store.get_repository_by_bucket(&bucket)?.is_some() {
            return Err(Error::Conflict(format!(
                "Repository '{display_name}' already exists"
            )));
        }

        self.objects
            .create_bucket(&bucket)
            .await
            .map_err(|e| match e {
                StorageError::BucketAlreadyExists(_) => {
                    Error::Conflict(format!("Repository '{display_name}' already exists"))
                }
                StorageError::InvalidName(name) => {
                    Error::Validation(format!("'{name}' is not a valid bucket name"))
                }
                e => Error::Storage(e),
            })?;

        let result = self.insert_repository(owner, display_name, &bucket);
        if let Err(e) = &result {
            self.release_bucket(&bucket, e).await;
        }

        let repository = result?;
        tracing::info!(
            "Created repository '{}' for '{}'",
            repository.name,
            owner.name
        );
        Ok(repository)
    }

    /// Removes a bucket left behind by a failed insert, unless a row written
    /// in the meantime owns it.
    async fn release_bucket(&self, bucket: &str, cause: &Error) {
        match self.store.get_repository_by_bucket(bucket) {
            Ok(None) => {
                tracing::warn!("Bucket '{bucket}' orphaned after failed insert: {cause}");
                if let Err(cleanup) = self.objects.delete_bucket(bucket).await {
                    tracing::warn!("Failed to remove orphaned bucket '{bucket}': {cleanup}");
                }
            }
            Ok(Some(existing)) => {
                tracing::warn!(
                    "Bucket '{bucket}' belongs to repository '{}', leaving it in place",
                    existing.id
                );
            }
            Err(lookup) => {
                tracing::warn!("Leaving bucket '{bucket}' in place, owner unknown: {lookup}");
            }
        }
    }

    fn insert_repository(&self, owner: &User, display_name: &str, bucket: &str) -> Result<Repository> {
        for attempt in 1..=LINK_ATTEMPTS {
            let repository = Repository {
                id: Uuid::new_v4().to_string(),
                user_id: owner.id.clone(),
                view_name: display_name.to_string(),
                name: bucket.to_string(),
                link: (self.links)(),
                created_at: timestamp_now(),
            };

            match self.store.create_repository(&repository) {
                Ok(()) => return Ok(repository),
                Err(Error::LinkCollision) => {
                    tracing::debug!("Link collision on attempt {attempt}/{LINK_ATTEMPTS}");
                }
                Err(e) => return Err(e),
            }
        }

        Err(Error::Conflict(
            "Could not allocate a unique repository link".to_string(),
        ))
    }

    pub async fn delete_repository(&self, requester: &User, bucket: &str) -> Result<DeleteOutcome> {
        let repository = self
            .store
            .get_repository_by_bucket(bucket)?
            .ok_or(Error::NotFound)?;
        require_owner(requester, &repository)?;

        if !self.store.delete_repository(&repository.id)? {
            return Err(Error::NotFound);
        }

        let outcome = self.purge_bucket(&repository.name).await;
        match &outcome {
            DeleteOutcome::Complete => {
                tracing::info!("Deleted repository '{}'", repository.name);
            }
            DeleteOutcome::StorageLeftovers { detail, .. } => {
                tracing::warn!(
                    "Deleted repository '{}' but storage was left behind: {detail}",
                    repository.name
                );
            }
        }

        Ok(outcome)
    }

    /// Empties and removes a bucket, collecting failures instead of stopping
    /// at the first one.
    async fn purge_bucket(&self, bucket: &str) -> DeleteOutcome {
        let mut failures = Vec::new();

        match self.objects.list_objects(bucket).await {
            Ok(keys) => {
                for key in keys {
                    match self.objects.delete_object(bucket, &key).await {
                        Ok(()) => {}
                        Err(e) if e.is_not_found() => {}
                        Err(e) => failures.push(format!("object '{key}': {e}")),
                    }
                }
            }
            Err(e) if e.is_not_found() => return DeleteOutcome::Complete,
            Err(e) => {
                tracing::warn!("Listing bucket '{bucket}' failed, deleting it directly: {e}");
            }
        }

        match self.objects.delete_bucket(bucket).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {}
            Err(e) => failures.push(format!("bucket: {e}")),
        }

        if failures.is_empty() {
            DeleteOutcome::Complete
        } else {
            DeleteOutcome::StorageLeftovers {
                bucket: bucket.to_string(),
                detail: failures.join("; "),
            }
        }
    }

    pub async fn add_file(
        &self,
        requester: &User,
        link: &str,
        display_name: &str,
        data: Bytes,
    ) -> Result<RepoFile> {
        let repository = self
            .store
            .get_repository_by_link(link)?
            .ok_or(Error::NotFound)?;
        require_owner(requester, &repository)?;

        let display_name = base_name(display_name);
        validate_file_name(display_name)?;

        let key = file_key(display_name);
        if key.is_empty() {
            return Err(Error::Validation(format!(
                "File name '{display_name}' has no usable characters"
            )));
        }

        if self.store.get_file(&repository.id, &key)?.is_some() {
            return Err(Error::Conflict(format!(
                "File '{key}' already exists in this repository"
            )));
        }

        let size = data.len();
        self.objects
            .put_object(&repository.name, &key, data)
            .await
            .map_err(|e| match e {
                StorageError::ObjectExists(_) => {
                    Error::Conflict(format!("File '{key}' already exists in this repository"))
                }
                e => Error::Storage(e),
            })?;

        let file = RepoFile {
            id: Uuid::new_v4().to_string(),
            rep_id: repository.id.clone(),
            view_name: display_name.to_string(),
            download_link: download_link(&repository.name, &key),
            name: key,
            created_at: timestamp_now(),
        };

        match self.store.create_file(&file) {
            Ok(()) => {}
            // Another row already points at this key and keeps the object.
            Err(e @ Error::Conflict(_)) => return Err(e),
            Err(e) => {
                self.discard_object(&repository.name, &file.name, &e).await;
                return Err(e);
            }
        }

        tracing::info!(
            "Stored '{}/{}' ({size} bytes)",
            repository.name,
            file.name
        );
        Ok(file)
    }

    async fn discard_object(&self, bucket: &str, key: &str, cause: &Error) {
        tracing::warn!("Removing object '{bucket}/{key}' after failed insert: {cause}");
        if let Err(cleanup) = self.objects.delete_object(bucket, key).await {
            tracing::error!("Failed to remove object '{bucket}/{key}': {cleanup}");
        }
    }

    /// Returns the repository the file belonged to.
    pub async fn remove_file(&self, requester: &User, bucket: &str, key: &str) -> Result<Repository> {
        let repository = self
            .store
            .get_repository_by_bucket(bucket)?
            .ok_or(Error::NotFound)?;
        require_owner(requester, &repository)?;

        let file = self
            .store
            .get_file(&repository.id, key)?
            .ok_or(Error::NotFound)?;

        match self.objects.delete_object(&repository.name, &file.name).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {
                tracing::warn!(
                    "Object '{}/{}' was already gone",
                    repository.name,
                    file.name
                );
            }
            Err(e) => return Err(e.into()),
        }

        self.store.delete_file(&file.id)?;

        tracing::info!("Removed '{}/{}'", repository.name, file.name);
        Ok(repository)
    }

    /// Fetches a file by bucket and key. Knowing both is the capability.
    pub async fn read_file(&self, bucket: &str, key: &str) -> Result<(RepoFile, Bytes)> {
        let repository = self
            .store
            .get_repository_by_bucket(bucket)?
            .ok_or(Error::NotFound)?;
        let file = self
            .store
            .get_file(&repository.id, key)?
            .ok_or(Error::NotFound)?;

        let data = match self.objects.get_object(&repository.name, &file.name).await {
            Ok(data) => data,
            Err(e) if e.is_not_found() => {
                tracing::error!(
                    "Object '{}/{}' missing from storage",
                    repository.name,
                    file.name
                );
                return Err(Error::NotFound);
            }
            Err(e) => return Err(e.into()),
        };

        Ok((file, data))
    }

    pub fn repository_view(&self, viewer: Option<&User>, link: &str) -> Result<RepositoryView> {
        let repository = self
            .store
            .get_repository_by_link(link)?
            .ok_or(Error::NotFound)?;

        let access = Access::for_viewer(viewer, &repository);
        let files = self.store.list_files(&repository.id)?;
        let repositories = match access {
            Access::Owner => self.store.list_user_repositories(&repository.user_id)?,
            Access::Reader => Vec::new(),
        };

        Ok(RepositoryView {
            access,
            editable: access.can_mutate(),
            repository,
            files,
            repositories,
        })
    }
}
