//! S3-compatible backend (AWS S3, MinIO, R2, ...).

use async_trait::async_trait;
use aws_sdk_s3::{
    Client,
    config::{BehaviorVersion, Builder, Credentials, Region},
    error::{DisplayErrorContext, ProvideErrorMetadata, SdkError},
    primitives::ByteStream,
    types::{BucketLocationConstraint, CreateBucketConfiguration},
};
use bytes::Bytes;

use super::{ObjectStore, StorageError, StorageResult};
use crate::config::StorageConfig;

const DEFAULT_REGION: &str = "us-east-1";

/// Error codes worth retrying.
const TRANSIENT_CODES: &[&str] = &[
    "InternalError",
    "RequestTimeout",
    "ServiceUnavailable",
    "SlowDown",
];

pub struct S3ObjectStore {
    client: Client,
    region: String,
}

impl S3ObjectStore {
    pub async fn new(config: &StorageConfig) -> Self {
        let mut builder = Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .force_path_style(config.force_path_style);

        if let Some(endpoint) = &config.endpoint {
            builder = builder.endpoint_url(endpoint);
        }

        match (&config.access_key_id, &config.secret_access_key) {
            (Some(access_key), Some(secret_key)) => {
                let creds = Credentials::new(access_key, secret_key, None, None, "filehost");
                builder = builder.credentials_provider(creds);
            }
            _ => {
                // Fall back to the default provider chain (env, profile, IMDS)
                let sdk_config = aws_config::load_defaults(BehaviorVersion::latest()).await;
                if let Some(creds) = sdk_config.credentials_provider() {
                    builder = builder.credentials_provider(creds);
                }
            }
        }

        Self {
            client: Client::from_conf(builder.build()),
            region: config.region.clone(),
        }
    }
}

fn backend_error<E, R>(err: SdkError<E, R>) -> StorageError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
    R: std::fmt::Debug + Send + Sync + 'static,
{
    let transient = matches!(
        err,
        SdkError::TimeoutError(_) | SdkError::DispatchFailure(_) | SdkError::ResponseError(_)
    ) || err
        .code()
        .is_some_and(|code| TRANSIENT_CODES.contains(&code));

    StorageError::Backend {
        message: DisplayErrorContext(&err).to_string(),
        transient,
    }
}

fn has_code<E, R>(err: &SdkError<E, R>, codes: &[&str]) -> bool
where
    E: ProvideErrorMetadata,
{
    err.code().is_some_and(|code| codes.contains(&code))
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn create_bucket(&self, bucket: &str) -> StorageResult<()> {
        let mut request = self.client.create_bucket().bucket(bucket);

        if self.region != DEFAULT_REGION {
            request = request.create_bucket_configuration(
                CreateBucketConfiguration::builder()
                    .location_constraint(BucketLocationConstraint::from(self.region.as_str()))
                    .build(),
            );
        }

        match request.send().await {
            Ok(_) => Ok(()),
            Err(e) if has_code(&e, &["BucketAlreadyExists", "BucketAlreadyOwnedByYou"]) => {
                Err(StorageError::BucketAlreadyExists(bucket.to_string()))
            }
            Err(e) if has_code(&e, &["InvalidBucketName"]) => {
                Err(StorageError::InvalidName(bucket.to_string()))
            }
            Err(e) => Err(backend_error(e)),
        }
    }

    async fn delete_bucket(&self, bucket: &str) -> StorageResult<()> {
        match self.client.delete_bucket().bucket(bucket).send().await {
            Ok(_) => Ok(()),
            Err(e) if has_code(&e, &["NoSuchBucket"]) => {
                Err(StorageError::NotFound(bucket.to_string()))
            }
            Err(e) if has_code(&e, &["BucketNotEmpty"]) => {
                Err(StorageError::BucketNotEmpty(bucket.to_string()))
            }
            Err(e) => Err(backend_error(e)),
        }
    }

    async fn bucket_exists(&self, bucket: &str) -> StorageResult<bool> {
        match self.client.head_bucket().bucket(bucket).send().await {
            Ok(_) => Ok(true),
            Err(e) if e.as_service_error().is_some_and(|se| se.is_not_found()) => Ok(false),
            Err(e) if has_code(&e, &["NotFound", "NoSuchBucket"]) => Ok(false),
            Err(e) => Err(backend_error(e)),
        }
    }

    async fn put_object(&self, bucket: &str, key: &str, data: Bytes) -> StorageResult<()> {
        match self
            .client
            .put_object()
            .bucket(bucket)
            .key(key)
            .if_none_match("*")
            .body(ByteStream::from(data))
            .send()
            .await
        {
            Ok(_) => Ok(()),
            Err(e) if has_code(&e, &["PreconditionFailed", "ConditionalRequestConflict"]) => {
                Err(StorageError::ObjectExists(format!("{bucket}/{key}")))
            }
            Err(e) if has_code(&e, &["NoSuchBucket"]) => {
                Err(StorageError::NotFound(bucket.to_string()))
            }
            Err(e) => Err(backend_error(e)),
        }
    }

    async fn get_object(&self, bucket: &str, key: &str) -> StorageResult<Bytes> {
        let output = match self.client.get_object().bucket(bucket).key(key).send().await {
            Ok(output) => output,
            Err(e) if e.as_service_error().is_some_and(|se| se.is_no_such_key()) => {
                return Err(StorageError::NotFound(format!("{bucket}/{key}")));
            }
            Err(e) if has_code(&e, &["NoSuchKey", "NoSuchBucket"]) => {
                return Err(StorageError::NotFound(format!("{bucket}/{key}")));
            }
            Err(e) => return Err(backend_error(e)),
        };

        let data = output
            .body
            .collect()
            .await
            .map_err(|e| StorageError::Backend {
                message: e.to_string(),
                transient: true,
            })?;

        Ok(data.into_bytes())
    }

    async fn list_objects(&self, bucket: &str) -> StorageResult<Vec<String>> {
        let mut keys = Vec::new();
        let mut continuation_token: Option<String> = None;

        loop {
            let mut request = self.client.list_objects_v2().bucket(bucket);

            if let Some(token) = &continuation_token {
                request = request.continuation_token(token);
            }

            let result = match request.send().await {
                Ok(result) => result,
                Err(e) if e.as_service_error().is_some_and(|se| se.is_no_such_bucket()) => {
                    return Err(StorageError::NotFound(bucket.to_string()));
                }
                Err(e) => return Err(backend_error(e)),
            };

            keys.extend(result.contents().iter().filter_map(|obj| obj.key().map(str::to_string)));

            let truncated = result.is_truncated().unwrap_or(false);
            match next_page_token(
                truncated,
                result.next_continuation_token(),
                continuation_token.as_deref(),
            ) {
                Some(token) => continuation_token = Some(token),
                None => {
                    if truncated {
                        tracing::warn!(
                            "Listing of bucket '{bucket}' stopped after {} keys: no new continuation token",
                            keys.len()
                        );
                    }
                    break;
                }
            }
        }

        Ok(keys)
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> StorageResult<()> {
        // S3 reports success for missing keys; only a missing bucket surfaces.
        match self.client.delete_object().bucket(bucket).key(key).send().await {
            Ok(_) => Ok(()),
            Err(e) if has_code(&e, &["NoSuchBucket", "NoSuchKey"]) => {
                Err(StorageError::NotFound(format!("{bucket}/{key}")))
            }
            Err(e) => Err(backend_error(e)),
        }
    }
}

/// Token for the next listing page. `None` ends the listing, including when a
/// truncated page carries no token or repeats the current one.
fn next_page_token(truncated: bool, next: Option<&str>, current: Option<&str>) -> Option<String> {
    if !truncated {
        return None;
    }
    match next {
        Some(token) if !token.is_empty() && Some(token) != current => Some(token.to_string()),
        _ => None,
    }
}
