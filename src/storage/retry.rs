use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use super::{ObjectStore, StorageResult};

/// Bounded exponential backoff for transient storage failures.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    attempts: u32,
    base_delay: Duration,
}

impl RetryPolicy {
    #[must_use]
    pub fn new(attempts: u32, base_delay: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            base_delay,
        }
    }

    /// Runs `op` until it succeeds, fails permanently, or the attempts run out.
    pub async fn run<T, F, Fut>(&self, name: &str, mut op: F) -> StorageResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = StorageResult<T>>,
    {
        let mut delay = self.base_delay;
        let mut attempt = 1;

        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < self.attempts => {
                    tracing::warn!(
                        "{name} failed (attempt {attempt}/{}), retrying in {}ms: {e}",
                        self.attempts,
                        delay.as_millis()
                    );
                    tokio::time::sleep(delay).await;
                    delay = delay.saturating_mul(2);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(100))
    }
}

/// Applies a [`RetryPolicy`] to every call of the wrapped store.
pub struct RetryingObjectStore {
    inner: Arc<dyn ObjectStore>,
    policy: RetryPolicy,
}

impl RetryingObjectStore {
    pub fn new(inner: Arc<dyn ObjectStore>, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

#[async_trait]
impl ObjectStore for RetryingObjectStore {
    async fn create_bucket(&self, bucket: &str) -> StorageResult<()> {
        let inner = &self.inner;
        self.policy
            .run("create_bucket", move || inner.create_bucket(bucket))
            .await
    }

    async fn delete_bucket(&self, bucket: &str) -> StorageResult<()> {
        let inner = &self.inner;
        self.policy
            .run("delete_bucket", move || inner.delete_bucket(bucket))
            .await
    }

    async fn bucket_exists(&self, bucket: &str) -> StorageResult<bool> {
        let inner = &self.inner;
        self.policy
            .run("bucket_exists", move || inner.bucket_exists(bucket))
            .await
    }

    async fn put_object(&self, bucket: &str, key: &str, data: Bytes) -> StorageResult<()> {
        let inner = &self.inner;
        self.policy
            .run("put_object", move || inner.put_object(bucket, key, data.clone()))
            .await
    }

    async fn get_object(&self, bucket: &str, key: &str) -> StorageResult<Bytes> {
        let inner = &self.inner;
        self.policy
            .run("get_object", move || inner.get_object(bucket, key))
            .await
    }

    async fn list_objects(&self, bucket: &str) -> StorageResult<Vec<String>> {
        let inner = &self.inner;
        self.policy
            .run("list_objects", move || inner.list_objects(bucket))
            .await
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> StorageResult<()> {
        let inner = &self.inner;
        self.policy
            .run("delete_object", move || inner.delete_object(bucket, key))
            .await
    }
}
