/// Object storage for downloaded images
///
/// `BlobStore` is the seam between the pipeline and S3 so the orchestration
/// can be exercised without a bucket.
use crate::models::StorageKey;
use async_trait::async_trait;
use bytes::Bytes;
use grpc_health::{HealthCheck, HealthCheckError};
use s3_utils::{S3Client, S3Error};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error(transparent)]
    S3(#[from] S3Error),
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Write `body` under `key` in a single request.
    async fn put_object(&self, key: &StorageKey, body: Bytes) -> Result<(), StorageError>;

    /// Publicly reachable URL for `key`. Pure string formatting.
    fn public_url(&self, key: &StorageKey) -> String;
}

#[async_trait]
impl BlobStore for S3Client {
    async fn put_object(&self, key: &StorageKey, body: Bytes) -> Result<(), StorageError> {
        S3Client::put_object(self, key.as_str(), body)
            .await
            .map_err(StorageError::from)
    }

    fn public_url(&self, key: &StorageKey) -> String {
        S3Client::public_url(self, key.as_str())
    }
}

/// Readiness check: the configured bucket answers `HeadBucket`
pub struct S3HealthCheck {
    client: S3Client,
}

impl S3HealthCheck {
    pub fn new(client: S3Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HealthCheck for S3HealthCheck {
    async fn check(&self) -> grpc_health::Result<()> {
        self.client
            .health_check()
            .await
            .map_err(|e| HealthCheckError::storage(e.to_string()))
    }
}
