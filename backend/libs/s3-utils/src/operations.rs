/// S3 object operations
use crate::error::{Result, S3Error};
use crate::S3Client;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;

impl S3Client {
    /// Upload an object in a single `PutObject` call.
    ///
    /// No retries and no multipart upload, whatever the body size.
    pub async fn put_object(&self, key: &str, body: Bytes) -> Result<()> {
        let size = body.len();

        self.client()
            .put_object()
            .bucket(&self.config().bucket)
            .key(key)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| S3Error::PutObject {
                key: key.to_string(),
                message: DisplayErrorContext(&e).to_string(),
            })?;

        tracing::debug!(bucket = %self.config().bucket, %key, size, "object uploaded");
        Ok(())
    }

    /// Public URL for an object key. See [`crate::S3Config::public_url`].
    pub fn public_url(&self, key: &str) -> String {
        self.config().public_url(key)
    }
}
