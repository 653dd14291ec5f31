/// S3 configuration shared across services
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct S3Config {
    /// S3 bucket name
    pub bucket: String,
    /// AWS region
    pub region: String,
    /// S3 API endpoint (MinIO, Ceph, ...). `None` uses the AWS default resolver.
    pub endpoint: Option<String>,
    /// Base URL that public object links are built from
    pub public_endpoint: String,
    /// Static access key id; paired with `secret_access_key`
    pub access_key_id: Option<String>,
    /// Static secret key
    #[serde(skip_serializing)]
    pub secret_access_key: Option<String>,
}

impl S3Config {
    /// Config with the public endpoint derived from the API endpoint, or the
    /// regional AWS host when no endpoint is set.
    pub fn new(bucket: impl Into<String>, region: impl Into<String>, endpoint: Option<String>) -> Self {
        let region = region.into();
        let public_endpoint = endpoint
            .clone()
            .unwrap_or_else(|| format!("https://s3.{}.amazonaws.com", region));

        Self {
            bucket: bucket.into(),
            region,
            endpoint,
            public_endpoint,
            access_key_id: None,
            secret_access_key: None,
        }
    }

    pub fn with_public_endpoint(mut self, public_endpoint: impl Into<String>) -> Self {
        self.public_endpoint = public_endpoint.into();
        self
    }

    pub fn with_credentials(
        mut self,
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
    ) -> Self {
        self.access_key_id = Some(access_key_id.into());
        self.secret_access_key = Some(secret_access_key.into());
        self
    }

    /// Build the public, path-style URL for an object: `{public_endpoint}/{bucket}/{key}`.
    ///
    /// Pure string derivation; performs no I/O and cannot fail.
    pub fn public_url(&self, key: &str) -> String {
        format!(
            "{}/{}/{}",
            self.public_endpoint.trim_end_matches('/'),
            self.bucket,
            key.trim_start_matches('/')
        )
    }
}
