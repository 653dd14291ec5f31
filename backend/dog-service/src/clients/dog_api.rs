/// Client for the upstream dog image provider
///
/// Two independent calls with no shared state and no retries: resolve a
/// random image URL for a breed, and download raw bytes from a URL.
use crate::models::DogApiResponse;
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{StatusCode, Url};
use std::time::Duration;
use thiserror::Error;

/// Fixed per-call timeout for provider requests
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum ProviderError {
    /// Connection, TLS or timeout failure
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned non-success status {status}")]
    Status { url: String, status: StatusCode },

    #[error("could not decode provider response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The provider answered but reported a business failure in the body
    #[error("dog API reported status '{status}': {message}")]
    Api { status: String, message: String },

    #[error("invalid provider URL {0}")]
    InvalidUrl(String),

    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),
}

impl ProviderError {
    /// True for failures where the provider never produced an answer.
    pub fn is_transport(&self) -> bool {
        matches!(self, ProviderError::Transport { .. })
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ImageProvider: Send + Sync {
    /// Ask the provider for a random image URL for `breed`.
    ///
    /// The breed is opaque here; the provider decides whether it exists.
    async fn resolve_image_url(&self, breed: &str) -> Result<String, ProviderError>;

    /// Download raw bytes from `url`. No content-type or size validation.
    async fn download_image(&self, url: &str) -> Result<Bytes, ProviderError>;
}

/// reqwest-backed [`ImageProvider`] for dog.ceo-compatible APIs
#[derive(Clone)]
pub struct DogApiClient {
    http: reqwest::Client,
    base_url: Url,
}

impl DogApiClient {
    pub fn new(base_url: &str) -> Result<Self, ProviderError> {
        let base_url =
            Url::parse(base_url).map_err(|_| ProviderError::InvalidUrl(base_url.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(ProviderError::InvalidUrl(base_url.to_string()));
        }

        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(ProviderError::ClientBuild)?;

        Ok(Self { http, base_url })
    }

    /// `{base}/breed/{breed}/images/random`, with the breed as one escaped segment
    fn random_image_url(&self, breed: &str) -> Result<Url, ProviderError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ProviderError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(["breed", breed, "images", "random"]);
        Ok(url)
    }
}

#[async_trait]
impl ImageProvider for DogApiClient {
    #[tracing::instrument(skip(self))]
    async fn resolve_image_url(&self, breed: &str) -> Result<String, ProviderError> {
        let url = self.random_image_url(breed)?;

        let response = self
            .http
            .get(url.clone())
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|source| {
                tracing::error!(%url, error = %source, "dog API request failed");
                ProviderError::Transport {
                    url: url.to_string(),
                    source,
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(%url, status = status.as_u16(), "dog API returned non-success status");
            return Err(ProviderError::Status {
                url: url.to_string(),
                status,
            });
        }

        let body: DogApiResponse = response.json().await.map_err(|source| {
            tracing::warn!(%url, error = %source, "dog API response could not be decoded");
            ProviderError::Decode {
                url: url.to_string(),
                source,
            }
        })?;

        if !body.is_success() {
            tracing::warn!(%url, status = %body.status, message = %body.message, "dog API reported failure");
            return Err(ProviderError::Api {
                status: body.status,
                message: body.message,
            });
        }

        tracing::debug!(image_url = %body.message, "resolved random dog image");
        Ok(body.message)
    }

    #[tracing::instrument(skip(self))]
    async fn download_image(&self, url: &str) -> Result<Bytes, ProviderError> {
        let transport = |source: reqwest::Error| {
            tracing::error!(%url, error = %source, "image download failed");
            ProviderError::Transport {
                url: url.to_string(),
                source,
            }
        };

        let response = self.http.get(url).send().await.map_err(transport)?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(%url, status = status.as_u16(), "image host returned non-success status");
            return Err(ProviderError::Status {
                url: url.to_string(),
                status,
            });
        }

        let bytes = response.bytes().await.map_err(transport)?;
        tracing::debug!(size = bytes.len(), "downloaded image");
        Ok(bytes)
    }
}
