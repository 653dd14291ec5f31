/// Error types for dog-service
///
/// [`DogImageError`] is the fetch-and-store failure classification. Every
/// kind raised after the provider resolved an image URL carries that URL so a
/// caller can retry from the download step. [`AppError`] maps pipeline and
/// request errors to HTTP responses.
use crate::clients::ProviderError;
use crate::db::RepositoryError;
use crate::storage::StorageError;
use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DogImageError {
    /// No image URL was obtained, so there is no partial result.
    #[error("failed to resolve image URL for breed '{breed}': {source}")]
    ResolutionFailed {
        breed: String,
        #[source]
        source: ProviderError,
    },

    #[error("failed to download image from {source_url}: {source}")]
    DownloadFailed {
        source_url: String,
        #[source]
        source: ProviderError,
    },

    /// Nothing was written under `key`.
    #[error("failed to store image from {source_url} under {key}: {source}")]
    StorageWriteFailed {
        source_url: String,
        key: String,
        #[source]
        source: StorageError,
    },

    /// The blob was written and stays in storage.
    #[error("failed to persist metadata for image from {source_url}: {source}")]
    PersistenceFailed {
        source_url: String,
        #[source]
        source: RepositoryError,
    },
}

impl DogImageError {
    /// Provider URL resolved before the failure, if any.
    pub fn source_url(&self) -> Option<&str> {
        match self {
            Self::ResolutionFailed { .. } => None,
            Self::DownloadFailed { source_url, .. }
            | Self::StorageWriteFailed { source_url, .. }
            | Self::PersistenceFailed { source_url, .. } => Some(source_url),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::ResolutionFailed { .. } => "RESOLUTION_FAILED",
            Self::DownloadFailed { .. } => "DOWNLOAD_FAILED",
            Self::StorageWriteFailed { .. } => "STORAGE_WRITE_FAILED",
            Self::PersistenceFailed { .. } => "PERSISTENCE_FAILED",
        }
    }
}

/// Result type for HTTP handlers
pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Pipeline(#[from] DogImageError),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// JSON error body
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
}

impl AppError {
    fn code(&self) -> &'static str {
        match self {
            AppError::BadRequest(_) => "INVALID_REQUEST",
            AppError::Pipeline(err) => err.code(),
            AppError::Internal(_) => "INTERNAL_SERVER_ERROR",
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Pipeline(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let source_url = match self {
            AppError::Pipeline(err) => err.source_url().map(str::to_string),
            _ => None,
        };

        HttpResponse::build(self.status_code()).json(ErrorBody {
            error: self.to_string(),
            code: self.code(),
            source_url,
        })
    }
}

impl From<prometheus::Error> for AppError {
    fn from(err: prometheus::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api_error() -> ProviderError {
        ProviderError::Api {
            status: "error".into(),
            message: "Breed not found".into(),
        }
    }

    #[test]
    fn test_source_url_only_after_resolution() {
        let resolution = DogImageError::ResolutionFailed {
            breed: "unicorn".into(),
            source: api_error(),
        };
        assert_eq!(resolution.source_url(), None);

        let download = DogImageError::DownloadFailed {
            source_url: "https://images.dog.ceo/a.jpg".into(),
            source: api_error(),
        };
        assert_eq!(download.source_url(), Some("https://images.dog.ceo/a.jpg"));
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            AppError::BadRequest("breed is empty".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        let pipeline = AppError::from(DogImageError::ResolutionFailed {
            breed: "unicorn".into(),
            source: api_error(),
        });
        assert_eq!(pipeline.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(pipeline.code(), "RESOLUTION_FAILED");
    }
}
