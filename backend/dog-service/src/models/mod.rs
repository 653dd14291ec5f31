/// Data models for dog-service
///
/// This module defines structures for:
/// - Storage keys for downloaded images
/// - Metadata records persisted by the repository backends
/// - Wire shapes of the upstream provider and the HTTP API
///
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ========================================
// Storage Models
// ========================================

/// Object storage key of the form `dogs/{breed}/{uuid}`.
///
/// A fresh key is generated for every successful download and never reused.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StorageKey(String);

impl StorageKey {
    pub const PREFIX: &'static str = "dogs";

    pub fn generate(breed: &str) -> Self {
        Self(format!("{}/{}/{}", Self::PREFIX, breed, Uuid::new_v4()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// UUID component of the key.
    pub fn id(&self) -> Option<Uuid> {
        self.0.rsplit('/').next().and_then(|s| Uuid::parse_str(s).ok())
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for StorageKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Successful outcome of the fetch-and-store pipeline
#[derive(Debug, Clone)]
pub struct StoredImage {
    /// Public object storage URL
    pub public_url: String,
    pub storage_key: StorageKey,
    /// URL the provider resolved; the bytes were downloaded from here
    pub source_url: String,
    /// Metadata record, when persistence ran and succeeded
    pub record: Option<DogRecord>,
}

// ========================================
// Metadata Models
// ========================================

/// Record to persist for a stored image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDog {
    pub breed: String,
    /// Public storage URL, never the provider's URL
    pub image_url: String,
}

/// Persisted image metadata
///
/// `id` is backend-assigned: a UUID on ClickHouse, the decimal rendering of
/// the generated key on PostgreSQL and MySQL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DogRecord {
    pub id: String,
    pub breed: String,
    pub image_url: String,
    pub created_at: DateTime<Utc>,
}

// ========================================
// API Models
// ========================================

/// Response body of `GET {base}/breed/{breed}/images/random`
#[derive(Debug, Clone, Deserialize)]
pub struct DogApiResponse {
    /// Image URL on success, error description otherwise
    pub message: String,
    pub status: String,
}

impl DogApiResponse {
    pub fn is_success(&self) -> bool {
        self.status == "success"
    }
}

/// Response body of `GET /api/v1/dogs/{breed}/image`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DogImageResponse {
    pub image_url: String,
    pub breed: String,
}
