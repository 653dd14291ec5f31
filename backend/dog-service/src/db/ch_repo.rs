/// ClickHouse dog repository
///
/// ClickHouse has no sequences, so the primary key is a UUID generated here
/// and returned as the record id.
use super::{observe_query, DogRepository, RepositoryError, DOGS_TABLE};
use crate::config::MetadataBackend;
use crate::metrics::ServiceMetrics;
use crate::models::{DogRecord, NewDog};
use async_trait::async_trait;
use chrono::{DateTime, SubsecRound, Utc};
use clickhouse::{Client, Row};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

/// Row struct for the `dogs` table
/// `created_at` is a `DateTime` column, so seconds since the epoch.
#[derive(Debug, Clone, Row, Serialize, Deserialize)]
pub struct DogRow {
    #[serde(with = "clickhouse::serde::uuid")]
    pub id: Uuid,
    pub breed: String,
    pub image_url: String,
    pub created_at: u32,
}

pub struct ClickHouseDogRepository {
    client: Client,
    metrics: Arc<ServiceMetrics>,
}

impl ClickHouseDogRepository {
    pub fn new(client: Client, metrics: Arc<ServiceMetrics>) -> Self {
        Self { client, metrics }
    }

    /// Seconds since the epoch as stored by a `DateTime` column.
    fn to_datetime_column(created_at: &DateTime<Utc>) -> Result<u32, RepositoryError> {
        let timestamp = created_at.timestamp();
        u32::try_from(timestamp).map_err(|_| RepositoryError::TimestampOutOfRange {
            column: "created_at",
            timestamp,
        })
    }

    async fn write_row(&self, row: &DogRow) -> Result<(), RepositoryError> {
        let mut insert = self.client.insert(DOGS_TABLE)?;
        insert.write(row).await?;
        insert.end().await?;
        Ok(())
    }
}

#[async_trait]
impl DogRepository for ClickHouseDogRepository {
    fn backend(&self) -> MetadataBackend {
        MetadataBackend::ClickHouse
    }

    #[tracing::instrument(skip(self), fields(breed = %dog.breed))]
    async fn insert_dog(&self, dog: &NewDog) -> Result<DogRecord, RepositoryError> {
        let started = Instant::now();
        let created_at: DateTime<Utc> = Utc::now().trunc_subsecs(0);

        let result = async {
            let row = DogRow {
                id: Uuid::new_v4(),
                breed: dog.breed.clone(),
                image_url: dog.image_url.clone(),
                created_at: Self::to_datetime_column(&created_at)?,
            };
            self.write_row(&row).await?;
            Ok::<_, RepositoryError>(row)
        }
        .await;
        observe_query(&self.metrics, self.backend(), "insert", started, &result);
        let row = result?;

        Ok(DogRecord {
            id: row.id.to_string(),
            breed: row.breed,
            image_url: row.image_url,
            created_at,
        })
    }
}
