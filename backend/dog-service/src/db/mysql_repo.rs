/// MySQL dog repository
use super::{observe_query, DogRepository, RepositoryError};
use crate::config::MetadataBackend;
use crate::metrics::ServiceMetrics;
use crate::models::{DogRecord, NewDog};
use async_trait::async_trait;
use chrono::{SubsecRound, Utc};
use sqlx::MySqlPool;
use std::sync::Arc;
use std::time::Instant;

pub struct MySqlDogRepository {
    pool: MySqlPool,
    metrics: Arc<ServiceMetrics>,
}

impl MySqlDogRepository {
    pub fn new(pool: MySqlPool, metrics: Arc<ServiceMetrics>) -> Self {
        Self { pool, metrics }
    }
}

#[async_trait]
impl DogRepository for MySqlDogRepository {
    fn backend(&self) -> MetadataBackend {
        MetadataBackend::MySql
    }

    #[tracing::instrument(skip(self), fields(breed = %dog.breed))]
    async fn insert_dog(&self, dog: &NewDog) -> Result<DogRecord, RepositoryError> {
        let started = Instant::now();
        // DATETIME(6) keeps microseconds
        let created_at = Utc::now().trunc_subsecs(6);

        let result = sqlx::query("INSERT INTO dogs (breed, image_url, created_at) VALUES (?, ?, ?)")
            .bind(&dog.breed)
            .bind(&dog.image_url)
            .bind(created_at)
            .execute(&self.pool)
            .await
            .map_err(RepositoryError::from);

        observe_query(&self.metrics, self.backend(), "insert", started, &result);
        let id = result?.last_insert_id();

        Ok(DogRecord {
            id: id.to_string(),
            breed: dog.breed.clone(),
            image_url: dog.image_url.clone(),
            created_at,
        })
    }
}
