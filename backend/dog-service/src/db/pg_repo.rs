/// PostgreSQL dog repository
use super::{observe_query, DogRepository, RepositoryError};
use crate::config::MetadataBackend;
use crate::metrics::ServiceMetrics;
use crate::models::{DogRecord, NewDog};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Instant;

pub struct PostgresDogRepository {
    pool: PgPool,
    metrics: Arc<ServiceMetrics>,
}

impl PostgresDogRepository {
    pub fn new(pool: PgPool, metrics: Arc<ServiceMetrics>) -> Self {
        Self { pool, metrics }
    }
}

#[async_trait]
impl DogRepository for PostgresDogRepository {
    fn backend(&self) -> MetadataBackend {
        MetadataBackend::Postgres
    }

    #[tracing::instrument(skip(self), fields(breed = %dog.breed))]
    async fn insert_dog(&self, dog: &NewDog) -> Result<DogRecord, RepositoryError> {
        let started = Instant::now();

        let result = sqlx::query_as::<_, (i64, DateTime<Utc>)>(
            r#"
            INSERT INTO dogs (breed, image_url)
            VALUES ($1, $2)
            RETURNING id, created_at
            "#,
        )
        .bind(&dog.breed)
        .bind(&dog.image_url)
        .fetch_one(&self.pool)
        .await
        .map_err(RepositoryError::from);

        observe_query(&self.metrics, self.backend(), "insert", started, &result);
        let (id, created_at) = result?;

        Ok(DogRecord {
            id: id.to_string(),
            breed: dog.breed.clone(),
            image_url: dog.image_url.clone(),
            created_at,
        })
    }
}
