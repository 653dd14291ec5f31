//! Health check implementations for metadata backends

use crate::error::{HealthCheckError, Result};
use async_trait::async_trait;
use sqlx::{MySqlPool, PgPool};

/// Trait for health check implementations
///
/// Implement this trait to create custom health checks for your dependencies.
#[async_trait]
pub trait HealthCheck: Send + Sync {
    /// Perform the health check
    ///
    /// Returns `Ok(())` if the dependency is healthy, or an error describing the problem.
    async fn check(&self) -> Result<()>;
}

/// PostgreSQL health check
///
/// Verifies database connectivity by executing a simple query.
pub struct PostgresHealthCheck {
    pool: PgPool,
}

impl PostgresHealthCheck {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl HealthCheck for PostgresHealthCheck {
    async fn check(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| HealthCheckError::database(format!("PostgreSQL ping failed: {}", e)))?;

        Ok(())
    }
}

/// MySQL health check
pub struct MySqlHealthCheck {
    pool: MySqlPool,
}

impl MySqlHealthCheck {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl HealthCheck for MySqlHealthCheck {
    async fn check(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| HealthCheckError::database(format!("MySQL ping failed: {}", e)))?;

        Ok(())
    }
}

/// ClickHouse health check
///
/// ClickHouse speaks HTTP, so there is no pool to inspect; a trivial query
/// round-trips through the server instead.
pub struct ClickHouseHealthCheck {
    client: clickhouse::Client,
}

impl ClickHouseHealthCheck {
    pub fn new(client: clickhouse::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HealthCheck for ClickHouseHealthCheck {
    async fn check(&self) -> Result<()> {
        self.client
            .query("SELECT 1")
            .execute()
            .await
            .map_err(|e| HealthCheckError::database(format!("ClickHouse ping failed: {}", e)))?;

        Ok(())
    }
}
