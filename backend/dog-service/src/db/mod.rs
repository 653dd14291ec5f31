/// Metadata persistence
///
/// One [`DogRepository`] implementation per backend, each with its own
/// identifier strategy:
/// - PostgreSQL: `BIGSERIAL` key read back with `RETURNING id`
/// - MySQL: `AUTO_INCREMENT` key read from the driver's last insert id
/// - ClickHouse: client-generated UUID
///
/// Exactly one backend is wired per process, chosen by [`connect`].
use crate::config::{DatabaseConfig, MetadataBackend};
use crate::metrics::ServiceMetrics;
use crate::models::{DogRecord, NewDog};
use async_trait::async_trait;
use grpc_health::{ClickHouseHealthCheck, HealthCheck, MySqlHealthCheck, PostgresHealthCheck};
use sqlx::mysql::{MySqlPool, MySqlPoolOptions};
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;

pub mod ch_repo;
pub mod mysql_repo;
pub mod pg_repo;

pub use ch_repo::ClickHouseDogRepository;
pub use mysql_repo::MySqlDogRepository;
pub use pg_repo::PostgresDogRepository;

pub const DOGS_TABLE: &str = "dogs";

const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

static POSTGRES_MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations/postgres");
static MYSQL_MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations/mysql");
const CLICKHOUSE_SCHEMA: &str = include_str!("../../migrations/clickhouse/0001_create_dogs.sql");

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("clickhouse error: {0}")]
    ClickHouse(#[from] clickhouse::error::Error),

    #[error("migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("timestamp {timestamp} does not fit the {column} column")]
    TimestampOutOfRange {
        column: &'static str,
        timestamp: i64,
    },

    #[error("{backend} backend selected but {setting} is not set")]
    NotConfigured {
        backend: MetadataBackend,
        setting: &'static str,
    },
}

impl RepositoryError {
    /// Label for the `error_type` dimension of `database_errors_total`
    pub fn error_type(&self) -> &'static str {
        match self {
            RepositoryError::Database(sqlx::Error::PoolTimedOut) => "pool_timeout",
            RepositoryError::Database(sqlx::Error::Database(_)) => "database",
            RepositoryError::Database(
                sqlx::Error::Io(_) | sqlx::Error::Tls(_) | sqlx::Error::PoolClosed,
            ) => "connection",
            RepositoryError::Database(_) => "query",
            RepositoryError::ClickHouse(_) => "clickhouse",
            RepositoryError::Migration(_) => "migration",
            RepositoryError::TimestampOutOfRange { .. } => "out_of_range",
            RepositoryError::NotConfigured { .. } => "configuration",
        }
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DogRepository: Send + Sync {
    fn backend(&self) -> MetadataBackend;

    /// Persist one record and return it with its backend-assigned id.
    async fn insert_dog(&self, dog: &NewDog) -> Result<DogRecord, RepositoryError>;
}

/// Connection handle for the active backend
#[derive(Clone)]
pub enum BackendPool {
    Postgres(PgPool),
    MySql(MySqlPool),
    ClickHouse(clickhouse::Client),
}

/// Repository and health check sharing one connection
pub struct MetadataStore {
    pub repository: Arc<dyn DogRepository>,
    pub health_check: Box<dyn HealthCheck>,
    pub pool: BackendPool,
}

/// Connect to the configured backend and build its repository.
///
/// Fails when the backend is unreachable, so a misconfigured deployment
/// never starts serving.
pub async fn connect(
    config: &DatabaseConfig,
    metrics: Arc<ServiceMetrics>,
) -> Result<MetadataStore, RepositoryError> {
    let backend = config.backend;
    tracing::info!(%backend, max_connections = config.max_connections, "connecting to metadata backend");

    let store = match backend {
        MetadataBackend::Postgres => {
            let dsn = config
                .postgres_dsn
                .as_deref()
                .ok_or(RepositoryError::NotConfigured {
                    backend,
                    setting: "POSTGRES_DSN",
                })?;
            let pool = PgPoolOptions::new()
                .max_connections(config.max_connections)
                .acquire_timeout(ACQUIRE_TIMEOUT)
                .connect(dsn)
                .await?;
            MetadataStore {
                repository: Arc::new(PostgresDogRepository::new(pool.clone(), metrics)),
                health_check: Box::new(PostgresHealthCheck::new(pool.clone())),
                pool: BackendPool::Postgres(pool),
            }
        }
        MetadataBackend::MySql => {
            let dsn = config
                .mysql_dsn
                .as_deref()
                .ok_or(RepositoryError::NotConfigured {
                    backend,
                    setting: "MYSQL_DSN",
                })?;
            let pool = MySqlPoolOptions::new()
                .max_connections(config.max_connections)
                .acquire_timeout(ACQUIRE_TIMEOUT)
                .connect(dsn)
                .await?;
            MetadataStore {
                repository: Arc::new(MySqlDogRepository::new(pool.clone(), metrics)),
                health_check: Box::new(MySqlHealthCheck::new(pool.clone())),
                pool: BackendPool::MySql(pool),
            }
        }
        MetadataBackend::ClickHouse => {
            let ch = &config.clickhouse;
            let url = ch.url.as_deref().ok_or(RepositoryError::NotConfigured {
                backend,
                setting: "CLICKHOUSE_URL",
            })?;
            let client = clickhouse::Client::default()
                .with_url(url)
                .with_database(&ch.database)
                .with_user(&ch.user)
                .with_password(&ch.password);

            // The HTTP client is lazy; ping once so startup fails fast.
            client.query("SELECT 1").execute().await?;

            MetadataStore {
                repository: Arc::new(ClickHouseDogRepository::new(client.clone(), metrics)),
                health_check: Box::new(ClickHouseHealthCheck::new(client.clone())),
                pool: BackendPool::ClickHouse(client),
            }
        }
    };

    tracing::info!(%backend, "metadata backend connected");
    Ok(store)
}

/// Apply the `dogs` schema for the active backend.
pub async fn migrate(pool: &BackendPool) -> Result<(), RepositoryError> {
    match pool {
        BackendPool::Postgres(pool) => POSTGRES_MIGRATOR.run(pool).await?,
        BackendPool::MySql(pool) => MYSQL_MIGRATOR.run(pool).await?,
        BackendPool::ClickHouse(client) => client.query(CLICKHOUSE_SCHEMA).execute().await?,
    }

    tracing::info!("metadata schema migrations applied");
    Ok(())
}

/// Record duration and, on failure, the error counter for one query.
pub(crate) fn observe_query<T>(
    metrics: &ServiceMetrics,
    backend: MetadataBackend,
    operation: &str,
    started: Instant,
    result: &Result<T, RepositoryError>,
) {
    metrics.observe_db_query(backend.as_str(), operation, DOGS_TABLE, started.elapsed());
    if let Err(err) = result {
        metrics.record_db_error(backend.as_str(), operation, DOGS_TABLE, err.error_type());
        tracing::error!(%backend, operation, error = %err, "metadata query failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ClickHouseConfig, MetadataPersistence};

    fn database_config(backend: MetadataBackend) -> DatabaseConfig {
        DatabaseConfig {
            backend,
            persistence: MetadataPersistence::BestEffort,
            postgres_dsn: None,
            mysql_dsn: None,
            clickhouse: ClickHouseConfig {
                url: None,
                database: "default".into(),
                user: "default".into(),
                password: String::new(),
            },
            max_connections: 1,
            run_migrations: false,
        }
    }

    #[tokio::test]
    async fn test_connect_requires_selected_backend_settings() {
        let metrics = Arc::new(ServiceMetrics::new().unwrap());

        for (backend, setting) in [
            (MetadataBackend::Postgres, "POSTGRES_DSN"),
            (MetadataBackend::MySql, "MYSQL_DSN"),
            (MetadataBackend::ClickHouse, "CLICKHOUSE_URL"),
        ] {
            let result = connect(&database_config(backend), metrics.clone()).await;
            match result {
                Err(RepositoryError::NotConfigured { backend: b, setting: s }) => {
                    assert_eq!(b, backend);
                    assert_eq!(s, setting);
                }
                Err(other) => panic!("unexpected error: {other}"),
                Ok(_) => panic!("connect succeeded without settings"),
            }
        }
    }

    #[test]
    fn test_error_type_labels() {
        assert_eq!(
            RepositoryError::Database(sqlx::Error::PoolTimedOut).error_type(),
            "pool_timeout"
        );
        assert_eq!(
            RepositoryError::Database(sqlx::Error::RowNotFound).error_type(),
            "query"
        );
        assert_eq!(
            RepositoryError::NotConfigured {
                backend: MetadataBackend::MySql,
                setting: "MYSQL_DSN"
            }
            .error_type(),
            "configuration"
        );
        assert_eq!(
            RepositoryError::TimestampOutOfRange {
                column: "created_at",
                timestamp: -1
            }
            .error_type(),
            "out_of_range"
        );
    }
}
