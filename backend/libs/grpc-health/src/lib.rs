//! # gRPC Health Check Library
//!
//! Health check implementation for Kubernetes liveness and readiness probes.
//! Implements the standard grpc.health.v1 protocol (`Check` and `Watch`) using tonic-health.
//!
//! ## Features
//!
//! - Standard grpc.health.v1 protocol support
//! - Per-service status alongside the overall ("") status
//! - Metadata backend checks (PostgreSQL, MySQL, ClickHouse)
//! - Background health monitoring
//!
//! ## Example
//!
//! ```ignore
//! use grpc_health::{HealthManagerBuilder, HealthManager};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn example(pool: sqlx::PgPool) {
//! use grpc_health::PostgresHealthCheck;
//! let (health_manager, health_service) = HealthManagerBuilder::new()
//!     .with_check(Box::new(PostgresHealthCheck::new(pool)))
//!     .with_service("dogs.v1.DogService")
//!     .build()
//!     .await;
//!
//! let health_manager = Arc::new(tokio::sync::Mutex::new(health_manager));
//! HealthManager::start_background_check(health_manager.clone(), Duration::from_secs(10));
//!
//! // Add health_service to your gRPC server
//! # }
//! ```

mod builder;
mod checks;
mod error;
mod health;
mod manager;

pub use builder::HealthManagerBuilder;
pub use checks::{ClickHouseHealthCheck, HealthCheck, MySqlHealthCheck, PostgresHealthCheck};
pub use error::{HealthCheckError, Result};
pub use health::HealthStatus;
pub use manager::HealthManager;

// Re-export tonic-health types for convenience
pub use tonic_health::pb::health_server::HealthServer;
pub use tonic_health::server::HealthReporter;
