//! Dog Service
//!
//! Fetches a random dog image for a breed from an upstream provider, stores
//! it in S3-compatible object storage, optionally records metadata in one of
//! PostgreSQL, MySQL or ClickHouse, and serves the result over HTTP and gRPC.

pub mod clients;
pub mod config;
pub mod db;
pub mod error;
pub mod grpc;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod services;
pub mod storage;
pub mod telemetry;

// Public re-exports
pub use config::Config;
pub use error::{AppError, DogImageError, Result};
