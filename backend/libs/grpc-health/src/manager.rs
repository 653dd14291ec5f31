//! Health check manager and background monitoring

use crate::checks::HealthCheck;
use crate::error::Result;
use crate::health::HealthStatus;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tonic_health::pb::health_server::{Health, HealthServer};
use tonic_health::server::HealthReporter;

/// Health check manager
///
/// Coordinates health checks for the service's dependencies and reports the
/// result to the gRPC health service, both as the overall ("") status and for
/// every named service registered with [`HealthManager::add_service`].
pub struct HealthManager {
    reporter: HealthReporter,
    checks: Arc<RwLock<Vec<Box<dyn HealthCheck>>>>,
    services: Vec<String>,
    status: HealthStatus,
}

impl HealthManager {
    /// Create a new health manager
    ///
    /// Returns a tuple of (manager, health_server) where health_server
    /// should be added to your gRPC server.
    pub fn new() -> (Self, HealthServer<impl Health>) {
        let (reporter, service) = tonic_health::server::health_reporter();

        let manager = Self {
            reporter,
            checks: Arc::new(RwLock::new(Vec::new())),
            services: Vec::new(),
            status: HealthStatus::Unknown,
        };

        (manager, service)
    }

    /// Report status for a fully-qualified gRPC service name as well as the overall status.
    pub fn add_service(&mut self, name: impl Into<String>) {
        self.services.push(name.into());
    }

    /// Register a health check
    ///
    /// All registered checks will be executed during health check runs.
    pub async fn register_check(&self, check: Box<dyn HealthCheck>) {
        self.checks.write().await.push(check);
    }

    /// Execute all registered health checks
    ///
    /// Returns `Ok(())` if all checks pass, or the first error encountered.
    pub async fn execute_checks(&self) -> Result<()> {
        let checks = self.checks.read().await;

        for check in checks.iter() {
            check.check().await?;
        }

        Ok(())
    }

    /// Status published by the last [`HealthManager::check_and_update`] run.
    pub fn status(&self) -> HealthStatus {
        self.status
    }

    /// Run health checks and publish SERVING or NOT_SERVING.
    pub async fn check_and_update(&mut self) -> HealthStatus {
        let outcome = self.execute_checks().await;
        let status = HealthStatus::from_outcome(&outcome);

        match &outcome {
            Ok(()) => tracing::debug!("All health checks passed, setting status to SERVING"),
            Err(e) => tracing::error!(
                error = %e,
                "Health check failed, setting status to NOT_SERVING"
            ),
        }

        if status != self.status {
            tracing::info!(from = ?self.status, to = ?status, "gRPC health status changed");
        }

        // Empty service name is the overall server health
        self.reporter.set_service_status("", status.into()).await;
        for service in &self.services {
            self.reporter
                .set_service_status(service.as_str(), status.into())
                .await;
        }

        self.status = status;
        status
    }

    /// Start background health check task
    ///
    /// Spawns a background task that periodically executes health checks
    /// and updates the service status. Abort the returned handle to stop it.
    pub fn start_background_check(
        manager: Arc<tokio::sync::Mutex<Self>>,
        interval: Duration,
    ) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval_timer = tokio::time::interval(interval);

            loop {
                interval_timer.tick().await;

                let mut mgr = manager.lock().await;
                mgr.check_and_update().await;
            }
        })
    }
}
