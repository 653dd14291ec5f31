//! Builder for health manager construction

use crate::checks::HealthCheck;
use crate::manager::HealthManager;
use tonic_health::pb::health_server::{Health, HealthServer};

/// Builder for HealthManager
#[derive(Default)]
pub struct HealthManagerBuilder {
    checks: Vec<Box<dyn HealthCheck>>,
    services: Vec<String>,
}

impl HealthManagerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a dependency check
    pub fn with_check(mut self, check: Box<dyn HealthCheck>) -> Self {
        self.checks.push(check);
        self
    }

    /// Publish status under a named gRPC service in addition to the overall status
    pub fn with_service(mut self, name: impl Into<String>) -> Self {
        self.services.push(name.into());
        self
    }

    /// Build the HealthManager with all configured checks
    ///
    /// Returns a tuple of (HealthManager, HealthServer) where HealthServer
    /// should be added to your gRPC server.
    pub async fn build(self) -> (HealthManager, HealthServer<impl Health>) {
        let (mut manager, service) = HealthManager::new();

        for name in self.services {
            manager.add_service(name);
        }

        for check in self.checks {
            manager.register_check(check).await;
        }

        (manager, service)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{HealthCheckError, Result};
    use crate::health::HealthStatus;
    use async_trait::async_trait;

    struct Failing;

    #[async_trait]
    impl HealthCheck for Failing {
        async fn check(&self) -> Result<()> {
            Err(HealthCheckError::database("connection refused"))
        }
    }

    #[tokio::test]
    async fn test_build_registers_checks() {
        let (mut manager, _service) = HealthManagerBuilder::new()
            .with_check(Box::new(Failing))
            .with_service("dogs.v1.DogService")
            .build()
            .await;

        assert_eq!(manager.status(), HealthStatus::Unknown);
        assert_eq!(manager.check_and_update().await, HealthStatus::NotServing);
    }
}
