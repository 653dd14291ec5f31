//! Health status types and conversions

/// Service health status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthStatus {
    /// Service is healthy and can accept traffic
    Serving,
    /// A dependency check failed
    NotServing,
    /// No check has run yet
    Unknown,
}

impl HealthStatus {
    /// Status implied by the outcome of a check run.
    pub fn from_outcome<E>(outcome: &std::result::Result<(), E>) -> Self {
        match outcome {
            Ok(()) => HealthStatus::Serving,
            Err(_) => HealthStatus::NotServing,
        }
    }
}

impl From<HealthStatus> for tonic_health::ServingStatus {
    fn from(status: HealthStatus) -> Self {
        match status {
            HealthStatus::Serving => tonic_health::ServingStatus::Serving,
            HealthStatus::NotServing => tonic_health::ServingStatus::NotServing,
            HealthStatus::Unknown => tonic_health::ServingStatus::Unknown,
        }
    }
}
