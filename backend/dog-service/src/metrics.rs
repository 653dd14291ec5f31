//! Prometheus metrics for dog-service
//!
//! A single [`ServiceMetrics`] is built at startup and handed to every
//! component that records something. Nothing is registered globally.

use prometheus::{
    histogram_opts, opts, Encoder, HistogramVec, IntCounterVec, Registry, Result, TextEncoder,
};
use std::time::Duration;

const LATENCY_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

/// Pipeline stage, used as the `step` label
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStep {
    Resolve,
    Download,
    Store,
    Persist,
}

impl PipelineStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Resolve => "resolve",
            Self::Download => "download",
            Self::Store => "store",
            Self::Persist => "persist",
        }
    }
}

#[derive(Clone)]
pub struct ServiceMetrics {
    registry: Registry,

    /// Labels: method, path, status
    http_requests_total: IntCounterVec,
    http_request_duration_seconds: HistogramVec,

    /// Labels: method, code
    grpc_requests_total: IntCounterVec,
    /// Labels: method
    grpc_request_duration_seconds: HistogramVec,

    /// Labels: step, outcome
    pipeline_steps_total: IntCounterVec,

    /// Labels: backend, operation, table
    db_query_duration_seconds: HistogramVec,
    /// Labels: backend, operation, table, error_type
    db_errors_total: IntCounterVec,
}

impl ServiceMetrics {
    /// Create and register every collector on a fresh registry.
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let http_requests_total = IntCounterVec::new(
            opts!("http_requests_total", "Total HTTP requests"),
            &["method", "path", "status"],
        )?;
        let http_request_duration_seconds = HistogramVec::new(
            histogram_opts!(
                "http_request_duration_seconds",
                "HTTP request latency",
                LATENCY_BUCKETS.to_vec()
            ),
            &["method", "path", "status"],
        )?;
        let grpc_requests_total = IntCounterVec::new(
            opts!("grpc_requests_total", "Total gRPC requests"),
            &["method", "code"],
        )?;
        let grpc_request_duration_seconds = HistogramVec::new(
            histogram_opts!(
                "grpc_request_duration_seconds",
                "gRPC request latency",
                LATENCY_BUCKETS.to_vec()
            ),
            &["method"],
        )?;
        let pipeline_steps_total = IntCounterVec::new(
            opts!(
                "dog_pipeline_steps_total",
                "Fetch-and-store pipeline steps by outcome"
            ),
            &["step", "outcome"],
        )?;
        let db_query_duration_seconds = HistogramVec::new(
            histogram_opts!(
                "database_query_duration_seconds",
                "Metadata backend query latency",
                LATENCY_BUCKETS.to_vec()
            ),
            &["backend", "operation", "table"],
        )?;
        let db_errors_total = IntCounterVec::new(
            opts!("database_errors_total", "Metadata backend query errors"),
            &["backend", "operation", "table", "error_type"],
        )?;

        registry.register(Box::new(http_requests_total.clone()))?;
        registry.register(Box::new(http_request_duration_seconds.clone()))?;
        registry.register(Box::new(grpc_requests_total.clone()))?;
        registry.register(Box::new(grpc_request_duration_seconds.clone()))?;
        registry.register(Box::new(pipeline_steps_total.clone()))?;
        registry.register(Box::new(db_query_duration_seconds.clone()))?;
        registry.register(Box::new(db_errors_total.clone()))?;

        #[cfg(target_os = "linux")]
        registry.register(Box::new(
            prometheus::process_collector::ProcessCollector::for_self(),
        ))?;

        Ok(Self {
            registry,
            http_requests_total,
            http_request_duration_seconds,
            grpc_requests_total,
            grpc_request_duration_seconds,
            pipeline_steps_total,
            db_query_duration_seconds,
            db_errors_total,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn observe_http(&self, method: &str, path: &str, status: u16, elapsed: Duration) {
        let status = status.to_string();
        let labels = [method, path, status.as_str()];
        self.http_requests_total.with_label_values(&labels).inc();
        self.http_request_duration_seconds
            .with_label_values(&labels)
            .observe(elapsed.as_secs_f64());
    }

    pub fn observe_grpc(&self, method: &str, code: tonic::Code, elapsed: Duration) {
        self.grpc_requests_total
            .with_label_values(&[method, grpc_code_label(code)])
            .inc();
        self.grpc_request_duration_seconds
            .with_label_values(&[method])
            .observe(elapsed.as_secs_f64());
    }

    pub fn record_step(&self, step: PipelineStep, success: bool) {
        let outcome = if success { "success" } else { "failure" };
        self.pipeline_steps_total
            .with_label_values(&[step.as_str(), outcome])
            .inc();
    }

    pub fn observe_db_query(&self, backend: &str, operation: &str, table: &str, elapsed: Duration) {
        self.db_query_duration_seconds
            .with_label_values(&[backend, operation, table])
            .observe(elapsed.as_secs_f64());
    }

    pub fn record_db_error(&self, backend: &str, operation: &str, table: &str, error_type: &str) {
        self.db_errors_total
            .with_label_values(&[backend, operation, table, error_type])
            .inc();
    }

    /// Prometheus text exposition of everything in the registry
    pub fn render(&self) -> Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

fn grpc_code_label(code: tonic::Code) -> &'static str {
    match code {
        tonic::Code::Ok => "OK",
        tonic::Code::Cancelled => "CANCELLED",
        tonic::Code::Unknown => "UNKNOWN",
        tonic::Code::InvalidArgument => "INVALID_ARGUMENT",
        tonic::Code::DeadlineExceeded => "DEADLINE_EXCEEDED",
        tonic::Code::NotFound => "NOT_FOUND",
        tonic::Code::AlreadyExists => "ALREADY_EXISTS",
        tonic::Code::PermissionDenied => "PERMISSION_DENIED",
        tonic::Code::ResourceExhausted => "RESOURCE_EXHAUSTED",
        tonic::Code::FailedPrecondition => "FAILED_PRECONDITION",
        tonic::Code::Aborted => "ABORTED",
        tonic::Code::OutOfRange => "OUT_OF_RANGE",
        tonic::Code::Unimplemented => "UNIMPLEMENTED",
        tonic::Code::Internal => "INTERNAL",
        tonic::Code::Unavailable => "UNAVAILABLE",
        tonic::Code::DataLoss => "DATA_LOSS",
        tonic::Code::Unauthenticated => "UNAUTHENTICATED",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_contains_recorded_series() {
        let metrics = ServiceMetrics::new().unwrap();
        metrics.observe_http("GET", "/api/v1/dogs/{breed}/image", 200, Duration::from_millis(12));
        metrics.observe_grpc("GetRandomDogImage", tonic::Code::Internal, Duration::from_millis(3));
        metrics.record_step(PipelineStep::Download, false);
        metrics.record_db_error("mysql", "insert", "dogs", "database");

        let text = metrics.render().unwrap();

        assert!(text.contains(
            r#"http_requests_total{method="GET",path="/api/v1/dogs/{breed}/image",status="200"} 1"#
        ));
        assert!(text.contains(r#"grpc_requests_total{code="INTERNAL",method="GetRandomDogImage"} 1"#));
        assert!(text.contains(r#"dog_pipeline_steps_total{outcome="failure",step="download"} 1"#));
        assert!(text.contains(
            r#"database_errors_total{backend="mysql",error_type="database",operation="insert",table="dogs"} 1"#
        ));
    }

    #[test]
    fn test_instances_do_not_share_state() {
        let a = ServiceMetrics::new().unwrap();
        let b = ServiceMetrics::new().unwrap();

        a.record_step(PipelineStep::Resolve, true);

        assert!(a.render().unwrap().contains("dog_pipeline_steps_total"));
        assert!(!b.render().unwrap().contains("dog_pipeline_steps_total{"));
    }
}
