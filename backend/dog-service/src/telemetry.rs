/// OpenTelemetry trace export
///
/// Spans recorded through `tracing` are shipped to an OTLP collector over
/// gRPC when an endpoint is configured. Without one the service only logs
/// locally. The tracer is handed to the subscriber by the binary; nothing in
/// the library reaches for a global tracer.
use crate::config::TracingConfig;
use opentelemetry::trace::TraceError;
use opentelemetry::{global, KeyValue};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::propagation::TraceContextPropagator;
use opentelemetry_sdk::trace::{RandomIdGenerator, Sampler, Tracer};
use opentelemetry_sdk::{runtime, Resource};

pub const SERVICE_NAME: &str = "dog-service";

pub fn resource(config: &TracingConfig) -> Resource {
    Resource::new(vec![
        KeyValue::new("service.name", SERVICE_NAME),
        KeyValue::new("service.version", config.service_version.clone()),
        KeyValue::new("deployment.environment", config.environment.clone()),
    ])
}

pub fn sampler(sample_rate: f64) -> Sampler {
    if sample_rate >= 1.0 {
        Sampler::AlwaysOn
    } else if sample_rate <= 0.0 {
        Sampler::AlwaysOff
    } else {
        Sampler::TraceIdRatioBased(sample_rate)
    }
}

/// Build the OTLP batch pipeline, or `None` when no endpoint is configured.
///
/// actix runs a current-thread runtime, so the batch exporter gets its own.
pub fn init_tracer(config: &TracingConfig) -> Result<Option<Tracer>, TraceError> {
    let Some(endpoint) = config.otlp_endpoint.as_deref() else {
        return Ok(None);
    };

    global::set_text_map_propagator(TraceContextPropagator::new());

    let exporter = opentelemetry_otlp::new_exporter()
        .tonic()
        .with_endpoint(endpoint);

    let tracer = opentelemetry_otlp::new_pipeline()
        .tracing()
        .with_exporter(exporter)
        .with_trace_config(
            opentelemetry_sdk::trace::config()
                .with_sampler(sampler(config.sample_rate))
                .with_id_generator(RandomIdGenerator::default())
                .with_resource(resource(config)),
        )
        .install_batch(runtime::TokioCurrentThread)?;

    Ok(Some(tracer))
}

/// Flush pending spans. A no-op when export was never enabled.
pub fn shutdown() {
    global::shutdown_tracer_provider();
}

#[cfg(test)]
mod tests {
    use super::*;
    use opentelemetry::{Key, Value};

    fn tracing_config(endpoint: Option<&str>) -> TracingConfig {
        TracingConfig {
            otlp_endpoint: endpoint.map(str::to_string),
            sample_rate: 0.5,
            service_version: "1.4.2".into(),
            environment: "staging".into(),
        }
    }

    #[test]
    fn test_export_disabled_without_endpoint() {
        let tracer = init_tracer(&tracing_config(None)).unwrap();
        assert!(tracer.is_none());
    }

    #[test]
    fn test_resource_describes_service() {
        let resource = resource(&tracing_config(None));

        assert_eq!(
            resource.get(Key::new("service.name")),
            Some(Value::from(SERVICE_NAME))
        );
        assert_eq!(
            resource.get(Key::new("service.version")),
            Some(Value::from("1.4.2"))
        );
        assert_eq!(
            resource.get(Key::new("deployment.environment")),
            Some(Value::from("staging"))
        );
    }

    #[test]
    fn test_sampler_from_rate() {
        assert!(matches!(sampler(1.0), Sampler::AlwaysOn));
        assert!(matches!(sampler(0.0), Sampler::AlwaysOff));
        assert!(matches!(sampler(0.1), Sampler::TraceIdRatioBased(rate) if rate == 0.1));
    }
}
