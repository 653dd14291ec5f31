/// Dog Service - HTTP and gRPC servers
///
/// Startup fails before any listener is bound when configuration is invalid
/// or the metadata backend is unreachable.
use actix_web::{web, App, HttpServer};
use anyhow::{Context, Result};
use dog_service::clients::DogApiClient;
use dog_service::config::LoggingConfig;
use dog_service::grpc::{self, DogServiceImpl};
use dog_service::metrics::ServiceMetrics;
use dog_service::middleware::MetricsMiddleware;
use dog_service::services::DogImageService;
use dog_service::storage::S3HealthCheck;
use dog_service::{db, handlers, telemetry, Config};
use grpc_health::{HealthManager, HealthManagerBuilder};
use s3_utils::S3Client;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinSet;
use tracing_actix_web::TracingLogger;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const HEALTH_CHECK_INTERVAL: Duration = Duration::from_secs(10);

fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    // An exporter that fails to start only disables export
    let (tracer, export_error) = match telemetry::init_tracer(&logging.tracing) {
        Ok(tracer) => (tracer, None),
        Err(e) => (None, Some(e)),
    };
    let exporting = tracer.is_some();
    let otel_layer = tracer.map(|tracer| tracing_opentelemetry::layer().with_tracer(tracer));

    let registry = tracing_subscriber::registry().with(filter).with(otel_layer);

    if logging.json {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    if let Some(e) = export_error {
        tracing::warn!(error = %e, "OTLP exporter failed to start; trace export disabled");
    }
    if exporting {
        tracing::info!(
            endpoint = logging.tracing.otlp_endpoint.as_deref().unwrap_or_default(),
            sample_rate = logging.tracing.sample_rate,
            "OTLP trace export enabled"
        );
    }
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = terminate.recv() => {},
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to install SIGTERM handler; waiting for Ctrl+C only");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

#[actix_web::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    init_tracing(&LoggingConfig::from_env());

    let config = Config::from_env()
        .inspect_err(|e| tracing::error!(error = %e, "Invalid configuration"))
        .context("Failed to load configuration")?;

    tracing::info!(
        backend = %config.database.backend,
        persistence = config.database.persistence.as_str(),
        bucket = %config.s3.bucket,
        "Starting dog-service"
    );

    let metrics = Arc::new(ServiceMetrics::new().context("Failed to register metrics")?);

    let s3 = S3Client::connect(config.s3.clone()).await;

    let store = db::connect(&config.database, metrics.clone())
        .await
        .context("Failed to connect to metadata backend")?;
    if config.database.run_migrations {
        db::migrate(&store.pool)
            .await
            .context("Failed to run metadata migrations")?;
    }

    let provider =
        DogApiClient::new(&config.dog_api.base_url).context("Failed to build dog API client")?;

    let service = Arc::new(DogImageService::new(
        Arc::new(provider),
        Arc::new(s3.clone()),
        store.repository.clone(),
        config.database.persistence,
        metrics.clone(),
    ));

    // gRPC health follows the metadata backend and the bucket
    let (mut health_manager, health_service) = HealthManagerBuilder::new()
        .with_check(store.health_check)
        .with_check(Box::new(S3HealthCheck::new(s3)))
        .with_service(grpc::SERVICE_NAME)
        .build()
        .await;
    health_manager.check_and_update().await;
    let health_task =
        HealthManager::start_background_check(Arc::new(Mutex::new(health_manager)), HEALTH_CHECK_INTERVAL);

    let http_bind_address = format!("{}:{}", config.app.host, config.app.http_port);
    let grpc_addr: SocketAddr = format!("{}:{}", config.app.host, config.app.grpc_port)
        .parse()
        .context("Failed to parse gRPC bind address")?;

    let service_data = web::Data::from(service.clone());
    let metrics_data = web::Data::from(metrics.clone());
    let http_metrics = metrics.clone();
    let server = HttpServer::new(move || {
        App::new()
            .app_data(service_data.clone())
            .app_data(metrics_data.clone())
            .wrap(MetricsMiddleware::new(http_metrics.clone()))
            .wrap(TracingLogger::default())
            .configure(handlers::configure)
    })
    .disable_signals()
    .bind(&http_bind_address)
    .with_context(|| format!("Failed to bind HTTP server to {http_bind_address}"))?
    .run();
    let http_handle = server.handle();

    tracing::info!("HTTP server listening on {}", http_bind_address);

    let (shutdown_tx, _) = broadcast::channel::<()>(1);
    let mut tasks = JoinSet::new();

    tasks.spawn(async move { server.await.context("HTTP server failed") });

    let grpc_shutdown = shutdown_tx.subscribe();
    let grpc_service = DogServiceImpl::new(service, metrics);
    tasks.spawn(async move {
        grpc::start_grpc_server(grpc_addr, grpc_service, health_service, grpc_shutdown)
            .await
            .context("gRPC server failed")
    });

    let stop = {
        let shutdown_tx = shutdown_tx.clone();
        let http_handle = http_handle.clone();
        move || {
            let _ = shutdown_tx.send(());
            let http_handle = http_handle.clone();
            tokio::spawn(async move { http_handle.stop(true).await });
        }
    };

    let signal_stop = stop.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        tracing::info!("Shutdown signal received, draining servers");
        signal_stop();
    });

    // Wait for both servers; the first failure stops the other one
    let mut first_error = None;
    while let Some(result) = tasks.join_next().await {
        let outcome = result.map_err(anyhow::Error::from).and_then(|r| r);
        if let Err(e) = outcome {
            tracing::error!(error = %e, "Server error");
            if first_error.is_none() {
                first_error = Some(e);
                stop();
            }
        }
    }

    health_task.abort();
    tracing::info!("dog-service shut down");
    telemetry::shutdown();

    match first_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
