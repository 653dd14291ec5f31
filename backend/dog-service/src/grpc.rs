// gRPC service implementation for dog-service (dogs.v1 proto)
use crate::error::DogImageError;
use crate::metrics::ServiceMetrics;
use crate::services::DogImageService;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::broadcast;
use tonic::metadata::MetadataValue;
use tonic::{Code, Request, Response, Status};
use tonic_health::pb::health_server::{Health, HealthServer};

pub mod dogs {
    pub mod v1 {
        tonic::include_proto!("dogs.v1");
    }
}

use dogs::v1::dog_service_server::{DogService, DogServiceServer};
use dogs::v1::{GetRandomDogImageRequest, GetRandomDogImageResponse};

/// Fully-qualified service name reported through `grpc.health.v1`
pub const SERVICE_NAME: &str = "dogs.v1.DogService";

/// Response metadata key carrying the partial-result source URL
pub const SOURCE_URL_METADATA: &str = "source-url";

#[derive(Clone)]
pub struct DogServiceImpl {
    service: Arc<DogImageService>,
    metrics: Arc<ServiceMetrics>,
}

impl DogServiceImpl {
    pub fn new(service: Arc<DogImageService>, metrics: Arc<ServiceMetrics>) -> Self {
        Self { service, metrics }
    }

    async fn random_dog_image(
        &self,
        req: GetRandomDogImageRequest,
    ) -> Result<GetRandomDogImageResponse, Status> {
        if req.breed.trim().is_empty() {
            return Err(Status::invalid_argument("breed must not be empty"));
        }

        let stored = self.service.fetch_and_store(&req.breed).await.map_err(|err| {
            tracing::error!(
                breed = %req.breed,
                code = err.code(),
                source_url = err.source_url(),
                error = %err,
                "dog image pipeline failed"
            );
            pipeline_status(&err)
        })?;

        let created_at = stored
            .record
            .as_ref()
            .map(|record| record.created_at)
            .unwrap_or_else(Utc::now);

        Ok(GetRandomDogImageResponse {
            image_url: stored.public_url,
            breed: req.breed,
            created_at: Some(to_timestamp(created_at)),
        })
    }
}

#[tonic::async_trait]
impl DogService for DogServiceImpl {
    #[tracing::instrument(skip(self, request), fields(breed = %request.get_ref().breed))]
    async fn get_random_dog_image(
        &self,
        request: Request<GetRandomDogImageRequest>,
    ) -> Result<Response<GetRandomDogImageResponse>, Status> {
        let started = Instant::now();
        let result = self.random_dog_image(request.into_inner()).await;

        let code = result.as_ref().map_or_else(|status| status.code(), |_| Code::Ok);
        self.metrics
            .observe_grpc("GetRandomDogImage", code, started.elapsed());

        result.map(Response::new)
    }
}

/// `Internal`, with the resolved source URL attached when there is one
fn pipeline_status(err: &DogImageError) -> Status {
    let mut status = Status::internal(err.to_string());
    if let Some(url) = err.source_url() {
        match MetadataValue::try_from(url) {
            Ok(value) => {
                status.metadata_mut().insert(SOURCE_URL_METADATA, value);
            }
            Err(_) => tracing::warn!(%url, "source URL is not valid gRPC metadata"),
        }
    }
    status
}

fn to_timestamp(at: DateTime<Utc>) -> prost_types::Timestamp {
    prost_types::Timestamp {
        seconds: at.timestamp(),
        nanos: at.timestamp_subsec_nanos() as i32,
    }
}

/// Serve the dog service and the health service until `shutdown` fires.
pub async fn start_grpc_server<H: Health>(
    addr: std::net::SocketAddr,
    service: DogServiceImpl,
    health_service: HealthServer<H>,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<(), tonic::transport::Error> {
    use tonic::transport::Server;

    tracing::info!("Starting gRPC server at {}", addr);

    Server::builder()
        .add_service(health_service)
        .add_service(DogServiceServer::new(service))
        .serve_with_shutdown(addr, async move {
            let _ = shutdown.recv().await;
        })
        .await
}
