/// Fetch-and-store pipeline
///
/// Steps run strictly in order and are attempted once:
/// 1. resolve a random image URL for the breed
/// 2. download the image bytes
/// 3. write them to object storage under a fresh `dogs/{breed}/{uuid}` key
/// 4. derive the public URL (pure)
/// 5. persist metadata, depending on [`MetadataPersistence`]
///
/// Nothing is rolled back. A failed metadata insert leaves the blob in place.
use crate::clients::ImageProvider;
use crate::config::MetadataPersistence;
use crate::db::DogRepository;
use crate::error::DogImageError;
use crate::metrics::{PipelineStep, ServiceMetrics};
use crate::models::{NewDog, StorageKey, StoredImage};
use crate::storage::BlobStore;
use std::sync::Arc;
use tracing::{info, warn};

/// Stateless orchestrator; safe to share across requests.
pub struct DogImageService {
    provider: Arc<dyn ImageProvider>,
    store: Arc<dyn BlobStore>,
    repository: Arc<dyn DogRepository>,
    persistence: MetadataPersistence,
    metrics: Arc<ServiceMetrics>,
}

impl DogImageService {
    pub fn new(
        provider: Arc<dyn ImageProvider>,
        store: Arc<dyn BlobStore>,
        repository: Arc<dyn DogRepository>,
        persistence: MetadataPersistence,
        metrics: Arc<ServiceMetrics>,
    ) -> Self {
        Self {
            provider,
            store,
            repository,
            persistence,
            metrics,
        }
    }

    /// Turn a breed into a stored, publicly reachable image.
    ///
    /// The breed is passed to the provider as-is; rejecting empty input is
    /// the caller's job. Every error after resolution carries the resolved
    /// source URL (see [`DogImageError::source_url`]).
    #[tracing::instrument(skip(self))]
    pub async fn fetch_and_store(&self, breed: &str) -> Result<StoredImage, DogImageError> {
        let source_url = self.step(
            PipelineStep::Resolve,
            self.provider.resolve_image_url(breed).await,
        );
        let source_url = source_url.map_err(|source| DogImageError::ResolutionFailed {
            breed: breed.to_string(),
            source,
        })?;

        let bytes = match self.step(
            PipelineStep::Download,
            self.provider.download_image(&source_url).await,
        ) {
            Ok(bytes) => bytes,
            Err(source) => return Err(DogImageError::DownloadFailed { source_url, source }),
        };

        let key = StorageKey::generate(breed);
        let size = bytes.len();
        if let Err(source) = self.step(PipelineStep::Store, self.store.put_object(&key, bytes).await)
        {
            return Err(DogImageError::StorageWriteFailed {
                source_url,
                key: key.to_string(),
                source,
            });
        }

        let public_url = self.store.public_url(&key);

        let record = match self.persistence {
            MetadataPersistence::Disabled => None,
            MetadataPersistence::BestEffort | MetadataPersistence::Required => {
                let dog = NewDog {
                    breed: breed.to_string(),
                    image_url: public_url.clone(),
                };
                match self.step(PipelineStep::Persist, self.repository.insert_dog(&dog).await) {
                    Ok(record) => Some(record),
                    Err(source) if self.persistence == MetadataPersistence::Required => {
                        return Err(DogImageError::PersistenceFailed { source_url, source });
                    }
                    Err(err) => {
                        warn!(
                            backend = %self.repository.backend(),
                            %public_url,
                            error = %err,
                            "metadata insert failed; returning stored image without a record"
                        );
                        None
                    }
                }
            }
        };

        info!(
            %source_url,
            storage_key = %key,
            %public_url,
            size,
            record_id = record.as_ref().map(|r| r.id.as_str()),
            "dog image stored"
        );

        Ok(StoredImage {
            public_url,
            storage_key: key,
            source_url,
            record,
        })
    }

    fn step<T, E>(&self, step: PipelineStep, result: Result<T, E>) -> Result<T, E> {
        self.metrics.record_step(step, result.is_ok());
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::{MockImageProvider, ProviderError};
    use crate::config::MetadataBackend;
    use crate::db::{MockDogRepository, RepositoryError};
    use crate::models::DogRecord;
    use crate::storage::{MockBlobStore, StorageError};
    use bytes::Bytes;
    use chrono::Utc;
    use s3_utils::S3Error;
    use std::collections::HashSet;
    use uuid::Uuid;

    const SOURCE_URL: &str = "https://images.dog.ceo/breeds/husky/n02110185_1469.jpg";
    const PUBLIC_BASE: &str = "http://localhost:9000/dog-images";

    fn resolving_provider() -> MockImageProvider {
        let mut provider = MockImageProvider::new();
        provider
            .expect_resolve_image_url()
            .returning(|_| Ok(SOURCE_URL.to_string()));
        provider
            .expect_download_image()
            .returning(|_| Ok(Bytes::from_static(b"\xFF\xD8\xFF\xE0jpeg")));
        provider
    }

    fn working_store() -> MockBlobStore {
        let mut store = MockBlobStore::new();
        store.expect_put_object().returning(|_, _| Ok(()));
        store
            .expect_public_url()
            .returning(|key| format!("{}/{}", PUBLIC_BASE, key));
        store
    }

    fn repository(fail: bool) -> MockDogRepository {
        let mut repo = MockDogRepository::new();
        repo.expect_backend().return_const(MetadataBackend::Postgres);
        repo.expect_insert_dog().returning(move |dog| {
            if fail {
                Err(RepositoryError::Database(sqlx::Error::PoolTimedOut))
            } else {
                Ok(DogRecord {
                    id: "42".into(),
                    breed: dog.breed.clone(),
                    image_url: dog.image_url.clone(),
                    created_at: Utc::now(),
                })
            }
        });
        repo
    }

    fn service(
        provider: MockImageProvider,
        store: MockBlobStore,
        repo: MockDogRepository,
        persistence: MetadataPersistence,
    ) -> (DogImageService, Arc<ServiceMetrics>) {
        let metrics = Arc::new(ServiceMetrics::new().unwrap());
        let service = DogImageService::new(
            Arc::new(provider),
            Arc::new(store),
            Arc::new(repo),
            persistence,
            metrics.clone(),
        );
        (service, metrics)
    }

    fn api_error() -> ProviderError {
        ProviderError::Api {
            status: "error".into(),
            message: "Breed not found (master breed does not exist)".into(),
        }
    }

    #[tokio::test]
    async fn test_success_returns_public_url_with_bucket_and_key() {
        let (service, metrics) = service(
            resolving_provider(),
            working_store(),
            repository(false),
            MetadataPersistence::BestEffort,
        );

        let stored = service.fetch_and_store("husky").await.unwrap();

        assert!(stored.public_url.starts_with(&format!("{}/dogs/husky/", PUBLIC_BASE)));
        assert!(stored.public_url.contains("dog-images"));
        let id = stored.public_url.rsplit('/').next().unwrap();
        assert!(Uuid::parse_str(id).is_ok());
        assert_eq!(stored.storage_key.id().map(|u| u.to_string()).as_deref(), Some(id));
        assert_eq!(stored.source_url, SOURCE_URL);

        let record = stored.record.expect("record should be persisted");
        assert_eq!(record.image_url, stored.public_url);
        assert_eq!(record.breed, "husky");

        let text = metrics.render().unwrap();
        for step in ["resolve", "download", "store", "persist"] {
            assert!(text.contains(&format!(
                r#"dog_pipeline_steps_total{{outcome="success",step="{}"}} 1"#,
                step
            )));
        }
    }

    #[tokio::test]
    async fn test_keys_are_distinct_for_repeated_breed() {
        let (service, _) = service(
            resolving_provider(),
            working_store(),
            repository(false),
            MetadataPersistence::Disabled,
        );

        let mut keys = HashSet::new();
        for _ in 0..20 {
            let stored = service.fetch_and_store("husky").await.unwrap();
            keys.insert(stored.storage_key);
        }

        assert_eq!(keys.len(), 20);
    }

    #[tokio::test]
    async fn test_resolution_failure_has_no_source_url() {
        let mut provider = MockImageProvider::new();
        provider
            .expect_resolve_image_url()
            .returning(|_| Err(api_error()));
        provider.expect_download_image().never();
        let mut store = MockBlobStore::new();
        store.expect_put_object().never();
        let mut repo = MockDogRepository::new();
        repo.expect_insert_dog().never();

        let (service, _) = service(provider, store, repo, MetadataPersistence::Required);
        let err = service.fetch_and_store("unicorn").await.unwrap_err();

        assert!(matches!(err, DogImageError::ResolutionFailed { ref breed, .. } if breed == "unicorn"));
        assert_eq!(err.source_url(), None);
    }

    #[tokio::test]
    async fn test_download_failure_carries_source_url() {
        let mut provider = MockImageProvider::new();
        provider
            .expect_resolve_image_url()
            .returning(|_| Ok(SOURCE_URL.to_string()));
        provider
            .expect_download_image()
            .withf(|url| url.to_string() == SOURCE_URL)
            .returning(|url| {
                Err(ProviderError::Status {
                    url: url.to_string(),
                    status: reqwest::StatusCode::NOT_FOUND,
                })
            });
        let mut store = MockBlobStore::new();
        store.expect_put_object().never();

        let (service, metrics) = service(
            provider,
            store,
            MockDogRepository::new(),
            MetadataPersistence::BestEffort,
        );
        let err = service.fetch_and_store("husky").await.unwrap_err();

        assert!(matches!(err, DogImageError::DownloadFailed { .. }));
        assert_eq!(err.source_url(), Some(SOURCE_URL));
        assert!(metrics
            .render()
            .unwrap()
            .contains(r#"dog_pipeline_steps_total{outcome="failure",step="download"} 1"#));
    }

    #[tokio::test]
    async fn test_storage_failure_carries_source_url_not_storage_url() {
        let mut store = MockBlobStore::new();
        store.expect_put_object().returning(|key, _| {
            Err(StorageError::S3(S3Error::PutObject {
                key: key.to_string(),
                message: "AccessDenied".into(),
            }))
        });
        store.expect_public_url().never();

        let (service, _) = service(
            resolving_provider(),
            store,
            MockDogRepository::new(),
            MetadataPersistence::BestEffort,
        );
        let err = service.fetch_and_store("husky").await.unwrap_err();

        match &err {
            DogImageError::StorageWriteFailed { key, .. } => {
                assert!(key.starts_with("dogs/husky/"))
            }
            other => panic!("expected StorageWriteFailed, got {other:?}"),
        }
        assert_eq!(err.source_url(), Some(SOURCE_URL));
    }

    #[tokio::test]
    async fn test_disabled_persistence_never_calls_repository() {
        let mut repo = MockDogRepository::new();
        repo.expect_insert_dog().never();

        let (service, _) = service(
            resolving_provider(),
            working_store(),
            repo,
            MetadataPersistence::Disabled,
        );
        let stored = service.fetch_and_store("pug").await.unwrap();

        assert!(stored.record.is_none());
    }

    #[tokio::test]
    async fn test_best_effort_persistence_failure_still_succeeds() {
        let (service, metrics) = service(
            resolving_provider(),
            working_store(),
            repository(true),
            MetadataPersistence::BestEffort,
        );

        let stored = service.fetch_and_store("pug").await.unwrap();

        assert!(stored.record.is_none());
        assert!(stored.public_url.contains("/dogs/pug/"));
        assert!(metrics
            .render()
            .unwrap()
            .contains(r#"dog_pipeline_steps_total{outcome="failure",step="persist"} 1"#));
    }

    #[tokio::test]
    async fn test_required_persistence_failure_is_an_error() {
        let (service, _) = service(
            resolving_provider(),
            working_store(),
            repository(true),
            MetadataPersistence::Required,
        );

        let err = service.fetch_and_store("pug").await.unwrap_err();

        assert!(matches!(err, DogImageError::PersistenceFailed { .. }));
        assert_eq!(err.source_url(), Some(SOURCE_URL));
    }

    #[tokio::test]
    async fn test_concurrent_calls_are_independent() {
        let mut provider = MockImageProvider::new();
        provider.expect_resolve_image_url().returning(|breed| {
            if breed == "unicorn" {
                Err(ProviderError::Api {
                    status: "error".into(),
                    message: "Breed not found".into(),
                })
            } else {
                Ok(format!("https://images.dog.ceo/breeds/{breed}/1.jpg"))
            }
        });
        provider
            .expect_download_image()
            .returning(|url| Ok(Bytes::from(url.to_string())));

        let (service, _) = service(
            provider,
            working_store(),
            repository(false),
            MetadataPersistence::BestEffort,
        );
        let service = Arc::new(service);

        let breeds = ["husky", "pug", "beagle", "unicorn", "husky", "corgi"];
        let handles: Vec<_> = breeds
            .iter()
            .map(|breed| {
                let service = service.clone();
                let breed = breed.to_string();
                tokio::spawn(async move { (breed.clone(), service.fetch_and_store(&breed).await) })
            })
            .collect();

        let mut keys = HashSet::new();
        for handle in handles {
            let (breed, result) = handle.await.unwrap();
            if breed == "unicorn" {
                assert!(matches!(result, Err(DogImageError::ResolutionFailed { .. })));
                continue;
            }
            let stored = result.unwrap();
            assert!(stored.storage_key.as_str().starts_with(&format!("dogs/{breed}/")));
            assert_eq!(
                stored.source_url,
                format!("https://images.dog.ceo/breeds/{breed}/1.jpg")
            );
            keys.insert(stored.storage_key);
        }

        assert_eq!(keys.len(), 5);
    }
}
