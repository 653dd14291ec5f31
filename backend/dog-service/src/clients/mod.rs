/// Outbound clients
///
/// - `dog_api`: upstream image provider (URL resolution + raw download)
pub mod dog_api;

pub use dog_api::{DogApiClient, ImageProvider, ProviderError, REQUEST_TIMEOUT};

#[cfg(test)]
pub use dog_api::MockImageProvider;
