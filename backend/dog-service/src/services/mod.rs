/// Service layer for dog images
///
/// - `dogs`: the fetch-and-store pipeline shared by the HTTP and gRPC adapters
pub mod dogs;

pub use dogs::DogImageService;
