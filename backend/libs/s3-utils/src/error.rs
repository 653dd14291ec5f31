/// S3 error types
use thiserror::Error;

pub type Result<T> = std::result::Result<T, S3Error>;

#[derive(Debug, Error)]
pub enum S3Error {
    #[error("failed to put object {key}: {message}")]
    PutObject { key: String, message: String },

    #[error("bucket {bucket} is not reachable: {message}")]
    HeadBucket { bucket: String, message: String },
}
