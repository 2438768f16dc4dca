use thiserror::Error;

/// Bounded error taxonomy for the Object Storage Adapter.
/// Callers match on this, never on `aws-sdk-s3`'s SDK-internal error kinds.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("invalid storage configuration: {0}")]
    ConfigInvalid(String),

    #[error("network timeout: {0}")]
    NetworkTimeout(String),

    #[error("authentication denied: {0}")]
    AuthDenied(String),

    #[error("object not found: {0}")]
    NotFound(String),

    #[error("transient server error: {0}")]
    TransientServerError(String),

    #[error("storage error: {0}")]
    Other(String),
}

impl From<StorageError> for crate::error::CoreError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(msg) => crate::error::CoreError::NotFound(msg),
            other => crate::error::CoreError::UploadFailed(other.to_string()),
        }
    }
}
