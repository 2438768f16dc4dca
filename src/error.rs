use thiserror::Error;

/// Crate-wide error taxonomy. Component errors (storage, dump) convert into
/// this at the boundary where they cross into the orchestration core.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid configuration: {0}")]
    ConfigInvalid(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("dump failed: {0}")]
    DumpFailed(String),

    #[error("upload failed: {0}")]
    UploadFailed(String),

    #[error("notification failed: {0}")]
    NotifyFailed(String),

    #[error("interrupted")]
    Interrupted,

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<sqlx::Error> for CoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => CoreError::NotFound("row not found".to_string()),
            sqlx::Error::Database(ref db_err) if db_err.is_foreign_key_violation() => {
                CoreError::Conflict(db_err.message().to_string())
            }
            other => CoreError::Internal(other.into()),
        }
    }
}

impl From<std::io::Error> for CoreError {
    fn from(err: std::io::Error) -> Self {
        CoreError::Internal(err.into())
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
