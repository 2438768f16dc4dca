use thiserror::Error;

#[derive(Debug, Error)]
pub enum DumpError {
    #[error("connection refused: {0}")]
    ConnectionRefused(String),

    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("target database engine version mismatch: {0}")]
    VersionMismatch(String),

    #[error("dump/restore tool not found on PATH: {0}")]
    ToolMissing(String),

    #[error("process exited with code {code}: {stderr_tail}")]
    ExitNonZero { code: i32, stderr_tail: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<DumpError> for crate::error::CoreError {
    fn from(err: DumpError) -> Self {
        crate::error::CoreError::DumpFailed(err.to_string())
    }
}
