mod error;
mod postgres;

pub use error::DumpError;
pub use postgres::PostgresDumpDriver;

use async_trait::async_trait;
use std::path::Path;

/// Connection parameters the driver needs to reach a target database;
/// deliberately flat rather than borrowing `DatabaseConfig` so the restore
/// path can supply an override target of the same shape.
#[derive(Debug, Clone)]
pub struct ConnectionParams {
    pub host: String,
    pub port: u16,
    pub database_name: String,
    pub username: String,
    pub password: String,
}

/// Result of a successful dump: the artifact size, and whether the
/// version-pinned binary was missing and plain `pg_dump` was used instead.
#[derive(Debug, Clone, Copy)]
pub struct DumpOutcome {
    pub size_bytes: i64,
    pub used_fallback_binary: bool,
}

/// External dump/restore tool invocation. One implementation per target
/// engine; only Postgres is built here, but the trait is what a
/// MySQL/Mongo driver would implement next to it.
#[async_trait]
pub trait DumpDriver: Send + Sync {
    async fn dump(&self, conn: &ConnectionParams, version_label: &str, output_path: &Path) -> Result<DumpOutcome, DumpError>;
    async fn restore(&self, conn: &ConnectionParams, input_path: &Path) -> Result<(), DumpError>;
}
