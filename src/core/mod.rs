mod backup_executor;
mod in_flight;
mod naming;
mod restore_executor;
mod tempfile_guard;

pub use backup_executor::BackupExecutor;
pub use in_flight::InFlightSet;
pub use naming::{generate_backup_name, storage_key};
pub use restore_executor::RestoreExecutor;
pub use tempfile_guard::TempArtifact;
