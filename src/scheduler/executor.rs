use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::core::{BackupExecutor, InFlightSet};
use crate::models::DatabaseConfig;

/// Wraps `BackupExecutor` with an in-memory overlap guard. The Config
/// Store's CAS lease stops two processes from double-claiming the same
/// backup row, but nothing stops this process from firing a second cron
/// tick while the previous run for the same config is still in flight.
pub struct JobExecutor {
    backup_executor: Arc<BackupExecutor>,
    in_flight: InFlightSet,
}

impl JobExecutor {
    pub fn new(backup_executor: Arc<BackupExecutor>) -> Self {
        Self { backup_executor, in_flight: InFlightSet::new() }
    }

    /// Runs one cron tick for `db_config`. Skips cleanly, logging, if the
    /// previous tick for this config hasn't finished yet.
    pub async fn run_tick(&self, db_config: DatabaseConfig, cancellation: CancellationToken) {
        if !self.in_flight.start(db_config.id) {
            info!("skipping scheduled backup for {}: previous run still in flight", db_config.name);
            return;
        }

        if let Err(e) = self.backup_executor.execute_backup(&db_config, cancellation).await {
            warn!("backup executor returned an error for {}: {e}", db_config.name);
        }

        self.in_flight.finish(db_config.id);
    }

    /// Number of backups currently mid-flight. Polled during shutdown to
    /// decide whether the bounded wait can end early.
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }
}
