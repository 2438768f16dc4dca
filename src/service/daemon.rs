use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::EnvConfig;
use crate::core::{BackupExecutor, InFlightSet, RestoreExecutor};
use crate::dump::{DumpDriver, PostgresDumpDriver};
use crate::notify::NotificationSink;
use crate::observability::shutdown_logging;
use crate::retention::RetentionEngine;
use crate::scheduler::{JobExecutor, Scheduler};
use crate::service::{setup_shutdown_handler, RecoveryManager};
use crate::store::ConfigStore;

const RECONCILE_SCHEDULES_INTERVAL: Duration = Duration::from_secs(60);
const RESTORE_POLL_INTERVAL: Duration = Duration::from_secs(5);
const ACTIVITY_SWEEP_INTERVAL: Duration = Duration::from_secs(86_400);
const FAILED_BACKUP_SWEEP_INTERVAL: Duration = Duration::from_secs(86_400);
const SHUTDOWN_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Top-level process orchestrator. Mirrors `ServiceDaemon`'s role -- owns
/// every long-lived component and runs the main `tokio::select!` loop --
/// but the unit of work is a DatabaseConfig's cron schedule instead of a
/// file-backup job polled on a fixed tick.
pub struct ServiceDaemon {
    store: Arc<ConfigStore>,
    scheduler: Scheduler,
    job_executor: Arc<JobExecutor>,
    restore_executor: Arc<RestoreExecutor>,
    restore_in_flight: Arc<InFlightSet>,
    recovery: RecoveryManager,
    config: Arc<EnvConfig>,
    cancellation: CancellationToken,
}

impl ServiceDaemon {
    pub async fn new(config: EnvConfig) -> Result<Self> {
        let config = Arc::new(config);
        let store = Arc::new(
            ConfigStore::connect(&config.database_dsn)
                .await
                .context("failed to connect to config store")?,
        );

        let dump_driver: Arc<dyn DumpDriver> = Arc::new(PostgresDumpDriver::new());
        let notifier = Arc::new(NotificationSink::new());
        let cancellation = CancellationToken::new();

        let backup_executor = Arc::new(BackupExecutor::new(
            store.clone(),
            dump_driver.clone(),
            notifier.clone(),
            config.clone(),
        ));
        let restore_executor = Arc::new(RestoreExecutor::new(
            store.clone(),
            dump_driver,
            notifier,
            config.clone(),
        ));

        let job_executor = Arc::new(JobExecutor::new(backup_executor));
        let scheduler = Scheduler::start(job_executor.clone(), cancellation.clone()).await?;
        let recovery = RecoveryManager::new(store.clone());

        Ok(Self {
            store,
            scheduler,
            job_executor,
            restore_executor,
            restore_in_flight: Arc::new(InFlightSet::new()),
            recovery,
            config,
            cancellation,
        })
    }

    pub async fn run(self) -> Result<()> {
        info!("dumpkeeper service starting...");

        setup_shutdown_handler(self.cancellation.clone()).await;

        self.recovery.reconcile(self.config.reconcile_grace_window).await?;

        let active = self.store.list_active_database_configs().await?;
        self.scheduler.reconcile(&active).await?;
        info!("installed {} schedule(s)", active.len());

        let mut reconcile_tick = tokio::time::interval(RECONCILE_SCHEDULES_INTERVAL);
        let mut restore_tick = tokio::time::interval(RESTORE_POLL_INTERVAL);
        let mut activity_tick = tokio::time::interval(ACTIVITY_SWEEP_INTERVAL);
        let mut failed_backup_tick = tokio::time::interval(FAILED_BACKUP_SWEEP_INTERVAL);

        loop {
            tokio::select! {
                _ = self.cancellation.cancelled() => {
                    info!("shutdown signal received");
                    break;
                }

                _ = reconcile_tick.tick() => {
                    self.reconcile_schedules().await;
                }

                _ = restore_tick.tick() => {
                    self.poll_restore_jobs().await;
                }

                _ = activity_tick.tick() => {
                    self.sweep_activity_log().await;
                }

                _ = failed_backup_tick.tick() => {
                    self.prune_failed_backups().await;
                }
            }
        }

        self.shutdown_gracefully().await
    }

    async fn reconcile_schedules(&self) {
        match self.store.list_active_database_configs().await {
            Ok(configs) => {
                if let Err(e) = self.scheduler.reconcile(&configs).await {
                    warn!("failed to reconcile schedules: {e}");
                }
            }
            Err(e) => warn!("failed to list active database configs: {e}"),
        }
    }

    async fn poll_restore_jobs(&self) {
        let pending = match self.store.list_pending_restore_jobs().await {
            Ok(jobs) => jobs,
            Err(e) => {
                warn!("failed to list pending restore jobs: {e}");
                return;
            }
        };

        for job in pending {
            if !self.restore_in_flight.start(job.id) {
                continue;
            }

            let backup = match self.store.get_backup(job.backup_id).await {
                Ok(Some(b)) => b,
                Ok(None) => {
                    warn!("restore job {} references missing backup {}", job.id, job.backup_id);
                    self.restore_in_flight.finish(job.id);
                    continue;
                }
                Err(e) => {
                    warn!("failed to fetch backup {} for restore job {}: {e}", job.backup_id, job.id);
                    self.restore_in_flight.finish(job.id);
                    continue;
                }
            };

            let db_config = match self.store.get_database_config(backup.database_config_id).await {
                Ok(Some(c)) => c,
                Ok(None) => {
                    warn!("restore job {} references a database config that no longer exists", job.id);
                    self.restore_in_flight.finish(job.id);
                    continue;
                }
                Err(e) => {
                    warn!("failed to fetch database config for restore job {}: {e}", job.id);
                    self.restore_in_flight.finish(job.id);
                    continue;
                }
            };

            let restore_executor = self.restore_executor.clone();
            let restore_in_flight = self.restore_in_flight.clone();
            let cancellation = self.cancellation.clone();
            let job_id = job.id;
            tokio::spawn(async move {
                if let Err(e) = restore_executor.execute_restore(job_id, &db_config, cancellation).await {
                    warn!("restore executor returned an error for {job_id}: {e}");
                }
                restore_in_flight.finish(job_id);
            });
        }
    }

    async fn sweep_activity_log(&self) {
        let cutoff = Utc::now() - chrono::Duration::days(self.config.activity_log_retention_days);
        match self.store.delete_old_activity_logs(cutoff).await {
            Ok(0) => {}
            Ok(n) => info!("swept {n} activity log entries older than {} days", self.config.activity_log_retention_days),
            Err(e) => warn!("activity log sweep failed: {e}"),
        }
    }

    async fn prune_failed_backups(&self) {
        let grace_period = chrono::Duration::days(self.config.failed_backup_grace_days);
        let engine = RetentionEngine::new(self.store.clone());
        if let Err(e) = engine.prune_failed_backups(grace_period).await {
            warn!("failed backup prune sweep failed: {e}");
        }
    }

    /// Stop accepting new work, then give in-flight backups and restores a
    /// bounded window to finish on their own. Anything still running past
    /// the deadline is left for `RecoveryManager::reconcile` on next boot.
    async fn shutdown_gracefully(self) -> Result<()> {
        info!("stopping scheduler, no new backups will start");
        self.scheduler.shutdown().await.context("failed to shut down scheduler")?;

        let deadline = tokio::time::Instant::now() + self.config.shutdown_deadline;
        while (self.job_executor.in_flight_count() > 0 || !self.restore_in_flight.is_empty())
            && tokio::time::Instant::now() < deadline
        {
            tokio::time::sleep(SHUTDOWN_POLL_INTERVAL).await;
        }

        let remaining_backups = self.job_executor.in_flight_count();
        let remaining_restores = self.restore_in_flight.len();
        if remaining_backups > 0 || remaining_restores > 0 {
            warn!(
                "{remaining_backups} backup(s) and {remaining_restores} restore(s) still running at shutdown deadline, leaving them for next-boot reconciliation"
            );
        }

        shutdown_logging();
        info!("dumpkeeper service stopped");
        Ok(())
    }
}
