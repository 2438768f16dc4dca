use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::Mutex;
use tokio_cron_scheduler::{Job, JobScheduler};
use tokio_util::sync::CancellationToken;
use tracing::info;
use uuid::Uuid;

use crate::models::DatabaseConfig;

use super::changes::diff_configs;
use super::executor::JobExecutor;

/// Cron-driven installer/reconciler on top of `tokio_cron_scheduler`.
/// Mirrors the `Scheduler::detect_config_changes`/`initialize_jobs` split,
/// but delegates the actual firing to the scheduler crate's own wheel
/// instead of a manual next-run poll loop.
pub struct Scheduler {
    cron: JobScheduler,
    job_executor: Arc<JobExecutor>,
    cancellation: CancellationToken,
    installed: Mutex<HashMap<Uuid, (Uuid, String)>>,
}

impl Scheduler {
    pub async fn start(job_executor: Arc<JobExecutor>, cancellation: CancellationToken) -> Result<Self> {
        let cron = JobScheduler::new().await.context("failed to start cron scheduler")?;
        cron.start().await.context("failed to start cron scheduler loop")?;

        Ok(Self {
            cron,
            job_executor,
            cancellation,
            installed: Mutex::new(HashMap::new()),
        })
    }

    /// Install/remove/replace cron jobs so the running set matches
    /// `configs` exactly. Call on startup and whenever DatabaseConfig rows
    /// change.
    pub async fn reconcile(&self, configs: &[DatabaseConfig]) -> Result<()> {
        let snapshot: HashMap<Uuid, String> = {
            let installed = self.installed.lock().await;
            installed.iter().map(|(id, (_, expr))| (*id, expr.clone())).collect()
        };

        let diff = diff_configs(&snapshot, configs);

        for id in diff.removed {
            self.remove_job(id).await?;
        }

        for config in diff.rescheduled {
            self.remove_job(config.id).await?;
            self.install_job(config).await?;
        }

        for config in diff.added {
            self.install_job(config).await?;
        }

        Ok(())
    }

    async fn install_job(&self, config: DatabaseConfig) -> Result<()> {
        let expr = six_field_cron(&config.cron_schedule);
        let db_config_id = config.id;
        let name = config.name.clone();
        let job_executor = self.job_executor.clone();
        let cancellation = self.cancellation.clone();

        let job = Job::new_async(expr.as_str(), move |_job_id, _scheduler| {
            let job_executor = job_executor.clone();
            let cancellation = cancellation.clone();
            let config = config.clone();
            Box::pin(async move {
                job_executor.run_tick(config, cancellation).await;
            })
        })
        .with_context(|| format!("invalid cron expression for {name}: {expr}"))?;

        let job_id = self.cron.add(job).await.context("failed to install cron job")?;
        self.installed.lock().await.insert(db_config_id, (job_id, expr.clone()));
        info!("installed schedule for {name} ({expr})");
        Ok(())
    }

    async fn remove_job(&self, db_config_id: Uuid) -> Result<()> {
        let entry = self.installed.lock().await.remove(&db_config_id);
        if let Some((job_id, _)) = entry {
            self.cron.remove(&job_id).await.context("failed to remove cron job")?;
            info!("removed schedule for database config {db_config_id}");
        }
        Ok(())
    }

    pub async fn shutdown(mut self) -> Result<()> {
        self.cron.shutdown().await.context("failed to shut down cron scheduler")?;
        Ok(())
    }
}

/// `tokio_cron_scheduler` expects a 6-field (seconds-first) expression;
/// the data model stores the standard 5-field form.
fn six_field_cron(five_field: &str) -> String {
    format!("0 {five_field}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prepends_seconds_field() {
        assert_eq!(six_field_cron("0 3 * * *"), "0 0 3 * * *");
    }
}
