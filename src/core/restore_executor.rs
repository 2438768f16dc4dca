use std::sync::Arc;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::EnvConfig;
use crate::dump::{ConnectionParams, DumpDriver};
use crate::error::{CoreError, CoreResult};
use crate::models::{ActivityLevel, ActivityLog, DatabaseConfig, RestoreJob, RestoreStatus, RestoreTarget};
use crate::notify::{Message, NotificationSink};
use crate::storage::{ObjectStorage, S3ObjectStorage};
use crate::store::ConfigStore;

use super::tempfile_guard::TempArtifact;

/// Inverse of `BackupExecutor`: fetch artifact, restore to a target,
/// record status, notify. Shares the executor's claim/finalize discipline
/// and its scoped temp-file cleanup, and races the same way against a
/// `CancellationToken` threaded in from the caller.
pub struct RestoreExecutor {
    store: Arc<ConfigStore>,
    dump_driver: Arc<dyn DumpDriver>,
    notifier: Arc<NotificationSink>,
    config: Arc<EnvConfig>,
}

impl RestoreExecutor {
    pub fn new(
        store: Arc<ConfigStore>,
        dump_driver: Arc<dyn DumpDriver>,
        notifier: Arc<NotificationSink>,
        config: Arc<EnvConfig>,
    ) -> Self {
        Self { store, dump_driver, notifier, config }
    }

    pub async fn execute_restore(&self, job_id: Uuid, db_config: &DatabaseConfig, cancellation: CancellationToken) -> CoreResult<()> {
        if !self.store.claim_pending_restore(job_id).await? {
            info!("restore job {job_id} already claimed elsewhere, aborting cleanly");
            return Ok(());
        }

        let job = self
            .store
            .get_restore_job(job_id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("restore job {job_id} not found")))?;

        let outcome = tokio::select! {
            result = self.run_attempt(&job, db_config) => result,
            _ = cancellation.cancelled() => {
                warn!("restore {job_id} for {} cancelled", db_config.name);
                Err(CoreError::Interrupted)
            }
        };

        match outcome {
            Ok(()) => {
                self.store.complete_restore(job_id, RestoreStatus::Success, None).await?;
                info!("restore {job_id} for {} succeeded", db_config.name);
                self.log_activity(db_config.id, ActivityLevel::Success, "restore.success", "restore succeeded").await;
                self.notify(db_config, &Message::restore_success(&db_config.name)).await;
            }
            Err(e) => {
                let message = e.to_string();
                self.store.complete_restore(job_id, RestoreStatus::Failed, Some(&message)).await?;
                error!("restore {job_id} for {} failed: {message}", db_config.name);
                self.log_activity(db_config.id, ActivityLevel::Error, "restore.failure", &message).await;
                self.notify(db_config, &Message::restore_failure(&db_config.name, &message)).await;
            }
        }

        Ok(())
    }

    async fn run_attempt(&self, job: &RestoreJob, db_config: &DatabaseConfig) -> CoreResult<()> {
        let backup = self
            .store
            .get_backup(job.backup_id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("backup {} not found", job.backup_id)))?;

        let storage_key = backup
            .storage_key
            .ok_or_else(|| CoreError::NotFound(format!("backup {} has no storage key", backup.id)))?;

        let storage_config = self
            .store
            .get_storage_config(db_config.storage_config_id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("storage config {} not found", db_config.storage_config_id)))?;

        let storage = S3ObjectStorage::connect(&storage_config).await?;
        let artifact = TempArtifact::new(&self.config.temp_dir, "dumpkeeper-restore");

        storage.download(&storage_key, artifact.path()).await?;

        let conn = target_connection(job.target.as_ref(), db_config);

        self.dump_driver.restore(&conn, artifact.path()).await?;

        Ok(())
    }

    async fn notify(&self, db_config: &DatabaseConfig, message: &Message) {
        let webhook = match db_config.notification_config_id {
            Some(id) => self.store.get_notification_config(id).await.ok().flatten().map(|c| c.webhook_url),
            None => self.config.discord_webhook_url.clone(),
        };
        self.notifier.send(webhook.as_deref(), message).await;
    }

    async fn log_activity(&self, database_config_id: Uuid, level: ActivityLevel, action: &str, description: &str) {
        let entry = ActivityLog {
            id: Uuid::new_v4(),
            user_id: None,
            action: action.to_string(),
            level,
            resource_kind: "database_config".to_string(),
            resource_id: Some(database_config_id.to_string()),
            description: description.to_string(),
            metadata: None,
            ip_address: None,
            created_at: Utc::now(),
        };

        if let Err(e) = self.store.create_activity_log(&entry).await {
            warn!("failed to write activity log entry: {e}");
        }
    }
}

fn target_connection(override_target: Option<&RestoreTarget>, db_config: &DatabaseConfig) -> ConnectionParams {
    match override_target {
        Some(t) => ConnectionParams {
            host: t.host.clone(),
            port: t.port,
            database_name: t.database_name.clone(),
            username: t.username.clone(),
            password: t.password.clone(),
        },
        None => ConnectionParams {
            host: db_config.host.clone(),
            port: db_config.port,
            database_name: db_config.database_name.clone(),
            username: db_config.username.clone(),
            password: db_config.password.clone(),
        },
    }
}
