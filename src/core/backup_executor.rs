use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::EnvConfig;
use crate::dump::{ConnectionParams, DumpDriver};
use crate::error::{CoreError, CoreResult};
use crate::models::{ActivityLevel, ActivityLog, Backup, BackupStatus, DatabaseConfig};
use crate::notify::{Message, NotificationSink};
use crate::retention::RetentionEngine;
use crate::storage::{ObjectStorage, S3ObjectStorage};
use crate::store::ConfigStore;

use super::naming::{generate_backup_name, storage_key};
use super::tempfile_guard::TempArtifact;

/// Drives one backup attempt end-to-end. Stays a thin, stateless driver;
/// durable state lives in the store.
pub struct BackupExecutor {
    store: Arc<ConfigStore>,
    dump_driver: Arc<dyn DumpDriver>,
    notifier: Arc<NotificationSink>,
    config: Arc<EnvConfig>,
}

impl BackupExecutor {
    pub fn new(
        store: Arc<ConfigStore>,
        dump_driver: Arc<dyn DumpDriver>,
        notifier: Arc<NotificationSink>,
        config: Arc<EnvConfig>,
    ) -> Self {
        Self { store, dump_driver, notifier, config }
    }

    /// Runs one backup end to end: claim, dump, upload, record outcome,
    /// enforce retention, notify. Returns once the attempt has reached a
    /// terminal state (or was never claimed at all).
    pub async fn execute_backup(&self, db_config: &DatabaseConfig, cancellation: CancellationToken) -> CoreResult<()> {
        let backup_id = Uuid::new_v4();
        let name = generate_backup_name(backup_id);
        let now = Utc::now();

        let backup = Backup {
            id: backup_id,
            database_config_id: db_config.id,
            name: name.clone(),
            status: BackupStatus::Pending,
            size_bytes: None,
            storage_key: None,
            error_message: None,
            started_at: now,
            completed_at: None,
            created_at: now,
        };
        self.store.create_pending_backup(&backup).await?;

        if !self.store.claim_pending_backup(backup_id).await? {
            info!("backup {backup_id} for {} already claimed elsewhere, aborting cleanly", db_config.name);
            return Ok(());
        }

        let started = Instant::now();
        let outcome = tokio::select! {
            result = self.run_attempt(db_config, backup_id, &name) => result,
            _ = cancellation.cancelled() => {
                warn!("backup {backup_id} for {} cancelled", db_config.name);
                Err(CoreError::Interrupted)
            }
        };

        match outcome {
            Ok((size_bytes, key)) => {
                self.store
                    .complete_backup(backup_id, BackupStatus::Success, Some(size_bytes), Some(&key), None)
                    .await?;

                info!("backup {backup_id} for {} succeeded ({size_bytes} bytes)", db_config.name);

                self.log_activity(db_config.id, ActivityLevel::Success, "backup.success", &format!("backup {name} succeeded")).await;

                if let Err(e) = RetentionEngine::new(self.store.clone()).enforce(db_config).await {
                    warn!("retention enforcement failed for {}: {e}", db_config.name);
                }

                self.notify(db_config, &Message::backup_success(&db_config.name, size_bytes, started.elapsed())).await;
            }
            Err(e) => {
                let message = e.to_string();
                self.store
                    .complete_backup(backup_id, BackupStatus::Failed, None, None, Some(&message))
                    .await?;

                error!("backup {backup_id} for {} failed: {message}", db_config.name);
                self.log_activity(db_config.id, ActivityLevel::Error, "backup.failure", &message).await;
                self.notify(db_config, &Message::backup_failure(&db_config.name, &message)).await;
            }
        }

        Ok(())
    }

    async fn run_attempt(&self, db_config: &DatabaseConfig, backup_id: Uuid, name: &str) -> CoreResult<(i64, String)> {
        let storage_config = self
            .store
            .get_storage_config(db_config.storage_config_id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("storage config {} not found", db_config.storage_config_id)))?;

        let artifact = TempArtifact::new(&self.config.temp_dir, "dumpkeeper-backup");

        let conn = ConnectionParams {
            host: db_config.host.clone(),
            port: db_config.port,
            database_name: db_config.database_name.clone(),
            username: db_config.username.clone(),
            password: db_config.password.clone(),
        };

        let outcome = self.dump_driver.dump(&conn, &db_config.version_label, artifact.path()).await?;

        if outcome.used_fallback_binary {
            self.log_activity(
                db_config.id,
                ActivityLevel::Warn,
                "backup.dump_tool_fallback",
                &format!("pg_dump-{} not found on PATH, fell back to plain pg_dump", db_config.version_label),
            )
            .await;
        }

        let storage = S3ObjectStorage::connect(&storage_config).await?;
        let key = storage_key(&db_config.name, name, backup_id);
        let started_header = Utc::now().to_rfc3339();

        storage.upload(artifact.path(), &key, &[("db", &db_config.name), ("started", &started_header)]).await?;

        Ok((outcome.size_bytes, key))
    }

    async fn notify(&self, db_config: &DatabaseConfig, message: &Message) {
        let webhook = match db_config.notification_config_id {
            Some(id) => match self.store.get_notification_config(id).await {
                Ok(Some(cfg)) => Some(cfg.webhook_url),
                Ok(None) => None,
                Err(e) => {
                    warn!("failed to load notification config {id}: {e}");
                    None
                }
            },
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
