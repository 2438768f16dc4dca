use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use crate::models::{ActivityLevel, ActivityLog, Backup, DatabaseConfig, RetentionPolicy};
use crate::storage::{ObjectStorage, S3ObjectStorage, StorageError};
use crate::store::ConfigStore;

/// Applies a DatabaseConfig's rotation policy after every successful
/// backup, and sweeps a config's entire storage prefix before it's deleted.
pub struct RetentionEngine {
    store: Arc<ConfigStore>,
}

impl RetentionEngine {
    pub fn new(store: Arc<ConfigStore>) -> Self {
        Self { store }
    }

    /// Prune successful backups beyond the policy, oldest first, always
    /// keeping the single most recent one (safety rail).
    pub async fn enforce(&self, db_config: &DatabaseConfig) -> anyhow::Result<()> {
        let successes = self.store.list_successful_backups_for_config(db_config.id).await?;
        if successes.len() <= 1 {
            return Ok(());
        }

        let deletable = select_deletable(&successes, db_config.retention);
        if deletable.is_empty() {
            return Ok(());
        }

        let storage_config = self
            .store
            .get_storage_config(db_config.storage_config_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("storage config {} not found", db_config.storage_config_id))?;
        let storage = S3ObjectStorage::connect(&storage_config).await.map_err(|e| anyhow::anyhow!(e))?;

        for backup in deletable {
            if let Err(e) = self.prune_one(&storage, &backup).await {
                warn!("failed to prune backup {} for {}: {e}", backup.id, db_config.name);
                self.log_warning(db_config.id, &format!("retention prune failed for {}: {e}", backup.name)).await;
            }
        }

        Ok(())
    }

    async fn prune_one(&self, storage: &S3ObjectStorage, backup: &Backup) -> anyhow::Result<()> {
        if let Some(key) = &backup.storage_key {
            match storage.delete(key).await {
                Ok(()) => {}
                Err(StorageError::NotFound(_)) => {
                    // Already gone from the bucket; proceed to drop the record.
                }
                Err(e) => return Err(anyhow::anyhow!(e)),
            }
        }

        self.store.delete_backup(backup.id).await?;
        info!("pruned backup {} ({})", backup.id, backup.name);
        Ok(())
    }

    /// Failed backups never have a storage object (upload only runs after a
    /// successful dump), so this is a plain row sweep, run globally rather
    /// than per-config. Kept around longer than successes -- the grace
    /// period defaults to 7 days -- so there's forensic info to look at.
    pub async fn prune_failed_backups(&self, grace_period: chrono::Duration) -> anyhow::Result<u64> {
        let cutoff = Utc::now() - grace_period;
        let pruned = self.store.delete_failed_backups_older_than(cutoff).await?;
        if pruned > 0 {
            info!("pruned {pruned} failed backup record(s) older than the grace period");
        }
        Ok(pruned)
    }

    /// CASCADE on DatabaseConfig deletion removes Backup rows but not the
    /// objects they reference. Call this BEFORE deleting the config so no
    /// orphaned objects remain.
    pub async fn sweep_for_delete(&self, db_config: &DatabaseConfig) -> anyhow::Result<()> {
        let storage_config = self
            .store
            .get_storage_config(db_config.storage_config_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("storage config {} not found", db_config.storage_config_id))?;
        let storage = S3ObjectStorage::connect(&storage_config).await.map_err(|e| anyhow::anyhow!(e))?;

        let prefix = format!("backups/{}/", db_config.name);
        let objects = storage.list(&prefix).await.map_err(|e| anyhow::anyhow!(e))?;

        for object in &objects {
            if let Err(e) = storage.delete(&object.key).await {
                warn!("failed to sweep object {} for deleted config {}: {e}", object.key, db_config.name);
            }
        }

        info!("swept {} object(s) for deleted config {}", objects.len(), db_config.name);
        Ok(())
    }

    async fn log_warning(&self, database_config_id: uuid::Uuid, description: &str) {
        let entry = ActivityLog {
            id: uuid::Uuid::new_v4(),
            user_id: None,
            action: "retention.warn".to_string(),
            level: ActivityLevel::Warn,
            resource_kind: "database_config".to_string(),
            resource_id: Some(database_config_id.to_string()),
            description: description.to_string(),
            metadata: None,
            ip_address: None,
            created_at: Utc::now(),
        };
        let _ = self.store.create_activity_log(&entry).await;
    }
}

/// `successes` must already be ordered most-recent-first (the store
/// guarantees this). Always keeps index 0.
fn select_deletable(successes: &[Backup], policy: RetentionPolicy) -> Vec<Backup> {
    match policy {
        RetentionPolicy::Count { value } => {
            let keep = (value as usize).max(1);
            successes.iter().skip(keep).cloned().collect()
        }
        RetentionPolicy::Days { value } => {
            let cutoff = Utc::now() - chrono::Duration::days(value as i64);
            successes
                .iter()
                .skip(1)
                .filter(|b| b.completed_at.map(|c| c < cutoff).unwrap_or(false))
                .cloned()
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BackupStatus;
    use uuid::Uuid;

    fn backup_at(days_ago: i64) -> Backup {
        let completed = Utc::now() - chrono::Duration::days(days_ago);
        Backup {
            id: Uuid::new_v4(),
            database_config_id: Uuid::new_v4(),
            name: format!("backup-{days_ago}"),
            status: BackupStatus::Success,
            size_bytes: Some(100),
            storage_key: Some(format!("backups/test/backup-{days_ago}.dump.gz")),
            error_message: None,
            started_at: completed,
            completed_at: Some(completed),
            created_at: completed,
        }
    }

    #[test]
    fn count_policy_keeps_exactly_n_most_recent() {
        let successes: Vec<_> = (0..5).map(backup_at).collect();
        let deletable = select_deletable(&successes, RetentionPolicy::Count { value: 2 });
        assert_eq!(deletable.len(), 3);
        assert_eq!(successes.len() - deletable.len(), 2);
    }

    #[test]
    fn count_policy_of_one_still_keeps_one() {
        let successes: Vec<_> = (0..3).map(backup_at).collect();
        let deletable = select_deletable(&successes, RetentionPolicy::Count { value: 1 });
        assert_eq!(deletable.len(), 2);
    }

    #[test]
    fn days_policy_never_deletes_the_most_recent_even_if_stale() {
        let successes = vec![backup_at(30)];
        let deletable = select_deletable(&successes, RetentionPolicy::Days { value: 1 });
        assert!(deletable.is_empty(), "safety rail must preserve the sole backup");
    }

    #[test]
    fn days_policy_deletes_older_than_cutoff_but_keeps_recent() {
        let successes = vec![backup_at(0), backup_at(10), backup_at(90)];
        let deletable = select_deletable(&successes, RetentionPolicy::Days { value: 30 });
        assert_eq!(deletable.len(), 1);
        assert_eq!(deletable[0].name, "backup-90");
    }
}
