use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::models::{Backup, BackupStatus};

use super::ConfigStore;

#[derive(FromRow)]
struct BackupRow {
    id: Uuid,
    database_config_id: Uuid,
    name: String,
    status: String,
    size_bytes: Option<i64>,
    storage_key: Option<String>,
    error_message: Option<String>,
    started_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl TryFrom<BackupRow> for Backup {
    type Error = anyhow::Error;

    fn try_from(row: BackupRow) -> anyhow::Result<Self> {
        let status = BackupStatus::parse(&row.status)
            .ok_or_else(|| anyhow::anyhow!("unknown backup status in row: {}", row.status))?;
        Ok(Backup {
            id: row.id,
            database_config_id: row.database_config_id,
            name: row.name,
            status,
            size_bytes: row.size_bytes,
            storage_key: row.storage_key,
            error_message: row.error_message,
            started_at: row.started_at,
            completed_at: row.completed_at,
            created_at: row.created_at,
        })
    }
}

impl ConfigStore {
    /// Insert a new backup in `pending`, before anything is claimed or run.
    pub async fn create_pending_backup(&self, backup: &Backup) -> CoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO backups (id, database_config_id, name, status, started_at, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(backup.id)
        .bind(backup.database_config_id)
        .bind(&backup.name)
        .bind(BackupStatus::Pending.as_str())
        .bind(backup.started_at)
        .bind(backup.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Atomic `pending` -> `running` compare-and-set. Returns `false` if the
    /// backup is missing or was already claimed -- the caller must treat
    /// that as "abort cleanly, no side effects", never as an error.
    pub async fn claim_pending_backup(&self, id: Uuid) -> CoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE backups
            SET status = 'running', started_at = $1
            WHERE id = $2 AND status = 'pending'
            "#,
        )
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Terminal transition. Rejects (no-op, returns `false`) if the backup
    /// is already in a terminal state -- a completed attempt's outcome is
    /// never overwritten.
    pub async fn complete_backup(
        &self,
        id: Uuid,
        status: BackupStatus,
        size_bytes: Option<i64>,
        storage_key: Option<&str>,
        error_message: Option<&str>,
    ) -> CoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE backups
            SET status = $1, size_bytes = $2, storage_key = $3, error_message = $4, completed_at = $5
            WHERE id = $6 AND status NOT IN ('success', 'failed')
            "#,
        )
        .bind(status.as_str())
        .bind(size_bytes)
        .bind(storage_key)
        .bind(error_message)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    pub async fn get_backup(&self, id: Uuid) -> CoreResult<Option<Backup>> {
        let row = sqlx::query_as::<_, BackupRow>("SELECT * FROM backups WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(TryFrom::try_from).transpose().map_err(CoreError::from)
    }

    pub async fn list_backups_for_config(&self, database_config_id: Uuid) -> CoreResult<Vec<Backup>> {
        let rows = sqlx::query_as::<_, BackupRow>(
            "SELECT * FROM backups WHERE database_config_id = $1 ORDER BY created_at DESC",
        )
        .bind(database_config_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryFrom::try_from).collect::<anyhow::Result<_>>().map_err(CoreError::from)
    }

    /// Successful backups for a config, most recent first -- the ordering
    /// the retention engine relies on to keep the head of the list.
    pub async fn list_successful_backups_for_config(&self, database_config_id: Uuid) -> CoreResult<Vec<Backup>> {
        let rows = sqlx::query_as::<_, BackupRow>(
            "SELECT * FROM backups WHERE database_config_id = $1 AND status = 'success' ORDER BY completed_at DESC",
        )
        .bind(database_config_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryFrom::try_from).collect::<anyhow::Result<_>>().map_err(CoreError::from)
    }

    pub async fn delete_backup(&self, id: Uuid) -> CoreResult<()> {
        sqlx::query("DELETE FROM backups WHERE id = $1").bind(id).execute(&self.pool).await?;

        Ok(())
    }

    /// No backup should stay `running` forever across a restart. Call once
    /// at startup before the scheduler installs any jobs.
    pub async fn reconcile_interrupted_backups(&self, grace_window: chrono::Duration) -> CoreResult<u64> {
        let now = Utc::now();
        let cutoff = now - grace_window;

        let result = sqlx::query(
            r#"
            UPDATE backups
            SET status = 'failed', error_message = 'interrupted', completed_at = $1
            WHERE status = 'running' AND started_at < $2
            "#,
        )
        .bind(now)
        .bind(cutoff)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Failed backups are kept around past completion for forensic info,
    /// then pruned once they're older than the grace window. Never touches
    /// storage -- a failed attempt never gets as far as uploading an object.
    pub async fn delete_failed_backups_older_than(&self, cutoff: DateTime<Utc>) -> CoreResult<u64> {
        let result = sqlx::query("DELETE FROM backups WHERE status = 'failed' AND completed_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::ConfigStore;

    async fn seed_database_config(pool: &sqlx::PgPool) -> Uuid {
        let owner_id = Uuid::new_v4();
        sqlx::query("INSERT INTO users (id, external_id, display_name) VALUES ($1, $2, $3)")
            .bind(owner_id)
            .bind(format!("user-{owner_id}"))
            .bind("test user")
            .execute(pool)
            .await
            .unwrap();

        let storage_config_id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO storage_configs (id, name, provider, bucket, access_key, secret_key, owner_id) \
             VALUES ($1, 'test', 's3', 'bucket', 'key', 'secret', $2)",
        )
        .bind(storage_config_id)
        .bind(owner_id)
        .execute(pool)
        .await
        .unwrap();

        let database_config_id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO database_configs (id, name, host, port, database_name, username, password, \
             cron_schedule, storage_config_id, retention_kind, retention_value, version_label, owner_id) \
             VALUES ($1, 'test-db', 'localhost', 5432, 'app', 'app', 'secret', '0 * * * *', $2, 'count', 5, '16', $3)",
        )
        .bind(database_config_id)
        .bind(storage_config_id)
        .bind(owner_id)
        .execute(pool)
        .await
        .unwrap();

        database_config_id
    }

    async fn seed_pending_backup(store: &ConfigStore, database_config_id: Uuid) -> Backup {
        let now = Utc::now();
        let backup = Backup {
            id: Uuid::new_v4(),
            database_config_id,
            name: "adjective-noun-20260101".to_string(),
            status: BackupStatus::Pending,
            size_bytes: None,
            storage_key: None,
            error_message: None,
            started_at: now,
            completed_at: None,
            created_at: now,
        };
        store.create_pending_backup(&backup).await.unwrap();
        backup
    }

    #[sqlx::test]
    async fn claim_pending_backup_succeeds_exactly_once(pool: sqlx::PgPool) {
        let database_config_id = seed_database_config(&pool).await;
        let store = ConfigStore::from_pool(pool);
        let backup = seed_pending_backup(&store, database_config_id).await;

        assert!(store.claim_pending_backup(backup.id).await.unwrap());
        assert!(!store.claim_pending_backup(backup.id).await.unwrap(), "second claim must lose the race");
    }

    #[sqlx::test]
    async fn complete_backup_does_not_overwrite_a_terminal_state(pool: sqlx::PgPool) {
        let database_config_id = seed_database_config(&pool).await;
        let store = ConfigStore::from_pool(pool);
        let backup = seed_pending_backup(&store, database_config_id).await;

        assert!(store.claim_pending_backup(backup.id).await.unwrap());
        assert!(store.complete_backup(backup.id, BackupStatus::Success, Some(100), Some("key"), None).await.unwrap());

        // A second terminal transition must be rejected -- the first outcome is final.
        assert!(!store.complete_backup(backup.id, BackupStatus::Failed, None, None, Some("late")).await.unwrap());

        let stored = store.get_backup(backup.id).await.unwrap().unwrap();
        assert_eq!(stored.status, BackupStatus::Success);
    }

    #[sqlx::test]
    async fn reconcile_interrupted_backups_only_flips_stale_running_rows(pool: sqlx::PgPool) {
        let database_config_id = seed_database_config(&pool).await;
        let store = ConfigStore::from_pool(pool);

        let stale = seed_pending_backup(&store, database_config_id).await;
        store.claim_pending_backup(stale.id).await.unwrap();
        // Backdate started_at so it falls outside the grace window.
        sqlx::query("UPDATE backups SET started_at = $1 WHERE id = $2")
            .bind(Utc::now() - chrono::Duration::hours(2))
            .bind(stale.id)
            .execute(&store.pool)
            .await
            .unwrap();

        let fresh = seed_pending_backup(&store, database_config_id).await;
        store.claim_pending_backup(fresh.id).await.unwrap();

        let reconciled = store.reconcile_interrupted_backups(chrono::Duration::minutes(30)).await.unwrap();
        assert_eq!(reconciled, 1);

        assert_eq!(store.get_backup(stale.id).await.unwrap().unwrap().status, BackupStatus::Failed);
        assert_eq!(store.get_backup(fresh.id).await.unwrap().unwrap().status, BackupStatus::Running);
    }

    #[sqlx::test]
    async fn delete_failed_backups_older_than_leaves_recent_failures_alone(pool: sqlx::PgPool) {
        let database_config_id = seed_database_config(&pool).await;
        let store = ConfigStore::from_pool(pool);

        let old = seed_pending_backup(&store, database_config_id).await;
        store.claim_pending_backup(old.id).await.unwrap();
        store.complete_backup(old.id, BackupStatus::Failed, None, None, Some("boom")).await.unwrap();
        sqlx::query("UPDATE backups SET completed_at = $1 WHERE id = $2")
            .bind(Utc::now() - chrono::Duration::days(30))
            .bind(old.id)
            .execute(&store.pool)
            .await
            .unwrap();

        let recent = seed_pending_backup(&store, database_config_id).await;
        store.claim_pending_backup(recent.id).await.unwrap();
        store.complete_backup(recent.id, BackupStatus::Failed, None, None, Some("boom")).await.unwrap();

        let cutoff = Utc::now() - chrono::Duration::days(7);
        let pruned = store.delete_failed_backups_older_than(cutoff).await.unwrap();
        assert_eq!(pruned, 1);

        assert!(store.get_backup(old.id).await.unwrap().is_none());
        assert!(store.get_backup(recent.id).await.unwrap().is_some());
    }
}
