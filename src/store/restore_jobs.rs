use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::models::{RestoreJob, RestoreStatus, RestoreTarget};

use super::ConfigStore;

#[derive(FromRow)]
struct RestoreJobRow {
    id: Uuid,
    backup_id: Uuid,
    target_host: Option<String>,
    target_port: Option<i32>,
    target_database: Option<String>,
    target_username: Option<String>,
    target_password: Option<String>,
    status: String,
    error_message: Option<String>,
    started_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

impl TryFrom<RestoreJobRow> for RestoreJob {
    type Error = anyhow::Error;

    fn try_from(row: RestoreJobRow) -> anyhow::Result<Self> {
        let status = RestoreStatus::parse(&row.status)
            .ok_or_else(|| anyhow::anyhow!("unknown restore status in row: {}", row.status))?;

        let target = match (row.target_host, row.target_port, row.target_database, row.target_username, row.target_password) {
            (Some(host), Some(port), Some(database_name), Some(username), Some(password)) => {
                Some(RestoreTarget { host, port: port as u16, database_name, username, password })
            }
            _ => None,
        };

        Ok(RestoreJob {
            id: row.id,
            backup_id: row.backup_id,
            target,
            status,
            error_message: row.error_message,
            started_at: row.started_at,
            completed_at: row.completed_at,
        })
    }
}

impl ConfigStore {
    pub async fn create_pending_restore(&self, job: &RestoreJob) -> CoreResult<()> {
        let (host, port, database_name, username, password) = match &job.target {
            Some(t) => (
                Some(t.host.clone()),
                Some(t.port as i32),
                Some(t.database_name.clone()),
                Some(t.username.clone()),
                Some(t.password.clone()),
            ),
            None => (None, None, None, None, None),
        };

        sqlx::query(
            r#"
            INSERT INTO restore_jobs (
                id, backup_id, target_host, target_port, target_database,
                target_username, target_password, status, started_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(job.id)
        .bind(job.backup_id)
        .bind(host)
        .bind(port)
        .bind(database_name)
        .bind(username)
        .bind(password)
        .bind(RestoreStatus::Pending.as_str())
        .bind(job.started_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn claim_pending_restore(&self, id: Uuid) -> CoreResult<bool> {
        let result = sqlx::query(
            "UPDATE restore_jobs SET status = 'running', started_at = $1 WHERE id = $2 AND status = 'pending'",
        )
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    pub async fn complete_restore(&self, id: Uuid, status: RestoreStatus, error_message: Option<&str>) -> CoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE restore_jobs
            SET status = $1, error_message = $2, completed_at = $3
            WHERE id = $4 AND status NOT IN ('success', 'failed')
            "#,
        )
        .bind(status.as_str())
        .bind(error_message)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    pub async fn get_restore_job(&self, id: Uuid) -> CoreResult<Option<RestoreJob>> {
        let row = sqlx::query_as::<_, RestoreJobRow>("SELECT * FROM restore_jobs WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(TryFrom::try_from).transpose().map_err(CoreError::from)
    }

    /// Picked up by the service's restore poll loop and handed to the
    /// RestoreExecutor, which performs its own CAS claim before acting.
    pub async fn list_pending_restore_jobs(&self) -> CoreResult<Vec<RestoreJob>> {
        let rows = sqlx::query_as::<_, RestoreJobRow>(
            "SELECT * FROM restore_jobs WHERE status = 'pending' ORDER BY started_at",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryFrom::try_from).collect::<anyhow::Result<_>>().map_err(CoreError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Backup, BackupStatus};
    use crate::store::ConfigStore;

    async fn seed_backup(pool: &sqlx::PgPool) -> Uuid {
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

        let backup = Backup {
            id: Uuid::new_v4(),
            database_config_id,
            name: "adjective-noun-20260101".to_string(),
            status: BackupStatus::Success,
            size_bytes: Some(10),
            storage_key: Some("backups/test-db/adjective-noun-20260101.dump.gz".to_string()),
            error_message: None,
            started_at: Utc::now(),
            completed_at: Some(Utc::now()),
            created_at: Utc::now(),
        };
        sqlx::query(
            "INSERT INTO backups (id, database_config_id, name, status, size_bytes, storage_key, started_at, completed_at, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(backup.id)
        .bind(backup.database_config_id)
        .bind(&backup.name)
        .bind(backup.status.as_str())
        .bind(backup.size_bytes)
        .bind(&backup.storage_key)
        .bind(backup.started_at)
        .bind(backup.completed_at)
        .bind(backup.created_at)
        .execute(pool)
        .await
        .unwrap();

        backup.id
    }

    #[sqlx::test]
    async fn claim_pending_restore_succeeds_exactly_once(pool: sqlx::PgPool) {
        let backup_id = seed_backup(&pool).await;
        let store = ConfigStore::from_pool(pool);

        let job = RestoreJob {
            id: Uuid::new_v4(),
            backup_id,
            target: None,
            status: RestoreStatus::Pending,
            error_message: None,
            started_at: Utc::now(),
            completed_at: None,
        };
        store.create_pending_restore(&job).await.unwrap();

        assert!(store.claim_pending_restore(job.id).await.unwrap());
        assert!(!store.claim_pending_restore(job.id).await.unwrap(), "second claim must lose the race");
    }

    #[sqlx::test]
    async fn complete_restore_does_not_overwrite_a_terminal_state(pool: sqlx::PgPool) {
        let backup_id = seed_backup(&pool).await;
        let store = ConfigStore::from_pool(pool);

        let job = RestoreJob {
            id: Uuid::new_v4(),
            backup_id,
            target: None,
            status: RestoreStatus::Pending,
            error_message: None,
            started_at: Utc::now(),
            completed_at: None,
        };
        store.create_pending_restore(&job).await.unwrap();
        store.claim_pending_restore(job.id).await.unwrap();

        assert!(store.complete_restore(job.id, RestoreStatus::Success, None).await.unwrap());
        assert!(!store.complete_restore(job.id, RestoreStatus::Failed, Some("late")).await.unwrap());

        let stored = store.get_restore_job(job.id).await.unwrap().unwrap();
        assert_eq!(stored.status, RestoreStatus::Success);
    }

    #[sqlx::test]
    async fn list_pending_restore_jobs_excludes_claimed_jobs(pool: sqlx::PgPool) {
        let backup_id = seed_backup(&pool).await;
        let store = ConfigStore::from_pool(pool);

        let pending = RestoreJob {
            id: Uuid::new_v4(),
            backup_id,
            target: None,
            status: RestoreStatus::Pending,
            error_message: None,
            started_at: Utc::now(),
            completed_at: None,
        };
        let claimed = RestoreJob { id: Uuid::new_v4(), ..pending.clone() };
        store.create_pending_restore(&pending).await.unwrap();
        store.create_pending_restore(&claimed).await.unwrap();
        store.claim_pending_restore(claimed.id).await.unwrap();

        let listed = store.list_pending_restore_jobs().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, pending.id);
    }
}
