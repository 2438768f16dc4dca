use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::models::{DatabaseConfig, RetentionPolicy};

use super::ConfigStore;

#[derive(FromRow)]
struct DatabaseConfigRow {
    id: Uuid,
    name: String,
    host: String,
    port: i32,
    database_name: String,
    username: String,
    password: String,
    cron_schedule: String,
    storage_config_id: Uuid,
    notification_config_id: Option<Uuid>,
    retention_kind: String,
    retention_value: i32,
    version_label: String,
    enabled: bool,
    paused: bool,
    owner_id: Uuid,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<DatabaseConfigRow> for DatabaseConfig {
    type Error = anyhow::Error;

    fn try_from(row: DatabaseConfigRow) -> anyhow::Result<Self> {
        Ok(DatabaseConfig {
            id: row.id,
            name: row.name,
            host: row.host,
            port: row.port as u16,
            database_name: row.database_name,
            username: row.username,
            password: row.password,
            cron_schedule: row.cron_schedule,
            storage_config_id: row.storage_config_id,
            notification_config_id: row.notification_config_id,
            retention: RetentionPolicy::from_parts(&row.retention_kind, row.retention_value)?,
            version_label: row.version_label,
            enabled: row.enabled,
            paused: row.paused,
            owner_id: row.owner_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

impl ConfigStore {
    pub async fn create_database_config(&self, cfg: &DatabaseConfig) -> CoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO database_configs (
                id, name, host, port, database_name, username, password, cron_schedule,
                storage_config_id, notification_config_id, retention_kind, retention_value,
                version_label, enabled, paused, owner_id, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
            "#,
        )
        .bind(cfg.id)
        .bind(&cfg.name)
        .bind(&cfg.host)
        .bind(cfg.port as i32)
        .bind(&cfg.database_name)
        .bind(&cfg.username)
        .bind(&cfg.password)
        .bind(&cfg.cron_schedule)
        .bind(cfg.storage_config_id)
        .bind(cfg.notification_config_id)
        .bind(cfg.retention.kind_str())
        .bind(cfg.retention.value())
        .bind(&cfg.version_label)
        .bind(cfg.enabled)
        .bind(cfg.paused)
        .bind(cfg.owner_id)
        .bind(cfg.created_at)
        .bind(cfg.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get_database_config(&self, id: Uuid) -> CoreResult<Option<DatabaseConfig>> {
        let row = sqlx::query_as::<_, DatabaseConfigRow>("SELECT * FROM database_configs WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(TryFrom::try_from).transpose().map_err(CoreError::from)
    }

    /// Every config the scheduler should have an installed job for.
    pub async fn list_active_database_configs(&self) -> CoreResult<Vec<DatabaseConfig>> {
        let rows = sqlx::query_as::<_, DatabaseConfigRow>(
            "SELECT * FROM database_configs WHERE enabled = TRUE AND paused = FALSE ORDER BY created_at",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryFrom::try_from).collect::<anyhow::Result<_>>().map_err(CoreError::from)
    }

    pub async fn list_database_configs_by_owner(&self, owner_id: Uuid) -> CoreResult<Vec<DatabaseConfig>> {
        let rows = sqlx::query_as::<_, DatabaseConfigRow>(
            "SELECT * FROM database_configs WHERE owner_id = $1 ORDER BY created_at DESC",
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryFrom::try_from).collect::<anyhow::Result<_>>().map_err(CoreError::from)
    }

    pub async fn update_database_config(&self, cfg: &DatabaseConfig) -> CoreResult<()> {
        sqlx::query(
            r#"
            UPDATE database_configs SET
                name = $1, host = $2, port = $3, database_name = $4, username = $5,
                password = $6, cron_schedule = $7, storage_config_id = $8,
                notification_config_id = $9, retention_kind = $10, retention_value = $11,
                version_label = $12, enabled = $13, paused = $14, updated_at = $15
            WHERE id = $16
            "#,
        )
        .bind(&cfg.name)
        .bind(&cfg.host)
        .bind(cfg.port as i32)
        .bind(&cfg.database_name)
        .bind(&cfg.username)
        .bind(&cfg.password)
        .bind(&cfg.cron_schedule)
        .bind(cfg.storage_config_id)
        .bind(cfg.notification_config_id)
        .bind(cfg.retention.kind_str())
        .bind(cfg.retention.value())
        .bind(&cfg.version_label)
        .bind(cfg.enabled)
        .bind(cfg.paused)
        .bind(Utc::now())
        .bind(cfg.id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Deletion cascades to backups and restore jobs at the database layer
    /// (invariant checked by the `backups`/`restore_jobs` FK `ON DELETE
    /// CASCADE`). Callers MUST run the retention engine's post-delete
    /// storage sweep before calling this, since CASCADE removes rows but
    /// not the objects they reference.
    pub async fn delete_database_config(&self, id: Uuid) -> CoreResult<()> {
        sqlx::query("DELETE FROM database_configs WHERE id = $1").bind(id).execute(&self.pool).await?;

        Ok(())
    }
}
