use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::CoreResult;
use crate::models::NotificationConfig;

use super::ConfigStore;

#[derive(FromRow)]
struct NotificationConfigRow {
    id: Uuid,
    name: String,
    webhook_url: String,
    owner_id: Uuid,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<NotificationConfigRow> for NotificationConfig {
    fn from(row: NotificationConfigRow) -> Self {
        NotificationConfig {
            id: row.id,
            name: row.name,
            webhook_url: row.webhook_url,
            owner_id: row.owner_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl ConfigStore {
    pub async fn create_notification_config(&self, cfg: &NotificationConfig) -> CoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO notification_configs (id, name, webhook_url, owner_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(cfg.id)
        .bind(&cfg.name)
        .bind(&cfg.webhook_url)
        .bind(cfg.owner_id)
        .bind(cfg.created_at)
        .bind(cfg.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get_notification_config(&self, id: Uuid) -> CoreResult<Option<NotificationConfig>> {
        let row = sqlx::query_as::<_, NotificationConfigRow>("SELECT * FROM notification_configs WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Into::into))
    }

    pub async fn delete_notification_config(&self, id: Uuid) -> CoreResult<()> {
        sqlx::query("DELETE FROM notification_configs WHERE id = $1").bind(id).execute(&self.pool).await?;

        Ok(())
    }
}
