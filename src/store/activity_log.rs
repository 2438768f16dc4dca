use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::models::{ActivityLevel, ActivityLog};

use super::ConfigStore;

#[derive(FromRow)]
struct ActivityLogRow {
    id: Uuid,
    user_id: Option<Uuid>,
    action: String,
    level: String,
    resource_kind: String,
    resource_id: Option<String>,
    description: String,
    metadata: Option<serde_json::Value>,
    ip_address: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<ActivityLogRow> for ActivityLog {
    type Error = anyhow::Error;

    fn try_from(row: ActivityLogRow) -> anyhow::Result<Self> {
        let level = match row.level.as_str() {
            "info" => ActivityLevel::Info,
            "success" => ActivityLevel::Success,
            "warn" => ActivityLevel::Warn,
            "error" => ActivityLevel::Error,
            other => anyhow::bail!("unknown activity level in row: {other}"),
        };

        Ok(ActivityLog {
            id: row.id,
            user_id: row.user_id,
            action: row.action,
            level,
            resource_kind: row.resource_kind,
            resource_id: row.resource_id,
            description: row.description,
            metadata: row.metadata,
            ip_address: row.ip_address,
            created_at: row.created_at,
        })
    }
}

impl ConfigStore {
    pub async fn create_activity_log(&self, entry: &ActivityLog) -> CoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO activity_log (
                id, user_id, action, level, resource_kind, resource_id,
                description, metadata, ip_address, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(entry.id)
        .bind(entry.user_id)
        .bind(&entry.action)
        .bind(entry.level.as_str())
        .bind(&entry.resource_kind)
        .bind(&entry.resource_id)
        .bind(&entry.description)
        .bind(&entry.metadata)
        .bind(&entry.ip_address)
        .bind(entry.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn list_recent_activity(&self, limit: i64) -> CoreResult<Vec<ActivityLog>> {
        let rows = sqlx::query_as::<_, ActivityLogRow>(
            "SELECT * FROM activity_log ORDER BY created_at DESC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryFrom::try_from).collect::<anyhow::Result<_>>().map_err(CoreError::from)
    }

    /// Bounded retention sweep, run daily by the service. Returns the
    /// number of rows removed.
    pub async fn delete_old_activity_logs(&self, cutoff: DateTime<Utc>) -> CoreResult<u64> {
        let result = sqlx::query("DELETE FROM activity_log WHERE created_at < $1").bind(cutoff).execute(&self.pool).await?;

        Ok(result.rows_affected())
    }
}
