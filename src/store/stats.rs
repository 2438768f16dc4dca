use sqlx::FromRow;

use crate::error::CoreResult;

use super::ConfigStore;

/// Aggregated counters surfaced by the stats/dashboard endpoint.
#[derive(Debug, Clone, FromRow)]
pub struct Stats {
    pub enabled_configs: i64,
    pub backups_last_24h: i64,
    pub successes_last_24h: i64,
    pub failures_last_24h: i64,
    pub total_success_bytes: i64,
}

impl ConfigStore {
    pub async fn stats(&self) -> CoreResult<Stats> {
        let row = sqlx::query_as::<_, Stats>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM database_configs WHERE enabled = TRUE) AS enabled_configs,
                (SELECT COUNT(*) FROM backups WHERE created_at > now() - interval '24 hours') AS backups_last_24h,
                (SELECT COUNT(*) FROM backups WHERE status = 'success' AND created_at > now() - interval '24 hours') AS successes_last_24h,
                (SELECT COUNT(*) FROM backups WHERE status = 'failed' AND created_at > now() - interval '24 hours') AS failures_last_24h,
                (SELECT COALESCE(SUM(size_bytes), 0) FROM backups WHERE status = 'success') AS total_success_bytes
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }
}
