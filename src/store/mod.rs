mod activity_log;
mod backups;
mod database_configs;
mod notification_configs;
mod restore_jobs;
mod stats;
mod storage_configs;

pub use stats::Stats;

use sqlx::postgres::{PgPool, PgPoolOptions};

/// Durable persistence for every entity in the data model, backed by a
/// Postgres connection pool -- a single handle cloned cheaply (via `Arc`
/// internally in `sqlx::Pool`) into every component that needs durable state.
#[derive(Clone)]
pub struct ConfigStore {
    pool: PgPool,
}

impl ConfigStore {
    /// Connect and run embedded migrations before returning. A migration
    /// failure is fatal at startup -- we never run against an unmigrated schema.
    pub async fn connect(dsn: &str) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(25)
            .min_connections(5)
            .connect(dsn)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool })
    }

    #[cfg(test)]
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }
}
