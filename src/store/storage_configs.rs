use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::models::{StorageConfig, StorageProvider};

use super::ConfigStore;

#[derive(FromRow)]
struct StorageConfigRow {
    id: Uuid,
    name: String,
    provider: String,
    bucket: String,
    region: Option<String>,
    endpoint: Option<String>,
    access_key: String,
    secret_key: String,
    owner_id: Uuid,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<StorageConfigRow> for StorageConfig {
    type Error = anyhow::Error;

    fn try_from(row: StorageConfigRow) -> anyhow::Result<Self> {
        let provider = StorageProvider::parse(&row.provider)
            .ok_or_else(|| anyhow::anyhow!("unknown storage provider in row: {}", row.provider))?;
        Ok(StorageConfig {
            id: row.id,
            name: row.name,
            provider,
            bucket: row.bucket,
            region: row.region,
            endpoint: row.endpoint,
            access_key: row.access_key,
            secret_key: row.secret_key,
            owner_id: row.owner_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

impl ConfigStore {
    pub async fn create_storage_config(&self, cfg: &StorageConfig) -> CoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO storage_configs
                (id, name, provider, bucket, region, endpoint, access_key, secret_key, owner_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(cfg.id)
        .bind(&cfg.name)
        .bind(cfg.provider.as_str())
        .bind(&cfg.bucket)
        .bind(&cfg.region)
        .bind(&cfg.endpoint)
        .bind(&cfg.access_key)
        .bind(&cfg.secret_key)
        .bind(cfg.owner_id)
        .bind(cfg.created_at)
        .bind(cfg.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get_storage_config(&self, id: Uuid) -> CoreResult<Option<StorageConfig>> {
        let row = sqlx::query_as::<_, StorageConfigRow>("SELECT * FROM storage_configs WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(TryFrom::try_from).transpose().map_err(CoreError::from)
    }

    pub async fn delete_storage_config(&self, id: Uuid) -> CoreResult<()> {
        // No ON DELETE CASCADE from database_configs -- RESTRICT stops a
        // referenced StorageConfig from being deleted at the database
        // layer; `?` surfaces the FK violation as CoreError::Conflict.
        sqlx::query("DELETE FROM storage_configs WHERE id = $1").bind(id).execute(&self.pool).await?;

        Ok(())
    }

    pub async fn list_storage_configs(&self, owner_id: Uuid) -> CoreResult<Vec<StorageConfig>> {
        let rows = sqlx::query_as::<_, StorageConfigRow>(
            "SELECT * FROM storage_configs WHERE owner_id = $1 ORDER BY created_at DESC",
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryFrom::try_from).collect::<anyhow::Result<_>>().map_err(CoreError::from)
    }
}
