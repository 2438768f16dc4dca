use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageProvider {
    S3,
    R2,
    Generic,
}

impl StorageProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageProvider::S3 => "s3",
            StorageProvider::R2 => "r2",
            StorageProvider::Generic => "generic",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "s3" => Some(StorageProvider::S3),
            "r2" => Some(StorageProvider::R2),
            "generic" => Some(StorageProvider::Generic),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub id: Uuid,
    pub name: String,
    pub provider: StorageProvider,
    pub bucket: String,
    pub region: Option<String>,
    pub endpoint: Option<String>,
    pub access_key: String,
    pub secret_key: String,
    pub owner_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
