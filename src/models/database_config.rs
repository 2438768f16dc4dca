use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Rotation policy applied by the retention engine after a successful backup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum RetentionPolicy {
    /// Keep the N most recent successful backups.
    Count { value: u32 },
    /// Keep successful backups completed within the last `value` days.
    Days { value: u32 },
}

impl RetentionPolicy {
    pub fn kind_str(&self) -> &'static str {
        match self {
            RetentionPolicy::Count { .. } => "count",
            RetentionPolicy::Days { .. } => "days",
        }
    }

    pub fn value(&self) -> i32 {
        match self {
            RetentionPolicy::Count { value } => *value as i32,
            RetentionPolicy::Days { value } => *value as i32,
        }
    }

    pub fn from_parts(kind: &str, value: i32) -> anyhow::Result<Self> {
        let value = value.max(0) as u32;
        match kind {
            "count" => Ok(RetentionPolicy::Count { value }),
            "days" => Ok(RetentionPolicy::Days { value }),
            other => anyhow::bail!("unknown retention policy kind: {other}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub id: Uuid,
    pub name: String,
    pub host: String,
    pub port: u16,
    pub database_name: String,
    pub username: String,
    pub password: String,
    /// Standard 5-field cron expression (minute hour day-of-month month day-of-week).
    pub cron_schedule: String,
    pub storage_config_id: Uuid,
    pub notification_config_id: Option<Uuid>,
    pub retention: RetentionPolicy,
    pub version_label: String,
    pub enabled: bool,
    pub paused: bool,
    pub owner_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DatabaseConfig {
    pub fn is_active(&self) -> bool {
        self.enabled && !self.paused
    }
}
