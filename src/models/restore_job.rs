use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RestoreStatus {
    Pending,
    Running,
    Success,
    Failed,
}

impl RestoreStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RestoreStatus::Pending => "pending",
            RestoreStatus::Running => "running",
            RestoreStatus::Success => "success",
            RestoreStatus::Failed => "failed",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "pending" => Some(RestoreStatus::Pending),
            "running" => Some(RestoreStatus::Running),
            "success" => Some(RestoreStatus::Success),
            "failed" => Some(RestoreStatus::Failed),
            _ => None,
        }
    }
}

/// Optional override target for a restore; when absent, the restore
/// executor targets the original DatabaseConfig's connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestoreTarget {
    pub host: String,
    pub port: u16,
    pub database_name: String,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestoreJob {
    pub id: Uuid,
    pub backup_id: Uuid,
    pub target: Option<RestoreTarget>,
    pub status: RestoreStatus,
    pub error_message: Option<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}
