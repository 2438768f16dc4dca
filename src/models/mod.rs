mod activity_log;
mod backup;
mod database_config;
mod notification_config;
mod restore_job;
mod storage_config;
mod user;

pub use activity_log::{ActivityLog, ActivityLevel};
pub use backup::{Backup, BackupStatus};
pub use database_config::{DatabaseConfig, RetentionPolicy};
pub use notification_config::NotificationConfig;
pub use restore_job::{RestoreJob, RestoreStatus, RestoreTarget};
pub use storage_config::{StorageConfig, StorageProvider};
pub use user::User;
