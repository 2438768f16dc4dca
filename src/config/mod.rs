use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ACTIVITY_LOG_RETENTION_DAYS: i64 = 60;
const DEFAULT_SHUTDOWN_DEADLINE_SECS: u64 = 30;
const DEFAULT_RECONCILE_GRACE_MINUTES: i64 = 10;
const DEFAULT_FAILED_BACKUP_GRACE_DAYS: i64 = 7;

/// Process-wide configuration loaded once from the environment at startup.
#[derive(Debug, Clone)]
pub struct EnvConfig {
    /// Postgres connection string for the Config Store.
    pub database_dsn: String,

    /// Signing key carried for API-boundary schema completeness; unused by
    /// the core directly.
    pub jwt_secret: String,
    pub jwt_expiration_hours: i64,
    pub otp_expiration_minutes: i64,

    /// System-wide fallback webhook used when a DatabaseConfig has no
    /// NotificationConfig of its own.
    pub discord_webhook_url: Option<String>,

    pub activity_log_retention_days: i64,

    /// How long a `failed` backup is kept around (for forensic info) before
    /// the retention sweep deletes it. Must stay >= 7 days.
    pub failed_backup_grace_days: i64,

    /// Scratch directory for dump/restore artifacts in flight.
    pub temp_dir: PathBuf,

    pub log_level: String,
    pub log_directory: Option<PathBuf>,
    pub log_rotation: LogRotation,

    pub shutdown_deadline: Duration,
    pub reconcile_grace_window: chrono::Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogRotation {
    Daily,
    Hourly,
    Never,
}

impl EnvConfig {
    /// Load from environment variables, failing fast on missing required keys.
    pub fn from_env() -> anyhow::Result<Self> {
        let database_dsn = require_env("DATABASE_DSN")?;
        let jwt_secret = require_env("JWT_SECRET")?;

        let jwt_expiration_hours = parse_env_or("JWT_EXPIRATION_HOURS", 24)?;
        let otp_expiration_minutes = parse_env_or("OTP_EXPIRATION_MINUTES", 5)?;
        let activity_log_retention_days =
            parse_env_or("ACTIVITY_LOG_RETENTION_DAYS", DEFAULT_ACTIVITY_LOG_RETENTION_DAYS)?;
        let failed_backup_grace_days: i64 =
            parse_env_or("FAILED_BACKUP_GRACE_DAYS", DEFAULT_FAILED_BACKUP_GRACE_DAYS)?;
        if failed_backup_grace_days < 7 {
            anyhow::bail!("FAILED_BACKUP_GRACE_DAYS must be at least 7, got {failed_backup_grace_days}");
        }

        let discord_webhook_url = std::env::var("DISCORD_WEBHOOK_URL").ok().filter(|s| !s.is_empty());

        let temp_dir = std::env::var("TEMP_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| std::env::temp_dir());

        let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_LOG_LEVEL.to_string());
        let log_directory = std::env::var("LOG_DIRECTORY").ok().map(PathBuf::from);
        let log_rotation = match std::env::var("LOG_ROTATION").as_deref() {
            Ok("hourly") => LogRotation::Hourly,
            Ok("never") => LogRotation::Never,
            _ => LogRotation::Daily,
        };

        let shutdown_deadline = Duration::from_secs(parse_env_or(
            "SHUTDOWN_DEADLINE_SECS",
            DEFAULT_SHUTDOWN_DEADLINE_SECS,
        )?);
        let reconcile_grace_window = chrono::Duration::minutes(parse_env_or(
            "RECONCILE_GRACE_MINUTES",
            DEFAULT_RECONCILE_GRACE_MINUTES,
        )?);

        Ok(Self {
            database_dsn,
            jwt_secret,
            jwt_expiration_hours,
            otp_expiration_minutes,
            discord_webhook_url,
            activity_log_retention_days,
            failed_backup_grace_days,
            temp_dir,
            log_level,
            log_directory,
            log_rotation,
            shutdown_deadline,
            reconcile_grace_window,
        })
    }
}

fn require_env(key: &str) -> anyhow::Result<String> {
    std::env::var(key).map_err(|_| anyhow::anyhow!("missing required environment variable: {key}"))
}

fn parse_env_or<T: std::str::FromStr>(key: &str, default: T) -> anyhow::Result<T>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("invalid value for {key}: {e}")),
        Err(_) => Ok(default),
    }
}
