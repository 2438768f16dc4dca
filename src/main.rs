use anyhow::{Context, Result};
use dumpkeeper::{
    config::{EnvConfig, LogRotation as ConfigLogRotation},
    observability::{init_logging, Rotation},
    service::ServiceDaemon,
};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let config = EnvConfig::from_env().context("failed to load configuration from environment")?;

    let rotation = match config.log_rotation {
        ConfigLogRotation::Daily => Rotation::Daily,
        ConfigLogRotation::Hourly => Rotation::Hourly,
        ConfigLogRotation::Never => Rotation::Never,
    };

    init_logging(&config.log_level, config.log_directory.as_deref(), rotation)?;

    info!("dumpkeeper v{} starting", env!("CARGO_PKG_VERSION"));
    if let Some(log_dir) = &config.log_directory {
        info!("file logging enabled: {}", log_dir.display());
    } else {
        info!("console logging only (no log directory configured)");
    }

    let daemon = ServiceDaemon::new(config).await.context("failed to initialize service daemon")?;
    daemon.run().await
}
