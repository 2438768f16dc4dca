use std::path::Path;
use std::sync::{Mutex, OnceLock};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Kept alive for the process lifetime; dropping it flushes the non-blocking
/// file writer's background thread.
static LOG_GUARD: OnceLock<Mutex<Option<tracing_appender::non_blocking::WorkerGuard>>> = OnceLock::new();

#[derive(Debug, Clone, Copy)]
pub enum Rotation {
    Daily,
    Hourly,
    Never,
}

/// Installs the global subscriber: console always on, optional rotating
/// file output gated by `log_dir`. Call once at process start.
pub fn init_logging(level: &str, log_dir: Option<&Path>, rotation: Rotation) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    let subscriber = tracing_subscriber::registry().with(filter).with(console_layer);

    match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;

            let file_appender = match rotation {
                Rotation::Daily => tracing_appender::rolling::daily(dir, "dumpkeeper.log"),
                Rotation::Hourly => tracing_appender::rolling::hourly(dir, "dumpkeeper.log"),
                Rotation::Never => tracing_appender::rolling::never(dir, "dumpkeeper.log"),
            };
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

            let file_layer = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_target(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true)
                .with_ansi(false);

            subscriber.with(file_layer).init();

            LOG_GUARD
                .set(Mutex::new(Some(guard)))
                .map_err(|_| anyhow::anyhow!("logger already initialized"))?;
        }
        None => subscriber.init(),
    }

    Ok(())
}

/// Flushes and drops the file writer guard, if one was installed. Call once
/// on the way out so buffered log lines aren't lost.
pub fn shutdown_logging() {
    if let Some(mutex) = LOG_GUARD.get() {
        if let Ok(mut guard) = mutex.lock() {
            guard.take();
        }
    }
}
