use tokio::signal::unix::{signal, SignalKind};
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Installs SIGTERM/SIGINT handling, cancelling `cancellation` on either.
/// This is a Unix-only daemon; there is no Windows service path to handle.
pub async fn setup_shutdown_handler(cancellation: CancellationToken) {
    tokio::spawn(async move {
        let mut sigterm = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
        let mut sigint = signal(SignalKind::interrupt()).expect("failed to install SIGINT handler");

        tokio::select! {
            _ = sigterm.recv() => {
                info!("received SIGTERM");
                cancellation.cancel();
            }
            _ = sigint.recv() => {
                info!("received SIGINT");
                cancellation.cancel();
            }
        }
    });
}
