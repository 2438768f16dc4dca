pub mod daemon;
pub mod recovery;
pub mod signals;

pub use daemon::ServiceDaemon;
pub use recovery::RecoveryManager;
pub use signals::setup_shutdown_handler;
