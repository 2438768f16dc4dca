use std::sync::Arc;

use anyhow::Result;
use tracing::warn;

use crate::store::ConfigStore;

/// Startup-only: flips any backup stuck in `running` since before the
/// process died back to `failed`. No backup should stay `running` forever
/// across a restart; the Config Store row is the recovery signal rather
/// than a stray local file.
pub struct RecoveryManager {
    store: Arc<ConfigStore>,
}

impl RecoveryManager {
    pub fn new(store: Arc<ConfigStore>) -> Self {
        Self { store }
    }

    pub async fn reconcile(&self, grace_window: chrono::Duration) -> Result<u64> {
        let reconciled = self.store.reconcile_interrupted_backups(grace_window).await?;
        if reconciled > 0 {
            warn!("reconciled {reconciled} backup(s) left running across a restart");
        }
        Ok(reconciled)
    }
}
