//! Background upkeep for the durable store.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::debug;

use storage::SessionStore;

const SWEEP_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Recurring history sweep: once at spawn, then hourly, pruning entries past
/// the retention window from the stored blob. Aborted when the handle drops.
pub struct HistorySweeper {
    handle: JoinHandle<()>,
}

impl HistorySweeper {
    /// Spawn the sweeper on the ambient tokio runtime.
    #[must_use]
    pub fn spawn(store: SessionStore) -> Self {
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(SWEEP_INTERVAL);
            loop {
                // The first interval tick fires immediately, which doubles
                // as the process-start sweep.
                interval.tick().await;
                if !store.sweep_history() {
                    debug!("history sweep skipped; storage unavailable");
                }
            }
        });
        Self { handle }
    }

    /// Stop sweeping now. Dropping the handle does the same.
    pub fn stop(&self) {
        self.handle.abort();
    }
}

impl Drop for HistorySweeper {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
