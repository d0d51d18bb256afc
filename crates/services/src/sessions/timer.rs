use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;

use super::engine::SessionEngine;

/// Recurring one-second drive for a shared [`SessionEngine`].
///
/// The tick task holds the engine only for the duration of each tick and is
/// aborted when this handle drops, so a discarded engine is never mutated by
/// a dangling timer.
pub struct SessionTimer {
    handle: JoinHandle<()>,
}

impl SessionTimer {
    /// Spawn the ticker on the ambient tokio runtime.
    ///
    /// Ticks on paused or untimed sessions are cheap no-ops; the engine
    /// decides whether time advances. The task ends on its own once the
    /// session completes.
    #[must_use]
    pub fn spawn(engine: Arc<Mutex<SessionEngine>>) -> Self {
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(1));
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            // The first interval tick fires immediately; consume it so the
            // first decrement lands a full second after spawn.
            interval.tick().await;
            loop {
                interval.tick().await;
                let Ok(mut engine) = engine.lock() else {
                    return;
                };
                engine.tick();
                if engine.is_completed() {
                    return;
                }
            }
        });
        Self { handle }
    }

    /// Stop ticking now. Dropping the handle does the same.
    pub fn stop(&self) {
        self.handle.abort();
    }
}

impl Drop for SessionTimer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
