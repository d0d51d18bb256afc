use std::sync::Arc;
use tracing::{debug, warn};

use practice_core::model::QueuedMistake;

use crate::kv::KeyValueStore;

const QUEUE_KEY: &str = "practice.mistakes.queue";

/// Durable FIFO of mistake reports whose delivery failed, persisted as one
/// JSON blob. Every mutation writes through immediately so a crash between
/// retries loses nothing.
#[derive(Clone)]
pub struct MistakeQueue {
    kv: Arc<dyn KeyValueStore>,
}

impl MistakeQueue {
    #[must_use]
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    /// Queued mistakes, oldest first. Backend failures and malformed blobs
    /// read as empty.
    #[must_use]
    pub fn load(&self) -> Vec<QueuedMistake> {
        let blob = match self.kv.get(QUEUE_KEY) {
            Ok(Some(blob)) => blob,
            Ok(None) => return Vec::new(),
            Err(err) => {
                warn!(%err, "mistake queue read failed");
                return Vec::new();
            }
        };
        serde_json::from_str(&blob).unwrap_or_else(|err| {
            debug!(%err, "ignoring malformed mistake queue");
            Vec::new()
        })
    }

    /// Append one failed report and persist immediately.
    pub fn push(&self, mistake: QueuedMistake) -> bool {
        let mut items = self.load();
        items.push(mistake);
        self.store(&items)
    }

    /// Replace the queue contents, typically with the survivors of a drain
    /// pass.
    pub fn replace(&self, items: &[QueuedMistake]) -> bool {
        self.store(items)
    }

    /// Drop everything.
    pub fn clear(&self) {
        if let Err(err) = self.kv.remove(QUEUE_KEY) {
            warn!(%err, "mistake queue not cleared");
        }
    }

    fn store(&self, items: &[QueuedMistake]) -> bool {
        let Ok(blob) = serde_json::to_string(items) else {
            warn!("mistake queue failed to serialize");
            return false;
        };
        match self.kv.set(QUEUE_KEY, &blob) {
            Ok(()) => true,
            Err(err) => {
                warn!(%err, "mistake queue not persisted");
                false
            }
        }
    }
}
