use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

use practice_core::model::{HistoryItem, SessionSnapshot, WordlistId};
use practice_core::time::Clock;

use crate::kv::{InMemoryStore, KeyValueStore};

/// Most recent completed sessions kept in the history log.
pub const HISTORY_MAX_ITEMS: usize = 50;
/// History entries older than this are dropped on read and swept eagerly.
pub const HISTORY_MAX_AGE_DAYS: i64 = 90;
/// A snapshot older than this is stale; restore deletes it instead of
/// handing it back.
pub const SNAPSHOT_MAX_AGE_HOURS: i64 = 24;

const SNAPSHOT_KEY: &str = "practice.session.current";
const HISTORY_KEY: &str = "practice.session.history";

/// Everything the store knows, bundled for backup and transfer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PracticeExport {
    pub current_session: Option<SessionSnapshot>,
    pub history: Vec<HistoryItem>,
    pub exported_at: DateTime<Utc>,
}

/// Snapshot and history persistence over a synchronous key-value backend.
///
/// Two independently-keyed records: the single in-flight snapshot and the
/// ordered history list (newest first). Every operation catches backend
/// failures and degrades; callers see `false`, `None`, or an empty list,
/// never an error.
#[derive(Clone)]
pub struct SessionStore {
    kv: Arc<dyn KeyValueStore>,
    clock: Clock,
}

impl SessionStore {
    #[must_use]
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self {
            kv,
            clock: Clock::default(),
        }
    }

    /// Override the clock (deterministic expiry tests).
    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryStore::new()))
    }

    //
    // ─── SNAPSHOT ──────────────────────────────────────────────────────────────
    //

    /// Persist the in-flight snapshot, overwriting any prior one.
    ///
    /// Returns false when serialization or the backend fails; in-memory
    /// session state is unaffected either way.
    pub fn save_snapshot(&self, snapshot: &SessionSnapshot) -> bool {
        let Ok(blob) = serde_json::to_string(snapshot) else {
            warn!("session snapshot failed to serialize");
            return false;
        };
        match self.kv.set(SNAPSHOT_KEY, &blob) {
            Ok(()) => true,
            Err(err) => {
                warn!(%err, "session snapshot not persisted");
                false
            }
        }
    }

    /// Restore the in-flight snapshot, if one exists and is still fresh.
    ///
    /// A snapshot older than [`SNAPSHOT_MAX_AGE_HOURS`] is deleted here as a
    /// side effect and never handed back. Malformed blobs read as absent.
    #[must_use]
    pub fn restore_snapshot(&self) -> Option<SessionSnapshot> {
        let blob = match self.kv.get(SNAPSHOT_KEY) {
            Ok(Some(blob)) => blob,
            Ok(None) => return None,
            Err(err) => {
                warn!(%err, "snapshot read failed");
                return None;
            }
        };
        let snapshot: SessionSnapshot = match serde_json::from_str(&blob) {
            Ok(snapshot) => snapshot,
            Err(err) => {
                debug!(%err, "ignoring malformed snapshot");
                return None;
            }
        };

        let age = self.clock.now().signed_duration_since(snapshot.state.started_at);
        if age > Duration::hours(SNAPSHOT_MAX_AGE_HOURS) {
            self.clear_snapshot();
            return None;
        }
        Some(snapshot)
    }

    /// Remove the current snapshot unconditionally.
    pub fn clear_snapshot(&self) {
        if let Err(err) = self.kv.remove(SNAPSHOT_KEY) {
            warn!(%err, "snapshot not cleared");
        }
    }

    //
    // ─── HISTORY ───────────────────────────────────────────────────────────────
    //

    /// Prepend one completed session, keeping only the
    /// [`HISTORY_MAX_ITEMS`] most recent (oldest dropped first).
    pub fn append_history(&self, item: HistoryItem) -> bool {
        let mut items = self.read_history_raw();
        items.insert(0, item);
        items.truncate(HISTORY_MAX_ITEMS);
        self.write_history(&items)
    }

    /// History entries, newest first, with the
    /// [`HISTORY_MAX_AGE_DAYS`] age filter applied. Optionally narrowed to
    /// one word list.
    #[must_use]
    pub fn query_history(&self, wordlist_id: Option<&WordlistId>) -> Vec<HistoryItem> {
        let cutoff = self.age_cutoff();
        self.read_history_raw()
            .into_iter()
            .filter(|item| item.completed_at >= cutoff)
            .filter(|item| wordlist_id.is_none_or(|id| &item.wordlist_id == id))
            .collect()
    }

    /// Delete every entry completed at exactly `completed_at`.
    ///
    /// History items carry no id of their own, so colliding timestamps all
    /// go together. Accepted limitation.
    pub fn delete_history_item(&self, completed_at: DateTime<Utc>) -> bool {
        let mut items = self.read_history_raw();
        items.retain(|item| item.completed_at != completed_at);
        self.write_history(&items)
    }

    /// Drop the whole history list.
    pub fn clear_history(&self) {
        if let Err(err) = self.kv.remove(HISTORY_KEY) {
            warn!(%err, "history not cleared");
        }
    }

    /// Apply the age filter eagerly and persist the pruned list.
    ///
    /// Reads already filter; this keeps the stored blob from accumulating
    /// stale entries. Run at process start and hourly (see the services
    /// crate's sweeper).
    pub fn sweep_history(&self) -> bool {
        let cutoff = self.age_cutoff();
        let items: Vec<HistoryItem> = self
            .read_history_raw()
            .into_iter()
            .filter(|item| item.completed_at >= cutoff)
            .collect();
        self.write_history(&items)
    }

    //
    // ─── EXPORT / IMPORT ───────────────────────────────────────────────────────
    //

    /// Bundle the snapshot and history for backup.
    #[must_use]
    pub fn export(&self) -> PracticeExport {
        PracticeExport {
            current_session: self.restore_snapshot(),
            history: self.query_history(None),
            exported_at: self.clock.now(),
        }
    }

    /// Serialized form of [`SessionStore::export`].
    #[must_use]
    pub fn export_json(&self) -> Option<String> {
        serde_json::to_string(&self.export()).ok()
    }

    /// Replace both records with the contents of an exported blob.
    ///
    /// The blob is parsed and validated before anything is written; invalid
    /// input returns false and leaves the store untouched.
    pub fn import_json(&self, blob: &str) -> bool {
        let export: PracticeExport = match serde_json::from_str(blob) {
            Ok(export) => export,
            Err(err) => {
                debug!(%err, "import rejected: malformed blob");
                return false;
            }
        };

        let mut ok = true;
        match &export.current_session {
            Some(snapshot) => ok &= self.save_snapshot(snapshot),
            None => self.clear_snapshot(),
        }
        ok &= self.write_history(&export.history);
        ok
    }

    fn age_cutoff(&self) -> DateTime<Utc> {
        self.clock.now() - Duration::days(HISTORY_MAX_AGE_DAYS)
    }

    fn read_history_raw(&self) -> Vec<HistoryItem> {
        let blob = match self.kv.get(HISTORY_KEY) {
            Ok(Some(blob)) => blob,
            Ok(None) => return Vec::new(),
            Err(err) => {
                warn!(%err, "history read failed");
                return Vec::new();
            }
        };
        serde_json::from_str(&blob).unwrap_or_else(|err| {
            debug!(%err, "ignoring malformed history");
            Vec::new()
        })
    }

    fn write_history(&self, items: &[HistoryItem]) -> bool {
        let Ok(blob) = serde_json::to_string(items) else {
            warn!("history failed to serialize");
            return false;
        };
        match self.kv.set(HISTORY_KEY, &blob) {
            Ok(()) => true,
            Err(err) => {
                warn!(%err, "history not persisted");
                false
            }
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
