//! Durable records for the practice engine over a synchronous key-value
//! backend: the resumable session snapshot, the bounded history log, and the
//! offline mistake queue.
//!
//! Every operation here degrades instead of propagating: a broken backend
//! means writes report `false` and reads report empty, never a panic.

#![forbid(unsafe_code)]

pub mod kv;
pub mod mistake_queue;
pub mod session_store;

pub use kv::{FileStore, InMemoryStore, KeyValueStore, NullStore, StorageError};
pub use mistake_queue::MistakeQueue;
pub use session_store::{
    PracticeExport, SessionStore, HISTORY_MAX_AGE_DAYS, HISTORY_MAX_ITEMS, SNAPSHOT_MAX_AGE_HOURS,
};
