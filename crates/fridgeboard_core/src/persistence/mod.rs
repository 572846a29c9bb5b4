//! Persistence of dashboard state to local key/value storage.
//!
//! # Responsibility
//! - Define the synchronous storage contract (`StorageBackend`) and its
//!   in-memory and SQLite implementations.
//! - Load/save whole snapshots as prefixed JSON values (`PersistenceAdapter`).
//! - Debounce saves behind a cancellable timer (`AutoSave`).
//!
//! # Invariants
//! - Stored values carry no version field; shape drift is absorbed by
//!   per-field fallback in the loader.

mod adapter;
mod autosave;
mod sqlite;
mod storage;

pub use adapter::{
    PersistenceAdapter, PersistenceError, PersistenceResult, SnapshotError, CURRENT_USER_KEY,
    MEDICATION_KEY, PERSISTED_FIELDS, TASKS_KEY, WATER_COUNT_KEY,
};
pub use autosave::{save_and_report, AutoSave};
pub use sqlite::SqliteStorage;
pub use storage::{MemoryStorage, StorageBackend, StorageError, StorageResult};
