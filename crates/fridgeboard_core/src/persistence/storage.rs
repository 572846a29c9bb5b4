//! Local key/value storage contract and in-memory implementation.
//!
//! # Responsibility
//! - Mirror the synchronous get/set/remove surface of browser local storage.
//! - Report unavailability and quota problems as typed errors.

use crate::db::DbError;
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type StorageResult<T> = Result<T, StorageError>;

/// Storage backend failure.
#[derive(Debug)]
pub enum StorageError {
    /// Storage is disabled or cannot be reached at all.
    Unavailable(String),
    /// A write would exceed the backend's size limit.
    QuotaExceeded { key: String, needed: usize, limit: usize },
    /// SQLite-backed storage failure.
    Db(DbError),
}

impl Display for StorageError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unavailable(message) => write!(f, "storage unavailable: {message}"),
            Self::QuotaExceeded { key, needed, limit } => write!(
                f,
                "storage quota exceeded writing `{key}`: needs {needed} bytes, limit {limit}"
            ),
            Self::Db(err) => write!(f, "{err}"),
        }
    }
}

impl Error for StorageError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for StorageError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StorageError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Synchronous string key/value storage.
pub trait StorageBackend {
    fn get_item(&self, key: &str) -> StorageResult<Option<String>>;
    fn set_item(&self, key: &str, value: &str) -> StorageResult<()>;
    fn remove_item(&self, key: &str) -> StorageResult<()>;
    /// All stored keys, sorted.
    fn keys(&self) -> StorageResult<Vec<String>>;
}

/// In-memory storage with an optional byte quota.
///
/// Quota accounting counts key plus value UTF-8 bytes of every entry.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: RefCell<BTreeMap<String, String>>,
    quota_bytes: Option<usize>,
    available: Cell<bool>,
    writes: Cell<usize>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self {
            available: Cell::new(true),
            ..Self::default()
        }
    }

    pub fn with_quota(quota_bytes: usize) -> Self {
        Self {
            quota_bytes: Some(quota_bytes),
            ..Self::new()
        }
    }

    /// Simulates storage being disabled (or re-enabled).
    pub fn set_available(&self, available: bool) {
        self.available.set(available);
    }

    /// Number of successful `set_item` calls so far.
    pub fn write_count(&self) -> usize {
        self.writes.get()
    }

    pub fn used_bytes(&self) -> usize {
        self.items
            .borrow()
            .iter()
            .map(|(key, value)| key.len() + value.len())
            .sum()
    }

    fn ensure_available(&self) -> StorageResult<()> {
        if self.available.get() {
            Ok(())
        } else {
            Err(StorageError::Unavailable("memory storage disabled".to_string()))
        }
    }
}

impl StorageBackend for MemoryStorage {
    fn get_item(&self, key: &str) -> StorageResult<Option<String>> {
        self.ensure_available()?;
        Ok(self.items.borrow().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> StorageResult<()> {
        self.ensure_available()?;
        if let Some(limit) = self.quota_bytes {
            let existing = self
                .items
                .borrow()
                .get(key)
                .map_or(0, |old| key.len() + old.len());
            let needed = self.used_bytes() - existing + key.len() + value.len();
            if needed > limit {
                return Err(StorageError::QuotaExceeded {
                    key: key.to_string(),
                    needed,
                    limit,
                });
            }
        }
        self.items
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        self.writes.set(self.writes.get() + 1);
        Ok(())
    }

    fn remove_item(&self, key: &str) -> StorageResult<()> {
        self.ensure_available()?;
        self.items.borrow_mut().remove(key);
        Ok(())
    }

    fn keys(&self) -> StorageResult<Vec<String>> {
        self.ensure_available()?;
        Ok(self.items.borrow().keys().cloned().collect())
    }
}

impl<S: StorageBackend + ?Sized> StorageBackend for std::rc::Rc<S> {
    fn get_item(&self, key: &str) -> StorageResult<Option<String>> {
        (**self).get_item(key)
    }

    fn set_item(&self, key: &str, value: &str) -> StorageResult<()> {
        (**self).set_item(key, value)
    }

    fn remove_item(&self, key: &str) -> StorageResult<()> {
        (**self).remove_item(key)
    }

    fn keys(&self) -> StorageResult<Vec<String>> {
        (**self).keys()
    }
}

#[cfg(test)]
mod tests {
    use super::{MemoryStorage, StorageBackend, StorageError};

    #[test]
    fn set_get_remove() {
        let storage = MemoryStorage::new();
        storage.set_item("a", "1").expect("write");
        assert_eq!(storage.get_item("a").expect("read").as_deref(), Some("1"));
        storage.remove_item("a").expect("remove");
        assert_eq!(storage.get_item("a").expect("read"), None);
        assert_eq!(storage.write_count(), 1);
    }

    #[test]
    fn quota_counts_replaced_values_once() {
        let storage = MemoryStorage::with_quota(10);
        storage.set_item("k", "12345").expect("fits");
        storage.set_item("k", "123456789").expect("replacement fits");
        let err = storage.set_item("k2", "x").expect_err("over quota");
        assert!(matches!(err, StorageError::QuotaExceeded { needed: 13, limit: 10, .. }));
    }

    #[test]
    fn disabled_storage_is_unavailable() {
        let storage = MemoryStorage::new();
        storage.set_available(false);
        assert!(matches!(
            storage.get_item("a"),
            Err(StorageError::Unavailable(_))
        ));
    }
}
