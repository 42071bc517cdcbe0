//! Local durable store contract.
//!
//! Repositories and the sync manager talk to the store through
//! [`LocalStore`]; [`SqliteStore`](super::SqliteStore) is the only engine.
//! [`open_store`] hands out one shared handle per database path.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock, Mutex};

use chrono::{DateTime, Utc};
use serde_json::Value;

use super::sqlite::SqliteStore;
use crate::error::{Error, Result};
use crate::model::{QueueCounts, QueueEntry, Record, SyncOperation};

/// Storage operations used by the repositories and the sync manager.
///
/// Calls are synchronous and short; implementations serialize access
/// internally, so callers never hold a store lock across an `.await`.
pub trait LocalStore: Send + Sync {
    // ── Collections ──────────────────────────────────────────

    /// All records in a collection, optionally only those of one owner.
    ///
    /// # Errors
    ///
    /// Returns `Error::UnknownCollection` or a database error.
    fn get_all(&self, collection: &str, owner: Option<&str>) -> Result<Vec<Record>>;

    /// One record by primary key.
    ///
    /// # Errors
    ///
    /// Returns `Error::UnknownCollection` or a database error.
    fn get_by_id(&self, collection: &str, id: &str) -> Result<Option<Record>>;

    /// Insert or replace a record by its id.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidRecord` if the record lacks an id or owner.
    fn put(&self, collection: &str, record: Record) -> Result<Record>;

    /// Remove a record. Removing an absent id succeeds.
    ///
    /// # Errors
    ///
    /// Returns `Error::UnknownCollection` or a database error.
    fn remove(&self, collection: &str, id: &str) -> Result<()>;

    // ── Sync queue ───────────────────────────────────────────

    /// Append a mutation to the queue and return its entry id.
    ///
    /// # Errors
    ///
    /// Returns `Error::UnknownCollection` or a database error.
    fn enqueue(
        &self,
        operation: SyncOperation,
        collection: &str,
        record_id: &str,
        owner: &str,
        payload: &Value,
    ) -> Result<i64>;

    /// Unsynced entries in insertion order.
    ///
    /// # Errors
    ///
    /// Returns a database error.
    fn pending(&self, owner: Option<&str>) -> Result<Vec<QueueEntry>>;

    /// Flag an entry as synced. Already-synced entries keep their timestamp.
    ///
    /// # Errors
    ///
    /// Returns a database error.
    fn mark_synced(&self, entry_id: i64) -> Result<()>;

    /// Count a failed replay and keep its message.
    ///
    /// # Errors
    ///
    /// Returns a database error.
    fn record_failure(&self, entry_id: i64, message: &str) -> Result<()>;

    /// Delete synced entries whose `synced_at` is before `cutoff`.
    ///
    /// # Errors
    ///
    /// Returns a database error.
    fn prune_synced_older_than(&self, cutoff: DateTime<Utc>) -> Result<usize>;

    /// Number of unsynced entries for one record.
    ///
    /// # Errors
    ///
    /// Returns a database error.
    fn pending_count_for(&self, collection: &str, record_id: &str) -> Result<usize>;

    /// Queue totals, optionally for one owner.
    ///
    /// # Errors
    ///
    /// Returns a database error.
    fn queue_counts(&self, owner: Option<&str>) -> Result<QueueCounts>;

    /// Most recent entries first, for inspection.
    ///
    /// # Errors
    ///
    /// Returns a database error.
    fn list_queue(&self, include_synced: bool, limit: usize) -> Result<Vec<QueueEntry>>;
}

static OPEN_STORES: LazyLock<Mutex<HashMap<PathBuf, Arc<SqliteStore>>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

/// Open (or reuse) the store at `path`.
///
/// Repeated calls with the same path return the same handle, so schema
/// setup runs once per process.
///
/// # Errors
///
/// Returns an error if the database cannot be created or migrated.
pub fn open_store(path: &Path) -> Result<Arc<SqliteStore>> {
    let key = std::path::absolute(path)?;

    let mut stores = OPEN_STORES
        .lock()
        .map_err(|_| Error::Store("store registry lock poisoned".to_string()))?;

    if let Some(store) = stores.get(&key) {
        return Ok(Arc::clone(store));
    }

    let store = Arc::new(SqliteStore::open(&key)?);
    stores.insert(key, Arc::clone(&store));
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_open_store_returns_cached_handle() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("offline.db");

        let first = open_store(&path).unwrap();
        let second = open_store(&path).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_open_store_creates_parent_dirs() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("data").join("offline.db");

        open_store(&path).unwrap();
        assert!(path.exists());
    }
}
