//! In-process backend.
//!
//! Keeps rows in memory with the same conflict and not-found behavior as the
//! REST backend. Failures can be injected per call or per record so the
//! queue paths can be exercised without a network.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde_json::Value;

use super::{RemoteBackend, RemoteError, RemoteResult};
use crate::model::{CollectionSchema, Record, SyncOperation};

/// One call observed by the backend, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteCall {
    pub operation: SyncOperation,
    pub collection: String,
    pub id: String,
}

#[derive(Default)]
struct State {
    /// collection -> id -> row
    tables: HashMap<String, BTreeMap<String, Record>>,
    /// Consumed one per call, before any other check
    next_failures: VecDeque<RemoteError>,
    /// Every call touching the id fails until cleared
    record_failures: HashMap<String, RemoteError>,
    calls: Vec<RemoteCall>,
}

/// Remote backend held in memory.
#[derive(Default)]
pub struct MemoryBackend {
    state: Mutex<State>,
    unreachable: AtomicBool,
}

impl MemoryBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make every call fail as unreachable until switched back.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    /// Fail the next call with `err`. Repeated calls queue further failures.
    pub fn fail_next(&self, err: RemoteError) {
        self.state().next_failures.push_back(err);
    }

    /// Fail every call for `id` with `err` until [`clear_failures`](Self::clear_failures).
    pub fn fail_record(&self, id: &str, err: RemoteError) {
        self.state().record_failures.insert(id.to_string(), err);
    }

    /// Drop all injected failures.
    pub fn clear_failures(&self) {
        let mut state = self.state();
        state.next_failures.clear();
        state.record_failures.clear();
    }

    /// Put a row directly, bypassing conflict checks.
    pub fn seed(&self, collection: &str, record: Record) {
        let id = record
            .get("id")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        self.state()
            .tables
            .entry(collection.to_string())
            .or_default()
            .insert(id, record);
    }

    /// One row by id.
    #[must_use]
    pub fn get(&self, collection: &str, id: &str) -> Option<Record> {
        self.state()
            .tables
            .get(collection)
            .and_then(|t| t.get(id).cloned())
    }

    /// All rows of a collection, ordered by id.
    #[must_use]
    pub fn rows(&self, collection: &str) -> Vec<Record> {
        self.state()
            .tables
            .get(collection)
            .map(|t| t.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Calls made so far.
    #[must_use]
    pub fn calls(&self) -> Vec<RemoteCall> {
        self.state().calls.clone()
    }

    /// Record the call and return any injected failure for it.
    fn begin(
        &self,
        operation: SyncOperation,
        schema: &CollectionSchema,
        id: &str,
    ) -> RemoteResult<MutexGuard<'_, State>> {
        let mut state = self.state();
        state.calls.push(RemoteCall {
            operation,
            collection: schema.name.to_string(),
            id: id.to_string(),
        });

        if self.unreachable.load(Ordering::SeqCst) {
            return Err(RemoteError::Unreachable("memory backend offline".to_string()));
        }
        if let Some(err) = state.next_failures.pop_front() {
            return Err(err);
        }
        if let Some(err) = state.record_failures.get(id) {
            return Err(err.clone());
        }
        Ok(state)
    }
}

fn owned_by(schema: &CollectionSchema, row: &Record, owner: &str) -> bool {
    schema.record_owner(row) == Some(owner)
}

impl RemoteBackend for MemoryBackend {
    async fn insert(&self, schema: &CollectionSchema, record: &Record) -> RemoteResult<()> {
        let id = schema
            .record_id(record)
            .ok_or_else(|| RemoteError::Rejected {
                status: 400,
                message: "record has no id".to_string(),
            })?
            .to_string();

        let mut state = self.begin(SyncOperation::Create, schema, &id)?;
        let table = state.tables.entry(schema.name.to_string()).or_default();
        if table.contains_key(&id) {
            return Err(RemoteError::Conflict { id });
        }
        table.insert(id, record.clone());
        Ok(())
    }

    async fn update(
        &self,
        schema: &CollectionSchema,
        id: &str,
        owner: &str,
        fields: &Record,
    ) -> RemoteResult<()> {
        let mut state = self.begin(SyncOperation::Update, schema, id)?;
        let row = state
            .tables
            .get_mut(schema.name)
            .and_then(|t| t.get_mut(id))
            .filter(|row| owned_by(schema, row, owner))
            .ok_or_else(|| RemoteError::NotFound { id: id.to_string() })?;

        for (key, value) in fields {
            row.insert(key.clone(), value.clone());
        }
        Ok(())
    }

    async fn delete(&self, schema: &CollectionSchema, id: &str, owner: &str) -> RemoteResult<()> {
        let mut state = self.begin(SyncOperation::Delete, schema, id)?;
        let table = state.tables.entry(schema.name.to_string()).or_default();
        if !table.get(id).is_some_and(|row| owned_by(schema, row, owner)) {
            return Err(RemoteError::NotFound { id: id.to_string() });
        }
        table.remove(id);
        Ok(())
    }

    async fn select_all(&self, schema: &CollectionSchema, owner: &str) -> RemoteResult<Vec<Record>> {
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(RemoteError::Unreachable("memory backend offline".to_string()));
        }
        let mut state = self.state();
        if let Some(err) = state.next_failures.pop_front() {
            return Err(err);
        }
        Ok(state
            .tables
            .get(schema.name)
            .map(|t| {
                t.values()
                    .filter(|row| owned_by(schema, row, owner))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn is_reachable(&self) -> bool {
        !self.unreachable.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::record::TASKS;
    use serde_json::json;

    fn row(id: &str, owner: &str) -> Record {
        json!({"id": id, "user_id": owner, "title": "x"})
            .as_object()
            .unwrap()
            .clone()
    }

    #[tokio::test]
    async fn test_insert_conflict_on_duplicate_id() {
        let backend = MemoryBackend::new();
        backend.insert(&TASKS, &row("t1", "u1")).await.unwrap();
        assert_eq!(
            backend.insert(&TASKS, &row("t1", "u1")).await,
            Err(RemoteError::Conflict { id: "t1".into() })
        );
        assert_eq!(backend.rows("tasks").len(), 1);
    }

    #[tokio::test]
    async fn test_update_and_delete_are_owner_scoped() {
        let backend = MemoryBackend::new();
        backend.seed("tasks", row("t1", "u1"));

        let fields = json!({"title": "y"}).as_object().unwrap().clone();
        assert!(matches!(
            backend.update(&TASKS, "t1", "u2", &fields).await,
            Err(RemoteError::NotFound { .. })
        ));
        backend.update(&TASKS, "t1", "u1", &fields).await.unwrap();
        assert_eq!(backend.get("tasks", "t1").unwrap()["title"], "y");

        assert!(backend.delete(&TASKS, "t1", "u2").await.is_err());
        backend.delete(&TASKS, "t1", "u1").await.unwrap();
        assert!(matches!(
            backend.delete(&TASKS, "t1", "u1").await,
            Err(RemoteError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_injected_failures() {
        let backend = MemoryBackend::new();
        backend.fail_next(RemoteError::Server {
            status: 503,
            message: "busy".into(),
        });
        assert!(backend.insert(&TASKS, &row("t1", "u1")).await.is_err());
        backend.insert(&TASKS, &row("t1", "u1")).await.unwrap();

        backend.fail_record("t2", RemoteError::Rejected {
            status: 400,
            message: "bad".into(),
        });
        assert!(backend.insert(&TASKS, &row("t2", "u1")).await.is_err());
        assert!(backend.insert(&TASKS, &row("t2", "u1")).await.is_err());
        backend.clear_failures();
        backend.insert(&TASKS, &row("t2", "u1")).await.unwrap();

        backend.set_unreachable(true);
        assert!(!backend.is_reachable().await);
        assert!(backend.select_all(&TASKS, "u1").await.unwrap_err().is_transient());
    }

    #[tokio::test]
    async fn test_select_all_filters_owner_and_logs_calls() {
        let backend = MemoryBackend::new();
        backend.insert(&TASKS, &row("t1", "u1")).await.unwrap();
        backend.insert(&TASKS, &row("t2", "u2")).await.unwrap();

        assert_eq!(backend.select_all(&TASKS, "u1").await.unwrap().len(), 1);
        assert_eq!(backend.calls().len(), 2);
        assert_eq!(backend.calls()[0].operation, SyncOperation::Create);
    }
}
