//! Entity repositories.
//!
//! A [`Repository`] owns the in-memory view of one collection for one owner
//! and routes every write through the same steps:
//! 1. Validate the resulting entity
//! 2. Persist it in the local store
//! 3. Publish the updated collection to subscribers
//! 4. Push the mutation to the remote, or queue it
//!
//! Entity-specific behavior lives in the submodules and is expressed only
//! through `add`, `update`, and `delete`.

mod daily_syncs;
mod knowledge;
mod notes;
mod tasks;

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use serde_json::Value;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::model::record::{now_timestamp, to_object};
use crate::model::{Entity, Record, SyncOperation};
use crate::remote::RemoteBackend;
use crate::sync::{QueueCause, SyncContext, WriteOutcome, apply_mutation, content_hash};

pub use notes::NotesWorkspace;

/// A committed local write and what happened to its remote push.
#[derive(Debug, Clone, Serialize)]
pub struct Mutation<T> {
    pub record: T,
    pub outcome: WriteOutcome,
}

/// Offline-first repository for one entity type and one owner.
pub struct Repository<T: Entity, R: RemoteBackend> {
    ctx: SyncContext<R>,
    owner: String,
    state: watch::Sender<Vec<T>>,
}

impl<T: Entity, R: RemoteBackend> Repository<T, R> {
    /// Create a repository with an empty in-memory view.
    ///
    /// Call [`load`](Self::load) to populate it.
    #[must_use]
    pub fn new(ctx: SyncContext<R>, owner: impl Into<String>) -> Self {
        let (state, _rx) = watch::channel(Vec::new());
        Self {
            ctx,
            owner: owner.into(),
            state,
        }
    }

    #[must_use]
    pub fn owner_id(&self) -> &str {
        &self.owner
    }

    /// Current in-memory collection, in display order.
    #[must_use]
    pub fn items(&self) -> Vec<T> {
        self.state.borrow().clone()
    }

    /// One item from the in-memory collection.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<T> {
        self.state.borrow().iter().find(|t| t.id() == id).cloned()
    }

    /// Receiver that sees every published collection.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Vec<T>> {
        self.state.subscribe()
    }

    fn collection(&self) -> &'static str {
        T::SCHEMA.name
    }

    fn publish(&self, mut items: Vec<T>) {
        items.sort_by(T::ordering);
        self.state.send_replace(items);
    }

    fn publish_upsert(&self, item: T) {
        self.state.send_modify(|items| {
            match items.iter_mut().find(|t| t.id() == item.id()) {
                Some(existing) => *existing = item,
                None => items.insert(0, item),
            }
            items.sort_by(T::ordering);
        });
    }

    fn publish_remove(&self, id: &str) {
        self.state.send_modify(|items| items.retain(|t| t.id() != id));
    }

    /// Parse stored records, skipping any that no longer match the entity.
    fn parse_all(&self, records: &[Record]) -> Vec<T> {
        records
            .iter()
            .filter_map(|record| match T::from_record(record) {
                Ok(item) => Some(item),
                Err(err) => {
                    warn!(
                        collection = self.collection(),
                        id = T::SCHEMA.record_id(record).unwrap_or("?"),
                        error = %err,
                        "Skipping malformed record"
                    );
                    None
                }
            })
            .collect()
    }

    /// The owner's stored record, or `RecordNotFound`.
    fn current_record(&self, id: &str) -> Result<Record> {
        self.ctx
            .store
            .get_by_id(self.collection(), id)?
            .filter(|record| T::SCHEMA.record_owner(record) == Some(self.owner.as_str()))
            .ok_or_else(|| Error::RecordNotFound {
                collection: self.collection().to_string(),
                id: id.to_string(),
            })
    }

    /// Load the collection: local snapshot first, then the remote if online.
    ///
    /// Remote rows replace local copies whose content differs, even when the
    /// record still has queued changes. Rows whose queued changes end in a
    /// delete stay hidden until the delete replays. Local rows the remote
    /// lacks are dropped unless they are still queued. A remote failure
    /// leaves the local snapshot in place.
    ///
    /// # Errors
    ///
    /// Returns an error only if the local store cannot be read or written.
    pub async fn load(&self) -> Result<Vec<T>> {
        let local_records = self.ctx.store.get_all(self.collection(), Some(&self.owner))?;
        self.publish(self.parse_all(&local_records));

        if !self.ctx.connectivity.is_online() {
            return Ok(self.items());
        }

        let remote_records = match self
            .ctx
            .remote
            .select_all(T::SCHEMA, &self.owner)
            .await
        {
            Ok(rows) => rows,
            Err(err) => {
                warn!(collection = self.collection(), error = %err, "Remote load failed, using local data");
                return Ok(self.items());
            }
        };

        // Last queued operation per record; FIFO order means later entries win.
        let queued: HashMap<String, SyncOperation> = self
            .ctx
            .store
            .pending(Some(&self.owner))?
            .into_iter()
            .filter(|entry| entry.collection_name == self.collection())
            .map(|entry| (entry.record_id, entry.operation))
            .collect();

        let mut merged: Vec<Record> = Vec::with_capacity(remote_records.len());
        let mut seen: HashSet<String> = HashSet::new();
        let mut refreshed = 0usize;

        for remote in remote_records {
            let Some(id) = T::SCHEMA.record_id(&remote).map(str::to_string) else {
                warn!(collection = self.collection(), "Skipping remote row without id");
                continue;
            };
            seen.insert(id.clone());

            if queued.get(&id) == Some(&SyncOperation::Delete) {
                debug!(collection = self.collection(), id = %id, "Remote row awaits a queued delete");
                continue;
            }

            let stored = self.ctx.store.get_by_id(self.collection(), &id)?;
            let changed = stored
                .as_ref()
                .is_none_or(|s| content_hash(s) != content_hash(&remote));
            if changed {
                if queued.contains_key(&id) {
                    info!(
                        collection = self.collection(),
                        id = %id,
                        "Remote version replaces a record with queued changes"
                    );
                }
                self.ctx.store.put(self.collection(), remote.clone())?;
                refreshed += 1;
            }
            merged.push(remote);
        }

        for local in &local_records {
            let Some(id) = T::SCHEMA.record_id(local) else {
                continue;
            };
            if seen.contains(id) {
                continue;
            }
            if queued.contains_key(id) {
                merged.push(local.clone());
            } else {
                self.ctx.store.remove(self.collection(), id)?;
            }
        }

        debug!(
            collection = self.collection(),
            total = merged.len(),
            refreshed,
            "Loaded remote collection"
        );
        self.publish(self.parse_all(&merged));
        Ok(self.items())
    }

    /// Same as [`load`](Self::load).
    ///
    /// # Errors
    ///
    /// See [`load`](Self::load).
    pub async fn reload(&self) -> Result<Vec<T>> {
        self.load().await
    }

    /// Create a record from a draft.
    ///
    /// The draft supplies entity fields; id, owner, and timestamps are
    /// assigned here.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidRecord` if the result fails validation, or a
    /// store error. Remote failures never surface here.
    pub async fn add<D: Serialize>(&self, draft: &D) -> Result<Mutation<T>> {
        let mut record = to_object(draft)?;
        let now = now_timestamp();
        record.insert(
            T::SCHEMA.id_field.to_string(),
            Value::String(uuid::Uuid::new_v4().to_string()),
        );
        record.insert(
            T::SCHEMA.owner_field.to_string(),
            Value::String(self.owner.clone()),
        );
        record.insert("created_at".to_string(), Value::String(now.clone()));
        record.insert("updated_at".to_string(), Value::String(now));

        let item = T::from_record(&record)?;
        item.validate()?;
        let record = item.to_record()?;

        self.ctx.store.put(self.collection(), record.clone())?;
        self.publish_upsert(item.clone());

        let outcome = self
            .push(SyncOperation::Create, item.id(), Value::Object(record))
            .await?;
        Ok(Mutation {
            record: item,
            outcome,
        })
    }

    /// Apply a partial update.
    ///
    /// Only the patched fields (plus `updated_at`) are sent to the remote.
    ///
    /// # Errors
    ///
    /// Returns `Error::RecordNotFound` for an unknown id,
    /// `Error::InvalidArgument` if the patch touches the id, owner, or
    /// creation time, and `Error::InvalidRecord` if the merged record fails
    /// validation.
    pub async fn update<P: Serialize>(&self, id: &str, patch: &P) -> Result<Mutation<T>> {
        let mut patch = to_object(patch)?;
        for key in T::SCHEMA.immutable_fields() {
            if patch.contains_key(key) {
                return Err(Error::InvalidArgument(format!(
                    "field '{key}' cannot be updated"
                )));
            }
        }

        let mut record = self.current_record(id)?;
        patch.insert("updated_at".to_string(), Value::String(now_timestamp()));
        for (key, value) in &patch {
            record.insert(key.clone(), value.clone());
        }

        let item = T::from_record(&record)?;
        item.validate()?;

        self.ctx.store.put(self.collection(), item.to_record()?)?;
        self.publish_upsert(item.clone());

        let outcome = self
            .push(SyncOperation::Update, id, Value::Object(patch))
            .await?;
        Ok(Mutation {
            record: item,
            outcome,
        })
    }

    /// Delete a record.
    ///
    /// # Errors
    ///
    /// Returns `Error::RecordNotFound` if the owner has no such record.
    pub async fn delete(&self, id: &str) -> Result<WriteOutcome> {
        self.current_record(id)?;

        self.ctx.store.remove(self.collection(), id)?;
        self.publish_remove(id);

        self.push(
            SyncOperation::Delete,
            id,
            Value::Object(serde_json::Map::new()),
        )
        .await
    }

    /// Send a mutation to the remote, or queue it.
    async fn push(&self, operation: SyncOperation, id: &str, payload: Value) -> Result<WriteOutcome> {
        let collection = self.collection();

        let cause = if !self.ctx.connectivity.is_online() {
            QueueCause::Offline
        } else if self.ctx.store.pending_count_for(collection, id)? > 0 {
            QueueCause::PendingPredecessor
        } else {
            match apply_mutation(
                self.ctx.remote.as_ref(),
                T::SCHEMA,
                operation,
                id,
                &self.owner,
                &payload,
            )
            .await
            {
                Ok(()) => {
                    debug!(collection, id, operation = operation.as_str(), "Remote write committed");
                    return Ok(WriteOutcome::Committed);
                }
                Err(err) if err.is_transient() => QueueCause::Transient(err.to_string()),
                Err(err) => QueueCause::Rejected(err.to_string()),
            }
        };

        let entry_id = self
            .ctx
            .store
            .enqueue(operation, collection, id, &self.owner, &payload)?;
        info!(
            collection,
            id,
            operation = operation.as_str(),
            entry = entry_id,
            cause = ?cause,
            "Write queued for sync"
        );
        Ok(WriteOutcome::Queued { entry_id, cause })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{NewTask, Quadrant, Task, TaskPatch, TaskStatus};
    use crate::remote::{MemoryBackend, RemoteError};
    use crate::storage::{LocalStore, SqliteStore};
    use crate::sync::Connectivity;
    use serde_json::json;
    use std::sync::Arc;

    struct Fixture {
        repo: Repository<Task, MemoryBackend>,
        store: Arc<SqliteStore>,
        remote: Arc<MemoryBackend>,
        connectivity: Connectivity,
    }

    fn fixture(online: bool) -> Fixture {
        let store = Arc::new(SqliteStore::open_memory().unwrap());
        let remote = Arc::new(MemoryBackend::new());
        let connectivity = Connectivity::new(online);
        let ctx = SyncContext::new(store.clone(), remote.clone(), connectivity.clone());
        Fixture {
            repo: Repository::new(ctx, "u1"),
            store,
            remote,
            connectivity,
        }
    }

    fn new_task(title: &str) -> NewTask {
        NewTask {
            title: title.into(),
            quadrant: Quadrant::Schedule,
            energy: 2,
            duration: 25,
            status: TaskStatus::Pending,
            due: String::new(),
        }
    }

    #[tokio::test]
    async fn test_add_online_commits() {
        let f = fixture(true);
        let m = f.repo.add(&new_task("Plan week")).await.unwrap();

        assert_eq!(m.outcome, WriteOutcome::Committed);
        assert_eq!(m.record.user_id, "u1");
        assert!(f.remote.get("tasks", &m.record.id).is_some());
        assert!(f.store.get_by_id("tasks", &m.record.id).unwrap().is_some());
        assert!(f.store.pending(None).unwrap().is_empty());
        assert_eq!(f.repo.items().len(), 1);
    }

    #[tokio::test]
    async fn test_add_offline_queues_create() {
        let f = fixture(false);
        let m = f.repo.add(&new_task("Plan week")).await.unwrap();

        assert!(matches!(
            m.outcome,
            WriteOutcome::Queued {
                cause: QueueCause::Offline,
                ..
            }
        ));
        let pending = f.store.pending(Some("u1")).unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].operation, SyncOperation::Create);
        assert_eq!(pending[0].payload["title"], "Plan week");
        assert!(f.remote.calls().is_empty());
    }

    #[tokio::test]
    async fn test_transient_and_rejected_failures_queue() {
        let f = fixture(true);
        f.remote.fail_next(RemoteError::Server {
            status: 503,
            message: "busy".into(),
        });
        let m = f.repo.add(&new_task("a")).await.unwrap();
        assert!(matches!(
            m.outcome,
            WriteOutcome::Queued {
                cause: QueueCause::Transient(_),
                ..
            }
        ));

        f.remote.fail_next(RemoteError::Rejected {
            status: 403,
            message: "denied".into(),
        });
        let m = f.repo.add(&new_task("b")).await.unwrap();
        assert!(matches!(
            m.outcome,
            WriteOutcome::Queued {
                cause: QueueCause::Rejected(_),
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_pending_predecessor_forces_queue() {
        let f = fixture(false);
        let m = f.repo.add(&new_task("a")).await.unwrap();
        f.connectivity.set_online(true);

        let patch = TaskPatch {
            title: Some("renamed".into()),
            ..Default::default()
        };
        let updated = f.repo.update(&m.record.id, &patch).await.unwrap();
        assert!(matches!(
            updated.outcome,
            WriteOutcome::Queued {
                cause: QueueCause::PendingPredecessor,
                ..
            }
        ));
        assert!(f.remote.calls().is_empty());
    }

    #[tokio::test]
    async fn test_update_sends_only_patched_fields() {
        let f = fixture(false);
        let m = f.repo.add(&new_task("a")).await.unwrap();
        let patch = TaskPatch {
            energy: Some(5),
            ..Default::default()
        };
        let updated = f.repo.update(&m.record.id, &patch).await.unwrap();

        assert_eq!(updated.record.energy, 5);
        assert_eq!(updated.record.title, "a");
        assert_eq!(updated.record.created_at, m.record.created_at);

        let pending = f.store.pending(None).unwrap();
        let payload = pending[1].payload.as_object().unwrap();
        let mut keys: Vec<_> = payload.keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(keys, ["energy", "updated_at"]);
    }

    #[tokio::test]
    async fn test_update_rejects_immutable_and_unknown() {
        let f = fixture(true);
        let m = f.repo.add(&new_task("a")).await.unwrap();

        let err = f
            .repo
            .update(&m.record.id, &json!({"user_id": "u2"}))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));

        let err = f.repo.update("nope", &json!({"title": "x"})).await.unwrap_err();
        assert!(matches!(err, Error::RecordNotFound { .. }));
    }

    #[tokio::test]
    async fn test_invalid_draft_writes_nothing() {
        let f = fixture(true);
        let mut draft = new_task("a");
        draft.energy = 9;
        assert!(matches!(
            f.repo.add(&draft).await,
            Err(Error::InvalidRecord { .. })
        ));
        assert!(f.store.get_all("tasks", None).unwrap().is_empty());
        assert!(f.repo.items().is_empty());
        assert!(f.remote.calls().is_empty());
    }

    #[tokio::test]
    async fn test_delete_removes_and_pushes() {
        let f = fixture(true);
        let m = f.repo.add(&new_task("a")).await.unwrap();

        let outcome = f.repo.delete(&m.record.id).await.unwrap();
        assert!(outcome.is_committed());
        assert!(f.repo.items().is_empty());
        assert!(f.store.get_by_id("tasks", &m.record.id).unwrap().is_none());
        assert!(f.remote.rows("tasks").is_empty());

        assert!(matches!(
            f.repo.delete(&m.record.id).await,
            Err(Error::RecordNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_load_offline_returns_local_snapshot() {
        let f = fixture(false);
        f.repo.add(&new_task("a")).await.unwrap();

        let other = Repository::<Task, MemoryBackend>::new(
            SyncContext::new(f.store.clone(), f.remote.clone(), f.connectivity.clone()),
            "u1",
        );
        let items = other.load().await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "a");
    }

    #[tokio::test]
    async fn test_load_remote_wins_for_clean_records() {
        let f = fixture(true);
        let m = f.repo.add(&new_task("local title")).await.unwrap();

        let mut remote_row = f.remote.get("tasks", &m.record.id).unwrap();
        remote_row.insert("title".into(), json!("remote title"));
        f.remote.seed("tasks", remote_row);

        let items = f.repo.load().await.unwrap();
        assert_eq!(items[0].title, "remote title");
        let stored = f.store.get_by_id("tasks", &m.record.id).unwrap().unwrap();
        assert_eq!(stored["title"], "remote title");
    }

    #[tokio::test]
    async fn test_load_keeps_queued_local_records() {
        let f = fixture(false);
        let m = f.repo.add(&new_task("offline only")).await.unwrap();
        f.connectivity.set_online(true);

        let items = f.repo.load().await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, m.record.id);
    }

    #[tokio::test]
    async fn test_load_remote_replaces_queued_update() {
        let f = fixture(true);
        let m = f.repo.add(&new_task("v1")).await.unwrap();

        f.connectivity.set_online(false);
        let patch = TaskPatch {
            title: Some("offline edit".into()),
            ..Default::default()
        };
        f.repo.update(&m.record.id, &patch).await.unwrap();

        let mut remote_row = f.remote.get("tasks", &m.record.id).unwrap();
        remote_row.insert("title".into(), json!("server edit"));
        remote_row.insert("updated_at".into(), json!("2999-01-01T00:00:00Z"));
        f.remote.seed("tasks", remote_row);
        f.connectivity.set_online(true);

        let items = f.repo.load().await.unwrap();
        assert_eq!(items[0].title, "server edit");
        let stored = f.store.get_by_id("tasks", &m.record.id).unwrap().unwrap();
        assert_eq!(stored["title"], "server edit");
        // The queued update is still waiting to replay.
        assert_eq!(f.store.pending_count_for("tasks", &m.record.id).unwrap(), 1);
    }

    #[tokio::test]
    async fn test_load_hides_row_with_queued_delete() {
        let f = fixture(true);
        let m = f.repo.add(&new_task("doomed")).await.unwrap();

        f.connectivity.set_online(false);
        f.repo.delete(&m.record.id).await.unwrap();
        f.connectivity.set_online(true);

        assert!(f.repo.load().await.unwrap().is_empty());
        assert!(f.repo.get(&m.record.id).is_none());
        assert!(f.store.get_by_id("tasks", &m.record.id).unwrap().is_none());
        assert!(f.remote.get("tasks", &m.record.id).is_some());
    }

    #[tokio::test]
    async fn test_load_drops_rows_deleted_remotely() {
        let f = fixture(true);
        let m = f.repo.add(&new_task("gone soon")).await.unwrap();
        f.remote.delete(&crate::model::record::TASKS, &m.record.id, "u1").await.unwrap();

        assert!(f.repo.load().await.unwrap().is_empty());
        assert!(f.store.get_by_id("tasks", &m.record.id).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_load_remote_failure_keeps_local() {
        let f = fixture(true);
        f.repo.add(&new_task("a")).await.unwrap();
        f.remote.set_unreachable(true);

        let items = f.repo.load().await.unwrap();
        assert_eq!(items.len(), 1);
    }

    #[tokio::test]
    async fn test_subscribers_see_published_state() {
        let f = fixture(false);
        let mut rx = f.repo.subscribe();
        f.repo.add(&new_task("a")).await.unwrap();

        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().len(), 1);
    }
}
