//! Queue drain and connectivity listener.
//!
//! The manager replays an owner's pending queue entries in insertion order.
//! Only one drain runs at a time per store and owner, across every manager in
//! the process; a second call while one is in progress returns immediately.

use std::collections::HashSet;
use std::sync::{Arc, LazyLock, Mutex, PoisonError};

use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::context::SyncContext;
use super::replay::apply_mutation;
use super::types::{DrainOutcome, DrainStats, RecordSyncStatus};
use crate::error::Result;
use crate::model::schema_for;
use crate::remote::{RemoteBackend, RemoteError};

/// Default retention for synced queue entries, in hours.
pub const DEFAULT_RETENTION_HOURS: i64 = 24;

/// Store address and owner id of one drain.
type DrainKey = (usize, String);

/// Drains in progress in this process.
static ACTIVE_DRAINS: LazyLock<Mutex<HashSet<DrainKey>>> =
    LazyLock::new(|| Mutex::new(HashSet::new()));

fn active_drains() -> std::sync::MutexGuard<'static, HashSet<DrainKey>> {
    ACTIVE_DRAINS.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Releases the drain slot when a drain ends, however it ends.
struct DrainGuard {
    key: DrainKey,
}

impl DrainGuard {
    fn acquire(key: DrainKey) -> Option<Self> {
        active_drains().insert(key.clone()).then_some(Self { key })
    }
}

impl Drop for DrainGuard {
    fn drop(&mut self) {
        active_drains().remove(&self.key);
    }
}

struct Inner<R> {
    ctx: SyncContext<R>,
    owner: String,
    retention: chrono::Duration,
    /// (collection, record id) of the entry being replayed
    in_flight: Mutex<Option<(String, String)>>,
    drains: watch::Sender<u64>,
}

/// Replays the sync queue for one owner.
pub struct SyncManager<R> {
    inner: Arc<Inner<R>>,
}

impl<R> Clone for SyncManager<R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<R: RemoteBackend> SyncManager<R> {
    #[must_use]
    pub fn new(ctx: SyncContext<R>, owner: impl Into<String>, retention: chrono::Duration) -> Self {
        let (drains, _rx) = watch::channel(0);
        Self {
            inner: Arc::new(Inner {
                ctx,
                owner: owner.into(),
                retention,
                in_flight: Mutex::new(None),
                drains,
            }),
        }
    }

    #[must_use]
    pub fn owner_id(&self) -> &str {
        &self.inner.owner
    }

    /// Whether a drain is running for this store and owner, from any manager.
    #[must_use]
    pub fn is_running(&self) -> bool {
        active_drains().contains(&self.drain_key())
    }

    fn drain_key(&self) -> DrainKey {
        let store = Arc::as_ptr(&self.inner.ctx.store).cast::<()>().addr();
        (store, self.inner.owner.clone())
    }

    /// Counter of completed drains, bumped after each one finishes.
    #[must_use]
    pub fn subscribe_drains(&self) -> watch::Receiver<u64> {
        self.inner.drains.subscribe()
    }

    fn set_in_flight(&self, entry: Option<(String, String)>) {
        *self
            .inner
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = entry;
    }

    /// Drain the owner's pending queue against the remote.
    ///
    /// Entries replay oldest first. After an entry fails, later entries for
    /// the same record are skipped for the rest of this drain. The drain stops
    /// early, leaving the rest deferred, when connectivity drops or the remote
    /// is unreachable. Synced entries older than the retention window are
    /// pruned at the end.
    ///
    /// # Errors
    ///
    /// Returns an error only for local store failures.
    pub async fn process_queue(&self) -> Result<DrainOutcome> {
        let inner = &self.inner;
        if !inner.ctx.connectivity.is_online() {
            return Ok(DrainOutcome::Offline);
        }
        let Some(_guard) = DrainGuard::acquire(self.drain_key()) else {
            debug!("Sync already in progress");
            return Ok(DrainOutcome::AlreadyRunning);
        };

        let entries = inner.ctx.store.pending(Some(&inner.owner))?;
        let total = entries.len();
        let mut stats = DrainStats::default();
        let mut blocked: HashSet<(String, String)> = HashSet::new();

        if total > 0 {
            info!(owner = %inner.owner, pending = total, "Processing sync queue");
        }

        for (index, entry) in entries.iter().enumerate() {
            if !inner.ctx.connectivity.is_online() {
                stats.deferred = total - index;
                info!(deferred = stats.deferred, "Connectivity lost, deferring remaining entries");
                break;
            }

            let key = (entry.collection_name.clone(), entry.record_id.clone());
            if blocked.contains(&key) {
                stats.blocked += 1;
                continue;
            }

            let schema = match schema_for(&entry.collection_name) {
                Ok(schema) => schema,
                Err(err) => {
                    warn!(entry = entry.id, error = %err, "Skipping queue entry");
                    inner.ctx.store.record_failure(entry.id, &err.to_string())?;
                    stats.failed += 1;
                    blocked.insert(key);
                    continue;
                }
            };

            self.set_in_flight(Some(key.clone()));
            let result = apply_mutation(
                inner.ctx.remote.as_ref(),
                schema,
                entry.operation,
                &entry.record_id,
                &entry.owner_id,
                &entry.payload,
            )
            .await;
            self.set_in_flight(None);

            match result {
                Ok(()) => {
                    inner.ctx.store.mark_synced(entry.id)?;
                    stats.synced += 1;
                    debug!(
                        entry = entry.id,
                        operation = entry.operation.as_str(),
                        collection = %entry.collection_name,
                        record_id = %entry.record_id,
                        "Replayed queue entry"
                    );
                }
                Err(err) => {
                    warn!(
                        entry = entry.id,
                        operation = entry.operation.as_str(),
                        collection = %entry.collection_name,
                        record_id = %entry.record_id,
                        error = %err,
                        "Sync failed for queue entry"
                    );
                    inner.ctx.store.record_failure(entry.id, &err.to_string())?;
                    stats.failed += 1;
                    blocked.insert(key);

                    if matches!(err, RemoteError::Unreachable(_)) {
                        stats.deferred = total - index - 1;
                        break;
                    }
                }
            }
        }

        stats.pruned = inner
            .ctx
            .store
            .prune_synced_older_than(Utc::now() - inner.retention)?;

        info!(
            synced = stats.synced,
            failed = stats.failed,
            blocked = stats.blocked,
            deferred = stats.deferred,
            pruned = stats.pruned,
            "Sync queue processed"
        );
        inner.drains.send_modify(|n| *n += 1);

        Ok(DrainOutcome::Completed(stats))
    }

    /// Sync status of one record, derived from the queue.
    ///
    /// # Errors
    ///
    /// Returns an error if the queue cannot be read.
    pub fn status_of(&self, collection: &str, id: &str) -> Result<RecordSyncStatus> {
        let in_flight = self
            .inner
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|(c, i)| c == collection && i == id);
        if in_flight {
            return Ok(RecordSyncStatus::Syncing);
        }

        if self.inner.ctx.store.pending_count_for(collection, id)? > 0 {
            Ok(RecordSyncStatus::LocalOnly)
        } else {
            Ok(RecordSyncStatus::Synced)
        }
    }

    /// Start listening for connectivity changes.
    ///
    /// Drains once right away if already online, then again on every
    /// offline-to-online transition. Must be called inside a tokio runtime.
    #[must_use]
    pub fn init(&self) -> SyncListener {
        let manager = self.clone();
        let mut rx = self.inner.ctx.connectivity.subscribe();

        let handle = tokio::spawn(async move {
            let mut was_online = *rx.borrow_and_update();
            if was_online {
                manager.spawn_drain();
            }

            while rx.changed().await.is_ok() {
                let online = *rx.borrow_and_update();
                if online && !was_online {
                    info!("Back online, processing sync queue");
                    manager.spawn_drain();
                }
                was_online = online;
            }
        });

        SyncListener {
            handle: Some(handle),
        }
    }

    /// Run a drain on its own task so tearing down the listener never
    /// cancels it.
    fn spawn_drain(&self) {
        let manager = self.clone();
        tokio::spawn(async move {
            if let Err(err) = manager.process_queue().await {
                warn!(error = %err, "Sync queue drain failed");
            }
        });
    }
}

/// Handle to a running connectivity listener.
///
/// Dropping it (or calling [`teardown`](Self::teardown)) stops the listener.
/// A drain already in progress finishes on its own.
pub struct SyncListener {
    handle: Option<JoinHandle<()>>,
}

impl SyncListener {
    /// Detach the listener.
    pub fn teardown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

impl Drop for SyncListener {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SyncOperation;
    use crate::remote::MemoryBackend;
    use crate::storage::{LocalStore, SqliteStore};
    use crate::sync::Connectivity;
    use serde_json::json;
    use std::time::Duration;

    type Fixture = (
        SyncManager<MemoryBackend>,
        Arc<SqliteStore>,
        Arc<MemoryBackend>,
        Connectivity,
    );

    fn setup(online: bool) -> Fixture {
        let store = Arc::new(SqliteStore::open_memory().unwrap());
        let remote = Arc::new(MemoryBackend::new());
        let connectivity = Connectivity::new(online);
        let ctx = SyncContext::new(store.clone(), remote.clone(), connectivity.clone());
        (
            SyncManager::new(ctx, "u1", chrono::Duration::hours(DEFAULT_RETENTION_HOURS)),
            store,
            remote,
            connectivity,
        )
    }

    fn enqueue_create(store: &SqliteStore, id: &str) -> i64 {
        store
            .enqueue(
                SyncOperation::Create,
                "tasks",
                id,
                "u1",
                &json!({"id": id, "user_id": "u1", "title": id}),
            )
            .unwrap()
    }

    #[tokio::test]
    async fn test_offline_drain_does_nothing() {
        let (manager, store, remote, _) = setup(false);
        enqueue_create(&store, "t1");

        assert_eq!(manager.process_queue().await.unwrap(), DrainOutcome::Offline);
        assert!(remote.calls().is_empty());
        assert_eq!(store.pending(None).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_drain_replays_in_order() {
        let (manager, store, remote, _) = setup(true);
        enqueue_create(&store, "t1");
        store
            .enqueue(SyncOperation::Update, "tasks", "t1", "u1", &json!({"title": "renamed"}))
            .unwrap();
        store
            .enqueue(SyncOperation::Delete, "tasks", "t1", "u1", &json!({}))
            .unwrap();

        let DrainOutcome::Completed(stats) = manager.process_queue().await.unwrap() else {
            panic!("expected a completed drain");
        };
        assert_eq!(stats.synced, 3);
        assert!(remote.get("tasks", "t1").is_none());

        let ops: Vec<_> = remote.calls().into_iter().map(|c| c.operation).collect();
        assert_eq!(
            ops,
            vec![SyncOperation::Create, SyncOperation::Update, SyncOperation::Delete]
        );
        assert!(store.pending(None).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_entry_blocks_later_entries_for_same_record() {
        let (manager, store, remote, _) = setup(true);
        enqueue_create(&store, "t1");
        store
            .enqueue(SyncOperation::Update, "tasks", "t1", "u1", &json!({"title": "x"}))
            .unwrap();
        enqueue_create(&store, "t2");

        remote.fail_record(
            "t1",
            RemoteError::Rejected {
                status: 400,
                message: "bad".into(),
            },
        );

        let DrainOutcome::Completed(stats) = manager.process_queue().await.unwrap() else {
            panic!("expected a completed drain");
        };
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.blocked, 1);
        assert_eq!(stats.synced, 1);
        assert!(remote.get("tasks", "t2").is_some());

        let pending = store.pending(None).unwrap();
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[0].attempts, 1);
        assert_eq!(pending[1].attempts, 0);
        assert_eq!(
            manager.status_of("tasks", "t1").unwrap(),
            RecordSyncStatus::LocalOnly
        );
        assert_eq!(
            manager.status_of("tasks", "t2").unwrap(),
            RecordSyncStatus::Synced
        );
    }

    #[tokio::test]
    async fn test_unreachable_remote_defers_rest() {
        let (manager, store, remote, _) = setup(true);
        enqueue_create(&store, "t1");
        enqueue_create(&store, "t2");
        remote.set_unreachable(true);

        let DrainOutcome::Completed(stats) = manager.process_queue().await.unwrap() else {
            panic!("expected a completed drain");
        };
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.deferred, 1);
        assert_eq!(remote.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_reentrant_drain_reports_already_running() {
        let (manager, _, _, _) = setup(true);
        let _guard = DrainGuard::acquire(manager.drain_key()).unwrap();

        assert!(manager.is_running());
        assert_eq!(
            manager.process_queue().await.unwrap(),
            DrainOutcome::AlreadyRunning
        );
    }

    #[tokio::test]
    async fn test_drain_slot_shared_across_managers() {
        let (manager, store, remote, connectivity) = setup(true);
        let ctx = SyncContext::new(store.clone(), remote.clone(), connectivity.clone());
        let same_owner =
            SyncManager::new(ctx.clone(), "u1", chrono::Duration::hours(DEFAULT_RETENTION_HOURS));
        let other_owner =
            SyncManager::new(ctx, "u2", chrono::Duration::hours(DEFAULT_RETENTION_HOURS));

        let guard = DrainGuard::acquire(manager.drain_key()).unwrap();
        assert!(same_owner.is_running());
        assert_eq!(
            same_owner.process_queue().await.unwrap(),
            DrainOutcome::AlreadyRunning
        );
        assert!(matches!(
            other_owner.process_queue().await.unwrap(),
            DrainOutcome::Completed(_)
        ));

        drop(guard);
        assert!(matches!(
            same_owner.process_queue().await.unwrap(),
            DrainOutcome::Completed(_)
        ));
    }

    #[tokio::test]
    async fn test_guard_released_after_drain() {
        let (manager, _, _, _) = setup(true);
        manager.process_queue().await.unwrap();
        assert!(!manager.is_running());
        assert!(matches!(
            manager.process_queue().await.unwrap(),
            DrainOutcome::Completed(_)
        ));
    }

    #[tokio::test]
    async fn test_listener_drains_on_reconnect() {
        let (manager, store, remote, connectivity) = setup(false);
        enqueue_create(&store, "t1");

        let mut drains = manager.subscribe_drains();
        let listener = manager.init();

        connectivity.set_online(true);
        tokio::time::timeout(Duration::from_secs(5), drains.changed())
            .await
            .expect("drain should run after reconnect")
            .unwrap();

        assert!(remote.get("tasks", "t1").is_some());
        listener.teardown();
    }

    #[tokio::test]
    async fn test_teardown_stops_listening() {
        let (manager, store, remote, connectivity) = setup(false);
        let listener = manager.init();
        listener.teardown();

        enqueue_create(&store, "t1");
        connectivity.set_online(true);
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(remote.calls().is_empty());
    }
}
