//! Shared handles for repositories and the sync manager.

use std::sync::Arc;

use super::connectivity::Connectivity;
use crate::remote::RemoteBackend;
use crate::storage::LocalStore;

/// The store, remote, and connectivity flag one process works against.
///
/// Cheap to clone; every clone shares the same underlying handles.
pub struct SyncContext<R> {
    pub store: Arc<dyn LocalStore>,
    pub remote: Arc<R>,
    pub connectivity: Connectivity,
}

impl<R: RemoteBackend> SyncContext<R> {
    #[must_use]
    pub fn new(store: Arc<dyn LocalStore>, remote: Arc<R>, connectivity: Connectivity) -> Self {
        Self {
            store,
            remote,
            connectivity,
        }
    }
}

impl<R> Clone for SyncContext<R> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            remote: Arc::clone(&self.remote),
            connectivity: self.connectivity.clone(),
        }
    }
}
