//! Offline sync.
//!
//! Writes that cannot be confirmed remotely land in the local sync queue.
//! This module replays that queue once connectivity returns:
//!
//! - **Replay**: one mutation applied idempotently to the remote
//! - **Manager**: FIFO drain with a re-entrancy guard and retention sweep
//! - **Connectivity**: observable online flag driving the listener
//! - **Hashing**: SHA256 content hashing for load-time change detection
//!
//! # Example
//!
//! ```ignore
//! use flowmate::sync::{Connectivity, SyncContext, SyncManager};
//!
//! let ctx = SyncContext::new(store, remote, Connectivity::new(false));
//! let manager = SyncManager::new(ctx.clone(), owner, retention);
//! let listener = manager.init();
//!
//! // later, when the network comes back
//! ctx.connectivity.set_online(true);
//! ```

mod connectivity;
mod context;
mod hash;
mod manager;
mod replay;
mod types;

pub use connectivity::Connectivity;
pub use context::SyncContext;
pub use hash::content_hash;
pub use manager::{DEFAULT_RETENTION_HOURS, SyncListener, SyncManager};
pub use replay::{apply_mutation, update_fields};
pub use types::{DrainOutcome, DrainStats, QueueCause, RecordSyncStatus, WriteOutcome};
