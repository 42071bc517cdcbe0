//! Remote persistence backends.
//!
//! The core only needs four row operations per collection: insert, update
//! by id, delete by id, and select by owner. [`RestBackend`] speaks the
//! PostgREST dialect used by the hosted backend; [`MemoryBackend`] keeps rows
//! in process and can inject failures.

mod memory;
mod rest;

use std::future::Future;

use crate::model::{CollectionSchema, Record};

pub use memory::{MemoryBackend, RemoteCall};
pub use rest::{RestBackend, RestConfig};

/// Result type for remote operations.
pub type RemoteResult<T> = std::result::Result<T, RemoteError>;

/// Failures reported by a remote backend.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemoteError {
    /// Insert of an id that already exists.
    #[error("Record {id} already exists remotely")]
    Conflict { id: String },

    /// Update or delete of an id that does not exist for this owner.
    #[error("Record {id} not found remotely")]
    NotFound { id: String },

    /// No response at all (offline, DNS, refused, timed out).
    #[error("Remote unreachable: {0}")]
    Unreachable(String),

    /// 5xx response.
    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    /// 4xx response other than a conflict.
    #[error("Request rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// Response body could not be understood.
    #[error("Malformed response: {0}")]
    Malformed(String),
}

impl RemoteError {
    /// Whether retrying the same request later might succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Unreachable(_) | Self::Server { .. })
    }
}

/// Trait for remote persistence backends.
///
/// Every operation is scoped by a collection declaration; update and delete
/// are additionally scoped to the owner.
pub trait RemoteBackend: Send + Sync + 'static {
    /// Insert a full record.
    fn insert(
        &self,
        schema: &CollectionSchema,
        record: &Record,
    ) -> impl Future<Output = RemoteResult<()>> + Send;

    /// Update the given fields of one record.
    fn update(
        &self,
        schema: &CollectionSchema,
        id: &str,
        owner: &str,
        fields: &Record,
    ) -> impl Future<Output = RemoteResult<()>> + Send;

    /// Delete one record.
    fn delete(
        &self,
        schema: &CollectionSchema,
        id: &str,
        owner: &str,
    ) -> impl Future<Output = RemoteResult<()>> + Send;

    /// All records of one owner.
    fn select_all(
        &self,
        schema: &CollectionSchema,
        owner: &str,
    ) -> impl Future<Output = RemoteResult<Vec<Record>>> + Send;

    /// Cheap reachability probe.
    ///
    /// Default assumes the backend is reachable.
    fn is_reachable(&self) -> impl Future<Output = bool> + Send {
        async { true }
    }
}
