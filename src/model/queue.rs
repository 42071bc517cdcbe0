//! Sync queue entry model.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Kind of mutation recorded in the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncOperation {
    Create,
    Update,
    Delete,
}

impl SyncOperation {
    /// Get the string representation for storage.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

impl std::fmt::Display for SyncOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SyncOperation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create" => Ok(Self::Create),
            "update" => Ok(Self::Update),
            "delete" => Ok(Self::Delete),
            _ => Err(format!("Unknown sync operation: {s}")),
        }
    }
}

/// A mutation not yet confirmed by the remote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueEntry {
    /// Auto-increment key; also the replay order
    pub id: i64,
    pub operation: SyncOperation,
    pub collection_name: String,
    pub record_id: String,
    pub owner_id: String,
    /// Full record for creates, changed fields for updates, `{}` for deletes
    pub payload: Value,
    /// RFC 3339
    pub created_at: String,
    pub synced: bool,
    pub synced_at: Option<String>,
    /// Failed replay attempts
    pub attempts: u32,
    pub last_error: Option<String>,
}

/// Queue totals for status output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct QueueCounts {
    /// Unsynced entries
    pub pending: usize,
    /// Unsynced entries with at least one failed attempt
    pub failing: usize,
    /// Synced entries awaiting pruning
    pub synced: usize,
}
