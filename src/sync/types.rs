//! Sync result types.
//!
//! Outcomes of a single write's remote push, of a queue drain, and the
//! per-record sync status derived from the queue.

use serde::Serialize;

/// Why a write ended up in the queue instead of being confirmed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum QueueCause {
    /// Connectivity reported offline; no remote attempt was made.
    Offline,
    /// The record already had unsynced entries, so this one waits its turn.
    PendingPredecessor,
    /// The remote attempt failed in a way that may succeed later.
    Transient(String),
    /// The remote refused the write; it is kept for a later replay.
    Rejected(String),
}

/// Result of pushing one mutation toward the remote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum WriteOutcome {
    /// The remote confirmed the write (or already had it).
    Committed,
    /// The write is in the local queue.
    Queued { entry_id: i64, cause: QueueCause },
}

impl WriteOutcome {
    /// Whether the remote already has this write.
    #[must_use]
    pub const fn is_committed(&self) -> bool {
        matches!(self, Self::Committed)
    }

    /// Queue entry id, if the write was queued.
    #[must_use]
    pub const fn queued_entry(&self) -> Option<i64> {
        match self {
            Self::Committed => None,
            Self::Queued { entry_id, .. } => Some(*entry_id),
        }
    }
}

/// Statistics for one queue drain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DrainStats {
    /// Entries replayed successfully (including idempotent no-ops).
    pub synced: usize,
    /// Entries whose replay failed; they stay queued.
    pub failed: usize,
    /// Entries skipped because an earlier entry for the same record failed.
    pub blocked: usize,
    /// Entries left untouched because connectivity was lost.
    pub deferred: usize,
    /// Synced entries removed by the retention sweep.
    pub pruned: usize,
}

impl DrainStats {
    /// Entries that are still pending after this drain.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.failed + self.blocked + self.deferred
    }
}

/// Result of a `process_queue` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum DrainOutcome {
    /// Connectivity is offline; nothing was attempted.
    Offline,
    /// Another drain is in progress.
    AlreadyRunning,
    /// The drain ran to completion (or stopped early, see `deferred`).
    Completed(DrainStats),
}

/// Where a record stands relative to the remote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordSyncStatus {
    /// Unsynced queue entries exist.
    LocalOnly,
    /// The sync manager is replaying one of its entries right now.
    Syncing,
    /// No unsynced entries.
    Synced,
}

impl RecordSyncStatus {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::LocalOnly => "local_only",
            Self::Syncing => "syncing",
            Self::Synced => "synced",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_drain_stats_remaining() {
        let stats = DrainStats {
            synced: 3,
            failed: 1,
            blocked: 2,
            deferred: 4,
            pruned: 0,
        };
        assert_eq!(stats.remaining(), 7);
        assert_eq!(DrainStats::default().remaining(), 0);
    }

    #[test]
    fn test_write_outcome_json_shape() {
        let queued = WriteOutcome::Queued {
            entry_id: 7,
            cause: QueueCause::Transient("Server error (503): busy".into()),
        };
        assert_eq!(
            serde_json::to_value(&queued).unwrap(),
            json!({
                "status": "queued",
                "entry_id": 7,
                "cause": {"kind": "transient", "message": "Server error (503): busy"}
            })
        );
        assert_eq!(queued.queued_entry(), Some(7));
        assert!(WriteOutcome::Committed.is_committed());
    }
}
