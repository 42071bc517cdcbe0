//! Content hashing for sync operations.
//!
//! SHA256 over a record's canonical form lets `load()` skip rewriting local
//! rows that already match the remote, without comparing field by field.

use sha2::{Digest, Sha256};

use crate::model::Record;

/// Compute a SHA256 hash of a record.
///
/// Keys are visited in sorted order (the map is ordered), each value in its
/// compact JSON form, so two records with equal content hash equally
/// regardless of how they were built.
#[must_use]
pub fn content_hash(record: &Record) -> String {
    let mut hasher = Sha256::new();
    for (key, value) in record {
        hasher.update(key.as_bytes());
        hasher.update(b"=");
        hasher.update(value.to_string().as_bytes());
        hasher.update(b"\n");
    }
    format!("{:x}", hasher.finalize())
}
