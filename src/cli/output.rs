//! Shared output helpers for command implementations.

use colored::Colorize;
use serde::Serialize;

use crate::error::{Error, Result};
use crate::sync::{QueueCause, RecordSyncStatus, WriteOutcome};
use crate::validate::Rejection;

/// Print one JSON document on stdout.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string(value)?);
    Ok(())
}

/// First eight characters of an id, enough to address it from the CLI.
#[must_use]
pub fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

/// Truncate for single-line display.
#[must_use]
pub fn truncate(s: &str, max: usize) -> String {
    let line = s.lines().next().unwrap_or_default();
    if line.chars().count() <= max && line.len() == s.len() {
        return line.to_string();
    }
    let kept: String = line.chars().take(max.saturating_sub(1)).collect();
    format!("{kept}…")
}

/// Human description of why a write was queued.
#[must_use]
pub fn cause_text(cause: &QueueCause) -> String {
    match cause {
        QueueCause::Offline => "offline".to_string(),
        QueueCause::PendingPredecessor => "earlier change still queued".to_string(),
        QueueCause::Transient(msg) => format!("remote unavailable: {msg}"),
        QueueCause::Rejected(msg) => format!("remote rejected: {msg}"),
    }
}

/// Colored one-word summary of a write outcome.
#[must_use]
pub fn outcome_label(outcome: &WriteOutcome) -> String {
    match outcome {
        WriteOutcome::Committed => "synced".green().to_string(),
        WriteOutcome::Queued { entry_id, cause } => {
            format!("queued #{entry_id} ({})", cause_text(cause))
                .yellow()
                .to_string()
        }
    }
}

/// Marker shown next to records in lists.
#[must_use]
pub fn sync_marker(status: RecordSyncStatus) -> String {
    match status {
        RecordSyncStatus::Synced => " ".to_string(),
        RecordSyncStatus::Syncing => "~".cyan().to_string(),
        RecordSyncStatus::LocalOnly => "*".yellow().to_string(),
    }
}

/// Turn a normalization rejection into an `InvalidArgument` error.
pub fn rejected(what: &str, rejection: Rejection) -> Error {
    let (input, suggestion) = rejection;
    match suggestion {
        Some(s) if s.contains(' ') => Error::InvalidArgument(format!("invalid {what} '{input}'. {s}")),
        Some(s) => Error::InvalidArgument(format!("invalid {what} '{input}', did you mean '{s}'?")),
        None => Error::InvalidArgument(format!("invalid {what} '{input}'")),
    }
}
