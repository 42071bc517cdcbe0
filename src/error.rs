//! Error types for the Flowmate offline core.
//!
//! Provides structured error handling with:
//! - Machine-readable error codes (`ErrorCode`)
//! - Category-based exit codes (2=store, 3=not_found, 4=validation, etc.)
//! - Retryability flags for callers that want to resubmit corrected input
//! - Context-aware recovery hints
//! - Structured JSON output for piped / non-TTY consumers
//!
//! Remote failures have their own type (`remote::RemoteError`); the repository
//! turns them into queued writes, so they never reach a caller as an `Error`.

use thiserror::Error;

/// Result type alias for Flowmate operations.
pub type Result<T> = std::result::Result<T, Error>;

// ── Error Code ────────────────────────────────────────────────

/// Machine-readable error codes grouped by category.
///
/// Each code maps to a SCREAMING_SNAKE string and a category-based
/// exit code. Scripts match on the string or on the exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Store (exit 2)
    NotInitialized,
    DatabaseError,
    StoreError,

    // Not Found (exit 3)
    RecordNotFound,
    UnknownCollection,
    NoOwner,

    // Validation (exit 4)
    InvalidRecord,
    InvalidArgument,

    // Config (exit 7)
    ConfigError,

    // I/O (exit 8)
    IoError,
    JsonError,

    // Internal (exit 1)
    InternalError,
}

impl ErrorCode {
    /// Machine-readable SCREAMING_SNAKE code string.
    #[must_use]
    pub const fn as_str(&self) -> &str {
        match self {
            Self::NotInitialized => "NOT_INITIALIZED",
            Self::DatabaseError => "DATABASE_ERROR",
            Self::StoreError => "STORE_ERROR",
            Self::RecordNotFound => "RECORD_NOT_FOUND",
            Self::UnknownCollection => "UNKNOWN_COLLECTION",
            Self::NoOwner => "NO_OWNER",
            Self::InvalidRecord => "INVALID_RECORD",
            Self::InvalidArgument => "INVALID_ARGUMENT",
            Self::ConfigError => "CONFIG_ERROR",
            Self::IoError => "IO_ERROR",
            Self::JsonError => "JSON_ERROR",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }

    /// Category-based exit code (1-8).
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::InternalError => 1,
            Self::NotInitialized | Self::DatabaseError | Self::StoreError => 2,
            Self::RecordNotFound | Self::UnknownCollection | Self::NoOwner => 3,
            Self::InvalidRecord | Self::InvalidArgument => 4,
            Self::ConfigError => 7,
            Self::IoError | Self::JsonError => 8,
        }
    }

    /// Whether the caller should retry with corrected input.
    ///
    /// True for validation errors and transient database contention.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::InvalidRecord | Self::InvalidArgument | Self::DatabaseError
        )
    }
}

// ── Error Enum ────────────────────────────────────────────────

/// Errors that can occur in Flowmate operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Not initialized: run `fm init` first")]
    NotInitialized,

    #[error("Record not found: {collection}/{id}")]
    RecordNotFound { collection: String, id: String },

    #[error("Record not found: {collection}/{id} (did you mean: {}?)", similar.join(", "))]
    RecordNotFoundSimilar {
        collection: String,
        id: String,
        similar: Vec<String>,
    },

    #[error("ID prefix '{prefix}' matches {} {collection} records", matches.len())]
    AmbiguousId {
        collection: String,
        prefix: String,
        matches: Vec<String>,
    },

    #[error("Unknown collection: {0}")]
    UnknownCollection(String),

    #[error("No owner configured")]
    NoOwner,

    #[error("Invalid {collection} record: {message}")]
    InvalidRecord { collection: String, message: String },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Store error: {0}")]
    Store(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Shorthand for an integrity failure on a collection record.
    pub fn invalid_record(collection: &str, message: impl Into<String>) -> Self {
        Self::InvalidRecord {
            collection: collection.to_string(),
            message: message.into(),
        }
    }

    /// Map this error to its structured `ErrorCode`.
    #[must_use]
    pub const fn error_code(&self) -> ErrorCode {
        match self {
            Self::NotInitialized => ErrorCode::NotInitialized,
            Self::Database(_) => ErrorCode::DatabaseError,
            Self::Store(_) => ErrorCode::StoreError,
            Self::RecordNotFound { .. } | Self::RecordNotFoundSimilar { .. } => {
                ErrorCode::RecordNotFound
            }
            Self::AmbiguousId { .. } => ErrorCode::InvalidArgument,
            Self::UnknownCollection(_) => ErrorCode::UnknownCollection,
            Self::NoOwner => ErrorCode::NoOwner,
            Self::InvalidRecord { .. } => ErrorCode::InvalidRecord,
            Self::InvalidArgument(_) => ErrorCode::InvalidArgument,
            Self::Config(_) => ErrorCode::ConfigError,
            Self::Io(_) => ErrorCode::IoError,
            Self::Json(_) => ErrorCode::JsonError,
            Self::Other(_) => ErrorCode::InternalError,
        }
    }

    /// Category-based exit code, delegating to the `ErrorCode`.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        self.error_code().exit_code()
    }

    /// Context-aware recovery hint.
    ///
    /// Returns `None` if no actionable suggestion exists.
    #[must_use]
    pub fn hint(&self) -> Option<String> {
        match self {
            Self::NotInitialized => Some("Run `fm init` to create the offline store".to_string()),

            Self::NoOwner => Some(
                "Pass --owner <user-id>, set FLOWMATE_OWNER, or add \"owner_id\" \
                 to ~/.flowmate/config.json"
                    .to_string(),
            ),

            Self::RecordNotFound { collection, id } => Some(format!(
                "No {collection} record with ID '{id}' for this owner. \
                 Run a list command to see available records."
            )),

            Self::RecordNotFoundSimilar { similar, .. } => {
                Some(format!("Did you mean: {}?", similar.join(", ")))
            }

            Self::AmbiguousId { matches, .. } => Some(format!(
                "Use more characters of the ID. Candidates: {}",
                matches.join(", ")
            )),

            Self::UnknownCollection(_) => Some(
                "Known collections: tasks, daily_syncs, notes, folders, knowledge_items"
                    .to_string(),
            ),

            Self::InvalidArgument(msg) | Self::InvalidRecord { message: msg, .. } => {
                if msg.contains("status") {
                    Some(
                        "Valid statuses: pending, completed, missed. \
                         Synonyms: done→completed, todo→pending, overdue→missed"
                            .to_string(),
                    )
                } else if msg.contains("quadrant") {
                    Some(
                        "Valid quadrants: Q1_DO, Q2_SCHEDULE, Q3_DELEGATE, Q4_ELIMINATE \
                         (or q1-q4, do, schedule, delegate, eliminate)"
                            .to_string(),
                    )
                } else if msg.contains("energy") {
                    Some("Energy is 1-5, or one of: drained, low, steady, high, peak".to_string())
                } else {
                    None
                }
            }

            Self::Database(_) | Self::Store(_) | Self::Io(_) | Self::Json(_) | Self::Config(_)
            | Self::Other(_) => None,
        }
    }

    /// Structured JSON representation for machine consumption.
    ///
    /// Includes error code, message, retryability, exit code, and
    /// optional recovery hint.
    #[must_use]
    pub fn to_structured_json(&self) -> serde_json::Value {
        let code = self.error_code();
        let mut obj = serde_json::json!({
            "error": {
                "code": code.as_str(),
                "message": self.to_string(),
                "retryable": code.is_retryable(),
                "exit_code": code.exit_code(),
            }
        });

        if let Some(hint) = self.hint() {
            obj["error"]["hint"] = serde_json::Value::String(hint);
        }

        obj
    }
}
