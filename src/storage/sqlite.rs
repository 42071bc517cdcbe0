//! SQLite storage implementation.
//!
//! One table per collection holds each record as JSON next to its id and
//! owner. The `sync_queue` table holds unconfirmed mutations. A single
//! connection behind a mutex serializes every call.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};
use serde_json::Value;
use tracing::warn;

use super::schema::apply_schema;
use super::store::LocalStore;
use crate::error::{Error, Result};
use crate::model::record::now_timestamp;
use crate::model::{QueueCounts, QueueEntry, Record, SyncOperation, schema_for};

const QUEUE_COLUMNS: &str = "id, operation, collection_name, record_id, owner_id, payload, \
                             created_at, synced, synced_at, attempts, last_error";

/// SQLite-based local store.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open a database at the given path.
    ///
    /// Creates parent directories and the database if missing, then applies
    /// the schema and any pending migrations.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established or schema fails.
    pub fn open(path: &Path) -> Result<Self> {
        Self::open_with_timeout(path, None)
    }

    /// Open a database with an optional busy timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established or schema fails.
    pub fn open_with_timeout(path: &Path, timeout_ms: Option<u64>) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        conn.busy_timeout(timeout_ms.map_or(Duration::from_secs(5), Duration::from_millis))?;
        apply_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database (for testing).
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established.
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        apply_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::Store("connection lock poisoned".to_string()))
    }

    /// Applied migration versions, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn applied_migrations(&self) -> Result<Vec<String>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT version FROM schema_migrations ORDER BY applied_at, version")?;
        let versions = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        Ok(versions)
    }
}

fn parse_data(collection: &str, id: &str, data: &str) -> Option<Record> {
    match serde_json::from_str::<Value>(data) {
        Ok(Value::Object(map)) => Some(map),
        Ok(_) | Err(_) => {
            warn!(collection, id, "Skipping unreadable local record");
            None
        }
    }
}

fn map_queue_row(row: &Row<'_>) -> rusqlite::Result<QueueEntry> {
    let operation: String = row.get(1)?;
    let payload: String = row.get(5)?;
    let synced: i64 = row.get(7)?;
    let attempts: i64 = row.get(9)?;

    Ok(QueueEntry {
        id: row.get(0)?,
        operation: operation.parse().map_err(|e: String| {
            rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, e.into())
        })?,
        collection_name: row.get(2)?,
        record_id: row.get(3)?,
        owner_id: row.get(4)?,
        payload: serde_json::from_str(&payload).unwrap_or(Value::Object(serde_json::Map::new())),
        created_at: row.get(6)?,
        synced: synced != 0,
        synced_at: row.get(8)?,
        attempts: u32::try_from(attempts).unwrap_or(u32::MAX),
        last_error: row.get(10)?,
    })
}

impl LocalStore for SqliteStore {
    fn get_all(&self, collection: &str, owner: Option<&str>) -> Result<Vec<Record>> {
        let schema = schema_for(collection)?;
        let conn = self.conn()?;

        let sql = format!(
            "SELECT id, data FROM {} WHERE (?1 IS NULL OR owner_id = ?1) ORDER BY rowid",
            schema.name
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![owner], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(rows
            .into_iter()
            .filter_map(|(id, data)| parse_data(collection, &id, &data))
            .collect())
    }

    fn get_by_id(&self, collection: &str, id: &str) -> Result<Option<Record>> {
        let schema = schema_for(collection)?;
        let conn = self.conn()?;

        let data: Option<String> = conn
            .query_row(
                &format!("SELECT data FROM {} WHERE id = ?1", schema.name),
                [id],
                |row| row.get(0),
            )
            .optional()?;

        Ok(data.and_then(|d| parse_data(collection, id, &d)))
    }

    fn put(&self, collection: &str, record: Record) -> Result<Record> {
        let schema = schema_for(collection)?;
        let id = schema
            .record_id(&record)
            .ok_or_else(|| Error::invalid_record(collection, "record has no id"))?;
        let owner = schema
            .record_owner(&record)
            .ok_or_else(|| Error::invalid_record(collection, "record has no owner"))?;
        let updated_at = record
            .get("updated_at")
            .and_then(Value::as_str)
            .map_or_else(now_timestamp, str::to_string);
        let data = serde_json::to_string(&record)?;

        let conn = self.conn()?;
        conn.execute(
            &format!(
                "INSERT INTO {} (id, owner_id, data, updated_at) VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(id) DO UPDATE SET
                    owner_id = excluded.owner_id,
                    data = excluded.data,
                    updated_at = excluded.updated_at",
                schema.name
            ),
            params![id, owner, data, updated_at],
        )?;

        Ok(record)
    }

    fn remove(&self, collection: &str, id: &str) -> Result<()> {
        let schema = schema_for(collection)?;
        let conn = self.conn()?;
        conn.execute(&format!("DELETE FROM {} WHERE id = ?1", schema.name), [id])?;
        Ok(())
    }

    fn enqueue(
        &self,
        operation: SyncOperation,
        collection: &str,
        record_id: &str,
        owner: &str,
        payload: &Value,
    ) -> Result<i64> {
        let schema = schema_for(collection)?;
        let payload = serde_json::to_string(payload)?;

        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO sync_queue (operation, collection_name, record_id, owner_id, payload, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                operation.as_str(),
                schema.name,
                record_id,
                owner,
                payload,
                now_timestamp()
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn pending(&self, owner: Option<&str>) -> Result<Vec<QueueEntry>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {QUEUE_COLUMNS} FROM sync_queue
             WHERE synced = 0 AND (?1 IS NULL OR owner_id = ?1)
             ORDER BY id ASC"
        ))?;
        let entries = stmt
            .query_map(params![owner], map_queue_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    fn mark_synced(&self, entry_id: i64) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "UPDATE sync_queue SET synced = 1, synced_at = ?2 WHERE id = ?1 AND synced = 0",
            params![entry_id, now_timestamp()],
        )?;
        Ok(())
    }

    fn record_failure(&self, entry_id: i64, message: &str) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "UPDATE sync_queue SET attempts = attempts + 1, last_error = ?2 WHERE id = ?1",
            params![entry_id, message],
        )?;
        Ok(())
    }

    fn prune_synced_older_than(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        let cutoff = cutoff.to_rfc3339_opts(SecondsFormat::Millis, true);
        let conn = self.conn()?;
        let removed = conn.execute(
            "DELETE FROM sync_queue WHERE synced = 1 AND synced_at IS NOT NULL AND synced_at < ?1",
            [cutoff],
        )?;
        Ok(removed)
    }

    fn pending_count_for(&self, collection: &str, record_id: &str) -> Result<usize> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM sync_queue
             WHERE collection_name = ?1 AND record_id = ?2 AND synced = 0",
            params![collection, record_id],
            |row| row.get(0),
        )?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    fn queue_counts(&self, owner: Option<&str>) -> Result<QueueCounts> {
        let conn = self.conn()?;
        let (pending, failing, synced): (i64, i64, i64) = conn.query_row(
            "SELECT
                COALESCE(SUM(CASE WHEN synced = 0 THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN synced = 0 AND attempts > 0 THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN synced = 1 THEN 1 ELSE 0 END), 0)
             FROM sync_queue WHERE (?1 IS NULL OR owner_id = ?1)",
            params![owner],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )?;

        Ok(QueueCounts {
            pending: usize::try_from(pending).unwrap_or(0),
            failing: usize::try_from(failing).unwrap_or(0),
            synced: usize::try_from(synced).unwrap_or(0),
        })
    }

    fn list_queue(&self, include_synced: bool, limit: usize) -> Result<Vec<QueueEntry>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {QUEUE_COLUMNS} FROM sync_queue
             WHERE (?1 OR synced = 0)
             ORDER BY id DESC LIMIT ?2"
        ))?;
        let entries = stmt
            .query_map(params![include_synced, limit], map_queue_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(entries)
    }
}
