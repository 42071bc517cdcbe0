//! Database schema definitions.
//!
//! The base DDL holds the migration ledger and the sync queue. Collection
//! tables are generated from the [`COLLECTIONS`] declarations so adding a
//! collection or an indexed field only touches `model::record`.

use rusqlite::{Connection, Result};

use crate::model::{COLLECTIONS, CollectionSchema};

/// Current schema version for migration tracking.
pub const CURRENT_SCHEMA_VERSION: i32 = 1;

/// Base SQL schema.
///
/// Timestamps are RFC 3339 text so they compare lexicographically and match
/// what the remote returns.
pub const SCHEMA_SQL: &str = r"
-- ====================
-- Schema Version Tracking
-- ====================

CREATE TABLE IF NOT EXISTS schema_migrations (
    version TEXT PRIMARY KEY,
    applied_at INTEGER NOT NULL
);

-- ====================
-- Sync Queue
-- ====================

-- Mutations not yet confirmed by the remote, replayed in id order
CREATE TABLE IF NOT EXISTS sync_queue (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    operation TEXT NOT NULL CHECK (operation IN ('create', 'update', 'delete')),
    collection_name TEXT NOT NULL,
    record_id TEXT NOT NULL,
    owner_id TEXT NOT NULL,
    payload TEXT NOT NULL DEFAULT '{}',
    created_at TEXT NOT NULL,
    synced INTEGER NOT NULL DEFAULT 0,
    synced_at TEXT
);

CREATE INDEX IF NOT EXISTS idx_sync_queue_synced ON sync_queue(synced, id);
CREATE INDEX IF NOT EXISTS idx_sync_queue_collection ON sync_queue(collection_name);
CREATE INDEX IF NOT EXISTS idx_sync_queue_owner ON sync_queue(owner_id, synced);
";

/// DDL for one collection table and its indexes.
///
/// Declared field names are static identifiers, never user input.
#[must_use]
pub fn collection_ddl(schema: &CollectionSchema) -> String {
    let table = schema.name;
    let mut sql = format!(
        "CREATE TABLE IF NOT EXISTS {table} (
    id TEXT PRIMARY KEY,
    owner_id TEXT NOT NULL,
    data TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_{table}_owner ON {table}(owner_id);
"
    );
    for field in schema.indexed_fields {
        sql.push_str(&format!(
            "CREATE INDEX IF NOT EXISTS idx_{table}_{field} ON {table}(json_extract(data, '$.{field}'));\n"
        ));
    }
    sql
}

/// Apply pragmas, the base schema, collection tables, and migrations.
///
/// # Errors
///
/// Returns an error if any statement fails.
pub fn apply_schema(conn: &Connection) -> Result<()> {
    // Set pragmas before schema creation
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    conn.pragma_update(None, "temp_store", "MEMORY")?;

    conn.execute_batch(SCHEMA_SQL)?;

    for schema in COLLECTIONS {
        conn.execute_batch(&collection_ddl(schema))?;
    }

    super::migrations::run_migrations(conn)?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
        rusqlite::params![
            format!("v{CURRENT_SCHEMA_VERSION}"),
            chrono::Utc::now().timestamp_millis()
        ],
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::record::TASKS;

    #[test]
    fn test_schema_applies() {
        let conn = Connection::open_in_memory().unwrap();
        apply_schema(&conn).unwrap();

        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<_, _>>()
            .unwrap();

        for expected in ["daily_syncs", "folders", "knowledge_items", "notes", "sync_queue", "tasks"] {
            assert!(tables.iter().any(|t| t == expected), "missing table {expected}");
        }
    }

    #[test]
    fn test_schema_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        apply_schema(&conn).unwrap();
        apply_schema(&conn).unwrap();
    }

    #[test]
    fn test_expression_indexes_created() {
        let conn = Connection::open_in_memory().unwrap();
        apply_schema(&conn).unwrap();

        let count: i32 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='index' AND name IN ('idx_tasks_status', 'idx_tasks_quadrant')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 2);
    }

    #[test]
    fn test_collection_ddl_mentions_indexed_fields() {
        let ddl = collection_ddl(&TASKS);
        assert!(ddl.contains("CREATE TABLE IF NOT EXISTS tasks"));
        assert!(ddl.contains("json_extract(data, '$.status')"));
    }

    #[test]
    fn test_operation_constraint() {
        let conn = Connection::open_in_memory().unwrap();
        apply_schema(&conn).unwrap();

        let result = conn.execute(
            "INSERT INTO sync_queue (operation, collection_name, record_id, owner_id, created_at)
             VALUES ('upsert', 'tasks', 't1', 'u1', '2025-01-01T00:00:00Z')",
            [],
        );
        assert!(result.is_err());
    }
}
