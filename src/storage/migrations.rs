//! Database migrations embedded at compile time.
//!
//! Migrations are sourced from `/migrations/` at the repo root and
//! embedded into the binary using `include_str!`. Each one is additive:
//! new columns, indexes, or tables only.

use rusqlite::{Connection, Result};
use tracing::{info, warn};

/// A single migration with version identifier and SQL content.
struct Migration {
    version: &'static str,
    sql: &'static str,
}

/// All migrations in order, embedded at compile time.
///
/// Version names match the SQL filenames (without .sql extension).
/// The `schema_migrations` table tracks which have been applied.
const MIGRATIONS: &[Migration] = &[
    Migration {
        version: "001_queue_attempts",
        sql: include_str!("../../migrations/001_queue_attempts.sql"),
    },
    Migration {
        version: "002_queue_record_index",
        sql: include_str!("../../migrations/002_queue_record_index.sql"),
    },
];

/// Run all pending migrations on the database.
///
/// Already-applied migrations (tracked in `schema_migrations`) are skipped,
/// so this is safe to call on every open. A store created by an older build
/// picks up only the migrations it is missing.
///
/// # Errors
///
/// Returns an error if a migration fails to apply. Duplicate-column errors
/// are logged and the migration is marked complete.
pub fn run_migrations(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version TEXT PRIMARY KEY,
            applied_at INTEGER NOT NULL
        )",
        [],
    )?;

    let applied: std::collections::HashSet<String> = conn
        .prepare("SELECT version FROM schema_migrations")?
        .query_map([], |row| row.get(0))?
        .collect::<Result<_, _>>()?;

    for migration in MIGRATIONS {
        if applied.contains(migration.version) {
            continue;
        }

        info!(version = migration.version, "Applying migration");

        if let Err(e) = conn.execute_batch(migration.sql) {
            if e.to_string().contains("duplicate column name") {
                warn!(
                    version = migration.version,
                    "Migration partially applied (columns exist), marking complete"
                );
            } else {
                return Err(e);
            }
        }

        conn.execute(
            "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
            rusqlite::params![migration.version, chrono::Utc::now().timestamp_millis()],
        )?;

        info!(version = migration.version, "Migration complete");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::schema::SCHEMA_SQL;

    fn setup_db(conn: &Connection) {
        conn.execute_batch(SCHEMA_SQL).expect("Base schema should apply");
    }

    fn applied_count(conn: &Connection) -> i32 {
        conn.query_row(
            "SELECT COUNT(*) FROM schema_migrations WHERE version NOT LIKE 'v%'",
            [],
            |row| row.get(0),
        )
        .unwrap()
    }

    #[test]
    fn test_run_migrations_fresh_db() {
        let conn = Connection::open_in_memory().unwrap();
        setup_db(&conn);
        run_migrations(&conn).expect("Migrations should apply to fresh database");
        assert_eq!(applied_count(&conn), 2);

        // attempts column exists with default 0
        conn.execute(
            "INSERT INTO sync_queue (operation, collection_name, record_id, owner_id, created_at)
             VALUES ('create', 'tasks', 't1', 'u1', '2025-01-01T00:00:00Z')",
            [],
        )
        .unwrap();
        let attempts: i64 = conn
            .query_row("SELECT attempts FROM sync_queue", [], |row| row.get(0))
            .unwrap();
        assert_eq!(attempts, 0);
    }

    #[test]
    fn test_run_migrations_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        setup_db(&conn);

        run_migrations(&conn).expect("First run should succeed");
        run_migrations(&conn).expect("Second run should succeed (idempotent)");
        assert_eq!(applied_count(&conn), 2);
    }

    #[test]
    fn test_partial_upgrade_applies_only_missing() {
        let conn = Connection::open_in_memory().unwrap();
        setup_db(&conn);
        conn.execute_batch(MIGRATIONS[0].sql).unwrap();
        conn.execute(
            "INSERT INTO schema_migrations (version, applied_at) VALUES ('001_queue_attempts', 0)",
            [],
        )
        .unwrap();

        run_migrations(&conn).unwrap();
        assert_eq!(applied_count(&conn), 2);

        let idx: i32 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE name = 'idx_sync_queue_record'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(idx, 1);
    }
}
