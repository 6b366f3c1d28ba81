// ==========================================
// Site Progress - SQLite connection init
// ==========================================
// Goals:
// - Unify PRAGMA behaviour for every Connection::open so that the
//   history cascade (foreign keys) is never silently disabled
// - Unify busy_timeout to reduce sporadic busy errors on concurrent writes
// ==========================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::time::Duration;

/// Default busy_timeout (milliseconds)
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// Schema version the current code expects (aligned with scripts/dev_db/schema.sql)
///
/// Used for warnings only, not automatic migration; running against an
/// older database should be loud, not silent.
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// Apply the unified PRAGMA set to a SQLite connection
///
/// foreign_keys and busy_timeout are per-connection settings, so every
/// opened connection must pass through here.
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// Open a SQLite connection with the unified configuration applied
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// Read schema_version (None when the table does not exist yet)
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> =
        conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}
