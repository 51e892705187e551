//! `SQLite` schema definitions for evidencelink.
//!
//! Documents are stored whole, one row per key. There is no versioning of
//! the documents themselves; the table layout is created idempotently.

use rusqlite::Connection;

use crate::error::Result;

/// SQL statement to create the documents table.
pub const CREATE_DOCUMENTS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS documents (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL
)
";

/// SQL statement to create an index on `updated_at` for stats queries.
pub const CREATE_UPDATED_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_documents_updated ON documents(updated_at DESC)
";

/// All schema creation statements in order.
pub const SCHEMA_STATEMENTS: &[&str] = &[CREATE_DOCUMENTS_TABLE, CREATE_UPDATED_INDEX];

/// Create all tables and indexes if they don't exist.
///
/// # Errors
///
/// Returns an error if any statement fails.
pub fn initialize_schema(conn: &Connection) -> Result<()> {
    for statement in SCHEMA_STATEMENTS {
        conn.execute(statement, [])?;
    }
    Ok(())
}
