//! Table and index definitions.
//!
//! The full record lives in `notes.record` as JSON tagged with the record
//! schema version it was written under; the other columns exist for ordering
//! and lookup. `note_tags` mirrors `Note::tags` for tag lookups.

use sqlx::SqlitePool;
use tracing::debug;

use snapnote_core::{Error, Result};

const STATEMENTS: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS notes (
        id TEXT PRIMARY KEY NOT NULL,
        title TEXT NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT,
        schema_version INTEGER NOT NULL,
        record TEXT NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_notes_title ON notes (title)",
    "CREATE INDEX IF NOT EXISTS idx_notes_created_at ON notes (created_at)",
    "CREATE TABLE IF NOT EXISTS note_tags (
        note_id TEXT NOT NULL REFERENCES notes (id) ON DELETE CASCADE,
        tag TEXT NOT NULL,
        position INTEGER NOT NULL,
        PRIMARY KEY (note_id, tag)
    )",
    "CREATE INDEX IF NOT EXISTS idx_note_tags_tag ON note_tags (tag)",
];

/// Create tables and indexes when missing. Idempotent.
pub async fn apply_schema(pool: &SqlitePool) -> Result<()> {
    for statement in STATEMENTS {
        sqlx::query(statement)
            .execute(pool)
            .await
            .map_err(Error::Database)?;
    }
    debug!(
        subsystem = "database",
        component = "schema",
        op = "apply",
        statements = STATEMENTS.len(),
        "Schema applied"
    );
    Ok(())
}
