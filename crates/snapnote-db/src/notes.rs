//! SQLite implementation of [`NoteStore`].

use std::time::Instant;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::{Row, Sqlite, SqlitePool, Transaction};
use tracing::{debug, info, warn};
use uuid::Uuid;

use snapnote_core::defaults::NOTE_SCHEMA_VERSION;
use snapnote_core::{upgrade_record, Error, NewNote, Note, NoteId, NoteStore, NoteUpdate, Result};

use crate::schema::apply_schema;

/// Fixed-width timestamp text so that `ORDER BY created_at` is chronological.
fn ts(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Note store backed by SQLite.
#[derive(Clone)]
pub struct SqliteNoteStore {
    pool: SqlitePool,
}

impl SqliteNoteStore {
    /// Wrap a pool without touching the schema.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Apply the schema and upgrade every record written under an older
    /// record version.
    pub async fn open(pool: SqlitePool) -> Result<Self> {
        apply_schema(&pool).await?;
        let store = Self::new(pool);
        store.migrate_records().await?;
        Ok(store)
    }

    /// Underlying pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Rewrite outdated records in the current shape. Returns how many
    /// records were upgraded.
    pub async fn migrate_records(&self) -> Result<u64> {
        let start = Instant::now();
        let rows = sqlx::query("SELECT id, schema_version, record FROM notes WHERE schema_version < ?")
            .bind(NOTE_SCHEMA_VERSION as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;

        if rows.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        let mut upgraded = 0u64;
        for row in rows {
            let id: String = row.get("id");
            let version: i64 = row.get("schema_version");
            let record: String = row.get("record");
            let value: serde_json::Value = serde_json::from_str(&record)?;
            let note = upgrade_record(value, version as u32).map_err(|e| {
                warn!(
                    subsystem = "database",
                    component = "notes",
                    op = "migrate",
                    note_id = %id,
                    from_version = version,
                    error = %e,
                    "Record upgrade failed"
                );
                e
            })?;
            Self::write_tx(&mut tx, &note).await?;
            upgraded += 1;
        }
        tx.commit().await.map_err(Error::Database)?;

        info!(
            subsystem = "database",
            component = "notes",
            op = "migrate",
            upgraded,
            to_version = NOTE_SCHEMA_VERSION,
            duration_ms = start.elapsed().as_millis() as u64,
            "Upgraded stored note records"
        );
        Ok(upgraded)
    }

    /// Notes carrying an exact tag, newest first. Uses the tag index.
    pub async fn list_by_tag(&self, tag: &str) -> Result<Vec<Note>> {
        let rows = sqlx::query(
            "SELECT n.schema_version, n.record FROM notes n
             JOIN note_tags t ON t.note_id = n.id
             WHERE t.tag = ?
             ORDER BY n.created_at DESC, n.id DESC",
        )
        .bind(tag)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;
        rows.iter().map(Self::decode_row).collect()
    }

    /// Number of stored notes.
    pub async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM notes")
            .fetch_one(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(count)
    }

    fn decode_row(row: &sqlx::sqlite::SqliteRow) -> Result<Note> {
        let version: i64 = row.get("schema_version");
        let record: String = row.get("record");
        if version as u32 == NOTE_SCHEMA_VERSION {
            Ok(serde_json::from_str(&record)?)
        } else {
            upgrade_record(serde_json::from_str(&record)?, version as u32)
        }
    }

    async fn fetch_tx(tx: &mut Transaction<'_, Sqlite>, id: NoteId) -> Result<Option<Note>> {
        let row = sqlx::query("SELECT schema_version, record FROM notes WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&mut **tx)
            .await
            .map_err(Error::Database)?;
        row.as_ref().map(Self::decode_row).transpose()
    }

    /// Insert or replace the row and tag mirror for `note`.
    async fn write_tx(tx: &mut Transaction<'_, Sqlite>, note: &Note) -> Result<()> {
        let id = note.id.to_string();
        let record = serde_json::to_string(note)?;

        sqlx::query(
            "INSERT INTO notes (id, title, created_at, updated_at, schema_version, record)
             VALUES (?, ?, ?, ?, ?, ?)
             ON CONFLICT (id) DO UPDATE SET
                title = excluded.title,
                updated_at = excluded.updated_at,
                schema_version = excluded.schema_version,
                record = excluded.record",
        )
        .bind(&id)
        .bind(&note.title)
        .bind(ts(note.created_at))
        .bind(note.updated_at.map(ts))
        .bind(NOTE_SCHEMA_VERSION as i64)
        .bind(&record)
        .execute(&mut **tx)
        .await
        .map_err(Error::Database)?;

        sqlx::query("DELETE FROM note_tags WHERE note_id = ?")
            .bind(&id)
            .execute(&mut **tx)
            .await
            .map_err(Error::Database)?;

        for (position, tag) in note.tags.iter().enumerate() {
            sqlx::query("INSERT INTO note_tags (note_id, tag, position) VALUES (?, ?, ?)")
                .bind(&id)
                .bind(tag)
                .bind(position as i64)
                .execute(&mut **tx)
                .await
                .map_err(Error::Database)?;
        }
        Ok(())
    }
}

#[async_trait]
impl NoteStore for SqliteNoteStore {
    async fn create(&self, note: NewNote) -> Result<NoteId> {
        let id = Uuid::now_v7();
        let note = note.with_id(id);

        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        Self::write_tx(&mut tx, &note).await?;
        tx.commit().await.map_err(Error::Database)?;

        debug!(
            subsystem = "database",
            component = "notes",
            op = "create",
            note_id = %id,
            tag_count = note.tags.len(),
            "Note created"
        );
        Ok(id)
    }

    async fn get(&self, id: NoteId) -> Result<Option<Note>> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        let note = Self::fetch_tx(&mut tx, id).await?;
        tx.commit().await.map_err(Error::Database)?;
        Ok(note)
    }

    async fn update(&self, id: NoteId, changes: NoteUpdate) -> Result<u64> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        let Some(mut note) = Self::fetch_tx(&mut tx, id).await? else {
            debug!(
                subsystem = "database",
                component = "notes",
                op = "update",
                note_id = %id,
                "Update of unknown note ignored"
            );
            return Ok(0);
        };
        changes.apply(&mut note, Utc::now());
        Self::write_tx(&mut tx, &note).await?;
        tx.commit().await.map_err(Error::Database)?;

        debug!(
            subsystem = "database",
            component = "notes",
            op = "update",
            note_id = %id,
            "Note updated"
        );
        Ok(1)
    }

    async fn delete(&self, id: NoteId) -> Result<()> {
        let id_text = id.to_string();
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        sqlx::query("DELETE FROM note_tags WHERE note_id = ?")
            .bind(&id_text)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;
        let result = sqlx::query("DELETE FROM notes WHERE id = ?")
            .bind(&id_text)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;
        tx.commit().await.map_err(Error::Database)?;

        debug!(
            subsystem = "database",
            component = "notes",
            op = "delete",
            note_id = %id,
            rows = result.rows_affected(),
            "Note deleted"
        );
        Ok(())
    }

    async fn list(&self) -> Result<Vec<Note>> {
        let rows = sqlx::query(
            "SELECT schema_version, record FROM notes ORDER BY created_at DESC, id DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;
        rows.iter().map(Self::decode_row).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_text_is_fixed_width() {
        let a: DateTime<Utc> = "2026-01-01T00:00:00Z".parse().unwrap();
        let b: DateTime<Utc> = "2026-01-01T00:00:00.5Z".parse().unwrap();
        assert_eq!(ts(a).len(), ts(b).len());
        assert!(ts(a) < ts(b));
    }
}
