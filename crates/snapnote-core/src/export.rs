//! JSON export of all notes.
//!
//! The export is a pretty-printed JSON array of [`Note`] values, offered as a
//! file named with the current date (`notes_backup_2026-10-19.json`).

use chrono::NaiveDate;

use crate::defaults::EXPORT_FILE_PREFIX;
use crate::error::Result;
use crate::models::Note;

/// Serialize notes as a pretty-printed JSON array.
pub fn export_notes(notes: &[Note]) -> Result<String> {
    Ok(serde_json::to_string_pretty(notes)?)
}

/// Parse an export produced by [`export_notes`].
///
/// Notes lacking newer optional fields (`visionCaption`, `updatedAt`) parse
/// with those fields absent.
pub fn parse_export(json: &str) -> Result<Vec<Note>> {
    Ok(serde_json::from_str(json)?)
}

/// File name for an export taken on `date`.
pub fn export_file_name(date: NaiveDate) -> String {
    format!("{}_{}.json", EXPORT_FILE_PREFIX, date.format("%Y-%m-%d"))
}
