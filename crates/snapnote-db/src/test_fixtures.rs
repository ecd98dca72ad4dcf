//! Shared helpers for store tests.

use chrono::{DateTime, Duration, TimeZone, Utc};
use snapnote_core::{structure, NewNote};

/// Private in-memory SQLite database; one per pool.
pub const MEMORY_DATABASE_URL: &str = "sqlite::memory:";

/// Fixed base timestamp so ordering assertions are stable.
pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 4, 1, 12, 0, 0)
        .single()
        .unwrap_or_else(Utc::now)
}

/// A note as the pipeline would produce it from `text`, created
/// `offset_secs` after [`base_time`].
pub fn sample_note(text: &str, offset_secs: i64) -> NewNote {
    let facts = structure(text);
    NewNote {
        title: facts.suggested_title.clone(),
        content: text.to_string(),
        original_image: Some("data:image/jpeg;base64,/9j/4AAQSkZJRg==".to_string()),
        tags: facts.keywords.clone(),
        extracted_data: facts,
        vision_caption: None,
        created_at: base_time() + Duration::seconds(offset_secs),
        updated_at: None,
    }
}
