//! Data models for notes and extraction results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::tags::normalize_tags;

/// Opaque note identifier, assigned by the store on creation.
pub type NoteId = Uuid;

// =============================================================================
// EXTRACTION
// =============================================================================

/// Structured facts pulled out of recognized or summarized text.
///
/// `keywords` are unique by construction; `urls`, `emails` and `sentences`
/// keep duplicates exactly as they occur in the source text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuredFacts {
    #[serde(default)]
    pub urls: Vec<String>,
    #[serde(default)]
    pub emails: Vec<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub sentences: Vec<String>,
    /// Absent on records written before titles were stored with the facts.
    #[serde(default)]
    pub suggested_title: String,
}

/// Output of the remote multimodal analysis path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub summary: String,
    pub facts: StructuredFacts,
}

/// A single scene-classifier prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub label: String,
    /// Relative confidence; higher is better.
    pub score: f32,
}

/// A raw file handed to the pipeline (manual upload or clipboard paste).
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub name: String,
    /// MIME type declared by the source, if any.
    pub declared_mime: Option<String>,
    pub data: Vec<u8>,
}

impl UploadFile {
    pub fn new(name: impl Into<String>, declared_mime: Option<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            declared_mime,
            data,
        }
    }

    /// Reported size in bytes.
    pub fn size(&self) -> usize {
        self.data.len()
    }
}

// =============================================================================
// NOTES
// =============================================================================

/// A persisted note.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: NoteId,
    pub title: String,
    /// Raw recognized text (local path) or model summary (remote path).
    pub content: String,
    /// Normalized image as a data URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_image: Option<String>,
    pub extracted_data: StructuredFacts,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vision_caption: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// A note that has not been persisted yet; the store assigns its id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewNote {
    pub title: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_image: Option<String>,
    pub extracted_data: StructuredFacts,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vision_caption: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl NewNote {
    /// Attach the store-assigned id.
    pub fn with_id(self, id: NoteId) -> Note {
        Note {
            id,
            title: self.title,
            content: self.content,
            original_image: self.original_image,
            extracted_data: self.extracted_data,
            tags: normalize_tags(self.tags),
            vision_caption: self.vision_caption,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Partial update of the user-editable note fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteUpdate {
    pub title: Option<String>,
    pub content: Option<String>,
    pub tags: Option<Vec<String>>,
}

impl NoteUpdate {
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn tags(mut self, tags: Vec<String>) -> Self {
        self.tags = Some(tags);
        self
    }

    /// True when no field would change.
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.content.is_none() && self.tags.is_none()
    }

    /// Apply the patch and stamp `updated_at`.
    pub fn apply(&self, note: &mut Note, now: DateTime<Utc>) {
        if let Some(title) = &self.title {
            note.title = title.clone();
        }
        if let Some(content) = &self.content {
            note.content = content.clone();
        }
        if let Some(tags) = &self.tags {
            note.tags = normalize_tags(tags.clone());
        }
        note.updated_at = Some(now);
    }
}

/// Case-insensitive match of a search query against title, tags and content.
pub fn note_matches_query(note: &Note, query: &str) -> bool {
    let query = query.to_lowercase();
    note.title.to_lowercase().contains(&query)
        || note.tags.iter().any(|t| t.to_lowercase().contains(&query))
        || note.content.to_lowercase().contains(&query)
}
