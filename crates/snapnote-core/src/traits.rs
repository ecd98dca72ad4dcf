//! Core traits for snapnote abstractions.
//!
//! These traits define the interfaces that concrete implementations
//! must satisfy, enabling pluggable backends and testability.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::*;

// =============================================================================
// NOTE STORE
// =============================================================================

/// Predicate used by [`NoteStore::filter`].
pub type NotePredicate<'a> = &'a (dyn Fn(&Note) -> bool + Send + Sync);

/// Persistent record store for notes.
///
/// Implementations provide their own atomicity for each call; callers never
/// span a transaction across calls.
#[async_trait]
pub trait NoteStore: Send + Sync {
    /// Persist a new note and return its assigned id.
    async fn create(&self, note: NewNote) -> Result<NoteId>;

    /// Fetch a note by id.
    async fn get(&self, id: NoteId) -> Result<Option<Note>>;

    /// Apply a partial update, refreshing `updated_at`. Returns the number of
    /// notes changed (0 for an unknown id).
    async fn update(&self, id: NoteId, changes: NoteUpdate) -> Result<u64>;

    /// Delete a note. Deleting an unknown id is a no-op.
    async fn delete(&self, id: NoteId) -> Result<()>;

    /// All notes, newest first.
    async fn list(&self) -> Result<Vec<Note>>;

    /// Notes matching a predicate, newest first.
    async fn filter(&self, predicate: NotePredicate<'_>) -> Result<Vec<Note>> {
        Ok(self
            .list()
            .await?
            .into_iter()
            .filter(|n| predicate(n))
            .collect())
    }

    /// Case-insensitive search over title, tags and content.
    async fn search(&self, query: &str) -> Result<Vec<Note>> {
        let query = query.to_string();
        self.filter(&move |n: &Note| note_matches_query(n, &query))
            .await
    }
}

// =============================================================================
// LOCAL RECOGNITION
// =============================================================================

/// A running text-recognition engine.
///
/// One instance is shared by every caller, so implementations must either
/// serialize or support concurrent `recognize` calls.
#[async_trait]
pub trait OcrEngine: Send + Sync {
    /// Recognize text in encoded image bytes.
    async fn recognize(&self, image: &[u8]) -> Result<String>;

    /// Release engine resources. Called once, on shutdown.
    async fn terminate(&self) -> Result<()>;

    /// Engine name for logging.
    fn name(&self) -> &str;
}

/// Starts [`OcrEngine`] instances. Starting is expensive.
#[async_trait]
pub trait EngineFactory: Send + Sync {
    async fn start(&self) -> Result<Arc<dyn OcrEngine>>;
}

// =============================================================================
// SCENE CLASSIFICATION
// =============================================================================

/// Pretrained visual classifier used for best-effort scene captions.
#[async_trait]
pub trait ImageClassifier: Send + Sync {
    /// Classify an encoded image. Predictions may be returned in any order.
    async fn classify(&self, image: &[u8], mime_type: &str) -> Result<Vec<Prediction>>;

    /// Model name for logging.
    fn model_name(&self) -> &str;
}

// =============================================================================
// REMOTE ANALYSIS
// =============================================================================

/// Hosted multimodal analysis of a screenshot.
///
/// Every failure is reported as `Error::Analysis`; deciding what to do about
/// it is the caller's job.
#[async_trait]
pub trait AnalysisBackend: Send + Sync {
    /// Analyze an image given as a data URL (or bare base64 payload).
    async fn analyze(&self, credential: &str, image: &str) -> Result<AnalysisResult>;

    /// Model name for logging.
    fn model_name(&self) -> &str;
}
