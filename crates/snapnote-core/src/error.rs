//! Error types for snapnote.

use thiserror::Error;

/// Result type alias using snapnote's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for snapnote operations.
///
/// The first six variants are the extraction pipeline's stage failures. Only
/// [`Error::Caption`] and [`Error::Analysis`] are absorbed by the orchestrator;
/// everything else aborts an upload.
#[derive(Error, Debug)]
pub enum Error {
    /// Input rejected before the pipeline starts (oversized, empty, not an image)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Input bytes could not be decoded as an image
    #[error("Decode error: {0}")]
    Decode(String),

    /// Image could not be normalized for display and storage
    #[error("Processing error: {0}")]
    Processing(String),

    /// Scene captioning failed (model load or decode)
    #[error("Caption error: {0}")]
    Caption(String),

    /// Local text recognition failed
    #[error("Recognition error: {0}")]
    Recognition(String),

    /// Remote analysis failed (network, auth, quota, malformed response)
    #[error("Analysis error: {0}")]
    Analysis(String),

    /// Database operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Note not found
    #[error("Note not found: {0}")]
    NoteNotFound(uuid::Uuid),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP/network request failed
    #[error("Request error: {0}")]
    Request(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Request(e.to_string())
    }
}
