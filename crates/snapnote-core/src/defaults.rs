//! Centralized default constants for snapnote.
//!
//! **This module is the single source of truth** for shared default values.
//! All crates reference these constants instead of defining their own magic
//! numbers.

// =============================================================================
// UPLOAD
// =============================================================================

/// Largest accepted upload, in bytes (10 MB).
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

// =============================================================================
// IMAGE NORMALIZATION
// =============================================================================

/// Maximum output width after normalization.
pub const NORMALIZE_MAX_WIDTH: u32 = 1920;

/// Maximum output height after normalization.
pub const NORMALIZE_MAX_HEIGHT: u32 = 1080;

/// Default re-encode quality in `(0, 1]`.
pub const NORMALIZE_QUALITY: f32 = 0.85;

/// Default transport format for normalized images.
pub const NORMALIZE_FORMAT: &str = "image/jpeg";

// =============================================================================
// TEXT STRUCTURING
// =============================================================================

/// Maximum number of keywords kept by the structurer.
pub const KEYWORD_LIMIT: usize = 5;

/// Minimum keyword length in characters.
pub const KEYWORD_MIN_LEN: usize = 4;

/// Sentences must be strictly longer than this many characters.
pub const SENTENCE_MIN_LEN: usize = 5;

/// Maximum characters kept from the first sentence for a suggested title.
pub const TITLE_MAX_CHARS: usize = 30;

/// Marker appended to a truncated title.
pub const TITLE_ELLIPSIS: char = '…';

/// Title used when no sentence or keyword is available.
pub const DEFAULT_TITLE: &str = "New Note";

// =============================================================================
// SCENE CAPTIONING
// =============================================================================

/// Number of classifier labels included in a caption.
pub const CAPTION_TOP_LABELS: usize = 3;

/// Prefix for a caption with at least one label.
pub const CAPTION_PREFIX: &str = "Content detected: ";

/// Caption used when the classifier returns nothing.
pub const CAPTION_EMPTY: &str = "No content detected";

// =============================================================================
// LOCAL RECOGNITION (TESSERACT)
// =============================================================================

/// Tesseract language packs loaded by the local engine.
pub const OCR_LANGUAGES: &str = "eng+chi_sim";

/// Tesseract executable name.
pub const OCR_BINARY: &str = "tesseract";

/// Concurrent recognitions allowed through the single engine.
pub const OCR_MAX_CONCURRENCY: usize = 2;

/// Timeout for one tesseract invocation, in seconds.
pub const OCR_CMD_TIMEOUT_SECS: u64 = 120;

/// Environment variable overriding [`OCR_LANGUAGES`].
pub const ENV_OCR_LANGS: &str = "SNAPNOTE_OCR_LANGS";

/// Environment variable overriding [`OCR_BINARY`].
pub const ENV_OCR_BIN: &str = "SNAPNOTE_OCR_BIN";

/// Environment variable overriding [`OCR_MAX_CONCURRENCY`].
pub const ENV_OCR_CONCURRENCY: &str = "SNAPNOTE_OCR_CONCURRENCY";

// =============================================================================
// REMOTE ANALYSIS (GEMINI)
// =============================================================================

/// Gemini API base URL.
pub const GEMINI_URL: &str = "https://generativelanguage.googleapis.com";

/// Gemini multimodal model used for screenshot analysis.
pub const GEMINI_MODEL: &str = "gemini-1.5-flash";

/// MIME type assumed for an image string without a data-URL prefix.
pub const ANALYSIS_DEFAULT_MIME: &str = "image/png";

/// Summary used when the model omits one.
pub const ANALYSIS_DEFAULT_SUMMARY: &str = "No summary available.";

/// Title used when the model omits one.
pub const ANALYSIS_DEFAULT_TITLE: &str = "AI Note";

/// Request timeout for remote and vision calls, in seconds.
pub const INFERENCE_TIMEOUT_SECS: u64 = 120;

/// Environment variable holding the remote-analysis API key.
pub const ENV_GEMINI_API_KEY: &str = "GEMINI_API_KEY";

/// Environment variable overriding [`GEMINI_URL`].
pub const ENV_GEMINI_BASE_URL: &str = "GEMINI_BASE_URL";

/// Environment variable overriding [`GEMINI_MODEL`].
pub const ENV_GEMINI_MODEL: &str = "GEMINI_MODEL";

// =============================================================================
// VISION (OLLAMA)
// =============================================================================

/// Default Ollama base URL.
pub const OLLAMA_URL: &str = "http://localhost:11434";

/// Environment variable naming the Ollama vision model used for captions.
/// Captioning is disabled when unset.
pub const ENV_OLLAMA_VISION_MODEL: &str = "OLLAMA_VISION_MODEL";

// =============================================================================
// STORAGE & EXPORT
// =============================================================================

/// Current persisted note record schema version.
pub const NOTE_SCHEMA_VERSION: u32 = 3;

/// Database file name inside the data directory.
pub const DB_FILE_NAME: &str = "notes.db";

/// Export file name prefix; the date and `.json` are appended.
pub const EXPORT_FILE_PREFIX: &str = "notes_backup";

/// Broadcast capacity for pipeline events.
pub const EVENT_BUS_CAPACITY: usize = 256;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_limit_is_ten_mebibytes() {
        assert_eq!(MAX_UPLOAD_BYTES, 10_485_760);
    }

    #[test]
    fn test_quality_in_range() {
        assert!(NORMALIZE_QUALITY > 0.0 && NORMALIZE_QUALITY <= 1.0);
    }
}
