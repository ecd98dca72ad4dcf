//! Structured logging schema and field name constants for snapnote.
//!
//! All crates use these constants for consistent structured logging fields.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Upload aborted, no note created |
//! | WARN  | Recoverable issue, automatic fallback applied |
//! | INFO  | Lifecycle events (engine start/shutdown), note created |
//! | DEBUG | Decision points, stage transitions, config choices |
//! | TRACE | Per-item iteration (tokens, clipboard items) |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Correlation ID for one upload, UUIDv7.
pub const UPLOAD_ID: &str = "upload_id";

/// Subsystem originating the log event.
/// Values: "pipeline", "db", "inference", "cli"
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem.
/// Examples: "orchestrator", "recognizer", "normalizer", "gemini", "sqlite"
pub const COMPONENT: &str = "component";

/// Logical operation name.
/// Examples: "process", "recognize", "analyze", "create"
pub const OPERATION: &str = "op";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// Note UUID being operated on.
pub const NOTE_ID: &str = "note_id";

/// Pipeline stage name.
pub const STAGE: &str = "stage";

/// Uploaded file name.
pub const FILE_NAME: &str = "file_name";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Input size in bytes.
pub const SIZE_BYTES: &str = "size_bytes";

/// Number of characters of recognized text.
pub const TEXT_LEN: &str = "text_len";

/// Byte length of a model response.
pub const RESPONSE_LEN: &str = "response_len";

// ─── Inference fields ──────────────────────────────────────────────────────

/// Model name used for inference.
pub const MODEL: &str = "model";

/// Extraction path taken ("remote", "local").
pub const EXTRACTION_PATH: &str = "path";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Boolean success/failure indicator.
pub const SUCCESS: &str = "success";

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";
