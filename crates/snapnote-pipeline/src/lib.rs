//! # snapnote-pipeline
//!
//! Image-to-note extraction pipeline for snapnote.
//!
//! This crate provides:
//! - Image normalization (decode, bound, re-encode, data URL)
//! - The tesseract recognition engine and the shared recognition handle
//! - Best-effort scene captions
//! - The extraction orchestrator with remote-to-local fallback
//! - Clipboard paste ingestion

pub mod captioner;
pub mod clipboard;
pub mod normalizer;
pub mod orchestrator;
pub mod recognition;
pub mod tesseract;

pub use captioner::{format_caption, SceneCaptioner};
pub use clipboard::{process_clipboard, ClipboardItem};
pub use normalizer::{
    normalize, normalize_blocking, target_dimensions, NormalizeOptions, NormalizedImage,
};
pub use orchestrator::{validate_upload, ExtractionOrchestrator, ExtractionPath};
pub use recognition::RecognitionHandle;
pub use tesseract::{RecognitionConfig, TesseractEngine, TesseractFactory};
