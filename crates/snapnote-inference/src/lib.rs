//! # snapnote-inference
//!
//! Hosted and local model backends for snapnote.
//!
//! This crate provides:
//! - The remote screenshot analysis client (Google Gemini)
//! - Prompt and response parsing shared by analysis backends
//! - A vision backend abstraction with an Ollama implementation, and a
//!   label classifier on top of it for scene captions
//! - Inference configuration from TOML and environment

pub mod analysis;
pub mod config;
pub mod gemini;
pub mod vision;

pub use analysis::{parse_analysis_response, split_data_url, ImagePayload, ANALYSIS_PROMPT};
pub use config::{ConfigError, GeminiConfig, InferenceConfig, VisionConfig};
pub use gemini::{GeminiAnalysisBackend, GeminiErrorCode};
pub use vision::{parse_labels, OllamaVisionBackend, VisionBackend, VisionLabelClassifier};

// Re-export core types
pub use snapnote_core::{AnalysisBackend, AnalysisResult, Error, ImageClassifier, Prediction, Result};
