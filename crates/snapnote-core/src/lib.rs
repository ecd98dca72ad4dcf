//! # snapnote-core
//!
//! Core types, traits, and abstractions for snapnote.
//!
//! This crate provides the note data model, the error taxonomy shared by the
//! extraction pipeline, the trait seams for stores and engines, and the pure
//! text structurer.

pub mod defaults;
pub mod error;
pub mod events;
pub mod export;
pub mod logging;
pub mod migration;
pub mod models;
pub mod structurer;
pub mod tags;
pub mod traits;

// Re-export commonly used types at crate root
pub use error::{Error, Result};
pub use events::{EventBus, EventEnvelope, PipelineEvent, Stage};
pub use export::{export_file_name, export_notes, parse_export};
pub use migration::{upgrade_record, MigrationError, MigrationRegistry, RecordMigration};
pub use models::*;
pub use structurer::structure;
pub use tags::{add_tag, normalize_tags, remove_tag, validate_tag};
pub use traits::*;
