//! # snapnote-db
//!
//! SQLite database layer for snapnote.
//!
//! This crate provides:
//! - Connection pool management
//! - Schema creation
//! - The SQLite [`NoteStore`] with record upgrades at open time
//! - An in-memory [`NoteStore`]
//!
//! ## Example
//!
//! ```rust,ignore
//! use snapnote_db::{Database, NoteStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::connect("sqlite://notes.db").await?;
//!     for note in db.notes.list().await? {
//!         println!("{} {}", note.id, note.title);
//!     }
//!     Ok(())
//! }
//! ```

pub mod memory;
pub mod notes;
pub mod pool;
pub mod schema;

// Test fixtures for integration tests
pub mod test_fixtures;

// Re-export core types
pub use snapnote_core::*;

pub use memory::MemoryNoteStore;
pub use notes::SqliteNoteStore;
pub use pool::{create_pool, create_pool_with_config, log_pool_metrics, open_file, PoolConfig};
pub use schema::apply_schema;

use std::path::Path;

/// Combined database context.
#[derive(Clone)]
pub struct Database {
    /// The underlying connection pool.
    pub pool: sqlx::SqlitePool,
    /// Note store for CRUD operations.
    pub notes: SqliteNoteStore,
}

impl Database {
    /// Apply the schema, upgrade old records, and build the context.
    pub async fn new(pool: sqlx::SqlitePool) -> Result<Self> {
        let notes = SqliteNoteStore::open(pool.clone()).await?;
        Ok(Self { pool, notes })
    }

    /// Connect to a database URL (`sqlite://…` or `sqlite::memory:`).
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = create_pool(url).await?;
        Self::new(pool).await
    }

    /// Open the database file at `path`, creating it when missing.
    pub async fn open(path: &Path) -> Result<Self> {
        let pool = open_file(path, PoolConfig::default()).await?;
        Self::new(pool).await
    }
}
