//! Note record migrations.
//!
//! A migration is a pure function from one record shape to the next, applied
//! to the JSON form of a stored note. Stores run the chain once at open time
//! for every record older than [`NOTE_SCHEMA_VERSION`].
//!
//! | Version | Shape change |
//! |---------|--------------|
//! | 1 | `id, title, content, originalImage?, extractedData, createdAt` |
//! | 2 | `tags` indexed and always present, `updatedAt` added |
//! | 3 | optional `visionCaption` |

use serde_json::Value;
use thiserror::Error;

use crate::defaults::NOTE_SCHEMA_VERSION;
use crate::models::Note;

/// Error types for migration operations.
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("No migration path found from v{from} to v{to}")]
    NoMigrationPath { from: u32, to: u32 },

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    #[error("Record is not a JSON object")]
    NotAnObject,
}

impl From<MigrationError> for crate::Error {
    fn from(e: MigrationError) -> Self {
        crate::Error::Serialization(e.to_string())
    }
}

/// A single record-shape upgrade.
pub trait RecordMigration: Send + Sync {
    /// Source version this migration applies to.
    fn from_version(&self) -> u32;

    /// Human-readable description of the migration.
    fn description(&self) -> &str;

    /// Perform the migration. Produces version `from_version() + 1`.
    fn migrate(&self, record: Value) -> Result<Value, MigrationError>;
}

/// v1 → v2: make `tags` present and backfill `updatedAt` from `createdAt`.
pub struct AddUpdatedAt;

impl RecordMigration for AddUpdatedAt {
    fn from_version(&self) -> u32 {
        1
    }

    fn description(&self) -> &str {
        "backfill updatedAt from createdAt and default tags"
    }

    fn migrate(&self, mut record: Value) -> Result<Value, MigrationError> {
        let obj = record.as_object_mut().ok_or(MigrationError::NotAnObject)?;
        if !obj.get("tags").is_some_and(Value::is_array) {
            obj.insert("tags".to_string(), Value::Array(Vec::new()));
        }
        let missing = obj.get("updatedAt").map_or(true, Value::is_null);
        if missing {
            let created = obj.get("createdAt").cloned().ok_or_else(|| {
                MigrationError::MigrationFailed("record has no createdAt".to_string())
            })?;
            obj.insert("updatedAt".to_string(), created);
        }
        Ok(record)
    }
}

/// v2 → v3: `visionCaption` is optional, so nothing is rewritten.
pub struct AddVisionCaption;

impl RecordMigration for AddVisionCaption {
    fn from_version(&self) -> u32 {
        2
    }

    fn description(&self) -> &str {
        "introduce optional visionCaption"
    }

    fn migrate(&self, record: Value) -> Result<Value, MigrationError> {
        if !record.is_object() {
            return Err(MigrationError::NotAnObject);
        }
        Ok(record)
    }
}

/// Registry of record migrations, applied in version order.
pub struct MigrationRegistry {
    migrations: Vec<Box<dyn RecordMigration>>,
}

impl MigrationRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            migrations: Vec::new(),
        }
    }

    /// Registry with every built-in migration.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(AddUpdatedAt));
        registry.register(Box::new(AddVisionCaption));
        registry
    }

    /// Register a migration.
    pub fn register(&mut self, migration: Box<dyn RecordMigration>) {
        self.migrations.push(migration);
    }

    /// Upgrade a record from `from` to `to`, one version at a time.
    pub fn migrate(&self, record: Value, from: u32, to: u32) -> Result<Value, MigrationError> {
        let mut current = record;
        let mut version = from;
        while version < to {
            let step = self
                .migrations
                .iter()
                .find(|m| m.from_version() == version)
                .ok_or(MigrationError::NoMigrationPath { from: version, to })?;
            tracing::trace!(
                from = version,
                description = step.description(),
                "Applying record migration"
            );
            current = step.migrate(current)?;
            version += 1;
        }
        Ok(current)
    }
}

impl Default for MigrationRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Upgrade a stored record of any known version to the current [`Note`].
pub fn upgrade_record(record: Value, version: u32) -> crate::Result<Note> {
    let upgraded = MigrationRegistry::builtin().migrate(record, version, NOTE_SCHEMA_VERSION)?;
    Ok(serde_json::from_value(upgraded)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_v1_to_v2_backfills_updated_at() {
        let record = json!({"createdAt": "2024-01-01T00:00:00Z"});
        let out = AddUpdatedAt.migrate(record).unwrap();
        assert_eq!(out["updatedAt"], "2024-01-01T00:00:00Z");
        assert_eq!(out["tags"], json!([]));
    }

    #[test]
    fn test_v1_to_v2_keeps_existing_updated_at() {
        let record = json!({
            "createdAt": "2024-01-01T00:00:00Z",
            "updatedAt": "2024-03-01T00:00:00Z",
            "tags": ["kept"]
        });
        let out = AddUpdatedAt.migrate(record).unwrap();
        assert_eq!(out["updatedAt"], "2024-03-01T00:00:00Z");
        assert_eq!(out["tags"], json!(["kept"]));
    }

    #[test]
    fn test_v1_without_created_at_fails() {
        assert!(AddUpdatedAt.migrate(json!({})).is_err());
    }

    #[test]
    fn test_non_object_rejected() {
        assert!(matches!(
            AddVisionCaption.migrate(json!([1, 2])),
            Err(MigrationError::NotAnObject)
        ));
    }

    #[test]
    fn test_missing_path() {
        let registry = MigrationRegistry::new();
        let err = registry.migrate(json!({}), 1, 3).unwrap_err();
        assert!(matches!(
            err,
            MigrationError::NoMigrationPath { from: 1, to: 3 }
        ));
    }

    #[test]
    fn test_same_version_is_identity() {
        let registry = MigrationRegistry::new();
        let record = json!({"a": 1});
        assert_eq!(registry.migrate(record.clone(), 3, 3).unwrap(), record);
    }
}
