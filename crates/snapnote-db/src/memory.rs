//! In-memory [`NoteStore`] for tests and ephemeral sessions.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use snapnote_core::{NewNote, Note, NoteId, NoteStore, NoteUpdate, Result};

/// Note store holding everything in a map.
#[derive(Default)]
pub struct MemoryNoteStore {
    notes: RwLock<HashMap<NoteId, Note>>,
}

impl MemoryNoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored notes.
    pub async fn len(&self) -> usize {
        self.notes.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.notes.read().await.is_empty()
    }
}

#[async_trait]
impl NoteStore for MemoryNoteStore {
    async fn create(&self, note: NewNote) -> Result<NoteId> {
        let id = Uuid::now_v7();
        self.notes.write().await.insert(id, note.with_id(id));
        Ok(id)
    }

    async fn get(&self, id: NoteId) -> Result<Option<Note>> {
        Ok(self.notes.read().await.get(&id).cloned())
    }

    async fn update(&self, id: NoteId, changes: NoteUpdate) -> Result<u64> {
        let mut notes = self.notes.write().await;
        match notes.get_mut(&id) {
            Some(note) => {
                changes.apply(note, Utc::now());
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn delete(&self, id: NoteId) -> Result<()> {
        self.notes.write().await.remove(&id);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<Note>> {
        let mut notes: Vec<Note> = self.notes.read().await.values().cloned().collect();
        notes.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(notes)
    }
}
