//! Pipeline events and the broadcast bus that carries them.
//!
//! The orchestrator reports stage transitions and user-visible warnings here.
//! Front ends subscribe independently; slow receivers that fall behind get a
//! `Lagged` error and miss events.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

/// Pipeline stage of one upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Validating,
    Normalizing,
    Captioning,
    RemoteAnalysis,
    LocalRecognition,
    Assembling,
    Persisted,
    Rejected,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Validating => "validating",
            Stage::Normalizing => "normalizing",
            Stage::Captioning => "captioning",
            Stage::RemoteAnalysis => "remote_analysis",
            Stage::LocalRecognition => "local_recognition",
            Stage::Assembling => "assembling",
            Stage::Persisted => "persisted",
            Stage::Rejected => "rejected",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Domain events emitted while processing uploads.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum PipelineEvent {
    /// An upload entered the pipeline.
    UploadStarted { file_name: String, size_bytes: usize },
    /// An upload moved to a new stage.
    StageEntered { stage: Stage },
    /// A recoverable failure was absorbed; shown to the user transiently.
    Warning { stage: Stage, message: String },
    /// A note was persisted.
    NoteCreated { note_id: Uuid, title: String },
    /// The upload was aborted; no note was created.
    UploadFailed { stage: Stage, error: String },
}

impl PipelineEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            PipelineEvent::UploadStarted { .. } => "upload.started",
            PipelineEvent::StageEntered { .. } => "upload.stage",
            PipelineEvent::Warning { .. } => "upload.warning",
            PipelineEvent::NoteCreated { .. } => "note.created",
            PipelineEvent::UploadFailed { .. } => "upload.failed",
        }
    }
}

/// Event wrapper carrying the upload correlation id.
#[derive(Debug, Clone, Serialize)]
pub struct EventEnvelope {
    /// UUIDv7 event id.
    pub event_id: Uuid,
    pub event_type: String,
    /// Correlates every event of one upload.
    pub upload_id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub payload: PipelineEvent,
}

impl EventEnvelope {
    pub fn new(upload_id: Uuid, event: PipelineEvent) -> Self {
        Self {
            event_id: Uuid::now_v7(),
            event_type: event.event_type().to_string(),
            upload_id,
            occurred_at: Utc::now(),
            payload: event,
        }
    }
}

/// Broadcast-based event bus for pipeline events.
pub struct EventBus {
    tx: broadcast::Sender<EventEnvelope>,
}

impl EventBus {
    /// Create a new event bus with the given buffer capacity.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Emit an event to all subscribers. Dropped silently when nobody listens.
    pub fn emit(&self, upload_id: Uuid, event: PipelineEvent) {
        let envelope = EventEnvelope::new(upload_id, event);
        tracing::trace!(
            event_type = %envelope.event_type,
            upload_id = %upload_id,
            subscriber_count = self.tx.receiver_count(),
            "EventBus emit"
        );
        let _ = self.tx.send(envelope);
    }

    /// Subscribe to receive events. Each subscriber gets its own stream.
    pub fn subscribe(&self) -> broadcast::Receiver<EventEnvelope> {
        self.tx.subscribe()
    }

    /// Returns the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(crate::defaults::EVENT_BUS_CAPACITY)
    }
}
