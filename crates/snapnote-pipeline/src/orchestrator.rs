//! Extraction orchestrator: one upload in, one persisted note out.
//!
//! Stages per upload:
//!
//! ```text
//! Validating → Normalizing ─┬─ RemoteAnalysis ──failure──▶ LocalRecognition ─┬─ Assembling → Persisted
//!              Captioning ──┘  (credential set)                               │
//!                           └─ LocalRecognition (no credential) ──────────────┘
//! ```
//!
//! Captioning runs alongside normalization and never fails the upload.
//! Remote analysis failures fall back to local recognition with a warning.
//! Every other failure aborts the upload before anything is persisted.

use std::sync::{Arc, Mutex};
use std::time::Instant;

use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use snapnote_core::defaults::MAX_UPLOAD_BYTES;
use snapnote_core::{
    normalize_tags, structure, AnalysisBackend, Error, EventBus, NewNote, Note, NoteId,
    NoteStore, PipelineEvent, Result, Stage, StructuredFacts, UploadFile,
};

use crate::captioner::SceneCaptioner;
use crate::normalizer::{normalize, NormalizeOptions, NormalizedImage};
use crate::recognition::RecognitionHandle;

/// Which extraction path produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionPath {
    Remote,
    Local,
}

impl ExtractionPath {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractionPath::Remote => "remote",
            ExtractionPath::Local => "local",
        }
    }
}

/// Title, content and facts from one extraction path.
#[derive(Debug, Clone)]
struct Extraction {
    path: ExtractionPath,
    content: String,
    facts: StructuredFacts,
}

/// Reject inputs that must not enter the pipeline.
pub fn validate_upload(file: &UploadFile) -> Result<()> {
    if file.size() > MAX_UPLOAD_BYTES {
        return Err(Error::Validation(format!(
            "File '{}' is too large: {} bytes exceeds the {} byte limit",
            file.name,
            file.size(),
            MAX_UPLOAD_BYTES
        )));
    }
    if file.data.is_empty() {
        return Err(Error::Validation(format!("File '{}' is empty", file.name)));
    }
    if let Some(kind) = infer::get(&file.data) {
        if kind.matcher_type() != infer::MatcherType::Image {
            return Err(Error::Validation(format!(
                "File '{}' is not an image ({})",
                file.name,
                kind.mime_type()
            )));
        }
    }
    Ok(())
}

/// Pipeline controller.
pub struct ExtractionOrchestrator {
    store: Arc<dyn NoteStore>,
    recognizer: Arc<RecognitionHandle>,
    analysis: Option<Arc<dyn AnalysisBackend>>,
    captioner: Option<SceneCaptioner>,
    options: NormalizeOptions,
    events: Arc<EventBus>,
    selected: Mutex<Option<NoteId>>,
}

impl ExtractionOrchestrator {
    /// Orchestrator using local recognition only and no captions.
    pub fn new(store: Arc<dyn NoteStore>, recognizer: Arc<RecognitionHandle>) -> Self {
        Self {
            store,
            recognizer,
            analysis: None,
            captioner: None,
            options: NormalizeOptions::default(),
            events: Arc::new(EventBus::default()),
            selected: Mutex::new(None),
        }
    }

    /// Enable the remote path when a credential is supplied to `process`.
    pub fn with_analysis(mut self, backend: Arc<dyn AnalysisBackend>) -> Self {
        self.analysis = Some(backend);
        self
    }

    pub fn with_captioner(mut self, captioner: SceneCaptioner) -> Self {
        self.captioner = Some(captioner);
        self
    }

    pub fn with_normalize_options(mut self, options: NormalizeOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_event_bus(mut self, events: Arc<EventBus>) -> Self {
        self.events = events;
        self
    }

    /// Pipeline event bus.
    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    pub fn recognizer(&self) -> &Arc<RecognitionHandle> {
        &self.recognizer
    }

    /// Id of the most recently persisted note.
    pub fn selected_note(&self) -> Option<NoteId> {
        *self.selected.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Run one file through the pipeline and persist the resulting note.
    ///
    /// `credential` enables remote analysis when non-empty and a backend is
    /// configured.
    pub async fn process(&self, file: UploadFile, credential: Option<&str>) -> Result<Note> {
        let upload_id = Uuid::now_v7();
        let start = Instant::now();

        info!(
            subsystem = "pipeline",
            component = "orchestrator",
            op = "process",
            upload_id = %upload_id,
            file_name = %file.name,
            size_bytes = file.size(),
            "Upload received"
        );
        self.events.emit(
            upload_id,
            PipelineEvent::UploadStarted {
                file_name: file.name.clone(),
                size_bytes: file.size(),
            },
        );

        self.enter(upload_id, Stage::Validating);
        if let Err(e) = validate_upload(&file) {
            return Err(self.fail(upload_id, Stage::Rejected, e));
        }

        let mime_type = file
            .declared_mime
            .clone()
            .or_else(|| infer::get(&file.data).map(|k| k.mime_type().to_string()))
            .unwrap_or_else(|| "application/octet-stream".to_string());
        let data: Arc<[u8]> = file.data.into();

        self.enter(upload_id, Stage::Normalizing);
        let (normalized, caption) = tokio::join!(
            normalize(Arc::clone(&data), &self.options),
            self.caption(upload_id, Arc::clone(&data), &mime_type)
        );
        let normalized = match normalized {
            Ok(normalized) => normalized,
            Err(e) => return Err(self.fail(upload_id, Stage::Normalizing, e)),
        };
        drop(data);

        let credential = credential.map(str::trim).filter(|c| !c.is_empty());
        let remote = match (credential, &self.analysis) {
            (Some(key), Some(backend)) => {
                Some(self.analyze_remote(upload_id, backend.as_ref(), key, &normalized).await)
            }
            _ => None,
        };

        let extraction = match remote {
            Some(Ok(extraction)) => extraction,
            Some(Err(e)) => {
                warn!(
                    subsystem = "pipeline",
                    component = "orchestrator",
                    upload_id = %upload_id,
                    stage = Stage::RemoteAnalysis.as_str(),
                    error = %e,
                    "AI analysis failed, falling back to local OCR"
                );
                self.events.emit(
                    upload_id,
                    PipelineEvent::Warning {
                        stage: Stage::RemoteAnalysis,
                        message: format!("AI analysis failed, falling back to local OCR: {}", e),
                    },
                );
                self.recognize_local(upload_id, &normalized).await?
            }
            None => self.recognize_local(upload_id, &normalized).await?,
        };

        self.enter(upload_id, Stage::Assembling);
        let note = NewNote {
            title: extraction.facts.suggested_title.clone(),
            content: extraction.content,
            original_image: Some(normalized.data_url),
            tags: normalize_tags(extraction.facts.keywords.clone()),
            extracted_data: extraction.facts,
            vision_caption: caption.filter(|c| !c.is_empty()),
            created_at: Utc::now(),
            updated_at: None,
        };

        let id = match self.store.create(note.clone()).await {
            Ok(id) => id,
            Err(e) => return Err(self.fail(upload_id, Stage::Assembling, e)),
        };
        let note = note.with_id(id);
        *self.selected.lock().unwrap_or_else(|p| p.into_inner()) = Some(id);

        self.enter(upload_id, Stage::Persisted);
        self.events.emit(
            upload_id,
            PipelineEvent::NoteCreated {
                note_id: id,
                title: note.title.clone(),
            },
        );
        info!(
            subsystem = "pipeline",
            component = "orchestrator",
            op = "process",
            upload_id = %upload_id,
            note_id = %id,
            path = extraction.path.as_str(),
            duration_ms = start.elapsed().as_millis() as u64,
            success = true,
            "Note created from screenshot"
        );
        Ok(note)
    }

    fn enter(&self, upload_id: Uuid, stage: Stage) {
        debug!(
            subsystem = "pipeline",
            component = "orchestrator",
            upload_id = %upload_id,
            stage = stage.as_str(),
            "Stage entered"
        );
        self.events
            .emit(upload_id, PipelineEvent::StageEntered { stage });
    }

    /// Report a fatal failure and hand the error back.
    fn fail(&self, upload_id: Uuid, stage: Stage, error: Error) -> Error {
        warn!(
            subsystem = "pipeline",
            component = "orchestrator",
            upload_id = %upload_id,
            stage = stage.as_str(),
            error = %error,
            success = false,
            "Upload failed"
        );
        self.events.emit(
            upload_id,
            PipelineEvent::UploadFailed {
                stage,
                error: error.to_string(),
            },
        );
        error
    }

    /// Best-effort caption. `None` when no captioner is configured or it
    /// failed.
    async fn caption(&self, upload_id: Uuid, data: Arc<[u8]>, mime_type: &str) -> Option<String> {
        let captioner = self.captioner.as_ref()?;
        self.enter(upload_id, Stage::Captioning);
        match captioner.caption(data, mime_type).await {
            Ok(caption) => Some(caption),
            Err(e) => {
                warn!(
                    subsystem = "pipeline",
                    component = "orchestrator",
                    upload_id = %upload_id,
                    stage = Stage::Captioning.as_str(),
                    model = captioner.model_name(),
                    error = %e,
                    "Scene captioning failed, continuing without caption"
                );
                self.events.emit(
                    upload_id,
                    PipelineEvent::Warning {
                        stage: Stage::Captioning,
                        message: e.to_string(),
                    },
                );
                None
            }
        }
    }

    async fn analyze_remote(
        &self,
        upload_id: Uuid,
        backend: &dyn AnalysisBackend,
        credential: &str,
        image: &NormalizedImage,
    ) -> Result<Extraction> {
        self.enter(upload_id, Stage::RemoteAnalysis);
        let result = backend
            .analyze(credential, &image.data_url)
            .await
            .map_err(|e| match e {
                Error::Analysis(_) => e,
                other => Error::Analysis(other.to_string()),
            })?;
        Ok(Extraction {
            path: ExtractionPath::Remote,
            content: result.summary,
            facts: result.facts,
        })
    }

    async fn recognize_local(&self, upload_id: Uuid, image: &NormalizedImage) -> Result<Extraction> {
        self.enter(upload_id, Stage::LocalRecognition);
        let text = match self.recognizer.recognize(&image.binary).await {
            Ok(text) => text,
            Err(e) => return Err(self.fail(upload_id, Stage::LocalRecognition, e)),
        };
        let facts = structure(&text);
        Ok(Extraction {
            path: ExtractionPath::Local,
            content: text,
            facts,
        })
    }
}
