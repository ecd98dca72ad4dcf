//! Command implementations.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{bail, Context};
use futures::future::join_all;
use tokio::io::AsyncReadExt;
use tokio::sync::broadcast::error::TryRecvError;
use tracing::{info, warn};
use uuid::Uuid;

use snapnote_core::defaults::DB_FILE_NAME;
use snapnote_core::{
    add_tag, export_file_name, export_notes, remove_tag, Note, NoteStore, NoteUpdate,
    PipelineEvent, UploadFile,
};
use snapnote_db::Database;
use snapnote_inference::{
    GeminiAnalysisBackend, InferenceConfig, OllamaVisionBackend, VisionBackend, VisionConfig,
    VisionLabelClassifier,
};
use snapnote_pipeline::{
    process_clipboard, ClipboardItem, ExtractionOrchestrator, RecognitionHandle, SceneCaptioner,
};

use crate::settings::{mask_key, Settings};
use crate::ConfigAction;

/// Default database path (`<data_dir>/snapnote/notes.db`).
pub fn default_db_path() -> PathBuf {
    let mut path = dirs::data_dir().unwrap_or_else(|| PathBuf::from(".local/share"));
    path.push("snapnote");
    path.push(DB_FILE_NAME);
    path
}

/// Declared MIME type for a file, from its extension.
fn mime_from_extension(path: &Path) -> Option<String> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    let mime = match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        _ => return None,
    };
    Some(mime.to_string())
}

fn parse_id(id: &str) -> anyhow::Result<Uuid> {
    Uuid::parse_str(id.trim()).with_context(|| format!("Invalid note id '{}'", id))
}

fn print_summary(note: &Note) {
    let tags = if note.tags.is_empty() {
        String::new()
    } else {
        format!("  [{}]", note.tags.join(", "))
    };
    println!(
        "{}  {}  {}{}",
        note.id,
        note.created_at.format("%Y-%m-%d %H:%M"),
        note.title,
        tags
    );
}

fn print_note(note: &Note) {
    println!("id:       {}", note.id);
    println!("title:    {}", note.title);
    println!("created:  {}", note.created_at.to_rfc3339());
    if let Some(updated) = note.updated_at {
        println!("updated:  {}", updated.to_rfc3339());
    }
    if !note.tags.is_empty() {
        println!("tags:     {}", note.tags.join(", "));
    }
    if let Some(caption) = &note.vision_caption {
        println!("caption:  {}", caption);
    }
    let facts = &note.extracted_data;
    if !facts.urls.is_empty() {
        println!("urls:     {}", facts.urls.join(" "));
    }
    if !facts.emails.is_empty() {
        println!("emails:   {}", facts.emails.join(" "));
    }
    println!();
    println!("{}", note.content);
}

/// Store plus the pipeline wired from configuration.
pub struct App {
    db: Database,
    orchestrator: ExtractionOrchestrator,
    credential: Option<String>,
}

impl App {
    pub async fn open(db_path: &Path, settings_path: &Path) -> anyhow::Result<Self> {
        let db = Database::open(db_path)
            .await
            .with_context(|| format!("Failed to open database {}", db_path.display()))?;

        let settings = Settings::load_from(settings_path)?;
        let credential = settings.credential();

        let config = InferenceConfig::load().context("Invalid inference configuration")?;
        let analysis = GeminiAnalysisBackend::new(config.gemini.clone())?;

        let mut orchestrator =
            ExtractionOrchestrator::new(Arc::new(db.notes.clone()), RecognitionHandle::global())
                .with_analysis(Arc::new(analysis));
        if let Some(backend) = OllamaVisionBackend::from_config(&config.vision) {
            orchestrator = orchestrator
                .with_captioner(SceneCaptioner::new(Arc::new(VisionLabelClassifier::new(backend))));
        }

        let notes = db.notes.count().await?;
        info!(
            subsystem = "cli",
            op = "open",
            db = %db_path.display(),
            notes,
            remote_analysis = credential.is_some(),
            captions = config.vision.enabled(),
            "snapnote ready"
        );

        Ok(Self {
            db,
            orchestrator,
            credential,
        })
    }

    #[cfg(test)]
    pub(crate) fn database(&self) -> &Database {
        &self.db
    }

    /// Release the recognition engine and close the pool.
    pub async fn close(self) {
        if let Err(e) = self.orchestrator.recognizer().shutdown().await {
            warn!(subsystem = "cli", op = "close", error = %e, "Recognition shutdown failed");
        }
        self.db.pool.close().await;
    }

    fn report_warnings(
        rx: &mut tokio::sync::broadcast::Receiver<snapnote_core::EventEnvelope>,
    ) {
        loop {
            match rx.try_recv() {
                Ok(envelope) => {
                    if let PipelineEvent::Warning { message, .. } = envelope.payload {
                        eprintln!("warning: {}", message);
                    }
                }
                Err(TryRecvError::Lagged(_)) => continue,
                Err(_) => break,
            }
        }
    }

    pub async fn add(&self, files: Vec<PathBuf>) -> anyhow::Result<ExitCode> {
        let mut rx = self.orchestrator.events().subscribe();
        let credential = self.credential.as_deref();

        let jobs = files.iter().map(|path| async move {
            let data = tokio::fs::read(path)
                .await
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());
            let file = UploadFile::new(name, mime_from_extension(path), data);
            let note = self.orchestrator.process(file, credential).await?;
            anyhow::Ok(note)
        });
        let outcomes = join_all(jobs).await;
        Self::report_warnings(&mut rx);

        let mut failed = 0;
        for (path, outcome) in files.iter().zip(outcomes) {
            match outcome {
                Ok(note) => print_summary(&note),
                Err(e) => {
                    failed += 1;
                    eprintln!("{}: {:#}", path.display(), e);
                }
            }
        }
        Ok(if failed == 0 {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        })
    }

    pub async fn paste(&self, mime: String) -> anyhow::Result<ExitCode> {
        let mut data = Vec::new();
        tokio::io::stdin()
            .read_to_end(&mut data)
            .await
            .context("Failed to read stdin")?;

        let mut rx = self.orchestrator.events().subscribe();
        let item = ClipboardItem::new(mime.clone(), data);
        let outcomes =
            process_clipboard(&self.orchestrator, vec![item], self.credential.as_deref()).await;
        Self::report_warnings(&mut rx);

        if outcomes.is_empty() {
            bail!("Nothing to paste: '{}' is not an image type", mime);
        }
        let mut code = ExitCode::SUCCESS;
        for outcome in outcomes {
            match outcome {
                Ok(note) => print_summary(&note),
                Err(e) => {
                    eprintln!("paste: {}", e);
                    code = ExitCode::FAILURE;
                }
            }
        }
        Ok(code)
    }

    pub async fn list(&self, tag: Option<&str>) -> anyhow::Result<ExitCode> {
        let notes = match tag {
            Some(tag) => self.db.notes.list_by_tag(tag).await?,
            None => self.db.notes.list().await?,
        };
        notes.iter().for_each(print_summary);
        Ok(ExitCode::SUCCESS)
    }

    pub async fn show(&self, id: &str, json: bool) -> anyhow::Result<ExitCode> {
        let id = parse_id(id)?;
        let Some(note) = self.db.notes.get(id).await? else {
            bail!("Note not found: {}", id);
        };
        if json {
            println!("{}", export_notes(std::slice::from_ref(&note))?);
        } else {
            print_note(&note);
        }
        Ok(ExitCode::SUCCESS)
    }

    pub async fn search(&self, query: &str) -> anyhow::Result<ExitCode> {
        let notes = self.db.notes.search(query).await?;
        notes.iter().for_each(print_summary);
        Ok(ExitCode::SUCCESS)
    }

    pub async fn edit(
        &self,
        id: &str,
        title: Option<String>,
        content: Option<String>,
    ) -> anyhow::Result<ExitCode> {
        let id = parse_id(id)?;
        let mut changes = NoteUpdate::default();
        if let Some(title) = title {
            changes = changes.title(title);
        }
        if let Some(content) = content {
            changes = changes.content(content);
        }
        if changes.is_empty() {
            bail!("Nothing to change: pass --title and/or --content");
        }
        if self.db.notes.update(id, changes).await? == 0 {
            bail!("Note not found: {}", id);
        }
        println!("Updated {}", id);
        Ok(ExitCode::SUCCESS)
    }

    pub async fn tag(&self, id: &str, tag: &str, add: bool) -> anyhow::Result<ExitCode> {
        let id = parse_id(id)?;
        let Some(note) = self.db.notes.get(id).await? else {
            bail!("Note not found: {}", id);
        };
        let mut tags = note.tags;
        let changed = if add {
            add_tag(&mut tags, tag)?
        } else {
            remove_tag(&mut tags, tag)
        };
        if changed {
            self.db
                .notes
                .update(id, NoteUpdate::default().tags(tags.clone()))
                .await?;
        }
        println!("{}: [{}]", id, tags.join(", "));
        Ok(ExitCode::SUCCESS)
    }

    pub async fn delete(&self, id: &str) -> anyhow::Result<ExitCode> {
        let id = parse_id(id)?;
        self.db.notes.delete(id).await?;
        println!("Deleted {}", id);
        Ok(ExitCode::SUCCESS)
    }

    pub async fn export(&self, dir: &Path) -> anyhow::Result<ExitCode> {
        let notes = self.db.notes.list().await?;
        let json = export_notes(&notes)?;
        let path = dir.join(export_file_name(chrono::Local::now().date_naive()));
        tokio::fs::write(&path, json)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!(
            subsystem = "cli",
            op = "export",
            count = notes.len(),
            path = %path.display(),
            "Notes exported"
        );
        println!("Exported {} notes to {}", notes.len(), path.display());
        Ok(ExitCode::SUCCESS)
    }
}

/// Start the shared recognition engine and report the outcome.
pub async fn warmup() -> anyhow::Result<ExitCode> {
    let handle = RecognitionHandle::global();
    let start = Instant::now();
    let outcome = handle.ensure_ready().await;
    let elapsed = start.elapsed();
    handle.shutdown().await?;
    match outcome {
        Ok(()) => {
            println!("Recognition engine ready in {} ms", elapsed.as_millis());
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            eprintln!("{}", e);
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Caption model line for `config show`. Contacts the server when a model
/// is configured.
async fn captioner_status(config: &VisionConfig) -> String {
    let Some(backend) = OllamaVisionBackend::from_config(config) else {
        return "(disabled)".to_string();
    };
    let reachable = backend.health_check().await.unwrap_or(false);
    format!(
        "{} at {} ({})",
        backend.model_name(),
        config.base_url,
        if reachable { "reachable" } else { "unreachable" }
    )
}

pub async fn config(settings_path: &Path, action: ConfigAction) -> anyhow::Result<()> {
    let mut settings = Settings::load_from(settings_path)?;
    match action {
        ConfigAction::SetKey { key } => {
            settings.set_key(&key);
            if settings.gemini_api_key.is_none() {
                bail!("API key cannot be empty; use clear-key to remove it");
            }
            settings.save_to(settings_path)?;
            println!("API key saved to {}", settings_path.display());
        }
        ConfigAction::ClearKey => {
            settings.clear_key();
            settings.save_to(settings_path)?;
            println!("API key cleared");
        }
        ConfigAction::Show => {
            let inference = InferenceConfig::load().context("Invalid inference configuration")?;
            println!("settings:        {}", settings_path.display());
            match settings.credential() {
                Some(key) => println!("gemini api key:  {}", mask_key(&key)),
                None => println!("gemini api key:  (not set, local recognition only)"),
            }
            println!("gemini model:    {}", inference.gemini.model);
            println!(
                "caption model:   {}",
                captioner_status(&inference.vision).await
            );
            println!("database:        {}", default_db_path().display());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_mime_from_extension() {
        assert_eq!(
            mime_from_extension(Path::new("a/shot.PNG")).as_deref(),
            Some("image/png")
        );
        assert_eq!(
            mime_from_extension(Path::new("photo.jpeg")).as_deref(),
            Some("image/jpeg")
        );
        assert_eq!(mime_from_extension(Path::new("notes.txt")), None);
        assert_eq!(mime_from_extension(Path::new("noext")), None);
    }

    #[test]
    fn test_parse_id() {
        let id = Uuid::now_v7();
        assert_eq!(parse_id(&format!(" {} ", id)).unwrap(), id);
        assert!(parse_id("not-a-uuid").is_err());
    }

    #[tokio::test]
    async fn test_captioner_status_disabled_without_model() {
        let config = VisionConfig::default();
        assert_eq!(captioner_status(&config).await, "(disabled)");
    }

    #[tokio::test]
    async fn test_captioner_status_reports_reachability() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/tags"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"models":[]}"#))
            .mount(&server)
            .await;

        let up = VisionConfig {
            base_url: server.uri(),
            model: Some("llava".to_string()),
            ..Default::default()
        };
        assert_eq!(
            captioner_status(&up).await,
            format!("llava at {} (reachable)", server.uri())
        );

        let down = VisionConfig {
            base_url: "http://127.0.0.1:1".to_string(),
            model: Some("llava".to_string()),
            ..Default::default()
        };
        assert!(captioner_status(&down).await.ends_with("(unreachable)"));
    }

    #[test]
    fn test_default_db_path_ends_with_file_name() {
        let path = default_db_path();
        assert!(path.ends_with(Path::new("snapnote").join(DB_FILE_NAME)));
    }
}
