//! Best-effort scene captions from a pretrained classifier.

use std::cmp::Ordering;
use std::sync::Arc;
use std::time::Instant;

use tracing::debug;

use snapnote_core::defaults::{CAPTION_EMPTY, CAPTION_PREFIX, CAPTION_TOP_LABELS};
use snapnote_core::{Error, ImageClassifier, Prediction, Result};

/// Turns classifier predictions into a short caption.
#[derive(Clone)]
pub struct SceneCaptioner {
    classifier: Arc<dyn ImageClassifier>,
}

impl SceneCaptioner {
    pub fn new(classifier: Arc<dyn ImageClassifier>) -> Self {
        Self { classifier }
    }

    pub fn model_name(&self) -> &str {
        self.classifier.model_name()
    }

    /// Caption an encoded image. Undecodable input fails before the
    /// classifier is consulted.
    pub async fn caption(&self, data: Arc<[u8]>, mime_type: &str) -> Result<String> {
        let start = Instant::now();

        let bytes = Arc::clone(&data);
        tokio::task::spawn_blocking(move || image::load_from_memory(&bytes).map(|_| ()))
            .await
            .map_err(|e| Error::Caption(format!("Caption task failed: {}", e)))?
            .map_err(|e| Error::Caption(format!("Failed to load image for vision: {}", e)))?;

        let predictions = self
            .classifier
            .classify(&data, mime_type)
            .await
            .map_err(|e| match e {
                Error::Caption(_) => e,
                other => Error::Caption(other.to_string()),
            })?;

        let caption = format_caption(predictions);
        debug!(
            subsystem = "pipeline",
            component = "captioner",
            op = "caption",
            model = self.classifier.model_name(),
            duration_ms = start.elapsed().as_millis() as u64,
            caption = %caption,
            "Scene captioned"
        );
        Ok(caption)
    }
}

/// `"Content detected: a, b, c"` from the three best-scoring predictions,
/// or `"No content detected"`.
pub fn format_caption(mut predictions: Vec<Prediction>) -> String {
    if predictions.is_empty() {
        return CAPTION_EMPTY.to_string();
    }
    predictions.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    let labels: Vec<String> = predictions
        .into_iter()
        .take(CAPTION_TOP_LABELS)
        .map(|p| p.label)
        .collect();
    format!("{}{}", CAPTION_PREFIX, labels.join(", "))
}
