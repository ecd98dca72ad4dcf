//! Vision backend traits and implementations for scene labels.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use snapnote_core::{Error, ImageClassifier, Prediction, Result};

use crate::config::VisionConfig;

/// Prompt asking for short, ranked scene labels.
pub const LABEL_PROMPT: &str = "List the main objects or scene categories visible in this image \
as a comma-separated list of short labels, most prominent first. Reply with the labels only.";

/// Backend for describing images using vision LLMs.
#[async_trait]
pub trait VisionBackend: Send + Sync {
    /// Describe an image, optionally with a custom prompt.
    async fn describe_image(
        &self,
        image_data: &[u8],
        mime_type: &str,
        prompt: Option<&str>,
    ) -> Result<String>;

    /// Check if the vision backend is available.
    async fn health_check(&self) -> Result<bool>;

    /// Get the model name being used.
    fn model_name(&self) -> &str;
}

/// Ollama-based vision backend (e.g. llava, qwen2.5vl).
pub struct OllamaVisionBackend {
    base_url: String,
    model: String,
    client: reqwest::Client,
    timeout_secs: u64,
}

impl OllamaVisionBackend {
    pub fn new(base_url: String, model: String) -> Self {
        Self {
            base_url,
            model,
            client: reqwest::Client::new(),
            timeout_secs: snapnote_core::defaults::INFERENCE_TIMEOUT_SECS,
        }
    }

    /// Create from configuration. Returns None when no vision model is set.
    pub fn from_config(config: &VisionConfig) -> Option<Self> {
        let model = config.model.clone()?;
        let mut backend = Self::new(config.base_url.clone(), model);
        backend.timeout_secs = config.timeout_secs;
        Some(backend)
    }
}

#[derive(Serialize)]
struct OllamaGenerateRequest {
    model: String,
    prompt: String,
    images: Vec<String>, // base64 encoded
    stream: bool,
}

#[derive(Deserialize)]
struct OllamaGenerateResponse {
    response: String,
}

#[async_trait]
impl VisionBackend for OllamaVisionBackend {
    async fn describe_image(
        &self,
        image_data: &[u8],
        _mime_type: &str,
        prompt: Option<&str>,
    ) -> Result<String> {
        use base64::Engine;
        let image_b64 = base64::engine::general_purpose::STANDARD.encode(image_data);

        let request = OllamaGenerateRequest {
            model: self.model.clone(),
            prompt: prompt.unwrap_or(LABEL_PROMPT).to_string(),
            images: vec![image_b64],
            stream: false,
        };

        let url = format!("{}/api/generate", self.base_url.trim_end_matches('/'));
        let response = self
            .client
            .post(&url)
            .json(&request)
            .timeout(Duration::from_secs(self.timeout_secs))
            .send()
            .await
            .map_err(|e| Error::Caption(format!("Vision request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Caption(format!(
                "Vision API returned {}: {}",
                status, body
            )));
        }

        let result: OllamaGenerateResponse = response
            .json()
            .await
            .map_err(|e| Error::Caption(format!("Failed to parse vision response: {}", e)))?;

        Ok(result.response)
    }

    async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/api/tags", self.base_url.trim_end_matches('/'));
        match self
            .client
            .get(&url)
            .timeout(Duration::from_secs(5))
            .send()
            .await
        {
            Ok(resp) => Ok(resp.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Turn a free-text label answer into ranked predictions.
///
/// Labels are split on commas and newlines, list markers and trailing
/// periods are stripped, and case-insensitive duplicates are dropped. The
/// first label scores 1.0, the second 0.5, and so on.
pub fn parse_labels(answer: &str) -> Vec<Prediction> {
    let mut seen: Vec<String> = Vec::new();
    let mut labels: Vec<String> = Vec::new();

    for raw in answer.split([',', '\n']) {
        let label = strip_list_marker(raw.trim()).trim_end_matches('.').trim();
        if label.is_empty() {
            continue;
        }
        let key = label.to_lowercase();
        if seen.contains(&key) {
            continue;
        }
        seen.push(key);
        labels.push(label.to_string());
    }

    labels
        .into_iter()
        .enumerate()
        .map(|(rank, label)| Prediction {
            label,
            score: 1.0 / (rank as f32 + 1.0),
        })
        .collect()
}

/// Strip `- `, `* `, `• `, `1. ` or `1) ` prefixes.
fn strip_list_marker(label: &str) -> &str {
    let label = label.trim_start_matches(['-', '*', '•']).trim_start();
    let digits = label.len() - label.trim_start_matches(|c: char| c.is_ascii_digit()).len();
    if digits > 0 {
        if let Some(rest) = label[digits..].strip_prefix(['.', ')']) {
            return rest.trim_start();
        }
    }
    label
}

/// [`ImageClassifier`] that asks a vision model for scene labels.
pub struct VisionLabelClassifier<B> {
    backend: B,
}

impl<B: VisionBackend> VisionLabelClassifier<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }
}

#[async_trait]
impl<B: VisionBackend> ImageClassifier for VisionLabelClassifier<B> {
    async fn classify(&self, image: &[u8], mime_type: &str) -> Result<Vec<Prediction>> {
        let answer = self
            .backend
            .describe_image(image, mime_type, Some(LABEL_PROMPT))
            .await?;
        let predictions = parse_labels(&answer);
        debug!(
            subsystem = "inference",
            component = "vision",
            op = "classify",
            model = self.backend.model_name(),
            label_count = predictions.len(),
            "Scene labels parsed"
        );
        Ok(predictions)
    }

    fn model_name(&self) -> &str {
        self.backend.model_name()
    }
}
