//! Google Gemini backend for remote screenshot analysis.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use snapnote_core::{AnalysisBackend, AnalysisResult, Error, Result};

use crate::analysis::{parse_analysis_response, split_data_url, ANALYSIS_PROMPT};
use crate::config::GeminiConfig;

/// Header carrying the API key. Kept out of the URL so that transport
/// errors, which print the URL, never contain it.
pub const API_KEY_HEADER: &str = "x-goog-api-key";

/// Gemini error classes, derived from the HTTP status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeminiErrorCode {
    /// Missing or rejected API key.
    Authentication,
    /// Quota or rate limit exhausted.
    QuotaExceeded,
    /// Model not found or not available.
    ModelNotFound,
    /// Request rejected as malformed.
    InvalidRequest,
    /// Server error.
    ServerError,
    /// Unknown error.
    Unknown,
}

impl GeminiErrorCode {
    /// Determine error code from HTTP status.
    pub fn from_status(status: u16) -> Self {
        match status {
            401 | 403 => Self::Authentication,
            429 => Self::QuotaExceeded,
            404 => Self::ModelNotFound,
            400 => Self::InvalidRequest,
            500..=599 => Self::ServerError,
            _ => Self::Unknown,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Self::Authentication => "Authentication failed",
            Self::QuotaExceeded => "Quota exceeded",
            Self::ModelNotFound => "Model not found",
            Self::InvalidRequest => "Invalid request",
            Self::ServerError => "Server error",
            Self::Unknown => "Unexpected response",
        }
    }
}

/// Convert an HTTP failure into the analysis error callers see.
pub fn to_analysis_error(code: GeminiErrorCode, status: u16, message: &str) -> Error {
    Error::Analysis(format!("{} ({}): {}", code.label(), status, message))
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part<'a> {
    Text {
        text: &'a str,
    },
    #[serde(rename_all = "camelCase")]
    InlineData { inline_data: InlineData<'a> },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData<'a> {
    mime_type: &'a str,
    data: &'a str,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

/// Analysis backend calling `models/{model}:generateContent`.
pub struct GeminiAnalysisBackend {
    config: GeminiConfig,
    client: reqwest::Client,
}

impl GeminiAnalysisBackend {
    pub fn new(config: GeminiConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { config, client })
    }

    /// Backend with default base URL and model.
    pub fn with_defaults() -> Result<Self> {
        Self::new(GeminiConfig::default())
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        )
    }

    async fn generate(&self, credential: &str, image: &str) -> Result<String> {
        let payload = split_data_url(image);
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![
                    Part::Text {
                        text: ANALYSIS_PROMPT,
                    },
                    Part::InlineData {
                        inline_data: InlineData {
                            mime_type: payload.mime_type,
                            data: payload.data,
                        },
                    },
                ],
            }],
        };

        let response = self
            .client
            .post(self.endpoint())
            .header(API_KEY_HEADER, credential)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Analysis(format!("Request failed: {}", e.without_url())))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorEnvelope>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            let code = GeminiErrorCode::from_status(status.as_u16());
            return Err(to_analysis_error(code, status.as_u16(), &message));
        }

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| {
                Error::Analysis(format!("Failed to parse response: {}", e.without_url()))
            })?;

        let candidate = body
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| Error::Analysis("Response contained no candidates".to_string()))?;

        Ok(candidate
            .content
            .map(|c| {
                c.parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default())
    }
}

#[async_trait]
impl AnalysisBackend for GeminiAnalysisBackend {
    async fn analyze(&self, credential: &str, image: &str) -> Result<AnalysisResult> {
        if credential.trim().is_empty() {
            return Err(Error::Analysis("No API key configured".to_string()));
        }

        let start = Instant::now();
        debug!(
            subsystem = "inference",
            component = "gemini",
            op = "analyze",
            model = %self.config.model,
            image_len = image.len(),
            "Starting remote analysis"
        );

        let text = self.generate(credential, image).await?;
        let result = parse_analysis_response(&text)?;

        info!(
            subsystem = "inference",
            component = "gemini",
            op = "analyze",
            model = %self.config.model,
            response_len = text.len(),
            keyword_count = result.facts.keywords.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Remote analysis complete"
        );
        Ok(result)
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}
