//! Prompt, data URL handling, and response parsing for remote screenshot
//! analysis. Independent of the hosting provider.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use snapnote_core::defaults::{
    ANALYSIS_DEFAULT_MIME, ANALYSIS_DEFAULT_SUMMARY, ANALYSIS_DEFAULT_TITLE,
};
use snapnote_core::{normalize_tags, AnalysisResult, Error, Result, StructuredFacts};

/// Instruction sent alongside the image.
pub const ANALYSIS_PROMPT: &str = r#"Analyze this screenshot.
1. Summarize the main content in a concise paragraph.
2. Extract the following structured data if available:
   - URLs
   - Email addresses
   - Key technical terms or keywords (max 5)
   - Important sentences or quotes
3. Suggest a short, descriptive title for this note.

Return the result in strictly valid JSON format like this:
{
  "title": "Suggested Title",
  "summary": "The main content summary...",
  "urls": ["url1", "url2"],
  "emails": ["email1"],
  "keywords": ["keyword1", "keyword2"],
  "sentences": ["sentence1", "sentence2"]
}"#;

static DATA_URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"data:(.*?);base64,(.*)").expect("data URL pattern compiles"));

/// An image payload split out of a data URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImagePayload<'a> {
    pub mime_type: &'a str,
    /// Base64 data without the prefix.
    pub data: &'a str,
}

/// Split `data:<mime>;base64,<payload>`. Input without the prefix is taken
/// as a bare base64 payload of type `image/png`.
pub fn split_data_url(image: &str) -> ImagePayload<'_> {
    if image.contains("data:") && image.contains(";base64,") {
        if let Some(caps) = DATA_URL.captures(image) {
            if let (Some(mime), Some(data)) = (caps.get(1), caps.get(2)) {
                return ImagePayload {
                    mime_type: mime.as_str(),
                    data: data.as_str(),
                };
            }
        }
    }
    ImagePayload {
        mime_type: ANALYSIS_DEFAULT_MIME,
        data: image,
    }
}

/// Parse the model's answer into an [`AnalysisResult`].
///
/// The JSON object is taken from the first `{` to the last `}` so that prose
/// or code fences around it are ignored. Missing, empty, or wrongly-typed
/// fields fall back to defaults.
pub fn parse_analysis_response(text: &str) -> Result<AnalysisResult> {
    let (start, end) = match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if start < end => (start, end),
        _ => return Err(Error::Analysis("No JSON found in response".to_string())),
    };

    let data: Value = serde_json::from_str(&text[start..=end])
        .map_err(|e| Error::Analysis(format!("Malformed JSON in response: {}", e)))?;

    let summary = string_field(&data, "summary").unwrap_or(ANALYSIS_DEFAULT_SUMMARY);
    let title = string_field(&data, "title").unwrap_or(ANALYSIS_DEFAULT_TITLE);

    Ok(AnalysisResult {
        summary: summary.to_string(),
        facts: StructuredFacts {
            urls: list_field(&data, "urls"),
            emails: list_field(&data, "emails"),
            keywords: normalize_tags(list_field(&data, "keywords")),
            sentences: list_field(&data, "sentences"),
            suggested_title: title.to_string(),
        },
    })
}

fn string_field<'a>(data: &'a Value, key: &str) -> Option<&'a str> {
    data.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

fn list_field(data: &Value, key: &str) -> Vec<String> {
    data.get(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}
