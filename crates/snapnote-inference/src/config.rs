//! Inference configuration.
//!
//! Configuration can be loaded from:
//! - a TOML file (default: `~/.config/snapnote/inference.toml`)
//! - environment variables, which override file values
//!
//! # Example
//!
//! ```rust,no_run
//! use snapnote_inference::config::InferenceConfig;
//!
//! // Load from default path or fall back to env vars
//! let config = InferenceConfig::load().expect("Failed to load config");
//!
//! // Or from environment variables only
//! let config = InferenceConfig::from_env();
//! ```
//!
//! ```toml
//! [gemini]
//! base_url = "https://generativelanguage.googleapis.com"
//! model = "gemini-1.5-flash"
//! timeout_secs = 120
//!
//! [vision]
//! base_url = "http://localhost:11434"
//! model = "llava"
//! ```

use std::env;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use snapnote_core::defaults::{
    ENV_GEMINI_BASE_URL, ENV_GEMINI_MODEL, ENV_OLLAMA_VISION_MODEL, GEMINI_MODEL, GEMINI_URL,
    INFERENCE_TIMEOUT_SECS, OLLAMA_URL,
};

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

impl From<ConfigError> for snapnote_core::Error {
    fn from(e: ConfigError) -> Self {
        snapnote_core::Error::Config(e.to_string())
    }
}

fn validate_url(name: &str, url: &str) -> ConfigResult<()> {
    if url.is_empty() {
        return Err(ConfigError::Validation(format!(
            "{} base_url cannot be empty",
            name
        )));
    }
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(ConfigError::Validation(format!(
            "{} base_url must start with http:// or https://, got: {}",
            name, url
        )));
    }
    Ok(())
}

/// Remote analysis (Gemini) configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeminiConfig {
    /// Base URL of the Generative Language API.
    pub base_url: String,
    /// Multimodal model used for screenshot analysis.
    pub model: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            base_url: GEMINI_URL.to_string(),
            model: GEMINI_MODEL.to_string(),
            timeout_secs: INFERENCE_TIMEOUT_SECS,
        }
    }
}

impl GeminiConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        validate_url("Gemini", &self.base_url)?;
        if self.model.is_empty() {
            return Err(ConfigError::Validation(
                "Gemini model cannot be empty".to_string(),
            ));
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "Gemini timeout_secs must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Local vision model (Ollama) configuration for scene captions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisionConfig {
    pub base_url: String,
    /// Vision model name; captions are disabled when unset.
    pub model: Option<String>,
    pub timeout_secs: u64,
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            base_url: OLLAMA_URL.to_string(),
            model: None,
            timeout_secs: INFERENCE_TIMEOUT_SECS,
        }
    }
}

impl VisionConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        validate_url("Vision", &self.base_url)?;
        if matches!(&self.model, Some(m) if m.is_empty()) {
            return Err(ConfigError::Validation(
                "Vision model cannot be empty when set".to_string(),
            ));
        }
        Ok(())
    }

    /// True when a vision model is configured.
    pub fn enabled(&self) -> bool {
        self.model.is_some()
    }
}

/// Complete inference configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    pub gemini: GeminiConfig,
    pub vision: VisionConfig,
}

impl InferenceConfig {
    /// Default config file path (`<config_dir>/snapnote/inference.toml`).
    pub fn default_config_path() -> PathBuf {
        let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from(".config"));
        path.push("snapnote");
        path.push("inference.toml");
        path
    }

    /// Load configuration from the default path, falling back to environment
    /// variables.
    pub fn load() -> ConfigResult<Self> {
        let path = Self::default_config_path();

        if path.exists() {
            info!("Loading inference config from: {}", path.display());
            Self::from_file(&path)
        } else {
            debug!(
                "Config file not found at {}, using environment variables",
                path.display()
            );
            Ok(Self::from_env())
        }
    }

    /// Load from a TOML file, then apply environment overrides.
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from environment variables.
    ///
    /// - `GEMINI_BASE_URL`, `GEMINI_MODEL`
    /// - `SNAPNOTE_INFERENCE_TIMEOUT_SECS`
    /// - `OLLAMA_BASE` or `OLLAMA_URL`, `OLLAMA_VISION_MODEL`
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    fn apply_env(&mut self) {
        if let Some(url) = non_empty_var(ENV_GEMINI_BASE_URL) {
            self.gemini.base_url = url;
        }
        if let Some(model) = non_empty_var(ENV_GEMINI_MODEL) {
            self.gemini.model = model;
        }
        if let Some(secs) = non_empty_var("SNAPNOTE_INFERENCE_TIMEOUT_SECS")
            .and_then(|s| s.parse::<u64>().ok())
        {
            self.gemini.timeout_secs = secs;
            self.vision.timeout_secs = secs;
        }
        if let Some(url) = non_empty_var("OLLAMA_BASE").or_else(|| non_empty_var("OLLAMA_URL")) {
            self.vision.base_url = url;
        }
        if let Some(model) = non_empty_var(ENV_OLLAMA_VISION_MODEL) {
            self.vision.model = Some(model);
        }
    }

    /// Validate every section.
    pub fn validate(&self) -> ConfigResult<()> {
        self.gemini.validate()?;
        self.vision.validate()
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = InferenceConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.gemini.model, "gemini-1.5-flash");
        assert!(!config.vision.enabled());
    }

    #[test]
    fn test_invalid_scheme_rejected() {
        let config = GeminiConfig {
            base_url: "ftp://example.com".to_string(),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_empty_vision_model_rejected() {
        let config = VisionConfig {
            model: Some(String::new()),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let config = GeminiConfig {
            timeout_secs: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let toml = r#"
            [vision]
            model = "llava"
        "#;
        let config: InferenceConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.vision.model.as_deref(), Some("llava"));
        assert_eq!(config.vision.base_url, OLLAMA_URL);
        assert_eq!(config.gemini, GeminiConfig::default());
    }

    #[test]
    fn test_from_file_rejects_bad_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[gemini").unwrap();
        assert!(matches!(
            InferenceConfig::from_file(file.path()),
            Err(ConfigError::TomlParse(_))
        ));
    }

    #[test]
    fn test_config_error_maps_to_core_config() {
        let err: snapnote_core::Error = ConfigError::Validation("bad".to_string()).into();
        assert!(matches!(err, snapnote_core::Error::Config(_)));
    }
}
