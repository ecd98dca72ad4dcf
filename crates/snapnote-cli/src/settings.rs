//! Persisted user settings.
//!
//! A small TOML file at `<config_dir>/snapnote/settings.toml` holding the
//! remote-analysis API key. `GEMINI_API_KEY` in the environment takes
//! precedence; an empty value anywhere means "no credential".

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use snapnote_core::defaults::ENV_GEMINI_API_KEY;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gemini_api_key: Option<String>,
}

impl Settings {
    /// Default settings path (`<config_dir>/snapnote/settings.toml`).
    pub fn default_path() -> PathBuf {
        let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from(".config"));
        path.push("snapnote");
        path.push("settings.toml");
        path
    }

    /// Read settings from `path`. A missing file yields empty settings.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings from {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse settings in {}", path.display()))
    }

    /// Write settings to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let content = toml::to_string_pretty(self).context("Failed to serialize settings")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write settings to {}", path.display()))
    }

    pub fn set_key(&mut self, key: &str) {
        let key = key.trim();
        self.gemini_api_key = (!key.is_empty()).then(|| key.to_string());
    }

    pub fn clear_key(&mut self) {
        self.gemini_api_key = None;
    }

    /// The credential in effect: the environment first, then the file.
    pub fn credential(&self) -> Option<String> {
        resolve_credential(
            std::env::var(ENV_GEMINI_API_KEY).ok(),
            self.gemini_api_key.as_deref(),
        )
    }
}

fn resolve_credential(env: Option<String>, stored: Option<&str>) -> Option<String> {
    env.map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .or_else(|| {
            stored
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        })
}

/// Display form of a key: first and last four characters only.
pub fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 8 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}…{}", head, tail)
}
