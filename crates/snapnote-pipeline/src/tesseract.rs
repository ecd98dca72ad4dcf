//! Tesseract-backed text recognition.
//!
//! The engine shells out to the `tesseract` CLI. Starting it verifies the
//! binary and the configured language packs once; each recognition writes
//! the image to a temp file and reads the text from stdout.

use std::io::Write;
use std::process::Output;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tempfile::NamedTempFile;
use tokio::process::Command;
use tokio::sync::Semaphore;
use tracing::{debug, info};

use snapnote_core::defaults::{
    ENV_OCR_BIN, ENV_OCR_CONCURRENCY, ENV_OCR_LANGS, OCR_BINARY, OCR_CMD_TIMEOUT_SECS,
    OCR_LANGUAGES, OCR_MAX_CONCURRENCY,
};
use snapnote_core::{EngineFactory, Error, OcrEngine, Result};

/// Recognition engine settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognitionConfig {
    /// Path or name of the tesseract binary.
    pub binary: String,
    /// Language packs joined by `+`, e.g. `eng+chi_sim`.
    pub languages: String,
    /// Upper bound on concurrent tesseract processes.
    pub max_concurrency: usize,
    /// Per-invocation timeout.
    pub timeout_secs: u64,
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            binary: OCR_BINARY.to_string(),
            languages: OCR_LANGUAGES.to_string(),
            max_concurrency: OCR_MAX_CONCURRENCY,
            timeout_secs: OCR_CMD_TIMEOUT_SECS,
        }
    }
}

impl RecognitionConfig {
    /// Defaults overridden by `SNAPNOTE_OCR_BIN`, `SNAPNOTE_OCR_LANGS` and
    /// `SNAPNOTE_OCR_CONCURRENCY`.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(bin) = std::env::var(ENV_OCR_BIN).ok().filter(|v| !v.is_empty()) {
            config.binary = bin;
        }
        if let Some(langs) = std::env::var(ENV_OCR_LANGS).ok().filter(|v| !v.is_empty()) {
            config.languages = langs;
        }
        if let Some(n) = std::env::var(ENV_OCR_CONCURRENCY)
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .filter(|n| *n > 0)
        {
            config.max_concurrency = n;
        }
        config
    }

    /// Individual language pack names.
    pub fn language_list(&self) -> Vec<&str> {
        self.languages
            .split('+')
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect()
    }
}

/// Run a command with a timeout and return its output regardless of exit
/// status. A child still running at the deadline is killed.
async fn run_cmd(cmd: &mut Command, timeout_secs: u64) -> Result<Output> {
    cmd.kill_on_drop(true);
    tokio::time::timeout(Duration::from_secs(timeout_secs), cmd.output())
        .await
        .map_err(|_| {
            Error::Recognition(format!(
                "External command timed out after {}s",
                timeout_secs
            ))
        })?
        .map_err(|e| Error::Recognition(format!("Failed to execute command: {}", e)))
}

/// Run a command with a timeout, returning stdout as a string.
async fn run_cmd_with_timeout(cmd: &mut Command, timeout_secs: u64) -> Result<String> {
    let output = run_cmd(cmd, timeout_secs).await?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::Recognition(format!(
            "Command failed (exit {}): {}",
            output.status,
            stderr.trim()
        )));
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Parse `tesseract --list-langs` output. Older releases print the list on
/// stderr, so both streams are accepted.
pub fn parse_language_list(output: &str) -> Vec<String> {
    output
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with("List of available languages"))
        .map(str::to_string)
        .collect()
}

/// Starts [`TesseractEngine`]s.
#[derive(Debug, Clone, Default)]
pub struct TesseractFactory {
    config: RecognitionConfig,
}

impl TesseractFactory {
    pub fn new(config: RecognitionConfig) -> Self {
        Self { config }
    }

    pub fn from_env() -> Self {
        Self::new(RecognitionConfig::from_env())
    }

    pub fn config(&self) -> &RecognitionConfig {
        &self.config
    }
}

#[async_trait]
impl EngineFactory for TesseractFactory {
    async fn start(&self) -> Result<Arc<dyn OcrEngine>> {
        let start = Instant::now();
        let config = &self.config;

        let version = run_cmd_with_timeout(
            Command::new(&config.binary).arg("--version"),
            config.timeout_secs,
        )
        .await?;
        let version = version.lines().next().unwrap_or_default().trim().to_string();

        let output = run_cmd(
            Command::new(&config.binary).arg("--list-langs"),
            config.timeout_secs,
        )
        .await?;
        let mut listing = String::from_utf8_lossy(&output.stdout).into_owned();
        listing.push('\n');
        listing.push_str(&String::from_utf8_lossy(&output.stderr));
        let installed = parse_language_list(&listing);

        let missing: Vec<&str> = config
            .language_list()
            .into_iter()
            .filter(|lang| !installed.iter().any(|i| i == lang))
            .collect();
        if !missing.is_empty() {
            return Err(Error::Recognition(format!(
                "Tesseract language pack(s) not installed: {}",
                missing.join(", ")
            )));
        }

        info!(
            subsystem = "pipeline",
            component = "tesseract",
            op = "start",
            version = %version,
            languages = %config.languages,
            max_concurrency = config.max_concurrency,
            duration_ms = start.elapsed().as_millis() as u64,
            "Recognition engine started"
        );

        Ok(Arc::new(TesseractEngine {
            config: config.clone(),
            permits: Semaphore::new(config.max_concurrency.max(1)),
            version,
        }))
    }
}

/// A verified tesseract installation.
pub struct TesseractEngine {
    config: RecognitionConfig,
    permits: Semaphore,
    version: String,
}

impl TesseractEngine {
    pub fn version(&self) -> &str {
        &self.version
    }
}

#[async_trait]
impl OcrEngine for TesseractEngine {
    async fn recognize(&self, image: &[u8]) -> Result<String> {
        if image.is_empty() {
            return Err(Error::Recognition("Cannot recognize empty image".to_string()));
        }

        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| Error::Recognition("Recognition engine terminated".to_string()))?;

        let mut tmpfile = NamedTempFile::new()
            .map_err(|e| Error::Recognition(format!("Failed to create temp file: {}", e)))?;
        tmpfile
            .write_all(image)
            .map_err(|e| Error::Recognition(format!("Failed to write temp file: {}", e)))?;

        let start = Instant::now();
        let text = run_cmd_with_timeout(
            Command::new(&self.config.binary)
                .arg(tmpfile.path())
                .arg("stdout")
                .arg("-l")
                .arg(&self.config.languages),
            self.config.timeout_secs,
        )
        .await?;

        // tesseract ends each page with a form feed
        let text = text.trim_end_matches(['\n', '\r', '\u{c}', ' ']).to_string();

        debug!(
            subsystem = "pipeline",
            component = "tesseract",
            op = "recognize",
            size_bytes = image.len(),
            text_len = text.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Recognition complete"
        );
        Ok(text)
    }

    async fn terminate(&self) -> Result<()> {
        self.permits.close();
        debug!(
            subsystem = "pipeline",
            component = "tesseract",
            op = "terminate",
            "Recognition engine terminated"
        );
        Ok(())
    }

    fn name(&self) -> &str {
        "tesseract"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RecognitionConfig::default();
        assert_eq!(config.binary, "tesseract");
        assert_eq!(config.language_list(), vec!["eng", "chi_sim"]);
        assert_eq!(config.max_concurrency, 2);
    }

    #[test]
    fn test_language_list_ignores_empty_parts() {
        let config = RecognitionConfig {
            languages: "eng++deu+".to_string(),
            ..Default::default()
        };
        assert_eq!(config.language_list(), vec!["eng", "deu"]);
    }

    #[test]
    fn test_parse_language_list() {
        let output = "List of available languages in \"/usr/share/tessdata/\" (3):\nchi_sim\neng\nosd\n";
        assert_eq!(parse_language_list(output), vec!["chi_sim", "eng", "osd"]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_timed_out_command_is_killed() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("finished");
        let mut cmd = Command::new("sh");
        cmd.arg("-c")
            .arg(format!("sleep 2; touch '{}'", marker.display()));

        let err = run_cmd(&mut cmd, 1).await.unwrap_err();
        assert!(err.to_string().contains("timed out after 1s"));

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert!(!marker.exists());
    }

    #[tokio::test]
    async fn test_missing_binary_fails_to_start() {
        let factory = TesseractFactory::new(RecognitionConfig {
            binary: "/nonexistent/snapnote-tesseract".to_string(),
            ..Default::default()
        });
        let err = factory.start().await.err().expect("start must fail");
        assert!(matches!(err, Error::Recognition(_)));
    }

    #[tokio::test]
    async fn test_terminated_engine_rejects_work() {
        let engine = TesseractEngine {
            config: RecognitionConfig::default(),
            permits: Semaphore::new(1),
            version: "tesseract 5.3.0".to_string(),
        };
        engine.terminate().await.unwrap();
        let err = engine.recognize(b"\x89PNG").await.unwrap_err();
        assert!(matches!(err, Error::Recognition(ref m) if m.contains("terminated")));
    }
}
