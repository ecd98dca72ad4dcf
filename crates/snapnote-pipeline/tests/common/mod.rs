//! Test doubles shared by the pipeline integration tests.

#![allow(dead_code)]

use std::io::Cursor;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use image::{ImageFormat, Rgb, RgbImage};
use snapnote_core::{
    AnalysisBackend, AnalysisResult, EngineFactory, Error, ImageClassifier, OcrEngine,
    Prediction, Result, StructuredFacts,
};

/// A small valid PNG.
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_pixel(width, height, Rgb([240, 240, 240]));
    let mut out = Vec::new();
    img.write_to(&mut Cursor::new(&mut out), ImageFormat::Png)
        .expect("encode test png");
    out
}

/// Engine returning fixed text.
pub struct FixedEngine {
    pub text: String,
    pub terminated: Arc<AtomicBool>,
    pub calls: Arc<AtomicUsize>,
}

#[async_trait]
impl OcrEngine for FixedEngine {
    async fn recognize(&self, _image: &[u8]) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.terminated.load(Ordering::SeqCst) {
            return Err(Error::Recognition("terminated".to_string()));
        }
        Ok(self.text.clone())
    }

    async fn terminate(&self) -> Result<()> {
        self.terminated.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn name(&self) -> &str {
        "fixed"
    }
}

/// Factory counting starts; can be slowed down or made to fail the first
/// `failures` starts.
pub struct CountingFactory {
    pub text: String,
    pub delay: Duration,
    pub failures: AtomicUsize,
    pub starts: Arc<AtomicUsize>,
    pub terminated: Arc<AtomicBool>,
    pub recognitions: Arc<AtomicUsize>,
}

impl CountingFactory {
    pub fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            delay: Duration::ZERO,
            failures: AtomicUsize::new(0),
            starts: Arc::new(AtomicUsize::new(0)),
            terminated: Arc::new(AtomicBool::new(false)),
            recognitions: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn failing(self, times: usize) -> Self {
        self.failures.store(times, Ordering::SeqCst);
        self
    }

    pub fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EngineFactory for CountingFactory {
    async fn start(&self) -> Result<Arc<dyn OcrEngine>> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let remaining = self.failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures.store(remaining - 1, Ordering::SeqCst);
            return Err(Error::Recognition("language pack missing".to_string()));
        }
        Ok(Arc::new(FixedEngine {
            text: self.text.clone(),
            terminated: Arc::clone(&self.terminated),
            calls: Arc::clone(&self.recognitions),
        }))
    }
}

/// Remote backend that always fails.
#[derive(Default)]
pub struct FailingAnalysis {
    pub calls: AtomicUsize,
}

#[async_trait]
impl AnalysisBackend for FailingAnalysis {
    async fn analyze(&self, _credential: &str, _image: &str) -> Result<AnalysisResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(Error::Analysis("Quota exceeded (429): try later".to_string()))
    }

    fn model_name(&self) -> &str {
        "failing"
    }
}

/// Remote backend returning a fixed result.
pub struct FixedAnalysis {
    pub result: AnalysisResult,
    pub seen_image: std::sync::Mutex<Option<String>>,
}

impl FixedAnalysis {
    pub fn new(summary: &str, title: &str, keywords: &[&str]) -> Self {
        Self {
            result: AnalysisResult {
                summary: summary.to_string(),
                facts: StructuredFacts {
                    keywords: keywords.iter().map(|k| k.to_string()).collect(),
                    suggested_title: title.to_string(),
                    ..Default::default()
                },
            },
            seen_image: std::sync::Mutex::new(None),
        }
    }
}

#[async_trait]
impl AnalysisBackend for FixedAnalysis {
    async fn analyze(&self, _credential: &str, image: &str) -> Result<AnalysisResult> {
        *self.seen_image.lock().unwrap() = Some(image.to_string());
        Ok(self.result.clone())
    }

    fn model_name(&self) -> &str {
        "fixed"
    }
}

/// Classifier with canned predictions, or an error when `fail` is set.
pub struct StubClassifier {
    pub predictions: Vec<Prediction>,
    pub fail: bool,
    pub calls: AtomicUsize,
}

impl StubClassifier {
    pub fn labels(labels: &[(&str, f32)]) -> Self {
        Self {
            predictions: labels
                .iter()
                .map(|(label, score)| Prediction {
                    label: label.to_string(),
                    score: *score,
                })
                .collect(),
            fail: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            predictions: vec![],
            fail: true,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl ImageClassifier for StubClassifier {
    async fn classify(&self, _image: &[u8], _mime_type: &str) -> Result<Vec<Prediction>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(Error::Internal("model failed to load".to_string()));
        }
        Ok(self.predictions.clone())
    }

    fn model_name(&self) -> &str {
        "stub"
    }
}
