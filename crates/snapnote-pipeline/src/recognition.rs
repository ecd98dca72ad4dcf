//! Process-wide text recognition handle.
//!
//! The handle moves through three states:
//!
//! ```text
//! Uninitialized ──first use──▶ Initializing ──ok──▶ Ready
//!       ▲                          │                  │
//!       └────────failure───────────┘                  │
//!       └───────────────────shutdown──────────────────┘
//! ```
//!
//! While `Initializing`, the state holds one shared start future; every
//! caller awaits a clone of it, so the engine is started at most once per
//! cycle and all waiters observe the same outcome. The state mutex is never
//! held across an `.await`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use futures::future::{BoxFuture, FutureExt, Shared};
use once_cell::sync::Lazy;
use tracing::{debug, info, warn};

use snapnote_core::{EngineFactory, Error, OcrEngine, Result};

use crate::tesseract::TesseractFactory;

type StartOutcome = std::result::Result<Arc<dyn OcrEngine>, String>;
type PendingStart = Shared<BoxFuture<'static, StartOutcome>>;

enum EngineState {
    Uninitialized,
    Initializing { generation: u64, pending: PendingStart },
    Ready { generation: u64, engine: Arc<dyn OcrEngine> },
}

static GLOBAL: Lazy<Arc<RecognitionHandle>> =
    Lazy::new(|| Arc::new(RecognitionHandle::new(Arc::new(TesseractFactory::from_env()))));

/// Lazily started, shared recognition engine.
pub struct RecognitionHandle {
    factory: Arc<dyn EngineFactory>,
    state: Mutex<EngineState>,
    generations: AtomicU64,
}

impl RecognitionHandle {
    pub fn new(factory: Arc<dyn EngineFactory>) -> Self {
        Self {
            factory,
            state: Mutex::new(EngineState::Uninitialized),
            generations: AtomicU64::new(0),
        }
    }

    /// The process-wide handle, backed by tesseract configured from the
    /// environment.
    pub fn global() -> Arc<RecognitionHandle> {
        GLOBAL.clone()
    }

    fn lock(&self) -> MutexGuard<'_, EngineState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// True once an engine is running.
    pub fn is_ready(&self) -> bool {
        matches!(*self.lock(), EngineState::Ready { .. })
    }

    /// Begin starting the engine in the background. Returns immediately and
    /// is a no-op when the engine is already starting or running.
    pub fn warmup(self: &Arc<Self>) {
        if !matches!(*self.lock(), EngineState::Uninitialized) {
            return;
        }
        let handle = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(e) = handle.engine().await {
                warn!(
                    subsystem = "pipeline",
                    component = "recognition",
                    op = "warmup",
                    error = %e,
                    "Recognition engine warmup failed"
                );
            }
        });
    }

    /// Wait until the engine is running, starting it if needed.
    pub async fn ensure_ready(&self) -> Result<()> {
        self.engine().await.map(|_| ())
    }

    /// Recognize text in encoded image bytes, starting the engine on first
    /// use.
    pub async fn recognize(&self, image: &[u8]) -> Result<String> {
        let engine = self.engine().await?;
        let start = Instant::now();
        let text = engine.recognize(image).await.map_err(|e| match e {
            Error::Recognition(_) => e,
            other => Error::Recognition(other.to_string()),
        })?;
        debug!(
            subsystem = "pipeline",
            component = "recognition",
            op = "recognize",
            engine = engine.name(),
            text_len = text.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Text recognized"
        );
        Ok(text)
    }

    /// Stop the engine and return to `Uninitialized`. Safe when never
    /// started. A start in flight is awaited and its engine terminated;
    /// callers waiting on it receive a recognition error.
    pub async fn shutdown(&self) -> Result<()> {
        let prior = std::mem::replace(&mut *self.lock(), EngineState::Uninitialized);
        let engine = match prior {
            EngineState::Uninitialized => {
                debug!(
                    subsystem = "pipeline",
                    component = "recognition",
                    op = "shutdown",
                    "Shutdown requested before initialization"
                );
                return Ok(());
            }
            EngineState::Ready { engine, .. } => engine,
            EngineState::Initializing { pending, .. } => match pending.await {
                Ok(engine) => engine,
                Err(_) => return Ok(()),
            },
        };
        engine.terminate().await?;
        info!(
            subsystem = "pipeline",
            component = "recognition",
            op = "shutdown",
            engine = engine.name(),
            "Recognition engine shut down"
        );
        Ok(())
    }

    /// The running engine, starting it if needed.
    async fn engine(&self) -> Result<Arc<dyn OcrEngine>> {
        let (generation, pending) = {
            let mut state = self.lock();
            match &*state {
                EngineState::Ready { engine, .. } => return Ok(Arc::clone(engine)),
                EngineState::Initializing {
                    generation,
                    pending,
                } => (*generation, pending.clone()),
                EngineState::Uninitialized => {
                    let generation = self.generations.fetch_add(1, Ordering::SeqCst) + 1;
                    let pending = self.start_future();
                    *state = EngineState::Initializing {
                        generation,
                        pending: pending.clone(),
                    };
                    debug!(
                        subsystem = "pipeline",
                        component = "recognition",
                        op = "initialize",
                        generation,
                        "Starting recognition engine"
                    );
                    (generation, pending)
                }
            }
        };

        let outcome = pending.await;
        self.settle(generation, outcome)
    }

    fn start_future(&self) -> PendingStart {
        let factory = Arc::clone(&self.factory);
        async move { factory.start().await.map_err(|e| e.to_string()) }
            .boxed()
            .shared()
    }

    /// Record the outcome of start cycle `generation`.
    fn settle(&self, generation: u64, outcome: StartOutcome) -> Result<Arc<dyn OcrEngine>> {
        let mut state = self.lock();
        let current = match &*state {
            EngineState::Initializing { generation: g, .. }
            | EngineState::Ready { generation: g, .. } => Some(*g),
            EngineState::Uninitialized => None,
        };

        match outcome {
            Ok(engine) => match &*state {
                EngineState::Ready { engine: running, .. } if current == Some(generation) => {
                    Ok(Arc::clone(running))
                }
                EngineState::Initializing { .. } if current == Some(generation) => {
                    *state = EngineState::Ready {
                        generation,
                        engine: Arc::clone(&engine),
                    };
                    Ok(engine)
                }
                _ => Err(Error::Recognition(
                    "Recognition engine was shut down during initialization".to_string(),
                )),
            },
            Err(message) => {
                if matches!(&*state, EngineState::Initializing { .. })
                    && current == Some(generation)
                {
                    *state = EngineState::Uninitialized;
                    warn!(
                        subsystem = "pipeline",
                        component = "recognition",
                        op = "initialize",
                        generation,
                        error = %message,
                        "Recognition engine failed to start"
                    );
                }
                Err(Error::Recognition(format!(
                    "Recognition engine failed to start: {}",
                    message
                )))
            }
        }
    }
}
