//! Recognition engine interface and routing.
//!
//! Three engine variants sit behind one trait; a registry walks them in
//! priority order and the first whose `handles` predicate matches wins,
//! with the handwriting engine as the default. The actual
//! pixels-to-text models are external — engines consume them through
//! the `RecognizerBackend` capability and add routing, payload
//! validation, and lazy backend initialization on top.

pub mod handwriting;
pub mod layout;
pub mod vision;

pub use handwriting::HandwritingEngine;
pub use layout::LayoutEngine;
pub use vision::VisionLanguageEngine;

use std::sync::{Arc, Mutex};

use image::DynamicImage;
use thiserror::Error;

use crate::models::{Document, DocumentType, RecognizedLine, RecognizedText};

#[derive(Error, Debug)]
pub enum EngineError {
    /// Backing model failed to initialize, or the backend rejected the run.
    #[error("Engine unavailable: {0}")]
    Unavailable(String),

    /// Recognition call exceeded its deadline. Retryable at the
    /// pipeline level, never internally.
    #[error("Recognition timed out after {seconds}s")]
    Timeout { seconds: u64 },

    /// Payload could not be decoded as an image at all.
    #[error("Malformed document image: {0}")]
    MalformedImage(String),
}

// ═══════════════════════════════════════════
// Capabilities
// ═══════════════════════════════════════════

/// External recognition model capability: decoded pixels in, text lines
/// out. Implementations wrap the real model services; tests use mocks.
pub trait RecognizerBackend: Send + Sync {
    fn recognize(
        &self,
        image: &DynamicImage,
        language_hint: Option<&str>,
    ) -> Result<Vec<RecognizedLine>, EngineError>;
}

/// A text-recognition engine variant.
pub trait RecognitionEngine: Send + Sync {
    /// Stable identifier, recorded in `RecognizedText::engine_id`.
    fn id(&self) -> &'static str;

    /// Routing predicate over the document's declared hints.
    fn handles(&self, language_hint: Option<&str>, declared: Option<DocumentType>) -> bool;

    fn recognize(&self, document: &Document) -> Result<RecognizedText, EngineError>;
}

// ═══════════════════════════════════════════
// Lazy backend guard
// ═══════════════════════════════════════════

type BackendFactory =
    Box<dyn Fn() -> Result<Box<dyn RecognizerBackend>, EngineError> + Send + Sync>;

/// Lazily initialized backend handle shared by all engine variants.
///
/// Model loading is expensive, so it runs once on first use: the mutex
/// serializes concurrent first calls (a second caller waits and then
/// reuses the loaded backend), while later calls clone the `Arc`
/// without re-initializing. Initialization failure is not cached — the
/// next call retries the factory.
pub struct LazyBackend {
    factory: BackendFactory,
    loaded: Mutex<Option<Arc<dyn RecognizerBackend>>>,
}

impl LazyBackend {
    pub fn new(factory: BackendFactory) -> Self {
        Self {
            factory,
            loaded: Mutex::new(None),
        }
    }

    /// Pre-built backend, already initialized. Used by tests and by
    /// callers that manage model lifetime themselves.
    pub fn ready(backend: Box<dyn RecognizerBackend>) -> Self {
        Self {
            factory: Box::new(|| {
                Err(EngineError::Unavailable(
                    "backend was pre-initialized; factory should never run".into(),
                ))
            }),
            loaded: Mutex::new(Some(Arc::from(backend))),
        }
    }

    pub fn get(&self) -> Result<Arc<dyn RecognizerBackend>, EngineError> {
        let mut guard = self
            .loaded
            .lock()
            .map_err(|_| EngineError::Unavailable("backend guard poisoned".into()))?;
        if let Some(backend) = guard.as_ref() {
            return Ok(backend.clone());
        }
        let backend: Arc<dyn RecognizerBackend> = Arc::from((self.factory)()?);
        *guard = Some(backend.clone());
        Ok(backend)
    }

    /// Whether the backend has been initialized yet.
    pub fn is_loaded(&self) -> bool {
        self.loaded.lock().map(|g| g.is_some()).unwrap_or(false)
    }
}

/// Decode a document payload, rejecting anything that is not an image.
pub(crate) fn decode_payload(document: &Document) -> Result<DynamicImage, EngineError> {
    if document.bytes.is_empty() {
        return Err(EngineError::MalformedImage("empty payload".into()));
    }
    image::load_from_memory(&document.bytes)
        .map_err(|e| EngineError::MalformedImage(e.to_string()))
}

// ═══════════════════════════════════════════
// Registry
// ═══════════════════════════════════════════

/// Priority-ordered engine list. `select` returns the first engine that
/// handles the document's hints, defaulting to the handwriting engine
/// when none match.
pub struct EngineRegistry {
    engines: Vec<Box<dyn RecognitionEngine>>,
}

impl EngineRegistry {
    pub fn new(engines: Vec<Box<dyn RecognitionEngine>>) -> Self {
        Self { engines }
    }

    /// First engine whose predicate matches, else the handwriting
    /// engine. A registry without a handwriting engine has no default:
    /// an unmatched document selects nothing.
    pub fn select(
        &self,
        language_hint: Option<&str>,
        declared: Option<DocumentType>,
    ) -> Option<&dyn RecognitionEngine> {
        self.engines
            .iter()
            .find(|e| e.handles(language_hint, declared))
            .or_else(|| {
                self.engines
                    .iter()
                    .find(|e| e.id() == handwriting::HANDWRITING_ENGINE_ID)
            })
            .map(|e| e.as_ref())
    }

    pub fn is_empty(&self) -> bool {
        self.engines.is_empty()
    }
}
