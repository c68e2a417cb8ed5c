//! Handwriting-specialized recognition engine.
//!
//! The default route: unspecified or English-like input lands here.

use super::{decode_payload, EngineError, LazyBackend, RecognitionEngine, RecognizerBackend};
use crate::models::{Document, DocumentType, RecognizedText};

pub const HANDWRITING_ENGINE_ID: &str = "handwriting";

/// Language hints the handwriting model was trained on.
const TRAINED_HINTS: &[&str] = &["en", "eng", "english", "en-us", "en-gb"];

pub struct HandwritingEngine {
    backend: LazyBackend,
}

impl HandwritingEngine {
    pub fn new(
        factory: Box<dyn Fn() -> Result<Box<dyn RecognizerBackend>, EngineError> + Send + Sync>,
    ) -> Self {
        Self {
            backend: LazyBackend::new(factory),
        }
    }

    pub fn with_backend(backend: Box<dyn RecognizerBackend>) -> Self {
        Self {
            backend: LazyBackend::ready(backend),
        }
    }
}

impl RecognitionEngine for HandwritingEngine {
    fn id(&self) -> &'static str {
        HANDWRITING_ENGINE_ID
    }

    fn handles(&self, language_hint: Option<&str>, _declared: Option<DocumentType>) -> bool {
        match language_hint {
            None => true,
            Some(hint) => TRAINED_HINTS.contains(&hint.to_lowercase().as_str()),
        }
    }

    fn recognize(&self, document: &Document) -> Result<RecognizedText, EngineError> {
        let image = decode_payload(document)?;
        let backend = self.backend.get()?;

        let lines = backend.recognize(&image, document.language_hint.as_deref())?;
        tracing::debug!(
            engine = HANDWRITING_ENGINE_ID,
            lines = lines.len(),
            "Recognition complete"
        );
        Ok(RecognizedText::from_lines(HANDWRITING_ENGINE_ID, lines))
    }
}
