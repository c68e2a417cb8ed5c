//! Vision-language recognition engine.
//!
//! Selected when the declared language hint names a script the
//! handwriting model was not trained for (Malayalam and other Indic
//! scripts in the original deployment).

use super::{decode_payload, EngineError, LazyBackend, RecognitionEngine, RecognizerBackend};
use crate::models::{Document, DocumentType, RecognizedText};

pub const VISION_ENGINE_ID: &str = "vision-language";

/// Hints that route to the vision-language model.
const VISION_HINTS: &[&str] = &[
    "ml", "mal", "malayalam", "hi", "hin", "hindi", "ta", "tam", "tamil", "te", "tel", "telugu",
    "kn", "kan", "kannada",
];

pub struct VisionLanguageEngine {
    backend: LazyBackend,
}

impl VisionLanguageEngine {
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

impl RecognitionEngine for VisionLanguageEngine {
    fn id(&self) -> &'static str {
        VISION_ENGINE_ID
    }

    fn handles(&self, language_hint: Option<&str>, _declared: Option<DocumentType>) -> bool {
        language_hint
            .map(|hint| VISION_HINTS.contains(&hint.to_lowercase().as_str()))
            .unwrap_or(false)
    }

    fn recognize(&self, document: &Document) -> Result<RecognizedText, EngineError> {
        let image = decode_payload(document)?;
        let backend = self.backend.get()?;

        let lines = backend.recognize(&image, document.language_hint.as_deref())?;
        tracing::debug!(
            engine = VISION_ENGINE_ID,
            lines = lines.len(),
            hint = ?document.language_hint,
            "Recognition complete"
        );
        Ok(RecognizedText::from_lines(VISION_ENGINE_ID, lines))
    }
}
