//! Layout-aware recognition engine.
//!
//! Selected for declared lab reports, whose tabular layout benefits
//! from spatial anchoring. The backend emits an anchor per text block;
//! the engine orders lines top-to-bottom (then left-to-right) so the
//! full text reads in document order and header rows can be told
//! apart from the result table below them.

use super::{decode_payload, EngineError, LazyBackend, RecognitionEngine, RecognizerBackend};
use crate::models::{Document, DocumentType, RecognizedLine, RecognizedText};

pub const LAYOUT_ENGINE_ID: &str = "layout";

/// Anchors are normalized to a 1000-unit grid; blocks whose top edge
/// falls in the first fifth of the page are treated as header.
const HEADER_REGION_Y: u32 = 200;

pub struct LayoutEngine {
    backend: LazyBackend,
}

impl LayoutEngine {
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

impl RecognitionEngine for LayoutEngine {
    fn id(&self) -> &'static str {
        LAYOUT_ENGINE_ID
    }

    fn handles(&self, _language_hint: Option<&str>, declared: Option<DocumentType>) -> bool {
        declared == Some(DocumentType::LabReport)
    }

    fn recognize(&self, document: &Document) -> Result<RecognizedText, EngineError> {
        let image = decode_payload(document)?;
        let backend = self.backend.get()?;

        let mut lines = backend.recognize(&image, document.language_hint.as_deref())?;
        // Anchored lines sort into reading order; unanchored lines sink
        // to the end in their original relative order.
        lines.sort_by_key(|line| match line.anchor {
            Some(a) => (0u32, a.y0, a.x0),
            None => (1u32, 0, 0),
        });

        let text = RecognizedText::from_lines(LAYOUT_ENGINE_ID, lines);
        let (header, body) = split_header_body(&text);
        tracing::debug!(
            engine = LAYOUT_ENGINE_ID,
            header_lines = header.len(),
            body_lines = body.len(),
            "Recognition complete"
        );
        Ok(text)
    }
}

/// Partition recognized lines into header and body by anchor position.
/// Lines without an anchor count as body.
pub(crate) fn split_header_body(
    text: &RecognizedText,
) -> (Vec<&RecognizedLine>, Vec<&RecognizedLine>) {
    text.lines.iter().partition(|line| {
        line.anchor
            .map(|a| a.y0 < HEADER_REGION_Y)
            .unwrap_or(false)
    })
}
