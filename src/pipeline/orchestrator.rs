//! End-to-end document pipeline.
//!
//! Recognize → classify → extract → score, as one synchronous call.
//! Recognition failures surface as errors; extraction failures do not,
//! because the fallback path absorbs them.

use serde::{Deserialize, Serialize};

use super::classify::classify_document_type;
use super::confidence;
use super::engine::EngineRegistry;
use super::extract::ExtractionService;
use super::PipelineError;
use crate::config::TriageThresholds;
use crate::models::{ConfidenceScore, Document, DocumentType, ExtractionPath, ExtractionRecord};

/// Everything the pipeline produced for one document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineOutcome {
    pub document_type: DocumentType,
    pub record: ExtractionRecord,
    pub score: ConfidenceScore,
    pub path: ExtractionPath,
    /// Which recognition engine produced the text.
    pub engine_id: String,
}

/// The full digitization pipeline, assembled once and reused across
/// documents. Safe to share across worker threads.
pub struct DocumentPipeline {
    registry: EngineRegistry,
    extraction: ExtractionService,
    thresholds: TriageThresholds,
}

impl DocumentPipeline {
    pub fn new(
        registry: EngineRegistry,
        extraction: ExtractionService,
        thresholds: TriageThresholds,
    ) -> Self {
        Self {
            registry,
            extraction,
            thresholds,
        }
    }

    /// Process one document end to end.
    pub fn process(&self, document: &Document) -> Result<PipelineOutcome, PipelineError> {
        let engine = self
            .registry
            .select(document.language_hint.as_deref(), document.declared_type)
            .ok_or_else(|| {
                PipelineError::EngineUnavailable("no recognition engine registered".into())
            })?;

        let recognized = engine.recognize(document)?;
        tracing::info!(
            engine = recognized.engine_id,
            lines = recognized.line_count,
            avg_confidence = recognized.avg_confidence,
            "Recognition complete"
        );

        // A declared type wins over keyword classification.
        let document_type = document
            .declared_type
            .unwrap_or_else(|| classify_document_type(&recognized.full_text));

        let (record, path) = self.extraction.extract(&recognized.full_text, document_type);
        let score = confidence::score(&record, document_type, path, &self.thresholds);

        tracing::info!(
            document_type = document_type.as_str(),
            path = path.as_str(),
            fields = record.len(),
            confidence = score.value,
            disposition = score.disposition.as_str(),
            "Pipeline complete"
        );

        Ok(PipelineOutcome {
            document_type,
            record,
            score,
            path,
            engine_id: recognized.engine_id,
        })
    }
}
