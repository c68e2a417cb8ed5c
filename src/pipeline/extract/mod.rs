//! Structured extraction from recognized text.
//!
//! Two-path design: the primary path calls a language-model capability
//! with a prompt that fixes the flat key/value output shape; the
//! fallback path is deterministic regex extraction over the raw text.
//! On any primary failure the whole primary result is abandoned and
//! the fallback runs in its place — there is no field-level merge
//! between paths, so a record's provenance is always a single path.

pub mod fallback;
pub mod llm;
pub mod parser;
pub mod prompt;

pub use fallback::extract_fallback;
pub use llm::{HttpLlmClient, LlmClient, LlmError, MockLlmClient};
pub use parser::parse_flat_record;

use crate::models::{DocumentType, ExtractionPath, ExtractionRecord};

/// Extraction service: primary language-model path with the
/// deterministic fallback behind it.
pub struct ExtractionService {
    /// None: capability disabled, fallback runs unconditionally.
    llm: Option<Box<dyn LlmClient>>,
}

impl ExtractionService {
    pub fn new(llm: Box<dyn LlmClient>) -> Self {
        Self { llm: Some(llm) }
    }

    /// Build with the language-model capability disabled.
    pub fn disabled() -> Self {
        Self { llm: None }
    }

    /// Build from runtime settings: the hosted client when the
    /// capability is enabled, fallback-only otherwise.
    pub fn from_settings(
        settings: &crate::config::PipelineSettings,
        base_url: &str,
        api_key: &str,
    ) -> Self {
        if settings.llm_enabled {
            Self::new(Box::new(HttpLlmClient::new(
                base_url,
                api_key,
                llm::DEFAULT_MODEL,
                settings.call_timeout_secs,
            )))
        } else {
            Self::disabled()
        }
    }

    pub fn llm_enabled(&self) -> bool {
        self.llm.is_some()
    }

    /// Extract a flat record from recognized text. Total: the fallback
    /// path cannot fail, so this never errors — primary-path failures
    /// are logged and recovered here.
    pub fn extract(
        &self,
        full_text: &str,
        document_type: DocumentType,
    ) -> (ExtractionRecord, ExtractionPath) {
        if let Some(llm) = &self.llm {
            match self.extract_primary(llm.as_ref(), full_text, document_type) {
                Ok(record) => return (record, ExtractionPath::Model),
                Err(e) => {
                    tracing::warn!(
                        document_type = document_type.as_str(),
                        error = %e,
                        "Primary extraction failed, falling back to rule-based path"
                    );
                }
            }
        }
        (extract_fallback(full_text, document_type), ExtractionPath::Fallback)
    }

    fn extract_primary(
        &self,
        llm: &dyn LlmClient,
        full_text: &str,
        document_type: DocumentType,
    ) -> Result<ExtractionRecord, LlmError> {
        let system = prompt::system_prompt();
        let user = prompt::extraction_prompt(full_text, document_type);
        let response = llm.complete(system, &user)?;
        let record = parse_flat_record(&response)?;
        if record.is_empty() {
            return Err(LlmError::ResponseParsing(
                "model returned an empty record".into(),
            ));
        }
        Ok(record)
    }
}
