//! Document extraction pipeline.
//!
//! Stages, leaf-first:
//! engine (recognition routing) → classify → extract (LLM + fallback) →
//! confidence → orchestrator. Each stage is pure or capability-backed;
//! the orchestrator wires them into the single `process` entry point
//! used by both the synchronous call and the background workers.

pub mod classify;
pub mod confidence;
pub mod engine;
pub mod extract;
pub mod orchestrator;

pub use classify::classify_document_type;
pub use confidence::score;
pub use engine::{EngineError, EngineRegistry, RecognitionEngine, RecognizerBackend};
pub use orchestrator::{DocumentPipeline, PipelineOutcome};

use thiserror::Error;

/// Failures a synchronous caller can observe. Primary-path extraction
/// failures are absent on purpose: they are recovered by the fallback
/// extractor and never surface on their own.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Recognition engine unavailable: {0}")]
    EngineUnavailable(String),

    #[error("Call exceeded {seconds}s deadline")]
    EngineTimeout { seconds: u64 },

    #[error("Document could not be decoded: {0}")]
    MalformedDocument(String),
}

impl From<EngineError> for PipelineError {
    fn from(e: EngineError) -> Self {
        match e {
            EngineError::Unavailable(msg) => Self::EngineUnavailable(msg),
            EngineError::Timeout { seconds } => Self::EngineTimeout { seconds },
            EngineError::MalformedImage(msg) => Self::MalformedDocument(msg),
        }
    }
}
