//! MedScan — digitization pipeline for scanned medical documents.
//!
//! A submitted document flows through four stages:
//! recognition engine routing → document-type classification →
//! structured extraction (LLM with deterministic fallback) →
//! confidence scoring and triage.
//!
//! The same pipeline runs in two modes: inline (`DocumentPipeline::process`)
//! or as a durable background job (`JobManager::enqueue` + worker pool),
//! with identical results for the same document either way.

pub mod config;
pub mod crypto;
pub mod models;
pub mod pipeline;
pub mod jobs;

pub use config::{PipelineSettings, TriageThresholds};
pub use models::document::{Document, DocumentType, RecognizedLine, RecognizedText, TextAnchor};
pub use models::record::{ConfidenceScore, Disposition, ExtractionPath, ExtractionRecord};
pub use pipeline::orchestrator::{DocumentPipeline, PipelineOutcome};
pub use pipeline::PipelineError;
pub use jobs::manager::JobManager;
pub use jobs::types::{Job, JobResult, JobState, JobStats};
