//! Durable background job system.
//!
//! Documents are enqueued into a SQLite-backed queue and processed by
//! a pool of worker threads, each running the full document pipeline.
//! Job rows survive restarts; stored extraction results are encrypted
//! at rest. State machine: queued → running → finished | failed, with
//! no other transitions.

pub mod manager;
pub mod store;
pub mod types;
pub mod worker;

pub use manager::JobManager;
pub use store::{JobStore, SqliteJobStore};
pub use types::{Job, JobResult, JobState, JobStats};
pub use worker::WorkerPool;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum JobError {
    #[error("Job not found: {0}")]
    NotFound(String),

    #[error("Job {id} is {state}, operation requires a queued job")]
    InvalidState { id: String, state: String },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("JSON parsing error: {0}")]
    JsonParsing(String),
}
