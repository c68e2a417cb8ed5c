//! Job state machine and queue-facing types.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::models::{ConfidenceScore, DocumentType, ExtractionPath, ExtractionRecord};

/// Current UTC time in the queue's timestamp format. ISO-8601 with
/// second precision, so string comparison orders correctly.
pub fn now_utc() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

// ═══════════════════════════════════════════
// Job state
// ═══════════════════════════════════════════

/// Lifecycle of a queued document. Transitions are one-way:
/// queued → running → finished | failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Queued,
    Running,
    Finished,
    Failed,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Finished => "finished",
            Self::Failed => "failed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "queued" => Some(Self::Queued),
            "running" => Some(Self::Running),
            "finished" => Some(Self::Finished),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    pub fn all() -> &'static [JobState] {
        &[Self::Queued, Self::Running, Self::Finished, Self::Failed]
    }

    /// Terminal states are eligible for retention cleanup and nothing
    /// else ever touches them.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished | Self::Failed)
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ═══════════════════════════════════════════
// Job metadata & results
// ═══════════════════════════════════════════

/// Queue-visible metadata for one job. The document payload and the
/// extraction record are deliberately absent — payloads stay in the
/// store and records are fetched through [`JobResult`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub state: JobState,
    pub submitted_at: String,
    pub started_at: Option<String>,
    pub finished_at: Option<String>,
    pub document_type: Option<DocumentType>,
    pub error: Option<String>,
}

/// Counts per state, for queue monitoring.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobStats {
    pub queued: u32,
    pub running: u32,
    pub finished: u32,
    pub failed: u32,
}

impl JobStats {
    pub fn total(&self) -> u32 {
        self.queued + self.running + self.finished + self.failed
    }
}

/// What a caller polling for a job's outcome sees.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JobResult {
    /// Not terminal yet; carries the current state.
    Pending { state: JobState },
    Finished {
        document_type: DocumentType,
        record: ExtractionRecord,
        score: ConfidenceScore,
        path: ExtractionPath,
        finished_at: String,
    },
    Failed {
        error: String,
        finished_at: String,
    },
}
