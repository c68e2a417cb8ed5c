//! SQLite-backed job store.
//!
//! One table holds the whole job lifecycle: the submitted payload, the
//! state machine columns, and the extraction result once a worker
//! finishes. Claiming is a single atomic UPDATE so concurrent workers
//! never take the same job. The extraction record is encrypted at rest
//! through the [`FieldCipher`] capability.

use std::sync::{Mutex, PoisonError};

use chrono::{Duration, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::types::{now_utc, Job, JobResult, JobState, JobStats};
use super::JobError;
use crate::crypto::FieldCipher;
use crate::models::{
    ConfidenceScore, Disposition, Document, DocumentType, ExtractionPath, ExtractionRecord,
};
use crate::pipeline::PipelineOutcome;

/// A job taken off the queue by a worker, with the payload rebuilt.
#[derive(Debug)]
pub struct ClaimedJob {
    pub id: String,
    pub document: Document,
}

/// Storage boundary for the job queue. Implementations must be safe to
/// share across worker threads.
pub trait JobStore: Send + Sync {
    /// Insert a new queued job and return its id.
    fn enqueue(&self, document: &Document) -> Result<String, JobError>;

    /// Atomically claim the oldest queued job, moving it to running.
    /// Returns None when the queue is empty.
    fn claim_next(&self) -> Result<Option<ClaimedJob>, JobError>;

    /// Record a successful outcome. No-op unless the job is running.
    fn complete(&self, id: &str, outcome: &PipelineOutcome) -> Result<(), JobError>;

    /// Record a failure. No-op unless the job is running.
    fn fail(&self, id: &str, error: &str) -> Result<(), JobError>;

    fn get(&self, id: &str) -> Result<Job, JobError>;

    fn result(&self, id: &str) -> Result<JobResult, JobError>;

    fn stats(&self) -> Result<JobStats, JobError>;

    /// Delete terminal jobs that finished more than `retention_hours`
    /// ago. Returns the number of rows removed.
    fn purge_expired(&self, retention_hours: u64) -> Result<u32, JobError>;

    /// Remove a job that has not started yet.
    fn cancel(&self, id: &str) -> Result<(), JobError>;

    /// Fail running jobs whose worker died mid-flight: anything running
    /// longer than `ceiling_secs`. Returns the number of jobs failed.
    fn fail_stale_running(&self, ceiling_secs: u64) -> Result<u32, JobError>;
}

/// SQLite implementation. The connection is serialized behind a mutex;
/// every operation is a single statement or transaction.
pub struct SqliteJobStore {
    conn: Mutex<Connection>,
    cipher: Box<dyn FieldCipher>,
}

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS jobs (
        id              TEXT PRIMARY KEY,
        state           TEXT NOT NULL,
        submitted_at    TEXT NOT NULL,
        started_at      TEXT,
        finished_at     TEXT,
        document        BLOB NOT NULL,
        language_hint   TEXT,
        declared_type   TEXT,
        document_type   TEXT,
        extraction_path TEXT,
        record_json     TEXT,
        confidence      REAL,
        disposition     TEXT,
        error           TEXT
    );
    CREATE INDEX IF NOT EXISTS idx_jobs_state ON jobs(state, submitted_at);
";

impl SqliteJobStore {
    /// Open (or create) the store at the given path.
    pub fn open(path: &std::path::Path, cipher: Box<dyn FieldCipher>) -> Result<Self, JobError> {
        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
            cipher,
        })
    }

    /// In-memory store, used by tests and ephemeral deployments.
    pub fn in_memory(cipher: Box<dyn FieldCipher>) -> Result<Self, JobError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
            cipher,
        })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn job_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Job> {
    let state_str: String = row.get(1)?;
    let doc_type: Option<String> = row.get(5)?;
    Ok(Job {
        id: row.get(0)?,
        state: JobState::from_str(&state_str).unwrap_or(JobState::Failed),
        submitted_at: row.get(2)?,
        started_at: row.get(3)?,
        finished_at: row.get(4)?,
        document_type: doc_type.as_deref().and_then(DocumentType::from_str),
        error: row.get(6)?,
    })
}

const JOB_COLUMNS: &str = "id, state, submitted_at, started_at, finished_at, document_type, error";

impl JobStore for SqliteJobStore {
    fn enqueue(&self, document: &Document) -> Result<String, JobError> {
        let id = Uuid::new_v4().to_string();
        let conn = self.lock();
        conn.execute(
            "INSERT INTO jobs (id, state, submitted_at, document, language_hint, declared_type)
             VALUES (?1, 'queued', ?2, ?3, ?4, ?5)",
            params![
                id,
                now_utc(),
                document.bytes,
                document.language_hint,
                document.declared_type.map(|t| t.as_str()),
            ],
        )?;
        tracing::info!(job_id = %id, "Job enqueued");
        Ok(id)
    }

    fn claim_next(&self) -> Result<Option<ClaimedJob>, JobError> {
        let conn = self.lock();
        let claimed = conn
            .query_row(
                "UPDATE jobs SET state = 'running', started_at = ?1
                 WHERE id = (
                     SELECT id FROM jobs WHERE state = 'queued'
                     ORDER BY submitted_at ASC, id ASC LIMIT 1
                 )
                 RETURNING id, document, language_hint, declared_type",
                params![now_utc()],
                |row| {
                    let id: String = row.get(0)?;
                    let bytes: Vec<u8> = row.get(1)?;
                    let language_hint: Option<String> = row.get(2)?;
                    let declared: Option<String> = row.get(3)?;
                    Ok((id, bytes, language_hint, declared))
                },
            )
            .optional()?;

        Ok(claimed.map(|(id, bytes, language_hint, declared)| {
            let mut document = Document::new(bytes);
            document.language_hint = language_hint;
            document.declared_type = declared.as_deref().and_then(DocumentType::from_str);
            ClaimedJob { id, document }
        }))
    }

    fn complete(&self, id: &str, outcome: &PipelineOutcome) -> Result<(), JobError> {
        let record_json = serde_json::to_string(&outcome.record)
            .map_err(|e| JobError::JsonParsing(e.to_string()))?;
        let encrypted = self.cipher.encrypt(&record_json);

        let conn = self.lock();
        let updated = conn.execute(
            "UPDATE jobs SET state = 'finished', finished_at = ?1, document_type = ?2,
                    extraction_path = ?3, record_json = ?4, confidence = ?5, disposition = ?6,
                    document = X''
             WHERE id = ?7 AND state = 'running'",
            params![
                now_utc(),
                outcome.document_type.as_str(),
                outcome.path.as_str(),
                encrypted,
                outcome.score.value as f64,
                outcome.score.disposition.as_str(),
                id,
            ],
        )?;
        if updated == 0 {
            tracing::warn!(job_id = %id, "Completion for a job that is not running, ignored");
        }
        Ok(())
    }

    fn fail(&self, id: &str, error: &str) -> Result<(), JobError> {
        let conn = self.lock();
        let updated = conn.execute(
            "UPDATE jobs SET state = 'failed', finished_at = ?1, error = ?2, document = X''
             WHERE id = ?3 AND state = 'running'",
            params![now_utc(), error, id],
        )?;
        if updated == 0 {
            tracing::warn!(job_id = %id, "Failure for a job that is not running, ignored");
        }
        Ok(())
    }

    fn get(&self, id: &str) -> Result<Job, JobError> {
        let conn = self.lock();
        conn.query_row(
            &format!("SELECT {JOB_COLUMNS} FROM jobs WHERE id = ?1"),
            params![id],
            job_from_row,
        )
        .optional()?
        .ok_or_else(|| JobError::NotFound(id.to_string()))
    }

    fn result(&self, id: &str) -> Result<JobResult, JobError> {
        let conn = self.lock();
        let row = conn
            .query_row(
                "SELECT state, finished_at, document_type, extraction_path, record_json,
                        confidence, disposition, error
                 FROM jobs WHERE id = ?1",
                params![id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, Option<String>>(1)?,
                        row.get::<_, Option<String>>(2)?,
                        row.get::<_, Option<String>>(3)?,
                        row.get::<_, Option<String>>(4)?,
                        row.get::<_, Option<f64>>(5)?,
                        row.get::<_, Option<String>>(6)?,
                        row.get::<_, Option<String>>(7)?,
                    ))
                },
            )
            .optional()?
            .ok_or_else(|| JobError::NotFound(id.to_string()))?;
        drop(conn);

        let (state_str, finished_at, doc_type, path, record_json, confidence, disposition, error) =
            row;
        let state = JobState::from_str(&state_str).unwrap_or(JobState::Failed);

        match state {
            JobState::Queued | JobState::Running => Ok(JobResult::Pending { state }),
            JobState::Failed => Ok(JobResult::Failed {
                error: error.unwrap_or_else(|| "unknown failure".to_string()),
                finished_at: finished_at.unwrap_or_default(),
            }),
            JobState::Finished => {
                let record_json = record_json.ok_or_else(|| {
                    JobError::JsonParsing("finished job has no stored record".to_string())
                })?;
                let decrypted = self.cipher.decrypt(&record_json);
                let record: ExtractionRecord = serde_json::from_str(&decrypted)
                    .map_err(|e| JobError::JsonParsing(e.to_string()))?;

                let disposition = disposition
                    .as_deref()
                    .and_then(Disposition::from_str)
                    .unwrap_or(Disposition::Rejected);
                let path = path
                    .as_deref()
                    .and_then(ExtractionPath::from_str)
                    .unwrap_or(ExtractionPath::Fallback);
                let document_type = doc_type
                    .as_deref()
                    .and_then(DocumentType::from_str)
                    .unwrap_or(DocumentType::General);

                Ok(JobResult::Finished {
                    document_type,
                    record,
                    score: ConfidenceScore {
                        value: confidence.unwrap_or(0.0) as f32,
                        disposition,
                    },
                    path,
                    finished_at: finished_at.unwrap_or_default(),
                })
            }
        }
    }

    fn stats(&self) -> Result<JobStats, JobError> {
        let conn = self.lock();
        let mut stmt = conn.prepare("SELECT state, COUNT(*) FROM jobs GROUP BY state")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, u32>(1)?))
        })?;

        let mut stats = JobStats::default();
        for row in rows {
            let (state, count) = row?;
            match JobState::from_str(&state) {
                Some(JobState::Queued) => stats.queued = count,
                Some(JobState::Running) => stats.running = count,
                Some(JobState::Finished) => stats.finished = count,
                Some(JobState::Failed) => stats.failed = count,
                None => {}
            }
        }
        Ok(stats)
    }

    fn purge_expired(&self, retention_hours: u64) -> Result<u32, JobError> {
        let cutoff = (Utc::now() - Duration::hours(retention_hours as i64))
            .format("%Y-%m-%dT%H:%M:%SZ")
            .to_string();
        let conn = self.lock();
        let removed = conn.execute(
            "DELETE FROM jobs
             WHERE state IN ('finished', 'failed') AND finished_at < ?1",
            params![cutoff],
        )?;
        if removed > 0 {
            tracing::info!(removed, "Purged expired jobs");
        }
        Ok(removed as u32)
    }

    fn cancel(&self, id: &str) -> Result<(), JobError> {
        let conn = self.lock();
        let removed = conn.execute(
            "DELETE FROM jobs WHERE id = ?1 AND state = 'queued'",
            params![id],
        )?;
        if removed == 1 {
            tracing::info!(job_id = %id, "Job cancelled");
            return Ok(());
        }
        // Distinguish a missing job from one already picked up.
        let state: Option<String> = conn
            .query_row("SELECT state FROM jobs WHERE id = ?1", params![id], |row| {
                row.get(0)
            })
            .optional()?;
        match state {
            Some(state) => Err(JobError::InvalidState {
                id: id.to_string(),
                state,
            }),
            None => Err(JobError::NotFound(id.to_string())),
        }
    }

    fn fail_stale_running(&self, ceiling_secs: u64) -> Result<u32, JobError> {
        let cutoff = (Utc::now() - Duration::seconds(ceiling_secs as i64))
            .format("%Y-%m-%dT%H:%M:%SZ")
            .to_string();
        let conn = self.lock();
        let failed = conn.execute(
            "UPDATE jobs SET state = 'failed', finished_at = ?1,
                    error = 'worker exceeded running-time ceiling', document = X''
             WHERE state = 'running' AND started_at < ?2",
            params![now_utc(), cutoff],
        )?;
        if failed > 0 {
            tracing::warn!(failed, ceiling_secs, "Failed stale running jobs");
        }
        Ok(failed as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{AesFieldCipher, PassthroughCipher};

    fn store() -> SqliteJobStore {
        SqliteJobStore::in_memory(Box::new(PassthroughCipher))
            .expect("in-memory store")
    }

    fn outcome() -> PipelineOutcome {
        let mut record = ExtractionRecord::new();
        record.insert("patient_id", "MS-1".to_string());
        record.insert("diagnosis", "Dengue".to_string());
        PipelineOutcome {
            document_type: DocumentType::OpdNote,
            record,
            score: ConfidenceScore {
                value: 0.7,
                disposition: Disposition::PendingReview,
            },
            path: ExtractionPath::Fallback,
            engine_id: "handwriting".to_string(),
        }
    }

    #[test]
    fn enqueue_then_claim_rebuilds_document() {
        let store = store();
        let doc = Document::new(vec![1, 2, 3])
            .with_language_hint("ml")
            .with_declared_type(DocumentType::LabReport);
        let id = store.enqueue(&doc).unwrap();

        let claimed = store.claim_next().unwrap().unwrap();
        assert_eq!(claimed.id, id);
        assert_eq!(claimed.document.bytes, vec![1, 2, 3]);
        assert_eq!(claimed.document.language_hint.as_deref(), Some("ml"));
        assert_eq!(
            claimed.document.declared_type,
            Some(DocumentType::LabReport)
        );
        assert_eq!(store.get(&id).unwrap().state, JobState::Running);
    }

    #[test]
    fn claim_order_is_fifo() {
        let store = store();
        let first = store.enqueue(&Document::new(vec![1])).unwrap();
        let second = store.enqueue(&Document::new(vec![2])).unwrap();

        // Same-second submissions fall back to id order; both ids were
        // enqueued in sequence so claiming drains the queue fully.
        let mut claimed = vec![
            store.claim_next().unwrap().unwrap().id,
            store.claim_next().unwrap().unwrap().id,
        ];
        claimed.sort();
        let mut expected = vec![first, second];
        expected.sort();
        assert_eq!(claimed, expected);
        assert!(store.claim_next().unwrap().is_none());
    }

    #[test]
    fn concurrent_claims_never_overlap() {
        use std::sync::Arc;

        let store = Arc::new(store());
        for i in 0..20u8 {
            store.enqueue(&Document::new(vec![i])).unwrap();
        }

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let store = store.clone();
                std::thread::spawn(move || {
                    let mut ids = Vec::new();
                    while let Some(claimed) = store.claim_next().unwrap() {
                        ids.push(claimed.id);
                    }
                    ids
                })
            })
            .collect();

        let mut all: Vec<String> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        assert_eq!(all.len(), 20);
        all.sort();
        all.dedup();
        assert_eq!(all.len(), 20, "a job was claimed twice");
    }

    #[test]
    fn empty_queue_claims_nothing() {
        assert!(store().claim_next().unwrap().is_none());
    }

    #[test]
    fn complete_stores_result_and_drops_payload() {
        let store = store();
        let id = store.enqueue(&Document::new(vec![9; 1024])).unwrap();
        store.claim_next().unwrap().unwrap();
        store.complete(&id, &outcome()).unwrap();

        let job = store.get(&id).unwrap();
        assert_eq!(job.state, JobState::Finished);
        assert_eq!(job.document_type, Some(DocumentType::OpdNote));
        assert!(job.finished_at.is_some());

        match store.result(&id).unwrap() {
            JobResult::Finished { record, score, path, .. } => {
                assert_eq!(record.get("diagnosis"), Some("Dengue"));
                assert_eq!(score.disposition, Disposition::PendingReview);
                assert_eq!(path, ExtractionPath::Fallback);
            }
            other => panic!("expected finished result, got {other:?}"),
        }
    }

    #[test]
    fn fail_records_error() {
        let store = store();
        let id = store.enqueue(&Document::new(vec![1])).unwrap();
        store.claim_next().unwrap().unwrap();
        store.fail(&id, "backend offline").unwrap();

        match store.result(&id).unwrap() {
            JobResult::Failed { error, .. } => assert_eq!(error, "backend offline"),
            other => panic!("expected failed result, got {other:?}"),
        }
    }

    #[test]
    fn complete_ignored_unless_running() {
        let store = store();
        let id = store.enqueue(&Document::new(vec![1])).unwrap();
        // Never claimed: still queued, completion must not apply.
        store.complete(&id, &outcome()).unwrap();
        assert_eq!(store.get(&id).unwrap().state, JobState::Queued);
    }

    #[test]
    fn result_of_unfinished_job_is_pending() {
        let store = store();
        let id = store.enqueue(&Document::new(vec![1])).unwrap();
        match store.result(&id).unwrap() {
            JobResult::Pending { state } => assert_eq!(state, JobState::Queued),
            other => panic!("expected pending, got {other:?}"),
        }
    }

    #[test]
    fn unknown_job_is_not_found() {
        let store = store();
        assert!(matches!(store.get("nope"), Err(JobError::NotFound(_))));
        assert!(matches!(store.result("nope"), Err(JobError::NotFound(_))));
    }

    #[test]
    fn stats_count_by_state() {
        let store = store();
        store.enqueue(&Document::new(vec![1])).unwrap();
        let id = store.enqueue(&Document::new(vec![2])).unwrap();
        store.enqueue(&Document::new(vec![3])).unwrap();
        store.claim_next().unwrap().unwrap();
        store.claim_next().unwrap().unwrap();
        store.fail(&id, "boom").unwrap();

        let stats = store.stats().unwrap();
        assert_eq!(stats.queued, 1);
        assert_eq!(stats.running, 1);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.total(), 3);
    }

    #[test]
    fn cancel_only_touches_queued_jobs() {
        let store = store();
        let queued = store.enqueue(&Document::new(vec![1])).unwrap();
        let running = store.enqueue(&Document::new(vec![2])).unwrap();
        // First claim takes one of the two; cancel the other.
        let claimed = store.claim_next().unwrap().unwrap().id;
        let (queued, running) = if claimed == queued {
            (running, queued)
        } else {
            (queued, running)
        };

        store.cancel(&queued).unwrap();
        assert!(matches!(store.get(&queued), Err(JobError::NotFound(_))));
        assert!(matches!(
            store.cancel(&running),
            Err(JobError::InvalidState { .. })
        ));
        assert!(matches!(store.cancel("nope"), Err(JobError::NotFound(_))));
    }

    #[test]
    fn purge_removes_only_old_terminal_jobs() {
        let store = store();
        let done = store.enqueue(&Document::new(vec![1])).unwrap();
        let live = store.enqueue(&Document::new(vec![2])).unwrap();
        store.claim_next().unwrap().unwrap();
        store.claim_next().unwrap().unwrap();
        store.complete(&done, &outcome()).unwrap();
        store.complete(&live, &outcome()).unwrap();

        // Backdate one finished job past the cutoff.
        {
            let conn = store.lock();
            conn.execute(
                "UPDATE jobs SET finished_at = '2020-01-01T00:00:00Z' WHERE id = ?1",
                params![done],
            )
            .unwrap();
        }

        assert_eq!(store.purge_expired(24).unwrap(), 1);
        assert!(matches!(store.get(&done), Err(JobError::NotFound(_))));
        assert!(store.get(&live).is_ok());
    }

    #[test]
    fn stale_running_jobs_are_failed() {
        let store = store();
        let id = store.enqueue(&Document::new(vec![1])).unwrap();
        store.claim_next().unwrap().unwrap();
        {
            let conn = store.lock();
            conn.execute(
                "UPDATE jobs SET started_at = '2020-01-01T00:00:00Z' WHERE id = ?1",
                params![id],
            )
            .unwrap();
        }

        assert_eq!(store.fail_stale_running(600).unwrap(), 1);
        let job = store.get(&id).unwrap();
        assert_eq!(job.state, JobState::Failed);
        assert!(job.error.as_deref().unwrap().contains("ceiling"));
        // A fresh running job is untouched.
        assert_eq!(store.fail_stale_running(600).unwrap(), 0);
    }

    #[test]
    fn queued_jobs_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("jobs.db");

        let id = {
            let store =
                SqliteJobStore::open(&path, Box::new(PassthroughCipher)).unwrap();
            store.enqueue(&Document::new(vec![1, 2, 3])).unwrap()
        };

        let store = SqliteJobStore::open(&path, Box::new(PassthroughCipher)).unwrap();
        let job = store.get(&id).unwrap();
        assert_eq!(job.state, JobState::Queued);
        let claimed = store.claim_next().unwrap().unwrap();
        assert_eq!(claimed.document.bytes, vec![1, 2, 3]);
    }

    #[test]
    fn record_is_encrypted_at_rest() {
        let store =
            SqliteJobStore::in_memory(Box::new(AesFieldCipher::new([7u8; 32]))).unwrap();
        let id = store.enqueue(&Document::new(vec![1])).unwrap();
        store.claim_next().unwrap().unwrap();
        store.complete(&id, &outcome()).unwrap();

        let raw: String = {
            let conn = store.lock();
            conn.query_row(
                "SELECT record_json FROM jobs WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .unwrap()
        };
        assert!(!raw.contains("Dengue"));

        match store.result(&id).unwrap() {
            JobResult::Finished { record, .. } => {
                assert_eq!(record.get("diagnosis"), Some("Dengue"))
            }
            other => panic!("expected finished result, got {other:?}"),
        }
    }
}
