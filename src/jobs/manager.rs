//! Job manager — the public face of the background system.
//!
//! Owns the store and the worker pool; callers submit documents and
//! poll for results by job id. Maintenance (retention purge, stale-job
//! reaping) runs on a dedicated housekeeping thread so it keeps
//! happening even when nobody is enqueueing.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::store::JobStore;
use super::types::{Job, JobResult, JobState, JobStats};
use super::worker::WorkerPool;
use super::JobError;
use crate::config::PipelineSettings;
use crate::models::Document;
use crate::pipeline::DocumentPipeline;

/// Housekeeping cadence. Sleeps in short increments so shutdown stays
/// responsive.
const MAINTENANCE_INTERVAL_SECS: u64 = 60;
const SLEEP_GRANULARITY_MILLIS: u64 = 250;

pub struct JobManager {
    store: Arc<dyn JobStore>,
    // Field order matters: the pool must stop before the maintenance
    // thread handle is torn down.
    _pool: WorkerPool,
    shutdown: Arc<AtomicBool>,
    maintenance: Option<std::thread::JoinHandle<()>>,
}

impl JobManager {
    /// Start the workers and the housekeeping thread.
    pub fn start(
        pipeline: Arc<DocumentPipeline>,
        store: Arc<dyn JobStore>,
        settings: &PipelineSettings,
    ) -> Self {
        let pool = WorkerPool::start(
            pipeline,
            store.clone(),
            settings.workers,
            settings.poll_interval_millis,
        );

        let shutdown = Arc::new(AtomicBool::new(false));
        let flag = shutdown.clone();
        let maintenance_store = store.clone();
        let retention_hours = settings.retention_hours;
        let running_ceiling_secs = settings.running_ceiling_secs;
        let maintenance = std::thread::spawn(move || {
            maintenance_loop(
                maintenance_store.as_ref(),
                &flag,
                retention_hours,
                running_ceiling_secs,
            );
        });

        tracing::info!(
            workers = settings.workers,
            retention_hours,
            "Job manager started"
        );

        Self {
            store,
            _pool: pool,
            shutdown,
            maintenance: Some(maintenance),
        }
    }

    /// Submit a document and get its job id back immediately.
    pub fn enqueue(&self, document: &Document) -> Result<String, JobError> {
        self.store.enqueue(document)
    }

    pub fn job(&self, id: &str) -> Result<Job, JobError> {
        self.store.get(id)
    }

    pub fn status(&self, id: &str) -> Result<JobState, JobError> {
        Ok(self.store.get(id)?.state)
    }

    pub fn result(&self, id: &str) -> Result<JobResult, JobError> {
        self.store.result(id)
    }

    pub fn stats(&self) -> Result<JobStats, JobError> {
        self.store.stats()
    }

    /// Cancel a job that has not started running yet.
    pub fn cancel(&self, id: &str) -> Result<(), JobError> {
        self.store.cancel(id)
    }

    /// Trigger a retention purge outside the housekeeping cadence.
    pub fn purge(&self, retention_hours: u64) -> Result<u32, JobError> {
        self.store.purge_expired(retention_hours)
    }
}

impl Drop for JobManager {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        if let Some(handle) = self.maintenance.take() {
            let _ = handle.join();
        }
    }
}

fn maintenance_loop(
    store: &dyn JobStore,
    shutdown: &AtomicBool,
    retention_hours: u64,
    running_ceiling_secs: u64,
) {
    let ticks_per_cycle = MAINTENANCE_INTERVAL_SECS * 1000 / SLEEP_GRANULARITY_MILLIS;
    loop {
        for _ in 0..ticks_per_cycle {
            if shutdown.load(Ordering::Relaxed) {
                return;
            }
            std::thread::sleep(Duration::from_millis(SLEEP_GRANULARITY_MILLIS));
        }

        if let Err(e) = store.purge_expired(retention_hours) {
            tracing::error!(error = %e, "Retention purge failed");
        }
        if let Err(e) = store.fail_stale_running(running_ceiling_secs) {
            tracing::error!(error = %e, "Stale-job reaping failed");
        }
    }
}
