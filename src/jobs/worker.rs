//! Worker pool — background threads draining the job queue.
//!
//! Each worker loops: claim the oldest queued job, run the pipeline on
//! it, write the outcome back. A panicking pipeline run fails the job
//! instead of killing the worker. Shutdown is graceful: the in-flight
//! job completes, then the thread exits.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::store::JobStore;
use crate::pipeline::DocumentPipeline;

/// Handle for the worker threads.
///
/// Supports graceful shutdown via `shutdown()` or automatic cleanup on
/// `Drop`.
pub struct WorkerPool {
    shutdown: Arc<AtomicBool>,
    handles: Vec<std::thread::JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawn `workers` threads polling the store every
    /// `poll_interval_millis` when the queue is empty.
    pub fn start(
        pipeline: Arc<DocumentPipeline>,
        store: Arc<dyn JobStore>,
        workers: usize,
        poll_interval_millis: u64,
    ) -> Self {
        let shutdown = Arc::new(AtomicBool::new(false));
        let handles = (0..workers.max(1))
            .map(|worker_id| {
                let pipeline = pipeline.clone();
                let store = store.clone();
                let flag = shutdown.clone();
                std::thread::spawn(move || {
                    tracing::info!(worker_id, "Worker started");
                    worker_loop(worker_id, &pipeline, store.as_ref(), &flag, poll_interval_millis);
                    tracing::info!(worker_id, "Worker stopped");
                })
            })
            .collect();

        Self { shutdown, handles }
    }

    /// Request graceful shutdown. In-flight jobs complete, queued jobs
    /// stay queued.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
    }
}

fn worker_loop(
    worker_id: usize,
    pipeline: &DocumentPipeline,
    store: &dyn JobStore,
    shutdown: &AtomicBool,
    poll_interval_millis: u64,
) {
    while !shutdown.load(Ordering::Relaxed) {
        match store.claim_next() {
            Ok(Some(claimed)) => run_job(worker_id, pipeline, store, &claimed),
            Ok(None) => {
                std::thread::sleep(Duration::from_millis(poll_interval_millis));
            }
            Err(e) => {
                tracing::error!(worker_id, error = %e, "Claim failed, backing off");
                std::thread::sleep(Duration::from_millis(poll_interval_millis * 4));
            }
        }
    }
}

fn run_job(
    worker_id: usize,
    pipeline: &DocumentPipeline,
    store: &dyn JobStore,
    claimed: &super::store::ClaimedJob,
) {
    tracing::info!(worker_id, job_id = %claimed.id, "Processing job");

    let outcome = catch_unwind(AssertUnwindSafe(|| pipeline.process(&claimed.document)));

    let write_back = match outcome {
        Ok(Ok(outcome)) => store.complete(&claimed.id, &outcome),
        Ok(Err(e)) => store.fail(&claimed.id, &e.to_string()),
        Err(_) => store.fail(&claimed.id, "pipeline panicked"),
    };

    if let Err(e) = write_back {
        tracing::error!(worker_id, job_id = %claimed.id, error = %e, "Result write-back failed");
    }
}
