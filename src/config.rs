use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

/// Crate version, surfaced in logs and stats payloads.
pub const CRATE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default log filter when RUST_LOG is unset.
pub fn default_log_filter() -> String {
    "medscan=info".to_string()
}

/// Initialize tracing with the env filter, falling back to the crate default.
/// Safe to call more than once (subsequent calls are no-ops).
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(default_log_filter())),
        )
        .try_init();
}

// ═══════════════════════════════════════════
// Pipeline settings
// ═══════════════════════════════════════════

/// Runtime configuration for the pipeline and the job lifecycle manager.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSettings {
    /// Whether the language-model extraction capability is enabled.
    /// When false, every submission takes the deterministic fallback path.
    pub llm_enabled: bool,
    /// Number of concurrent background workers.
    pub workers: usize,
    /// Per-call timeout for the two network suspension points
    /// (recognition invocation, language-model invocation).
    pub call_timeout_secs: u64,
    /// Terminal jobs older than this are eligible for `purge`.
    pub retention_hours: u64,
    /// Running jobs older than this are force-failed as stale.
    pub running_ceiling_secs: u64,
    /// Worker poll interval while the queue is empty.
    pub poll_interval_millis: u64,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            llm_enabled: true,
            workers: 2,
            call_timeout_secs: 60,
            retention_hours: 24,
            // Matches the original deployment's 10-minute job timeout.
            running_ceiling_secs: 600,
            poll_interval_millis: 250,
        }
    }
}

// ═══════════════════════════════════════════
// Triage thresholds
// ═══════════════════════════════════════════

/// Field-count breakpoints for scoring open-schema (model-path) records.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ModelFieldBands {
    /// At or above this: the extraction captured the whole document.
    pub full: usize,
    pub broad: usize,
    pub partial: usize,
    pub minimal: usize,
}

impl Default for ModelFieldBands {
    fn default() -> Self {
        Self {
            full: 15,
            broad: 10,
            partial: 6,
            minimal: 3,
        }
    }
}

/// Confidence thresholds and scoring breakpoints.
///
/// The 0.90/0.70 boundaries and the 15/10/6/3 field-count bands are
/// hand-tuned values carried over from the original deployment; they are
/// configuration defaults rather than hard invariants so calibration can
/// be revisited without touching scoring code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriageThresholds {
    /// Score at or above this: record is auto-approved.
    pub auto_approve: f32,
    /// Score at or above this (but below auto_approve): human review.
    pub review: f32,
    pub model_bands: ModelFieldBands,
}

impl Default for TriageThresholds {
    fn default() -> Self {
        Self {
            auto_approve: 0.90,
            review: 0.70,
            model_bands: ModelFieldBands::default(),
        }
    }
}
