//! Status reconciliation.
//!
//! Polls the backend for each active job, maps its vocabulary onto the
//! canonical status set and pushes the result through the store's transition
//! rules. A transient poll failure never mutates job state; only a
//! successful backend response may advance it.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Duration as ChronoDuration, Utc};
use metrics::counter;
use tokio::time::interval;
use tracing::{debug, error, info, warn};

use fastcut_backend::{BackendJobState, BackendStatus, RenderBackend};
use fastcut_models::{IgnoreReason, RenderJob, RenderJobId, RenderStatus, StatusUpdate, Transition};
use fastcut_store::GenerationStore;

use crate::error::{PipelineError, PipelineResult};

/// Error recorded when a backend claims success without an artifact.
pub const INCOMPLETE_COMPLETION: &str =
    "backend reported completion without an output location";

pub struct Reconciler {
    store: Arc<dyn GenerationStore>,
    backend: Arc<dyn RenderBackend>,
}

impl Reconciler {
    pub fn new(store: Arc<dyn GenerationStore>, backend: Arc<dyn RenderBackend>) -> Self {
        Self { store, backend }
    }

    /// Reconcile one job against the backend's current view.
    pub async fn reconcile(&self, id: &RenderJobId) -> PipelineResult<Transition> {
        let job = self
            .store
            .get(id)
            .await?
            .ok_or_else(|| PipelineError::NotFound(id.to_string()))?;

        if job.is_terminal() {
            return Ok(Transition::Ignore(IgnoreReason::Terminal(job.status)));
        }

        let call_id = job.backend_call_id.as_deref().ok_or_else(|| {
            PipelineError::Conflict(format!("job {id} has no backend call recorded"))
        })?;

        let status = self.backend.poll_status(call_id).await?;
        let update = map_backend_status(&status);

        debug!(
            job_id = %id,
            backend_state = ?status.state,
            canonical = %update.status,
            "Reconciled backend status"
        );

        let transition = self.store.apply_status(id, update).await?;
        counter!(
            "fastcut_reconcile_total",
            "outcome" => if transition.is_applied() { "applied" } else { "ignored" }
        )
        .increment(1);

        Ok(transition)
    }

    /// Apply a status report pushed by the backend (callback path).
    ///
    /// Callbacks and polls race freely; the store's compare-and-set rules
    /// decide which write wins.
    pub async fn apply_report(
        &self,
        id: &RenderJobId,
        status: &BackendStatus,
    ) -> PipelineResult<Transition> {
        let update = map_backend_status(status);
        Ok(self.store.apply_status(id, update).await?)
    }
}

/// Map a normalized backend report onto a canonical status update.
pub fn map_backend_status(status: &BackendStatus) -> StatusUpdate {
    match status.state {
        BackendJobState::Queued | BackendJobState::Running => {
            StatusUpdate::processing(status.progress)
        }
        BackendJobState::Succeeded => match &status.output_url {
            Some(url) => StatusUpdate::completed(url.clone()),
            // Success without an artifact is a failure, not a stuck
            // Processing record
            None => StatusUpdate::failed(INCOMPLETE_COMPLETION),
        },
        BackendJobState::Failed => StatusUpdate::failed(
            status
                .error
                .clone()
                .unwrap_or_else(|| "backend reported failure".to_string()),
        ),
        BackendJobState::Cancelled => StatusUpdate::cancelled(),
    }
}

/// Configuration for the periodic reconciliation sweep.
#[derive(Debug, Clone)]
pub struct SweeperConfig {
    pub interval: Duration,
    pub enabled: bool,
    /// Active jobs with no status change for this long are marked Failed
    pub stale_after: Duration,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
            enabled: true,
            stale_after: Duration::from_secs(1800),
        }
    }
}

impl SweeperConfig {
    pub fn from_env() -> Self {
        let interval_secs = std::env::var("RECONCILE_INTERVAL_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(30);
        let enabled = std::env::var("ENABLE_RECONCILE_SWEEP")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(true);
        let stale_secs = std::env::var("STALE_JOB_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(1800);

        Self {
            interval: Duration::from_secs(interval_secs),
            enabled,
            stale_after: Duration::from_secs(stale_secs),
        }
    }
}

/// Background loop sweeping all active jobs through the reconciler.
pub struct ReconcileSweeper {
    reconciler: Reconciler,
    store: Arc<dyn GenerationStore>,
    config: SweeperConfig,
}

impl ReconcileSweeper {
    pub fn new(
        store: Arc<dyn GenerationStore>,
        backend: Arc<dyn RenderBackend>,
        config: SweeperConfig,
    ) -> Self {
        Self {
            reconciler: Reconciler::new(store.clone(), backend),
            store,
            config,
        }
    }

    /// Run indefinitely; spawn as a background task.
    pub async fn run(&self) {
        if !self.config.enabled {
            info!("Reconciliation sweep is disabled");
            return;
        }

        info!(interval = ?self.config.interval, "Starting reconciliation sweeper");

        let mut ticker = interval(self.config.interval);

        loop {
            ticker.tick().await;

            if let Err(e) = self.sweep_once().await {
                error!(error = %e, "Reconciliation sweep failed");
            }
        }
    }

    /// One pass over every active job. Per-job failures are logged and the
    /// sweep continues; the next tick retries them.
    pub async fn sweep_once(&self) -> PipelineResult<u32> {
        let active = self.store.list_active().await?;
        if active.is_empty() {
            return Ok(0);
        }

        let mut advanced = 0u32;

        for id in &active {
            let job = match self.store.get(id).await {
                Ok(Some(job)) => job,
                Ok(None) => continue,
                Err(e) => {
                    warn!(job_id = %id, error = %e, "Could not load job for sweep");
                    continue;
                }
            };

            // Failed jobs are waiting on an explicit retry, not on the
            // backend; polling them would revive them as Processing
            if job.is_terminal() || job.status == RenderStatus::Failed {
                continue;
            }

            if self.is_stale(&job) {
                match self.mark_stale(&job).await {
                    Ok(true) => advanced += 1,
                    Ok(false) => {}
                    Err(e) => {
                        warn!(job_id = %id, error = %e, "Could not mark stale job");
                    }
                }
                continue;
            }

            match self.reconciler.reconcile(id).await {
                Ok(transition) if transition.is_applied() => advanced += 1,
                Ok(_) => {}
                Err(e) => {
                    warn!(job_id = %id, error = %e, "Could not reconcile job");
                }
            }
        }

        if advanced > 0 {
            info!(active = active.len(), advanced, "Reconciliation sweep complete");
        }

        Ok(advanced)
    }

    fn is_stale(&self, job: &RenderJob) -> bool {
        let deadline = ChronoDuration::from_std(self.config.stale_after)
            .unwrap_or_else(|_| ChronoDuration::seconds(1800));
        Utc::now() - job.updated_at > deadline
    }

    /// Mark a job Failed after the no-status-change deadline. Returns true
    /// when the transition was applied.
    async fn mark_stale(&self, job: &RenderJob) -> PipelineResult<bool> {
        warn!(
            job_id = %job.id,
            status = %job.status,
            stale_secs = self.config.stale_after.as_secs(),
            "Marking stale job failed"
        );
        let transition = self
            .store
            .apply_status(
                &job.id,
                StatusUpdate::failed(format!(
                    "no backend status change within {}s",
                    self.config.stale_after.as_secs()
                )),
            )
            .await?;
        counter!("fastcut_reconcile_stale_total").increment(1);

        Ok(transition.is_applied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fastcut_models::RenderStatus;

    fn report(state: BackendJobState) -> BackendStatus {
        BackendStatus {
            state,
            progress: None,
            output_url: None,
            error: None,
        }
    }

    #[test]
    fn test_running_maps_to_processing_with_progress() {
        let mut status = report(BackendJobState::Running);
        status.progress = Some(42);

        let update = map_backend_status(&status);
        assert_eq!(update.status, RenderStatus::Processing);
        assert_eq!(update.progress, Some(42));
    }

    #[test]
    fn test_succeeded_with_output_maps_to_completed() {
        let mut status = report(BackendJobState::Succeeded);
        status.output_url = Some("s3://bucket/out/job-1.mp4".to_string());

        let update = map_backend_status(&status);
        assert_eq!(update.status, RenderStatus::Completed);
        assert_eq!(
            update.output_url.as_deref(),
            Some("s3://bucket/out/job-1.mp4")
        );
    }

    #[test]
    fn test_succeeded_without_output_is_a_failure() {
        let update = map_backend_status(&report(BackendJobState::Succeeded));
        assert_eq!(update.status, RenderStatus::Failed);
        assert_eq!(update.error_message.as_deref(), Some(INCOMPLETE_COMPLETION));
    }

    #[test]
    fn test_failed_carries_backend_error() {
        let mut status = report(BackendJobState::Failed);
        status.error = Some("out of memory".to_string());

        let update = map_backend_status(&status);
        assert_eq!(update.status, RenderStatus::Failed);
        assert_eq!(update.error_message.as_deref(), Some("out of memory"));
    }

    #[test]
    fn test_cancelled_maps_to_cancelled() {
        let update = map_backend_status(&report(BackendJobState::Cancelled));
        assert_eq!(update.status, RenderStatus::Cancelled);
    }
}
