//! End-to-end pipeline tests over the in-memory store and a scripted
//! backend: submit, duplicate submit, failure + retry, reconciliation and
//! cancellation.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use fastcut_backend::{
    BackendError, BackendJobState, BackendKind, BackendResult, BackendStatus, OutputDestination,
    RenderBackend, SubmitAck,
};
use fastcut_models::{ImageRef, RenderEnvelope, RenderJobId, RenderStatus};
use fastcut_pipeline::{
    PipelineError, ReconcileSweeper, Reconciler, RenderService, StyleCatalog, StyleInput,
    SubmitRenderRequest, SweeperConfig, INCOMPLETE_COMPLETION,
};
use fastcut_store::{GenerationStore, MemoryGenerationStore};

/// Backend double driven by pre-scripted responses.
struct ScriptedBackend {
    submits: Mutex<VecDeque<BackendResult<String>>>,
    polls: Mutex<VecDeque<BackendResult<BackendStatus>>>,
}

impl ScriptedBackend {
    fn new() -> Self {
        Self {
            submits: Mutex::new(VecDeque::new()),
            polls: Mutex::new(VecDeque::new()),
        }
    }

    fn push_submit(&self, result: BackendResult<String>) {
        self.submits.lock().unwrap().push_back(result);
    }

    fn push_poll(&self, result: BackendResult<BackendStatus>) {
        self.polls.lock().unwrap().push_back(result);
    }
}

#[async_trait]
impl RenderBackend for ScriptedBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Local
    }

    async fn submit(
        &self,
        _job_id: &str,
        _envelope: &RenderEnvelope,
        _output: &OutputDestination,
    ) -> BackendResult<SubmitAck> {
        let call_id = self
            .submits
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok("call-default".to_string()))?;
        Ok(SubmitAck {
            call_id,
            backend: BackendKind::Local,
        })
    }

    async fn poll_status(&self, _call_id: &str) -> BackendResult<BackendStatus> {
        self.polls
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(BackendError::unreachable("no scripted poll response")))
    }
}

struct Harness {
    store: Arc<MemoryGenerationStore>,
    backend: Arc<ScriptedBackend>,
    service: RenderService,
    reconciler: Reconciler,
}

fn harness() -> Harness {
    let store = Arc::new(MemoryGenerationStore::new());
    let backend = Arc::new(ScriptedBackend::new());
    let assets = Arc::new(fastcut_pipeline::StaticAssetSource::new());

    let service = RenderService::new(
        store.clone(),
        backend.clone(),
        assets,
        StyleCatalog::with_builtin_sets(),
        OutputDestination::new("s3://test-bucket/out"),
    );
    let reconciler = Reconciler::new(store.clone(), backend.clone());

    Harness {
        store,
        backend,
        service,
        reconciler,
    }
}

fn request(generation_id: &str) -> SubmitRenderRequest {
    SubmitRenderRequest {
        generation_id: Some(generation_id.to_string()),
        campaign_id: Some("campaign-1".to_string()),
        images: vec![
            ImageRef {
                url: "https://cdn.example.com/a.jpg".to_string(),
                order: 0,
            },
            ImageRef {
                url: "https://cdn.example.com/b.jpg".to_string(),
                order: 1,
            },
        ],
        audio_asset_id: None,
        audio_start_time: 0.0,
        script: None,
        use_audio_lyrics: false,
        style: StyleInput::StyleSet {
            style_set_id: "energetic_pop".to_string(),
        },
        aspect_ratio: fastcut_models::AspectRatio::PORTRAIT,
        target_duration: 30.0,
        seo: None,
    }
}

fn running(progress: u8) -> BackendStatus {
    BackendStatus {
        state: BackendJobState::Running,
        progress: Some(progress),
        output_url: None,
        error: None,
    }
}

fn succeeded(output_url: Option<&str>) -> BackendStatus {
    BackendStatus {
        state: BackendJobState::Succeeded,
        progress: Some(100),
        output_url: output_url.map(String::from),
        error: None,
    }
}

#[tokio::test]
async fn test_submit_persists_then_dispatches() {
    let h = harness();
    h.backend.push_submit(Ok("call-1".to_string()));

    let receipt = h.service.submit(request("job-1")).await.unwrap();
    assert_eq!(receipt.job_id.as_str(), "job-1");
    assert_eq!(receipt.status, RenderStatus::Processing);
    assert_eq!(receipt.backend_call_id, "call-1");

    let job = h
        .store
        .get(&RenderJobId::from_string("job-1"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(job.status, RenderStatus::Processing);
    assert_eq!(job.backend_call_id.as_deref(), Some("call-1"));
    // Settings are stored resolved, with provenance only
    assert_eq!(job.envelope.style_set_id.as_deref(), Some("energetic_pop"));
    assert!(!job.envelope.settings.use_ai_effects);
}

#[tokio::test]
async fn test_duplicate_submit_does_not_dispatch_second_render() {
    let h = harness();
    h.backend.push_submit(Ok("call-1".to_string()));
    h.backend.push_submit(Ok("call-2".to_string()));

    h.service.submit(request("job-1")).await.unwrap();
    let receipt = h.service.submit(request("job-1")).await.unwrap();

    // Second submit returns the in-flight state without a new backend call
    assert_eq!(receipt.status, RenderStatus::Processing);
    assert_eq!(receipt.backend_call_id, "call-1");

    assert_eq!(h.store.len(), 1);
    let job = h
        .store
        .get(&RenderJobId::from_string("job-1"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(job.backend_call_id.as_deref(), Some("call-1"));
}

#[tokio::test]
async fn test_duplicate_submit_after_completion_returns_terminal_state() {
    let h = harness();
    h.backend.push_submit(Ok("call-1".to_string()));
    h.service.submit(request("job-1")).await.unwrap();
    let id = RenderJobId::from_string("job-1");

    h.backend
        .push_poll(Ok(succeeded(Some("s3://test-bucket/out/job-1.mp4"))));
    h.reconciler.reconcile(&id).await.unwrap();

    let receipt = h.service.submit(request("job-1")).await.unwrap();
    assert_eq!(receipt.status, RenderStatus::Completed);
    assert_eq!(receipt.backend_call_id, "call-1");

    let job = h.store.get(&id).await.unwrap().unwrap();
    assert_eq!(job.status, RenderStatus::Completed);
    assert_eq!(
        job.output_url.as_deref(),
        Some("s3://test-bucket/out/job-1.mp4")
    );
}

#[tokio::test]
async fn test_unknown_style_set_fails_before_persisting() {
    let h = harness();
    let mut req = request("job-1");
    req.style = StyleInput::StyleSet {
        style_set_id: "nope".to_string(),
    };

    let err = h.service.submit(req).await.unwrap_err();
    assert!(matches!(err, PipelineError::InvalidStyleSet(_)));
    assert!(h.store.is_empty());
}

#[tokio::test]
async fn test_backend_submit_failure_marks_job_failed_and_retryable() {
    let h = harness();
    h.backend
        .push_submit(Err(BackendError::unreachable("connection refused")));

    let err = h.service.submit(request("job-1")).await.unwrap_err();
    assert!(err.is_retryable());

    let id = RenderJobId::from_string("job-1");
    let job = h.store.get(&id).await.unwrap().unwrap();
    assert_eq!(job.status, RenderStatus::Failed);
    assert!(job.error_message.as_deref().unwrap().contains("submit failed"));

    // Retry resubmits the stored envelope and clears failure bookkeeping
    h.backend.push_submit(Ok("call-2".to_string()));
    let receipt = h.service.retry(&id).await.unwrap();
    assert_eq!(receipt.backend_call_id, "call-2");

    let job = h.store.get(&id).await.unwrap().unwrap();
    assert_eq!(job.status, RenderStatus::Processing);
    assert_eq!(job.retry_count, 1);
    assert!(job.error_message.is_none());
    assert_eq!(job.backend_call_id.as_deref(), Some("call-2"));
}

#[tokio::test]
async fn test_rejected_payload_is_not_retryable_error() {
    let h = harness();
    h.backend.push_submit(Err(BackendError::Rejected {
        status: 422,
        message: "images missing".to_string(),
    }));

    let err = h.service.submit(request("job-1")).await.unwrap_err();
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_retry_of_processing_job_is_rejected() {
    let h = harness();
    h.backend.push_submit(Ok("call-1".to_string()));
    h.service.submit(request("job-1")).await.unwrap();

    let err = h
        .service
        .retry(&RenderJobId::from_string("job-1"))
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::NotRetryable { .. }));
}

#[tokio::test]
async fn test_reconcile_advances_progress_then_completes() {
    let h = harness();
    h.backend.push_submit(Ok("call-1".to_string()));
    h.service.submit(request("job-1")).await.unwrap();
    let id = RenderJobId::from_string("job-1");

    h.backend.push_poll(Ok(running(40)));
    h.reconciler.reconcile(&id).await.unwrap();
    assert_eq!(h.store.get(&id).await.unwrap().unwrap().progress, 40);

    h.backend
        .push_poll(Ok(succeeded(Some("s3://test-bucket/out/job-1.mp4"))));
    h.reconciler.reconcile(&id).await.unwrap();

    let job = h.store.get(&id).await.unwrap().unwrap();
    assert_eq!(job.status, RenderStatus::Completed);
    assert_eq!(job.progress, 100);
    assert_eq!(
        job.output_url.as_deref(),
        Some("s3://test-bucket/out/job-1.mp4")
    );

    // A stale in-flight poll arriving after completion is ignored
    h.backend.push_poll(Ok(running(80)));
    let transition = h.reconciler.reconcile(&id).await.unwrap();
    assert!(!transition.is_applied());
    let job = h.store.get(&id).await.unwrap().unwrap();
    assert_eq!(job.status, RenderStatus::Completed);
    assert_eq!(job.progress, 100);
}

#[tokio::test]
async fn test_reconcile_completion_without_output_fails_job() {
    let h = harness();
    h.backend.push_submit(Ok("call-1".to_string()));
    h.service.submit(request("job-1")).await.unwrap();
    let id = RenderJobId::from_string("job-1");

    h.backend.push_poll(Ok(succeeded(None)));
    h.reconciler.reconcile(&id).await.unwrap();

    let job = h.store.get(&id).await.unwrap().unwrap();
    assert_eq!(job.status, RenderStatus::Failed);
    assert_eq!(job.error_message.as_deref(), Some(INCOMPLETE_COMPLETION));
}

#[tokio::test]
async fn test_poll_failure_leaves_job_untouched() {
    let h = harness();
    h.backend.push_submit(Ok("call-1".to_string()));
    h.service.submit(request("job-1")).await.unwrap();
    let id = RenderJobId::from_string("job-1");

    h.backend.push_poll(Ok(running(55)));
    h.reconciler.reconcile(&id).await.unwrap();

    h.backend
        .push_poll(Err(BackendError::unreachable("poll timed out")));
    let err = h.reconciler.reconcile(&id).await.unwrap_err();
    assert!(err.is_retryable());

    let job = h.store.get(&id).await.unwrap().unwrap();
    assert_eq!(job.status, RenderStatus::Processing);
    assert_eq!(job.progress, 55);
}

#[tokio::test]
async fn test_sweep_leaves_failed_job_for_explicit_retry() {
    let h = harness();
    h.backend.push_submit(Ok("call-1".to_string()));
    h.service.submit(request("job-1")).await.unwrap();
    let id = RenderJobId::from_string("job-1");

    h.backend.push_poll(Ok(BackendStatus {
        state: BackendJobState::Failed,
        progress: None,
        output_url: None,
        error: Some("render crashed".to_string()),
    }));
    h.reconciler.reconcile(&id).await.unwrap();
    assert_eq!(
        h.store.get(&id).await.unwrap().unwrap().status,
        RenderStatus::Failed
    );

    // A poll of the failed job would wrongly revive it as Processing; the
    // sweep must not consume this
    h.backend.push_poll(Ok(running(10)));

    let sweeper = ReconcileSweeper::new(
        h.store.clone(),
        h.backend.clone(),
        SweeperConfig::default(),
    );
    let advanced = sweeper.sweep_once().await.unwrap();
    assert_eq!(advanced, 0);

    let job = h.store.get(&id).await.unwrap().unwrap();
    assert_eq!(job.status, RenderStatus::Failed);
    assert_eq!(job.retry_count, 0);
    assert_eq!(job.error_message.as_deref(), Some("render crashed"));
}

#[tokio::test]
async fn test_sweep_marks_stale_job_failed() {
    let h = harness();
    h.backend.push_submit(Ok("call-1".to_string()));
    h.service.submit(request("job-1")).await.unwrap();
    let id = RenderJobId::from_string("job-1");

    // Zero deadline: any active job counts as stale on the next sweep
    let sweeper = ReconcileSweeper::new(
        h.store.clone(),
        h.backend.clone(),
        SweeperConfig {
            stale_after: std::time::Duration::ZERO,
            ..Default::default()
        },
    );

    let advanced = sweeper.sweep_once().await.unwrap();
    assert_eq!(advanced, 1);

    let job = h.store.get(&id).await.unwrap().unwrap();
    assert_eq!(job.status, RenderStatus::Failed);
    assert!(job
        .error_message
        .as_deref()
        .unwrap()
        .contains("no backend status change"));

    // Failed jobs are retryable, so a stale job is recoverable
    assert!(h.store.get_for_retry(&id).await.is_ok());
}

#[tokio::test]
async fn test_cancel_processing_job() {
    let h = harness();
    h.backend.push_submit(Ok("call-1".to_string()));
    h.service.submit(request("job-1")).await.unwrap();
    let id = RenderJobId::from_string("job-1");

    let job = h.service.cancel(&id).await.unwrap();
    assert_eq!(job.status, RenderStatus::Cancelled);

    // Terminal; cancelling again conflicts
    let err = h.service.cancel(&id).await.unwrap_err();
    assert!(matches!(err, PipelineError::Conflict(_)));
}
