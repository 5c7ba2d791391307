//! Submission orchestration.
//!
//! `RenderService` wires the resolver, the envelope builder, the generation
//! store and the backend client together. Ordering matters: the pending
//! record is persisted before the backend is called, so a crash between the
//! two leaves a Pending record the sweep can surface instead of an untracked
//! backend job.

use std::sync::Arc;

use metrics::counter;
use serde::Deserialize;
use tracing::{error, info, warn};

use fastcut_backend::{OutputDestination, RenderBackend};
use fastcut_models::{
    AspectRatio, ImageRef, RenderJob, RenderJobId, RenderStatus, ScriptLine, SeoMetadata,
    StatusUpdate, Transition,
};
use fastcut_store::{GenerationStore, Upserted};

use crate::assets::AssetSource;
use crate::envelope::{build_envelope, EnvelopeInputs, ScriptSource};
use crate::error::{PipelineError, PipelineResult};
use crate::styles::{resolve, StyleCatalog, StyleInput};

/// One render submission.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitRenderRequest {
    /// Client-supplied id makes the submission idempotent; omitted means
    /// the service mints one.
    #[serde(default)]
    pub generation_id: Option<String>,
    #[serde(default)]
    pub campaign_id: Option<String>,
    pub images: Vec<ImageRef>,
    #[serde(default)]
    pub audio_asset_id: Option<String>,
    #[serde(default)]
    pub audio_start_time: f64,
    #[serde(default)]
    pub script: Option<Vec<ScriptLine>>,
    #[serde(default)]
    pub use_audio_lyrics: bool,
    #[serde(default)]
    pub style: StyleInput,
    #[serde(default = "default_aspect_ratio")]
    pub aspect_ratio: AspectRatio,
    #[serde(default = "default_target_duration")]
    pub target_duration: f64,
    #[serde(default)]
    pub seo: Option<SeoMetadata>,
}

fn default_aspect_ratio() -> AspectRatio {
    AspectRatio::PORTRAIT
}

fn default_target_duration() -> f64 {
    30.0
}

/// What the caller gets back from a successful submission.
#[derive(Debug, Clone)]
pub struct SubmitReceipt {
    pub job_id: RenderJobId,
    pub status: RenderStatus,
    pub backend_call_id: String,
    pub backend: String,
    pub script_source: ScriptSource,
}

pub struct RenderService {
    store: Arc<dyn GenerationStore>,
    backend: Arc<dyn RenderBackend>,
    assets: Arc<dyn AssetSource>,
    catalog: StyleCatalog,
    output: OutputDestination,
}

impl RenderService {
    pub fn new(
        store: Arc<dyn GenerationStore>,
        backend: Arc<dyn RenderBackend>,
        assets: Arc<dyn AssetSource>,
        catalog: StyleCatalog,
        output: OutputDestination,
    ) -> Self {
        Self {
            store,
            backend,
            assets,
            catalog,
            output,
        }
    }

    pub fn catalog(&self) -> &StyleCatalog {
        &self.catalog
    }

    /// Submit a new render.
    ///
    /// Resolution and envelope assembly happen before anything is persisted,
    /// so user-correctable failures never leave a record behind. A backend
    /// submit failure marks the already-persisted job Failed and surfaces
    /// the error; the stored envelope makes it retryable.
    pub async fn submit(&self, request: SubmitRenderRequest) -> PipelineResult<SubmitReceipt> {
        let job_id = match &request.generation_id {
            Some(id) => RenderJobId::from_string(id.clone()),
            None => RenderJobId::new(),
        };

        let style = resolve(&self.catalog, &request.style)?;
        let style_set_id = match &request.style {
            StyleInput::StyleSet { style_set_id } => Some(style_set_id.clone()),
            StyleInput::Custom { .. } => None,
        };

        let built = build_envelope(
            self.assets.as_ref(),
            style,
            EnvelopeInputs {
                images: request.images,
                audio_asset_id: request.audio_asset_id,
                audio_start_time: request.audio_start_time,
                explicit_script: request.script,
                use_audio_lyrics: request.use_audio_lyrics,
                aspect_ratio: request.aspect_ratio,
                target_duration: request.target_duration,
                style_set_id,
                seo: request.seo,
            },
            self.backend.kind().requires_unsigned_urls(),
        )
        .await?;

        let job = RenderJob::new(job_id.clone(), request.campaign_id, built.envelope);
        let outcome = self.store.upsert_pending(&job).await?;

        // A resubmit of an id that is already in flight or finished must not
        // start a second render; the caller gets the current state back.
        // Pending (crash before dispatch) and Failed records do re-dispatch.
        if outcome == Upserted::Updated {
            if let Some(existing) = self.store.get(&job_id).await? {
                if existing.status != RenderStatus::Pending
                    && existing.status != RenderStatus::Failed
                {
                    info!(
                        job_id = %job_id,
                        status = %existing.status,
                        "Duplicate submit; returning current state"
                    );
                    return Ok(SubmitReceipt {
                        job_id,
                        status: existing.status,
                        backend_call_id: existing.backend_call_id.unwrap_or_default(),
                        backend: self.backend.kind().to_string(),
                        script_source: built.script_source,
                    });
                }
            }
        }

        info!(
            job_id = %job_id,
            backend = %self.backend.kind(),
            image_count = job.envelope.images.len(),
            "Submitting render job"
        );

        let ack = self.dispatch(&job_id, &job).await?;

        Ok(SubmitReceipt {
            job_id,
            status: RenderStatus::Processing,
            backend_call_id: ack,
            backend: self.backend.kind().to_string(),
            script_source: built.script_source,
        })
    }

    /// Retry a failed job from its stored envelope.
    ///
    /// The envelope is resubmitted verbatim; nothing is re-resolved. Only
    /// jobs in Failed status qualify.
    pub async fn retry(&self, id: &RenderJobId) -> PipelineResult<SubmitReceipt> {
        let job = self.store.get_for_retry(id).await?;

        info!(job_id = %id, retry_count = job.retry_count, "Retrying failed render job");
        counter!("fastcut_pipeline_retries_total").increment(1);

        let ack = self.dispatch(id, &job).await?;

        Ok(SubmitReceipt {
            job_id: id.clone(),
            status: RenderStatus::Processing,
            backend_call_id: ack,
            backend: self.backend.kind().to_string(),
            script_source: ScriptSource::None,
        })
    }

    /// Cancel a job that has not reached a terminal state.
    pub async fn cancel(&self, id: &RenderJobId) -> PipelineResult<RenderJob> {
        match self.store.apply_status(id, StatusUpdate::cancelled()).await? {
            Transition::Apply { job, .. } => {
                info!(job_id = %id, "Render job cancelled");
                Ok(*job)
            }
            Transition::Ignore(reason) => Err(PipelineError::Conflict(format!(
                "cannot cancel job {id}: {reason:?}"
            ))),
        }
    }

    /// Current state of a job.
    pub async fn status(&self, id: &RenderJobId) -> PipelineResult<RenderJob> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| PipelineError::NotFound(id.to_string()))
    }

    /// Send the job to the backend and advance the record to Processing.
    ///
    /// Used by both first submission and retry; the transition rules handle
    /// the difference (a Failed record gets its error cleared and its retry
    /// count bumped).
    async fn dispatch(&self, id: &RenderJobId, job: &RenderJob) -> PipelineResult<String> {
        let ack = match self
            .backend
            .submit(id.as_str(), &job.envelope, &self.output)
            .await
        {
            Ok(ack) => ack,
            Err(e) => {
                error!(job_id = %id, error = %e, "Backend submit failed");
                counter!("fastcut_pipeline_submit_failures_total").increment(1);
                // Keep the record consistent; the stored envelope stays
                // retryable. A store failure here is secondary to the
                // submit failure, so it is logged and dropped.
                if let Err(store_err) = self
                    .store
                    .apply_status(id, StatusUpdate::failed(format!("submit failed: {e}")))
                    .await
                {
                    warn!(job_id = %id, error = %store_err, "Could not mark job failed");
                }
                return Err(e.into());
            }
        };

        let transition = self
            .store
            .apply_status(id, StatusUpdate::processing(Some(0)))
            .await?;
        if !transition.is_applied() {
            warn!(job_id = %id, "Job moved state during submit; keeping newer state");
        }
        self.store.record_backend_call(id, &ack.call_id).await?;

        counter!("fastcut_pipeline_submits_total", "backend" => self.backend.kind().as_str())
            .increment(1);

        Ok(ack.call_id)
    }
}
