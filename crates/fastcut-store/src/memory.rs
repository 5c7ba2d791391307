//! In-memory generation store for tests and local development.
//!
//! Same contract as the Redis store; the mutex serializes writers, so the
//! transition evaluation happens against the record that will be replaced.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use fastcut_models::{evaluate, RenderJob, RenderJobId, StatusUpdate, Transition};

use crate::error::{StoreError, StoreResult};
use crate::store::{GenerationStore, Upserted};

/// In-process store backed by a HashMap.
#[derive(Default)]
pub struct MemoryGenerationStore {
    jobs: Mutex<HashMap<String, RenderJob>>,
}

impl MemoryGenerationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records (test helper).
    pub fn len(&self) -> usize {
        self.jobs.lock().expect("store lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl GenerationStore for MemoryGenerationStore {
    async fn upsert_pending(&self, job: &RenderJob) -> StoreResult<Upserted> {
        let mut jobs = self.jobs.lock().expect("store lock poisoned");
        match jobs.get_mut(job.id.as_str()) {
            Some(existing) => {
                existing.envelope = job.envelope.clone();
                existing.campaign_id = job.campaign_id.clone();
                existing.updated_at = chrono::Utc::now();
                Ok(Upserted::Updated)
            }
            None => {
                jobs.insert(job.id.to_string(), job.clone());
                Ok(Upserted::Created)
            }
        }
    }

    async fn get(&self, id: &RenderJobId) -> StoreResult<Option<RenderJob>> {
        let jobs = self.jobs.lock().expect("store lock poisoned");
        Ok(jobs.get(id.as_str()).cloned())
    }

    async fn record_backend_call(&self, id: &RenderJobId, call_id: &str) -> StoreResult<()> {
        let mut jobs = self.jobs.lock().expect("store lock poisoned");
        let job = jobs
            .get_mut(id.as_str())
            .ok_or_else(|| StoreError::not_found(id.as_str()))?;
        job.backend_call_id = Some(call_id.to_string());
        job.updated_at = chrono::Utc::now();
        Ok(())
    }

    async fn apply_status(&self, id: &RenderJobId, update: StatusUpdate) -> StoreResult<Transition> {
        let mut jobs = self.jobs.lock().expect("store lock poisoned");
        let current = jobs
            .get(id.as_str())
            .ok_or_else(|| StoreError::not_found(id.as_str()))?;

        let transition = evaluate(current, &update);
        if let Transition::Apply { job, .. } = &transition {
            jobs.insert(id.to_string(), job.as_ref().clone());
        }
        Ok(transition)
    }

    async fn get_for_retry(&self, id: &RenderJobId) -> StoreResult<RenderJob> {
        let jobs = self.jobs.lock().expect("store lock poisoned");
        let job = jobs
            .get(id.as_str())
            .ok_or_else(|| StoreError::not_found(id.as_str()))?;

        if !job.status.is_retryable() {
            return Err(StoreError::not_retryable(id.as_str(), job.status));
        }

        Ok(job.clone())
    }

    async fn list_active(&self) -> StoreResult<Vec<RenderJobId>> {
        let jobs = self.jobs.lock().expect("store lock poisoned");
        Ok(jobs
            .values()
            .filter(|j| !j.is_terminal())
            .map(|j| j.id.clone())
            .collect())
    }
}
