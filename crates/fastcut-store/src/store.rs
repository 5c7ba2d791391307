//! The generation store contract.
//!
//! The store is the single owner of render job records. Submission, retry
//! and reconciliation all mutate job state exclusively through this trait,
//! so the compare-and-set discipline on status lives here and nowhere else.

use async_trait::async_trait;

use fastcut_models::{RenderJob, RenderJobId, StatusUpdate, Transition};

use crate::error::StoreResult;

/// Outcome of an idempotent upsert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upserted {
    /// A new record was created
    Created,
    /// An existing record was refreshed in place (duplicate submission)
    Updated,
}

/// Persistent record of render job lifecycles.
#[async_trait]
pub trait GenerationStore: Send + Sync {
    /// Create-or-update a pending job keyed by its id.
    ///
    /// Calling this twice with the same id (a retried HTTP request) must not
    /// produce a second record: the envelope is refreshed on the existing
    /// record and its lifecycle fields are left untouched.
    async fn upsert_pending(&self, job: &RenderJob) -> StoreResult<Upserted>;

    /// Fetch a job by id.
    async fn get(&self, id: &RenderJobId) -> StoreResult<Option<RenderJob>>;

    /// Record the backend's correlation handle after a successful submit.
    async fn record_backend_call(&self, id: &RenderJobId, call_id: &str) -> StoreResult<()>;

    /// Apply a status update through the transition rules.
    ///
    /// The update is evaluated against the current record and persisted via
    /// compare-and-set; a record that changed underneath is re-read and
    /// re-evaluated, so a stale poll can never overwrite a terminal state.
    async fn apply_status(&self, id: &RenderJobId, update: StatusUpdate) -> StoreResult<Transition>;

    /// Fetch the stored job for retry.
    ///
    /// Only jobs in Failed status qualify; any other status is rejected with
    /// [`crate::StoreError::NotRetryable`].
    async fn get_for_retry(&self, id: &RenderJobId) -> StoreResult<RenderJob>;

    /// Ids of jobs not yet in a terminal state, for the reconciliation sweep.
    async fn list_active(&self) -> StoreResult<Vec<RenderJobId>>;
}
