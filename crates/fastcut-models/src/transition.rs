//! Pure status-transition rules for render jobs.
//!
//! Every status write in the system is funneled through [`evaluate`] so the
//! compare-and-set discipline lives in exactly one place: stores load the
//! current record, evaluate the update against it, and persist the result
//! only if the record has not changed underneath them.

use chrono::Utc;

use crate::job::{RenderJob, RenderStatus};

/// A requested change to a job's lifecycle state.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusUpdate {
    pub status: RenderStatus,
    /// New progress; omitted means "leave as is"
    pub progress: Option<u8>,
    pub error_message: Option<String>,
    pub output_url: Option<String>,
    pub composed_output_url: Option<String>,
}

impl StatusUpdate {
    pub fn processing(progress: Option<u8>) -> Self {
        Self {
            status: RenderStatus::Processing,
            progress,
            error_message: None,
            output_url: None,
            composed_output_url: None,
        }
    }

    pub fn completed(output_url: impl Into<String>) -> Self {
        Self {
            status: RenderStatus::Completed,
            progress: Some(100),
            error_message: None,
            output_url: Some(output_url.into()),
            composed_output_url: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            status: RenderStatus::Failed,
            progress: None,
            error_message: Some(error.into()),
            output_url: None,
            composed_output_url: None,
        }
    }

    pub fn cancelled() -> Self {
        Self {
            status: RenderStatus::Cancelled,
            progress: None,
            error_message: None,
            output_url: None,
            composed_output_url: None,
        }
    }

    pub fn with_composed_output(mut self, url: impl Into<String>) -> Self {
        self.composed_output_url = Some(url.into());
        self
    }
}

/// Why an update was not applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// The job already reached a terminal state; the update is stale
    Terminal(RenderStatus),
    /// The requested status is not reachable from the current one
    Illegal {
        from: RenderStatus,
        to: RenderStatus,
    },
}

/// Result of evaluating an update against the current record.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// Persist `job` (compare-and-set against the record that was evaluated)
    Apply {
        job: Box<RenderJob>,
        /// True when the update carried a lower progress than stored and was
        /// clamped to the stored value
        clamped_progress: bool,
    },
    /// Drop the update; the stored record stays as is
    Ignore(IgnoreReason),
}

impl Transition {
    pub fn is_applied(&self) -> bool {
        matches!(self, Transition::Apply { .. })
    }
}

/// Whether `to` is reachable from `from`. Terminal states are handled before
/// this table is consulted.
fn is_legal(from: RenderStatus, to: RenderStatus) -> bool {
    use RenderStatus::*;
    match from {
        Pending => true,
        Processing => matches!(to, Processing | Completed | Failed | Cancelled),
        // Failed can only be retried (back to Processing) or re-reported
        Failed => matches!(to, Failed | Processing),
        Completed | Cancelled => false,
    }
}

/// Evaluate a status update against the current record.
///
/// Rules:
/// - Completed/Cancelled are immutable.
/// - Progress never decreases; a lower value is clamped to the stored one.
/// - Completed forces progress 100 and clears any error.
/// - Failed -> Processing is the retry transition: it resets progress,
///   clears the error and the previous backend call id, and increments
///   `retry_count`.
pub fn evaluate(current: &RenderJob, update: &StatusUpdate) -> Transition {
    if current.status.is_terminal() {
        return Transition::Ignore(IgnoreReason::Terminal(current.status));
    }

    if !is_legal(current.status, update.status) {
        return Transition::Ignore(IgnoreReason::Illegal {
            from: current.status,
            to: update.status,
        });
    }

    let is_retry = current.status == RenderStatus::Failed && update.status == RenderStatus::Processing;

    let mut job = current.clone();
    job.status = update.status;
    job.updated_at = Utc::now();

    let mut clamped = false;
    job.progress = if update.status == RenderStatus::Completed {
        100
    } else if is_retry {
        // Fresh submission: progress restarts
        update.progress.unwrap_or(0)
    } else {
        match update.progress {
            Some(p) if p.min(100) < current.progress => {
                clamped = true;
                current.progress
            }
            Some(p) => p.min(100),
            None => current.progress,
        }
    };

    match update.status {
        RenderStatus::Failed => {
            job.error_message = update.error_message.clone().or(job.error_message);
        }
        RenderStatus::Completed | RenderStatus::Processing => {
            job.error_message = None;
        }
        _ => {}
    }

    if is_retry {
        job.backend_call_id = None;
        job.retry_count += 1;
    }

    if let Some(url) = &update.output_url {
        job.output_url = Some(url.clone());
    }
    if let Some(url) = &update.composed_output_url {
        job.composed_output_url = Some(url.clone());
    }

    Transition::Apply {
        job: Box::new(job),
        clamped_progress: clamped,
    }
}
