//! Render backend client.
//!
//! One trait, three interchangeable compute targets (local render service,
//! serverless function, batch cluster), selected once at startup from
//! configuration. Heterogeneous response shapes are normalized into a single
//! `{call_id}` acknowledgment and a canonical status report.

pub mod batch;
pub mod client;
pub mod config;
pub mod error;
pub mod local;
pub mod serverless;
pub mod wire;

pub use batch::BatchBackend;
pub use client::{create_backend, RenderBackend};
pub use config::{BackendConfig, BackendKind};
pub use error::{BackendError, BackendResult};
pub use local::LocalBackend;
pub use serverless::ServerlessBackend;
pub use wire::{BackendJobState, BackendStatus, OutputDestination, RenderRequest, SubmitAck};
