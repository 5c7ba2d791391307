//! Render submission pipeline.
//!
//! Ties the style resolver, envelope builder, generation store and backend
//! client into the submit/retry/cancel/reconcile flows. Everything here is
//! transport-agnostic; the HTTP surface lives in the API crate.

pub mod assets;
pub mod envelope;
pub mod error;
pub mod reconcile;
pub mod service;
pub mod styles;

pub use assets::{AssetSource, AudioAsset, LyricLine, StaticAssetSource, TimedLyrics};
pub use envelope::{
    build_envelope, sanitize_storage_url, BuiltEnvelope, EnvelopeInputs, ScriptSource, MIN_IMAGES,
};
pub use error::{PipelineError, PipelineResult};
pub use reconcile::{
    map_backend_status, ReconcileSweeper, Reconciler, SweeperConfig, INCOMPLETE_COMPLETION,
};
pub use service::{RenderService, SubmitReceipt, SubmitRenderRequest};
pub use styles::{resolve, StyleCatalog, StyleInput, StyleSetDefinition};
