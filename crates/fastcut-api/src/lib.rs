//! Axum HTTP API server.
//!
//! This crate provides:
//! - Render submission, status, retry and cancel endpoints
//! - Backend status callbacks
//! - Prometheus metrics

pub mod assets;
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod state;

pub use assets::{AssetServiceClient, AssetServiceConfig};
pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
