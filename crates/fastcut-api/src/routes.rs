//! API routes.

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::limit::RequestBodyLimitLayer;

use crate::handlers::renders::{
    cancel_render, get_render, render_callback, retry_render, submit_render,
};
use crate::handlers::style_sets::list_style_sets;
use crate::handlers::{health, ready};
use crate::metrics::metrics_middleware;
use crate::middleware::{cors_layer, request_id, request_logging};
use crate::state::AppState;

/// Create the API router.
pub fn create_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    let render_routes = Router::new()
        .route("/renders", post(submit_render))
        .route("/renders/:job_id", get(get_render))
        .route("/renders/:job_id/retry", post(retry_render))
        .route("/renders/:job_id/cancel", post(cancel_render))
        // Status pushed by backends that support callbacks
        .route("/renders/:job_id/callback", post(render_callback));

    let style_routes = Router::new().route("/style-sets", get(list_style_sets));

    let api_routes = Router::new().merge(render_routes).merge(style_routes);

    let health_routes = Router::new()
        .route("/health", get(health))
        .route("/healthz", get(health))
        .route("/ready", get(ready));

    let metrics_routes = if let Some(handle) = metrics_handle {
        Router::new().route("/metrics", get(move || async move { handle.render() }))
    } else {
        Router::new()
    };

    Router::new()
        .nest("/api", api_routes)
        .merge(health_routes)
        .merge(metrics_routes)
        .layer(RequestBodyLimitLayer::new(state.config.max_body_size))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(request_id))
        .layer(middleware::from_fn(request_logging))
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}
