use axum::{extract::State, http::header, response::IntoResponse, routing::get, Router};
use std::sync::Arc;

use crate::registry::GaugeRegistry;

/// Prometheus text exposition format, version 0.0.4.
const EXPOSITION_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Builds the Axum `Router` with the single metrics exposition route.
/// Anything else 404s; there is deliberately no other surface.
pub fn create_router(registry: Arc<GaugeRegistry>) -> Router {
    Router::new()
        .route("/metrics", get(serve_metrics))
        .with_state(registry)
}

// ─── GET /metrics ────────────────────────────────────────────────
/// One consistent snapshot of every currently published gauge.
/// Probes that failed their last sample are simply absent from the body.

async fn serve_metrics(State(registry): State<Arc<GaugeRegistry>>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, EXPOSITION_CONTENT_TYPE)],
        registry.render(),
    )
}

// ─── Tests ───────────────────────────────────────────────────────
