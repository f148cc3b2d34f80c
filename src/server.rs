//! Web server module for the exporter.
//!
//! Serves the Prometheus pull endpoint, a small landing page and a liveness
//! probe.

use axum::{
    Json, Router,
    extract::State,
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::get,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::trace::{DefaultMakeSpan, TraceLayer};

use crate::exposition::{Exposition, ExpositionError};
use crate::storage::TargetCache;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub exposition: Exposition,
    pub cache: Arc<TargetCache>,
    pub metrics_path: String,
}

/// Health check response.
#[derive(Serialize)]
struct HealthResponse {
    status: String,
    targets: usize,
}

/// Create the Axum router with all routes.
pub fn create_router(state: AppState) -> Router {
    let metrics_path = state.metrics_path.clone();
    let app_state = Arc::new(state);

    Router::new()
        .route("/", get(landing_handler))
        .route("/healthz", get(healthz_handler))
        .route(&metrics_path, get(metrics_handler))
        .layer(TraceLayer::new_for_http().make_span_with(DefaultMakeSpan::default()))
        .with_state(app_state)
}

/// Landing page linking to the metrics path.
async fn landing_handler(State(state): State<Arc<AppState>>) -> Html<String> {
    Html(format!(
        "<html>\n<head><title>Flussonic Exporter</title></head>\n<body>\n\
         <h1>Flussonic Exporter</h1>\n\
         <p><a href=\"{path}\">Metrics</a></p>\n\
         </body>\n</html>\n",
        path = state.metrics_path
    ))
}

/// Liveness probe.
async fn healthz_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        targets: state.cache.len(),
    })
}

/// Prometheus pull endpoint. Reads the cache only; never scrapes.
async fn metrics_handler(State(state): State<Arc<AppState>>) -> Response {
    let response = {
        let _in_flight = state.exposition.track_in_flight();
        metrics_response(state.exposition.render(), state.exposition.content_type())
    };
    state.exposition.observe_request(response.status().as_u16());
    response
}

fn metrics_response(rendered: Result<String, ExpositionError>, content_type: String) -> Response {
    match rendered {
        Ok(body) => (StatusCode::OK, [(header::CONTENT_TYPE, content_type)], body).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to render metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("An error has occurred while serving metrics:\n\n{e}"),
            )
                .into_response()
        }
    }
}
