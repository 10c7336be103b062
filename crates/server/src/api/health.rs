// Health endpoint
//
// Runs a real render through the pool rather than reporting process
// liveness. Never authenticated.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use printworks_core::HealthReport;

use crate::service::DocumentService;

/// App state for the health route
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<dyn DocumentService>,
}

impl AppState {
    pub fn new(service: Arc<dyn DocumentService>) -> Self {
        Self { service }
    }
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .with_state(state)
}

/// GET /health - Deep health probe
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Pool, engine and render pipeline healthy", body = HealthReport),
        (status = 503, description = "At least one component degraded", body = HealthReport)
    ),
    tag = "health"
)]
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthReport>) {
    let report = state.service.probe().await;
    let status = if report.is_ok() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(report))
}
