// Printworks server library
// Decision: Shared library for the server binary and its router tests

// API routes and types (shared for OpenAPI generation)
pub mod api;

// Bearer key allow-list
pub mod auth;

// Startup configuration
pub mod config;

// OpenAPI spec generation
pub mod openapi;

// Handler-facing view of the printer
pub mod service;

pub use auth::ApiKeys;
pub use config::ServerConfig;
pub use service::DocumentService;

use std::sync::Arc;

use axum::Router;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Assemble the full application router.
///
/// `/health` and the OpenAPI endpoints stay at the root; the job API is
/// nested under `api_prefix` when one is set.
pub fn build_app(service: Arc<dyn DocumentService>, keys: ApiKeys, api_prefix: &str) -> Router {
    let generate_state = api::generate::AppState::new(service.clone(), keys);
    let health_state = api::health::AppState::new(service);

    let api_routes = Router::new().merge(api::generate::routes(generate_state));

    Router::new()
        .merge(api::health::routes(health_state))
        .merge(build_router_with_prefix(api_routes, api_prefix))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-doc/openapi.json", openapi::ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
}

/// Build router with optional API prefix (extracted for testing)
pub fn build_router_with_prefix<S: Clone + Send + Sync + 'static>(
    api_routes: Router<S>,
    api_prefix: &str,
) -> Router<S> {
    if api_prefix.is_empty() {
        api_routes
    } else {
        Router::new().nest(api_prefix, api_routes)
    }
}
