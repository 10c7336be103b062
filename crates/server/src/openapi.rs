// OpenAPI specification generation
//
// Served by the server under /api-doc/openapi.json with Swagger UI at /swagger-ui.

use crate::api;
use printworks_core::{
    ComponentHealth, HealthComponents, HealthReport, HealthStatus, Margin, RenderOptions,
};
use utoipa::OpenApi;

/// OpenAPI documentation for the Printworks API
#[derive(OpenApi)]
#[openapi(
    paths(
        api::generate::generate,
        api::health::health,
    ),
    components(
        schemas(
            api::generate::GenerateRequest,
            api::ErrorResponse,
            RenderOptions, Margin,
            HealthReport, HealthStatus, ComponentHealth, HealthComponents,
        )
    ),
    tags(
        (name = "documents", description = "HTML to PDF rendering"),
        (name = "health", description = "Deep health probe")
    ),
    info(
        title = "Printworks API",
        version = "0.1.0",
        description = "Render HTML to PDF on a pool of headless Chromium workers",
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spec_lists_both_routes() {
        let spec = ApiDoc::openapi();
        assert!(spec.paths.paths.contains_key("/generate"));
        assert!(spec.paths.paths.contains_key("/health"));
    }
}
