// Common DTOs for public API
//
// These types are shared across endpoints.

use axum::http::StatusCode;
use axum::Json;
use printworks_core::RenderError;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Standard error response for API endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Error message describing what went wrong.
    pub error: String,
    /// Machine-readable error class.
    #[schema(example = "timeout")]
    pub kind: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            kind: kind.into(),
        }
    }

    /// Convert to axum response tuple
    pub fn into_response(self, status: StatusCode) -> (StatusCode, Json<Self>) {
        (status, Json(self))
    }
}

/// HTTP status for a failed render
pub fn render_error_status(error: &RenderError) -> StatusCode {
    match error {
        RenderError::Validation(_) => StatusCode::BAD_REQUEST,
        RenderError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        RenderError::Engine(_) => StatusCode::BAD_GATEWAY,
        RenderError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

impl From<&RenderError> for ErrorResponse {
    fn from(error: &RenderError) -> Self {
        Self::new(error.to_string(), error.kind())
    }
}
