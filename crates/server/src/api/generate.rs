// Document generation endpoint
//
// Checks run in a fixed order: body parse, content and options validation,
// bearer auth, then rendering. Malformed input is always a 400, whatever
// credentials came with it.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use printworks_core::{RenderError, RenderJob, RenderOptions};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::common::{render_error_status, ErrorResponse};
use crate::auth::ApiKeys;
use crate::service::DocumentService;

/// Largest accepted request body
pub const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

/// App state for the generate route
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<dyn DocumentService>,
    pub keys: Arc<ApiKeys>,
}

impl AppState {
    pub fn new(service: Arc<dyn DocumentService>, keys: ApiKeys) -> Self {
        Self {
            service,
            keys: Arc::new(keys),
        }
    }
}

/// Request to render a document
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct GenerateRequest {
    /// Markup to render.
    #[schema(example = "<h1>Invoice</h1>")]
    pub html: Option<String>,
    /// Alias for `html`; used when `html` is absent.
    pub content: Option<String>,
    /// Export options; missing fields use engine defaults.
    pub options: Option<RenderOptions>,
    /// Download name sent back in `Content-Disposition`.
    #[schema(example = "invoice.pdf")]
    pub filename: Option<String>,
    /// Queue priority; larger is served first. Defaults to the middle level.
    pub priority: Option<u32>,
}

impl GenerateRequest {
    pub fn into_job(self) -> RenderJob {
        let content = self.html.or(self.content).unwrap_or_default();
        let mut job = RenderJob::new(content).with_options(self.options.unwrap_or_default());
        if let Some(filename) = self.filename {
            job = job.with_filename(filename);
        }
        job
    }
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/generate", post(generate))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(state)
}

/// POST /generate - Render markup to PDF
#[utoipa::path(
    post,
    path = "/generate",
    request_body = GenerateRequest,
    responses(
        (status = 200, description = "Rendered document", content_type = "application/pdf", body = Vec<u8>),
        (status = 400, description = "Malformed request, empty content or invalid options", body = ErrorResponse),
        (status = 401, description = "Missing or unknown bearer key", body = ErrorResponse),
        (status = 502, description = "Engine failed or produced unusable output", body = ErrorResponse),
        (status = 503, description = "Service is shutting down or cannot start an engine", body = ErrorResponse),
        (status = 504, description = "Timed out waiting for a worker or rendering", body = ErrorResponse)
    ),
    tag = "documents"
)]
pub async fn generate(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    let req: GenerateRequest = match serde_json::from_slice(&body) {
        Ok(req) => req,
        Err(e) => {
            return ErrorResponse::new(format!("Invalid request body: {}", e), "validation")
                .into_response(StatusCode::BAD_REQUEST)
                .into_response();
        }
    };

    let priority = req.priority;
    let job = req.into_job();
    if let Err(e) = job.validate() {
        return error_response(&e);
    }

    if let Err(e) = state.keys.authorize(&headers) {
        return e.into_response();
    }

    let job_id = job.id;
    let attachment = job.attachment_name();

    match state.service.print(job, priority).await {
        Ok(artifact) => {
            let mut headers = HeaderMap::new();
            headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/pdf"));
            headers.insert(header::CONTENT_LENGTH, HeaderValue::from(artifact.len()));
            if let Some(name) = attachment {
                match HeaderValue::from_str(&format!("attachment; filename=\"{}\"", name)) {
                    Ok(value) => {
                        headers.insert(header::CONTENT_DISPOSITION, value);
                    }
                    Err(_) => {
                        tracing::debug!(job_id = %job_id, "Skipping unrepresentable attachment name");
                    }
                }
            }
            (StatusCode::OK, headers, artifact.into_bytes()).into_response()
        }
        Err(e) => {
            if e.is_retryable() {
                tracing::warn!(job_id = %job_id, kind = e.kind(), error = %e, "Render failed");
            } else {
                tracing::error!(job_id = %job_id, kind = e.kind(), error = %e, "Render failed");
            }
            error_response(&e)
        }
    }
}

fn error_response(error: &RenderError) -> Response {
    ErrorResponse::from(error)
        .into_response(render_error_status(error))
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_takes_precedence_over_content() {
        let req: GenerateRequest =
            serde_json::from_str(r#"{"html": "<p>a</p>", "content": "<p>b</p>"}"#).unwrap();
        assert_eq!(req.into_job().content, "<p>a</p>");

        let req: GenerateRequest = serde_json::from_str(r#"{"content": "<p>b</p>"}"#).unwrap();
        assert_eq!(req.into_job().content, "<p>b</p>");
    }

    #[test]
    fn test_missing_content_becomes_empty_job() {
        let job = GenerateRequest::default().into_job();
        assert!(job.content.is_empty());
        assert_eq!(job.validate().unwrap_err().kind(), "validation");
    }

    #[test]
    fn test_options_and_filename_carried_over() {
        let req: GenerateRequest = serde_json::from_str(
            r#"{"html": "<p>x</p>", "filename": "report.pdf", "options": {"landscape": true, "format": "a4"}}"#,
        )
        .unwrap();
        let job = req.into_job();
        assert!(job.options.landscape);
        assert_eq!(job.filename.as_deref(), Some("report.pdf"));
    }
}
