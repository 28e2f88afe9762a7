//! Diagram Render Endpoints
//!
//! - `POST /api/plantuml/text/generate` - JSON `{ text, outputType? }`
//! - `POST /api/plantuml/file/generate` - multipart `file` plus optional
//!   `outputType`
//!
//! Both answer with the raw image bytes and the format's content type.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{multipart::MultipartError, Multipart, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use puml_core::{ArtifactBytes, OutputFormat, RenderRequest};
use serde::{Deserialize, Serialize};

use crate::config::HttpConfig;
use crate::error::{ApiError, ApiResult};
use crate::services::ImageService;
use crate::state::AppState;
use crate::validation::{parse_output_type, validate_upload, ValidateNonEmpty};

// ============================================================================
// TYPES
// ============================================================================

/// Body of `POST /text/generate`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateTextRequest {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub output_type: Option<String>,
}

/// Rendered image with its content type.
#[derive(Debug, Clone)]
pub struct ImageResponse {
    pub format: OutputFormat,
    pub bytes: ArtifactBytes,
}

impl IntoResponse for ImageResponse {
    fn into_response(self) -> Response {
        (
            StatusCode::OK,
            [(header::CONTENT_TYPE, self.format.content_type())],
            Bytes::copy_from_slice(&self.bytes),
        )
            .into_response()
    }
}

// ============================================================================
// HANDLERS
// ============================================================================

/// POST /api/plantuml/text/generate
pub async fn generate_from_text(
    State(service): State<Arc<ImageService>>,
    Json(req): Json<GenerateTextRequest>,
) -> ApiResult<ImageResponse> {
    req.text.validate_non_empty("text")?;
    let format = parse_output_type(req.output_type.as_deref())?;
    let text = req.text.unwrap_or_default();

    render(&service, RenderRequest::new(text, format)).await
}

/// POST /api/plantuml/file/generate
pub async fn generate_from_file(
    State(service): State<Arc<ImageService>>,
    State(http): State<Arc<HttpConfig>>,
    mut multipart: Multipart,
) -> ApiResult<ImageResponse> {
    let mut source: Option<String> = None;
    let mut output_type: Option<String> = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().map(|s| s.to_string()).unwrap_or_default();
        match name.as_str() {
            "file" => {
                let content_type = field.content_type().map(|s| s.to_string());
                let data = field.bytes().await.map_err(multipart_error)?;
                validate_upload(content_type.as_deref(), data.len(), http.max_upload_bytes)?;
                let text = String::from_utf8(data.to_vec())
                    .map_err(|_| ApiError::invalid_format("file", "UTF-8 text"))?;
                source = Some(text);
            }
            "outputType" => {
                output_type = Some(field.text().await.map_err(multipart_error)?);
            }
            _ => {}
        }
    }

    let text = source.ok_or_else(|| ApiError::missing_field("file"))?;
    text.validate_non_empty("file")?;
    let format = parse_output_type(output_type.as_deref())?;

    render(&service, RenderRequest::new(text, format)).await
}

async fn render(service: &ImageService, request: RenderRequest) -> ApiResult<ImageResponse> {
    let format = request.output_format;
    let bytes = service.render(&request).await?;
    Ok(ImageResponse { format, bytes })
}

fn multipart_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::from_code(crate::error::ErrorCode::PayloadTooLarge)
    } else {
        ApiError::validation_failed(format!("Invalid multipart body: {}", err.body_text()))
    }
}

// ============================================================================
// ROUTER
// ============================================================================

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/text/generate", post(generate_from_text))
        .route("/file/generate", post(generate_from_file))
        .with_state(state)
}
