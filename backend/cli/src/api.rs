use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        DefaultBodyLimit, Multipart, State,
    },
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;
use tower_http::services::ServeDir;
use tracing::{error, info, warn, Instrument};
use uuid::Uuid;

use smartvision_core::{AnalysisResult, SmartVisionError, UploadedImage};
use smartvision_logging::redact_sensitive_data;
use smartvision_media::{is_image, ImageUploader};
use smartvision_understanding::ImageAnalyzer;

/// Multipart field that carries the uploaded image.
pub const IMAGE_FIELD: &str = "image";

/// Readiness of one backing service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Ready,
    Degraded,
}

/// Startup readiness, reported by `/api/health`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Readiness {
    pub vision: ComponentStatus,
    pub storage: ComponentStatus,
}

impl Readiness {
    pub fn ready() -> Self {
        Self {
            vision: ComponentStatus::Ready,
            storage: ComponentStatus::Ready,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.vision == ComponentStatus::Ready && self.storage == ComponentStatus::Ready
    }
}

/// Shared application state for API handlers.
pub struct AppState {
    pub analyzer: ImageAnalyzer,
    pub uploader: ImageUploader,
    pub readiness: Readiness,
}

impl AppState {
    pub fn new(analyzer: ImageAnalyzer, uploader: ImageUploader) -> Self {
        Self {
            analyzer,
            uploader,
            readiness: Readiness::ready(),
        }
    }

    pub fn with_readiness(mut self, readiness: Readiness) -> Self {
        self.readiness = readiness;
        self
    }
}

/// Router settings taken from the server config.
#[derive(Debug, Clone)]
pub struct RouterOptions {
    /// Directory served for every path outside `/api`.
    pub static_dir: PathBuf,
    /// Request body cap for `/api/analyze`.
    pub max_upload_bytes: usize,
}

/// Build the Axum router with all API routes and the static fallback.
pub fn build_router(state: Arc<AppState>, options: &RouterOptions) -> Router {
    Router::new()
        .route("/api/test", get(test_endpoint))
        .route("/api/health", get(health))
        .route(
            "/api/analyze",
            post(analyze).layer(DefaultBodyLimit::max(options.max_upload_bytes)),
        )
        .with_state(state)
        .fallback_service(ServeDir::new(&options.static_dir))
}

/// Errors surfaced to API clients as `{ "success": false, "error": ... }`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("No image file uploaded.")]
    NoImage,
    #[error("invalid upload: {0}")]
    InvalidUpload(#[from] MultipartError),
    #[error("{0}")]
    Analysis(SmartVisionError),
    #[error("{0}")]
    Upload(SmartVisionError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::NoImage => StatusCode::BAD_REQUEST,
            Self::InvalidUpload(e) => e.status(),
            Self::Analysis(_) | Self::Upload(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    success: bool,
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = redact_sensitive_data(&self.to_string());
        if status.is_server_error() {
            error!(status = status.as_u16(), error = %message, "Analysis request failed");
        } else {
            warn!(status = status.as_u16(), error = %message, "Rejected analysis request");
        }
        let body = ErrorBody {
            success: false,
            error: message,
        };
        (status, Json(body)).into_response()
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzeResponse {
    success: bool,
    analysis: AnalysisResult,
    image_url: String,
}

/// Liveness probe.
async fn test_endpoint() -> Json<Value> {
    Json(json!({
        "message": "Server is working!",
        "status": "OK",
    }))
}

/// Health check endpoint. Reports startup readiness without calling Azure.
async fn health(State(state): State<Arc<AppState>>) -> Json<Value> {
    let readiness = state.readiness;
    Json(json!({
        "status": if readiness.is_ready() { "ok" } else { "degraded" },
        "vision": readiness.vision,
        "storage": readiness.storage,
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Analyze an uploaded image, then store it.
async fn analyze(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<AnalyzeResponse>, ApiError> {
    let request_id = Uuid::new_v4();
    let span = tracing::info_span!("analyze", %request_id);

    async move {
        let multipart = multipart.map_err(|rejection| {
            warn!(reason = %rejection, "Request is not a multipart upload");
            ApiError::NoImage
        })?;
        let image = read_image(multipart).await?.ok_or(ApiError::NoImage)?;
        info!(
            file = %image.file_name,
            bytes = image.data.len(),
            "Analyzing a new image"
        );

        let analysis = state
            .analyzer
            .analyze(&image.data)
            .await
            .map_err(ApiError::Analysis)?;
        let stored = state
            .uploader
            .upload(&image)
            .await
            .map_err(ApiError::Upload)?;

        info!(blob = %stored.blob_name, tags = analysis.tags.len(), "Analysis complete");
        Ok(Json(AnalyzeResponse {
            success: true,
            analysis,
            image_url: stored.url,
        }))
    }
    .instrument(span)
    .await
}

/// Pull the `image` file out of the form. Empty files count as missing.
///
/// A part named `image` without a `filename` is a text field, not a file,
/// and is ignored.
async fn read_image(mut multipart: Multipart) -> Result<Option<UploadedImage>, ApiError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }
        let Some(file_name) = field.file_name().map(str::to_string) else {
            warn!("Ignoring non-file form field named image");
            continue;
        };
        let content_type = field.content_type().map(str::to_string);
        let data = field.bytes().await?;
        if data.is_empty() {
            return Ok(None);
        }

        let mut image = UploadedImage::new(data, file_name);
        if let Some(content_type) = content_type {
            if !is_image(&content_type) {
                warn!(content_type = %content_type, "Upload does not declare an image type");
            }
            image = image.with_content_type(content_type);
        }
        return Ok(Some(image));
    }
    Ok(None)
}
