use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use moodfinance_storage::StorageError;
use moodfinance_vision::{ImageError, OcrError, PipelineError};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("Invalid multipart body: {0}")]
    Multipart(#[from] MultipartError),
    #[error(transparent)]
    Image(#[from] ImageError),
    #[error(transparent)]
    Receipt(#[from] PipelineError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    /// Writing a user-submitted record failed.
    #[error("DB 저장 실패: {0}")]
    StoreFailed(StorageError),
    #[error("Worker task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Multipart(e) => e.status(),
            ApiError::Image(ImageError::Decode(_)) => StatusCode::BAD_REQUEST,
            ApiError::Receipt(PipelineError::Preprocess(_)) => StatusCode::BAD_REQUEST,
            ApiError::Receipt(PipelineError::Ocr(OcrError::NotAvailable)) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            ApiError::Receipt(PipelineError::Ocr(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Storage(_) | ApiError::StoreFailed(_) | ApiError::Join(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// Rendered as `{"detail": "..."}`.
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, "request rejected");
        }
        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}
