use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::document::RenderError;
use crate::image_client::ImageError;
use crate::llm_client::LlmError;
use crate::screenplay::recovery::RecoveryError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Input incomplete: {0}")]
    InputIncomplete(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Upstream failure: {0}")]
    Upstream(String),

    #[error("Could not recover JSON from model output: {reason}")]
    Parse { reason: String, raw_text: String },

    #[error("Screenplay schema error: {0}")]
    Schema(String),

    #[error("Render error: {0}")]
    Render(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<LlmError> for AppError {
    fn from(e: LlmError) -> Self {
        AppError::Upstream(format!("text generation failed: {e}"))
    }
}

impl From<ImageError> for AppError {
    fn from(e: ImageError) -> Self {
        AppError::Upstream(format!("image generation failed: {e}"))
    }
}

impl From<RecoveryError> for AppError {
    fn from(e: RecoveryError) -> Self {
        match e {
            RecoveryError::Parse { reason, raw_text } => AppError::Parse { reason, raw_text },
        }
    }
}

impl From<RenderError> for AppError {
    fn from(e: RenderError) -> Self {
        AppError::Render(e.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let mut raw_text: Option<String> = None;

        let (status, code, message) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            AppError::InputIncomplete(msg) => (StatusCode::BAD_REQUEST, "INPUT_INCOMPLETE", msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg),
            AppError::Upstream(msg) => {
                tracing::error!("Upstream error: {msg}");
                (StatusCode::BAD_GATEWAY, "UPSTREAM_FAILURE", msg)
            }
            AppError::Parse { reason, raw_text: raw } => {
                tracing::warn!("Recovery failed: {reason} ({} bytes of model output)", raw.len());
                raw_text = Some(raw);
                (StatusCode::UNPROCESSABLE_ENTITY, "PARSE_ERROR", reason)
            }
            AppError::Schema(msg) => (StatusCode::UNPROCESSABLE_ENTITY, "SCHEMA_ERROR", msg),
            AppError::Render(msg) => {
                tracing::error!("Render error: {msg}");
                (StatusCode::INTERNAL_SERVER_ERROR, "RENDER_ERROR", msg)
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let mut error = json!({
            "code": code,
            "message": message
        });
        if let Some(raw) = raw_text {
            error["raw_text"] = json!(raw);
        }

        (status, Json(json!({ "error": error }))).into_response()
    }
}
