use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::pipeline::PipelineError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            AppError::Pipeline(e) => tracing::error!("Pipeline error: {e}"),
            AppError::Internal(e) => tracing::error!("Internal error: {e:?}"),
        }

        // Callers only ever see the generic failure envelope.
        let status = StatusCode::INTERNAL_SERVER_ERROR;
        let body = Json(json!({
            "statusCode": status.as_u16(),
            "message": "Error"
        }));

        (status, body).into_response()
    }
}
