use axum::{extract::State, Json};
use serde::Serialize;

use crate::errors::AppError;
use crate::pipeline::{DecompressReport, Decompressor, Pipeline, RunReport};
use crate::state::AppState;

/// Success envelope shared by the pipeline triggers.
#[derive(Serialize)]
pub struct TriggerResponse<R> {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub message: &'static str,
    pub report: R,
}

impl<R> TriggerResponse<R> {
    fn success(report: R) -> Self {
        Self {
            status_code: 200,
            message: "Success",
            report,
        }
    }
}

/// POST /api/v1/pipeline/run
pub async fn handle_run(
    State(state): State<AppState>,
) -> Result<Json<TriggerResponse<RunReport>>, AppError> {
    let report = Pipeline::from_state(&state).run().await?;
    Ok(Json(TriggerResponse::success(report)))
}

/// POST /api/v1/pipeline/decompress
pub async fn handle_decompress(
    State(state): State<AppState>,
) -> Result<Json<TriggerResponse<DecompressReport>>, AppError> {
    let report = Decompressor::new(state.store.as_ref()).run().await?;
    Ok(Json(TriggerResponse::success(report)))
}
