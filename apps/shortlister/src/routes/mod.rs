pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::pipeline::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/v1/pipeline/run", post(handlers::handle_run))
        .route(
            "/api/v1/pipeline/decompress",
            post(handlers::handle_decompress),
        )
        .with_state(state)
}
