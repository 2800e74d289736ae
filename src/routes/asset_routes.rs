use std::path::PathBuf;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use tracing::error;

use crate::errors::AppError;

#[derive(Clone)]
pub struct AssetState {
    pub index_path: PathBuf,
}

/// GET `/`: the harness page
pub async fn index_handler(State(state): State<AssetState>) -> Response {
    match tokio::fs::read_to_string(&state.index_path).await {
        Ok(html) => Html(html).into_response(),
        Err(e) => error_response(&AppError::asset_read(&state.index_path, e)),
    }
}

// ── Helper ────────────────────────────────────────────────────────────────────

fn error_response(err: &AppError) -> Response {
    error!("{err}");
    let status = if err.is_not_found() {
        StatusCode::NOT_FOUND
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    (status, err.to_string()).into_response()
}
