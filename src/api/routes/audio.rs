//! Audio artifact serving.
//!
//! Serves the WAV files referenced by response locators
//! (GET /audio/:call_id/:file).

use axum::{
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tracing::warn;

use super::ApiState;
use crate::api::error::ApiError;

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/audio/:call_id/:file", get(serve_audio))
        .with_state(state)
}

async fn serve_audio(
    State(state): State<ApiState>,
    Path((call_id, file)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    let path = state
        .store
        .resolve(&call_id, &file)
        .ok_or_else(|| ApiError::bad_request("invalid audio locator"))?;

    match tokio::fs::read(&path).await {
        Ok(bytes) => Ok(([(header::CONTENT_TYPE, "audio/wav")], bytes).into_response()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(ApiError::not_found("audio artifact not found"))
        }
        Err(e) => {
            warn!("Failed to read audio artifact {:?}: {}", path, e);
            Err(ApiError::internal("failed to read audio artifact"))
        }
    }
}
