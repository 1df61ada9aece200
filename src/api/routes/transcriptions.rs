//! Transcription ingest endpoint.
//!
//! Receives speaker-attributed transcript fragments from the transcription
//! source (webhook-style). The pipeline runs in a spawned task so delivery
//! returns immediately; the caller observes results via the response feed.

use axum::{extract::State, response::Json, routing::post, Router};
use serde_json::{json, Value};
use tracing::debug;

use super::ApiState;
use crate::api::error::{ApiError, ApiResult};

/// A speaker-attributed transcript fragment.
#[derive(Debug, serde::Deserialize)]
pub struct TranscriptionEvent {
    pub call_id: String,
    pub text: String,
    pub speaker_id: String,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/transcriptions", post(ingest_transcription))
        .with_state(state)
}

async fn ingest_transcription(
    State(state): State<ApiState>,
    Json(event): Json<TranscriptionEvent>,
) -> ApiResult<Json<Value>> {
    if event.call_id.trim().is_empty() {
        return Err(ApiError::bad_request("call_id must not be empty"));
    }
    if event.text.trim().is_empty() {
        return Err(ApiError::bad_request("text must not be empty"));
    }

    debug!(
        "Transcription fragment for call {} from {}: {} chars",
        event.call_id,
        event.speaker_id,
        event.text.len()
    );

    let machine = state.machine.clone();
    tokio::spawn(async move {
        machine
            .process_transcription(&event.call_id, &event.text, &event.speaker_id)
            .await;
    });

    Ok(Json(json!({ "accepted": true })))
}
