//! Voice session lifecycle endpoints.
//!
//! Provides HTTP endpoints for:
//! - Starting a session when an AI participant joins a call (POST /sessions/start)
//! - Ending a session on call teardown (DELETE /sessions/:call_id)
//! - Inspecting a live session (GET /sessions/:call_id)

use axum::{
    extract::{Path, State},
    response::Json,
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use tracing::info;

use super::ApiState;
use crate::api::error::{ApiError, ApiResult};

/// Request body for starting a session.
#[derive(Debug, serde::Deserialize)]
pub struct StartSessionRequest {
    pub call_id: String,
    pub agent_participant_id: String,
    #[serde(default)]
    pub instructions: Option<String>,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/sessions/start", post(start_session))
        .route("/sessions/:call_id", get(session_status).delete(end_session))
        .with_state(state)
}

async fn start_session(
    State(state): State<ApiState>,
    Json(req): Json<StartSessionRequest>,
) -> ApiResult<Json<Value>> {
    if req.call_id.trim().is_empty() {
        return Err(ApiError::bad_request("call_id must not be empty"));
    }
    if req.agent_participant_id.trim().is_empty() {
        return Err(ApiError::bad_request("agent_participant_id must not be empty"));
    }

    info!("Session start requested for call {}", req.call_id);

    let instructions = req.instructions.unwrap_or_default();
    state
        .machine
        .start_call(&req.call_id, &req.agent_participant_id, &instructions)
        .await;

    Ok(Json(json!({
        "success": true,
        "call_id": req.call_id,
        "message": "Voice session started",
    })))
}

async fn end_session(
    State(state): State<ApiState>,
    Path(call_id): Path<String>,
) -> Json<Value> {
    info!("Session end requested for call {}", call_id);

    let ended = state.machine.end_call(&call_id).await;

    // Ending an unknown session is not an error: teardown may race with a
    // duplicate webhook delivery.
    Json(json!({
        "success": true,
        "call_id": call_id,
        "ended": ended,
    }))
}

async fn session_status(
    State(state): State<ApiState>,
    Path(call_id): Path<String>,
) -> ApiResult<Json<Value>> {
    match state.registry.session_info(&call_id).await {
        Some(info) => Ok(Json(json!({
            "call_id": info.call_id,
            "agent_participant_id": info.agent_participant_id,
            "busy": info.busy,
            "turns": info.turns,
            "responses": info.responses,
            "started_at": info.started_at.to_rfc3339(),
        }))),
        None => Err(ApiError::not_found(format!(
            "No active session for call {call_id}"
        ))),
    }
}
