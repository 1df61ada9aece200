//! Response feed endpoints, consumed by the playback poller.
//!
//! Provides HTTP endpoints for:
//! - Fetching the most recent response (GET /responses/latest?call_id=...)
//! - Fetching the full ordered feed (GET /responses?call_id=...)

use axum::{
    extract::{Query, State},
    response::Json,
    routing::get,
    Router,
};
use serde_json::{json, Value};
use std::collections::HashMap;

use super::ApiState;
use crate::api::error::{ApiError, ApiResult};
use crate::voice::ResponseEntry;

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/responses/latest", get(latest_response))
        .route("/responses", get(all_responses))
        .with_state(state)
}

fn require_call_id(params: &HashMap<String, String>) -> ApiResult<&str> {
    params
        .get("call_id")
        .map(String::as_str)
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("call_id query parameter is required"))
}

fn entry_json(entry: &ResponseEntry) -> Value {
    json!({
        "audio_url": entry.audio_locator,
        "text": entry.text,
        "timestamp": entry.produced_at.to_rfc3339(),
    })
}

/// The most recent response for a call, with nulls when the call has no
/// entries yet (or no session at all — the poller cannot tell the difference
/// and does not need to).
async fn latest_response(
    Query(params): Query<HashMap<String, String>>,
    State(state): State<ApiState>,
) -> ApiResult<Json<Value>> {
    let call_id = require_call_id(&params)?;

    match state.registry.latest_response(call_id).await {
        Some(entry) => Ok(Json(entry_json(&entry))),
        None => Ok(Json(json!({
            "audio_url": null,
            "text": null,
            "timestamp": null,
        }))),
    }
}

async fn all_responses(
    Query(params): Query<HashMap<String, String>>,
    State(state): State<ApiState>,
) -> ApiResult<Json<Value>> {
    let call_id = require_call_id(&params)?;

    let entries: Vec<Value> = state
        .registry
        .all_responses(call_id)
        .await
        .iter()
        .map(entry_json)
        .collect();

    Ok(Json(json!({ "responses": entries })))
}
