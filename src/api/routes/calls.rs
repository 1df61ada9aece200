//! Call history endpoints.
//!
//! Provides HTTP endpoints for:
//! - Listing archived calls (GET /calls)
//! - Getting a specific call with transcript and summary (GET /calls/:id)

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use serde_json::{json, Value};
use std::collections::HashMap;

use super::ApiState;
use crate::db::calls::CallRepository;

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/calls", get(list_calls))
        .route("/calls/:id", get(get_call))
        .with_state(state)
}

async fn list_calls(
    Query(params): Query<HashMap<String, String>>,
    State(_state): State<ApiState>,
) -> Result<Json<Value>, StatusCode> {
    let limit: usize = params
        .get("limit")
        .and_then(|v| v.parse().ok())
        .unwrap_or(20);

    let calls = tokio::task::spawn_blocking(move || {
        let conn = crate::db::init_db()?;
        CallRepository::list(&conn, limit)
    })
    .await
    .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
    .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let entries: Vec<Value> = calls
        .iter()
        .map(|c| {
            json!({
                "id": c.id,
                "call_id": c.call_id,
                "status": c.status,
                "turn_count": c.turn_count,
                "summary": c.summary,
                "started_at": c.started_at,
                "ended_at": c.ended_at,
            })
        })
        .collect();

    Ok(Json(json!({ "calls": entries })))
}

async fn get_call(
    Path(id): Path<i64>,
    State(_state): State<ApiState>,
) -> Result<Json<Value>, StatusCode> {
    let call = tokio::task::spawn_blocking(move || {
        let conn = crate::db::init_db()?;
        CallRepository::get(&conn, id)
    })
    .await
    .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
    .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    match call {
        Some(c) => Ok(Json(json!({
            "id": c.id,
            "call_id": c.call_id,
            "instructions": c.instructions,
            "status": c.status,
            "transcript_text": c.transcript_text,
            "summary": c.summary,
            "turn_count": c.turn_count,
            "started_at": c.started_at,
            "ended_at": c.ended_at,
            "created_at": c.created_at,
        }))),
        None => Err(StatusCode::NOT_FOUND),
    }
}
