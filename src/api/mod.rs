//! REST API server for Vocalis.
//!
//! Provides HTTP endpoints for:
//! - Session lifecycle (start, end, status)
//! - Transcription ingest (webhook from the transcription source)
//! - Response feed retrieval (polled by the playback client)
//! - Audio artifact serving
//! - Call history

pub mod error;
pub mod routes;

use anyhow::Result;
use axum::{response::Json, routing::get, Router};
use serde_json::{json, Value};
use tower::ServiceBuilder;
use tracing::info;

pub use routes::ApiState;

pub struct ApiServer {
    port: u16,
    state: ApiState,
}

impl ApiServer {
    pub fn new(port: u16, state: ApiState) -> Self {
        Self { port, state }
    }

    pub async fn start(self) -> Result<()> {
        let app = Router::new()
            // Root and version endpoints
            .route("/", get(status))
            .route("/version", get(version))
            // Voice session and feed routes
            .merge(routes::sessions::router(self.state.clone()))
            .merge(routes::transcriptions::router(self.state.clone()))
            .merge(routes::responses::router(self.state.clone()))
            .merge(routes::audio::router(self.state.clone()))
            .merge(routes::calls::router(self.state))
            .layer(ServiceBuilder::new());

        let listener = tokio::net::TcpListener::bind(&format!("127.0.0.1:{}", self.port)).await?;

        info!("API server listening on http://127.0.0.1:{}", self.port);
        info!("Endpoints:");
        info!("  GET    /                    - Service info");
        info!("  GET    /version             - Version info");
        info!("  POST   /sessions/start      - Start a voice session");
        info!("  DELETE /sessions/:call_id   - End a voice session");
        info!("  GET    /sessions/:call_id   - Session status");
        info!("  POST   /transcriptions      - Ingest a transcript fragment");
        info!("  GET    /responses/latest    - Latest response for a call");
        info!("  GET    /responses           - Full response feed for a call");
        info!("  GET    /audio/:call/:file   - Stored audio artifact");
        info!("  GET    /calls               - Archived call history");
        info!("  GET    /calls/:id           - Archived call detail");

        axum::serve(listener, app).await?;

        Ok(())
    }
}

async fn status() -> Json<Value> {
    Json(json!({
        "service": "vocalis",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running"
    }))
}

async fn version() -> Json<Value> {
    Json(json!({
        "version": env!("CARGO_PKG_VERSION"),
        "name": "vocalis"
    }))
}
