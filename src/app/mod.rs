//! Service wiring: config → backends → machine → API server.

use std::sync::Arc;

use anyhow::Result;
use tracing::{info, warn};

use crate::api::{ApiServer, ApiState};
use crate::config::Config;
use crate::global;
use crate::storage::FsAudioStore;
use crate::summary::{PostCallHook, SummaryHook};
use crate::voice::providers::{build_generation_backend, build_tts_backend};
use crate::voice::{ResponseGenerator, SessionRegistry, SpeechSynthesizer, VoiceMachine};

pub async fn run_service() -> Result<()> {
    info!("Starting Vocalis service");

    let config = Config::load()?;

    if let Err(e) = crate::db::init_db() {
        warn!("Database unavailable, call history disabled: {}", e);
    }

    let generation_backend = build_generation_backend(&config.generation)?;
    let tts_backend = build_tts_backend(&config.speech)?;

    let generator = ResponseGenerator::new(generation_backend.clone());
    let synthesizer = SpeechSynthesizer::new(tts_backend, config.speech.voice_params());

    let store = Arc::new(FsAudioStore::new(
        global::audio_dir()?,
        config.speech.sample_rate_hertz,
    ));

    let hook: Option<Arc<dyn PostCallHook>> = Some(Arc::new(SummaryHook::new(
        config.summary.enabled.then(|| generation_backend.clone()),
    )));

    let registry = SessionRegistry::new();
    let machine = Arc::new(VoiceMachine::new(
        registry.clone(),
        generator,
        synthesizer,
        store.clone(),
        hook,
    ));

    let state = ApiState {
        machine,
        registry,
        store,
    };

    info!("Vocalis is ready!");
    info!(
        "Point the transcription webhook at http://127.0.0.1:{}/transcriptions",
        config.server.port
    );

    ApiServer::new(config.server.port, state).start().await
}
