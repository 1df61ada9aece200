//! Pluggable generation and speech backends.
//!
//! The pipeline depends on two capabilities it does not implement: a
//! generative-text backend and an optional text-to-speech backend. Both are
//! trait objects built once at startup from config.

use std::sync::Arc;

use anyhow::{bail, Result};
use async_trait::async_trait;
use tracing::info;

use crate::config::{GenerationConfig, SpeechConfig};
use crate::voice::error::VoiceResult;
use crate::voice::synthesizer::VoiceParams;

pub mod cloud_tts;
pub mod openai_chat;

pub use cloud_tts::CloudTtsBackend;
pub use openai_chat::OpenAIChatBackend;

/// Generative-text backend: one composed prompt in, generated text out.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    fn name(&self) -> &'static str;

    async fn complete(&self, prompt: &str) -> VoiceResult<String>;
}

/// Text-to-speech backend: text plus fixed voice parameters in, raw 16-bit
/// linear PCM out.
#[async_trait]
pub trait TtsBackend: Send + Sync {
    fn name(&self) -> &'static str;

    async fn synthesize(&self, text: &str, voice: &VoiceParams) -> VoiceResult<Vec<u8>>;
}

/// Build the configured generation backend.
pub fn build_generation_backend(config: &GenerationConfig) -> Result<Arc<dyn GenerationBackend>> {
    let provider = config.provider.as_deref().unwrap_or("openai-chat");

    let backend: Arc<dyn GenerationBackend> = match provider {
        "openai-chat" => {
            let api_key = match &config.api_key {
                Some(key) if !key.is_empty() => key.clone(),
                _ => bail!("api_key is required for the openai-chat generation provider"),
            };
            Arc::new(OpenAIChatBackend::new(
                config.api_endpoint.clone(),
                api_key,
                config.model.clone(),
            )?)
        }
        _ => bail!(
            "Unknown generation provider '{}'. Supported providers: openai-chat",
            provider
        ),
    };

    info!("Using {} for response generation", backend.name());
    Ok(backend)
}

/// Build the optional speech backend. `None` when no API key is configured —
/// the service then runs in text-only mode.
pub fn build_tts_backend(config: &SpeechConfig) -> Result<Option<Box<dyn TtsBackend>>> {
    let api_key = match &config.api_key {
        Some(key) if !key.is_empty() => key.clone(),
        _ => {
            info!("No speech API key configured; responses will be text-only");
            return Ok(None);
        }
    };

    let backend = CloudTtsBackend::new(config.api_endpoint.clone(), api_key)?;
    info!("Using {} for speech synthesis", backend.name());
    Ok(Some(Box::new(backend)))
}
