//! Speech synthesis with an optionally-absent backend.
//!
//! The text-to-speech backend is a capability resolved once at startup. When
//! it is not configured the synthesizer reports `None` and the pipeline
//! records text-only responses; that is a recognized mode, not an error.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::providers::TtsBackend;
use crate::voice::error::{VoiceError, VoiceResult};

/// Fixed voice parameters used for every synthesis call in a process.
/// Encoding is always 16-bit linear PCM.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceParams {
    pub language_code: String,
    pub voice_name: String,
    pub sample_rate_hertz: u32,
}

impl Default for VoiceParams {
    fn default() -> Self {
        Self {
            language_code: "en-US".to_string(),
            voice_name: "en-US-Neural2-C".to_string(),
            sample_rate_hertz: 24_000,
        }
    }
}

pub struct SpeechSynthesizer {
    backend: Option<Box<dyn TtsBackend>>,
    voice: VoiceParams,
}

impl SpeechSynthesizer {
    pub fn new(backend: Option<Box<dyn TtsBackend>>, voice: VoiceParams) -> Self {
        Self { backend, voice }
    }

    /// Synthesizer with no backend: every call reports text-only mode.
    pub fn disabled() -> Self {
        Self {
            backend: None,
            voice: VoiceParams::default(),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.backend.is_some()
    }

    pub fn voice(&self) -> &VoiceParams {
        &self.voice
    }

    /// Turn text into PCM bytes.
    ///
    /// Returns `Ok(None)` when no backend is configured. A configured backend
    /// returning an empty payload is a `VoiceError::Synthesis`; callers treat
    /// it as recoverable and record the response text-only.
    pub async fn synthesize(&self, text: &str) -> VoiceResult<Option<Vec<u8>>> {
        let backend = match &self.backend {
            Some(backend) => backend,
            None => {
                debug!("Speech backend not configured, skipping synthesis");
                return Ok(None);
            }
        };

        let bytes = backend.synthesize(text, &self.voice).await?;
        if bytes.is_empty() {
            return Err(VoiceError::Synthesis(
                "backend returned no audio payload".to_string(),
            ));
        }

        Ok(Some(bytes))
    }
}
