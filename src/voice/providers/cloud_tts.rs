//! Cloud text-to-speech backend.
//!
//! Speaks the Google Cloud `text:synthesize` dialect: JSON request carrying
//! the text plus fixed voice parameters, JSON response carrying base64-encoded
//! 16-bit linear PCM.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, info};

use super::TtsBackend;
use crate::voice::error::{VoiceError, VoiceResult};
use crate::voice::synthesizer::VoiceParams;

const DEFAULT_ENDPOINT: &str = "https://texttospeech.googleapis.com/v1/text:synthesize";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeRequest<'a> {
    input: SynthesisInput<'a>,
    voice: VoiceSelection<'a>,
    audio_config: AudioConfig<'a>,
}

#[derive(Debug, Serialize)]
struct SynthesisInput<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VoiceSelection<'a> {
    language_code: &'a str,
    name: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AudioConfig<'a> {
    audio_encoding: &'a str,
    sample_rate_hertz: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeResponse {
    audio_content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

pub struct CloudTtsBackend {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl CloudTtsBackend {
    pub fn new(endpoint: Option<String>, api_key: String) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;
        let endpoint = endpoint.unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());

        info!("Initialized cloud TTS backend: endpoint={}", endpoint);

        Ok(Self {
            client,
            endpoint,
            api_key,
        })
    }
}

#[async_trait]
impl TtsBackend for CloudTtsBackend {
    fn name(&self) -> &'static str {
        "Cloud TTS API"
    }

    async fn synthesize(&self, text: &str, voice: &VoiceParams) -> VoiceResult<Vec<u8>> {
        let body = SynthesizeRequest {
            input: SynthesisInput { text },
            voice: VoiceSelection {
                language_code: &voice.language_code,
                name: &voice.voice_name,
            },
            audio_config: AudioConfig {
                audio_encoding: "LINEAR16",
                sample_rate_hertz: voice.sample_rate_hertz,
            },
        };

        debug!("Synthesizing {} chars of text", text.len());

        let response = self
            .client
            .post(&self.endpoint)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| VoiceError::Synthesis(format!("request failed: {e}")))?;

        let status = response.status();
        let response_text = response
            .text()
            .await
            .map_err(|e| VoiceError::Synthesis(format!("failed to read response body: {e}")))?;

        if !status.is_success() {
            error!("TTS request failed with status {}", status);

            if let Ok(error_response) = serde_json::from_str::<ErrorResponse>(&response_text) {
                return Err(VoiceError::Synthesis(format!(
                    "TTS API error: {}",
                    error_response.error.message
                )));
            }
            return Err(VoiceError::Synthesis(format!(
                "TTS API returned status {status}: {response_text}"
            )));
        }

        let parsed: SynthesizeResponse = serde_json::from_str(&response_text)
            .map_err(|e| VoiceError::Synthesis(format!("malformed TTS response: {e}")))?;

        let audio_content = parsed.audio_content.unwrap_or_default();
        let bytes = BASE64
            .decode(audio_content.as_bytes())
            .map_err(|e| VoiceError::Synthesis(format!("invalid base64 audio payload: {e}")))?;

        debug!("TTS returned {} bytes of PCM", bytes.len());
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serialization_uses_fixed_encoding() {
        let voice = VoiceParams::default();
        let body = SynthesizeRequest {
            input: SynthesisInput { text: "Hello" },
            voice: VoiceSelection {
                language_code: &voice.language_code,
                name: &voice.voice_name,
            },
            audio_config: AudioConfig {
                audio_encoding: "LINEAR16",
                sample_rate_hertz: voice.sample_rate_hertz,
            },
        };

        let json = serde_json::to_string(&body).unwrap();
        assert!(json.contains("\"audioEncoding\":\"LINEAR16\""));
        assert!(json.contains("\"languageCode\""));
        assert!(json.contains("\"sampleRateHertz\""));
    }

    #[test]
    fn test_response_parsing() {
        let json = r#"{"audioContent":"AAAA"}"#;
        let parsed: SynthesizeResponse = serde_json::from_str(json).unwrap();
        let bytes = BASE64
            .decode(parsed.audio_content.unwrap().as_bytes())
            .unwrap();
        assert_eq!(bytes.len(), 3);
    }
}
