//! OpenAI-compatible chat completions backend.
//!
//! Sends the composed prompt as a single user message. Any endpoint speaking
//! the `/chat/completions` dialect works (OpenAI, OpenRouter, local gateways).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, info};

use super::GenerationBackend;
use crate::voice::error::{VoiceError, VoiceResult};

const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
const DEFAULT_MODEL: &str = "gpt-4o-mini";

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

pub struct OpenAIChatBackend {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl OpenAIChatBackend {
    pub fn new(
        endpoint: Option<String>,
        api_key: String,
        model: Option<String>,
    ) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;
        let endpoint = endpoint.unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());
        let model = model.unwrap_or_else(|| DEFAULT_MODEL.to_string());

        info!(
            "Initialized chat completions backend: endpoint={}, model={}",
            endpoint, model
        );

        Ok(Self {
            client,
            endpoint,
            api_key,
            model,
        })
    }
}

#[async_trait]
impl GenerationBackend for OpenAIChatBackend {
    fn name(&self) -> &'static str {
        "OpenAI-compatible chat API"
    }

    async fn complete(&self, prompt: &str) -> VoiceResult<String> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
        };

        debug!("Sending {} chars of prompt to chat API", prompt.len());

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| VoiceError::Generation(format!("request failed: {e}")))?;

        let status = response.status();
        let response_text = response
            .text()
            .await
            .map_err(|e| VoiceError::Generation(format!("failed to read response body: {e}")))?;

        if !status.is_success() {
            error!("Chat API request failed with status {}", status);

            if let Ok(error_response) = serde_json::from_str::<ErrorResponse>(&response_text) {
                return Err(VoiceError::Generation(format!(
                    "chat API error: {}",
                    error_response.error.message
                )));
            }
            return Err(VoiceError::Generation(format!(
                "chat API returned status {status}: {response_text}"
            )));
        }

        let parsed: ChatResponse = serde_json::from_str(&response_text)
            .map_err(|e| VoiceError::Generation(format!("malformed chat response: {e}")))?;

        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default();

        debug!("Chat API returned {} chars", text.len());
        Ok(text.trim().to_string())
    }
}
