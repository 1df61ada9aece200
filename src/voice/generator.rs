//! Response generation: conversation history in, assistant utterance out.

use std::sync::Arc;

use tracing::debug;

use super::providers::GenerationBackend;
use super::session::{render_transcript, ChatTurn};
use crate::voice::error::VoiceResult;

/// Returned when the backend produces an empty result, so the pipeline always
/// has some text to speak.
pub const FALLBACK_RESPONSE: &str = "I apologize, but I could not generate a response.";

const CONVERSATION_FRAMING: &str = "You are a voice assistant participating in a live call. \
Continue the conversation naturally and keep replies short enough to be spoken aloud.";

pub struct ResponseGenerator {
    backend: Arc<dyn GenerationBackend>,
}

impl ResponseGenerator {
    pub fn new(backend: Arc<dyn GenerationBackend>) -> Self {
        Self { backend }
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Produce the next assistant utterance for the conversation.
    ///
    /// Backend transport or auth failures surface as
    /// `VoiceError::Generation`; an empty backend result is replaced with
    /// [`FALLBACK_RESPONSE`] instead of failing the turn.
    pub async fn generate(
        &self,
        instructions: &str,
        history: &[ChatTurn],
    ) -> VoiceResult<String> {
        let prompt = compose_prompt(instructions, history);
        debug!("Composed prompt: {} chars", prompt.len());

        let text = self.backend.complete(&prompt).await?;
        if text.trim().is_empty() {
            debug!("Generation backend returned empty text, using fallback");
            return Ok(FALLBACK_RESPONSE.to_string());
        }

        Ok(text)
    }
}

/// Compose the single prompt string handed to the generation backend:
/// instructions, a fixed framing sentence, the history as alternating
/// `User:` / `Assistant:` lines, and a trailing `Assistant:` cue.
pub fn compose_prompt(instructions: &str, history: &[ChatTurn]) -> String {
    let mut prompt = String::new();
    if !instructions.trim().is_empty() {
        prompt.push_str(instructions.trim());
        prompt.push_str("\n\n");
    }
    prompt.push_str(CONVERSATION_FRAMING);
    prompt.push_str("\n\n");
    if !history.is_empty() {
        prompt.push_str(&render_transcript(history));
        prompt.push('\n');
    }
    prompt.push_str("Assistant:");
    prompt
}
