//! Post-call processing hook and summary generation.
//!
//! After a session is torn down, an optional hook can process its final state
//! (persist the transcript, generate a meeting summary). Hook failure never
//! affects call teardown.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tracing::{info, warn};

use crate::db::{self, calls::CallRepository};
use crate::voice::providers::GenerationBackend;
use crate::voice::session::{render_transcript, SessionSnapshot};

const SUMMARY_PROMPT_TEMPLATE: &str = "Summarize the following voice-call conversation in a few \
sentences. Mention the topics discussed and any decisions or follow-ups. Do not invent details \
that are not in the transcript.\n\nTranscript:\n---\n{transcript}\n---";

/// Build the summary prompt for a transcript.
pub fn summary_prompt(transcript: &str) -> String {
    SUMMARY_PROMPT_TEMPLATE.replace("{transcript}", transcript)
}

/// Post-call processing hook, run after `end_session`.
#[async_trait]
pub trait PostCallHook: Send + Sync {
    async fn execute(&self, snapshot: &SessionSnapshot) -> Result<()>;
}

/// Persists the call record and, when a backend is configured, generates a
/// summary of the conversation.
///
/// A summarization failure downgrades to persisting the transcript without a
/// summary; only a persistence failure is reported to the caller.
pub struct SummaryHook {
    backend: Option<Arc<dyn GenerationBackend>>,
}

impl SummaryHook {
    pub fn new(backend: Option<Arc<dyn GenerationBackend>>) -> Self {
        Self { backend }
    }

    async fn generate_summary(&self, transcript: &str) -> Option<String> {
        let backend = self.backend.as_ref()?;
        if transcript.is_empty() {
            return None;
        }

        match backend.complete(&summary_prompt(transcript)).await {
            Ok(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
            Ok(_) => {
                warn!("Summary backend returned empty text");
                None
            }
            Err(e) => {
                warn!("Summary generation failed: {}", e);
                None
            }
        }
    }
}

#[async_trait]
impl PostCallHook for SummaryHook {
    async fn execute(&self, snapshot: &SessionSnapshot) -> Result<()> {
        let db_id = match snapshot.db_id {
            Some(id) => id,
            None => {
                // The call was never recorded (database unavailable at start);
                // nothing to complete.
                return Ok(());
            }
        };

        let transcript = render_transcript(&snapshot.history);
        let summary = self.generate_summary(&transcript).await;

        let conn = db::init_db()?;
        CallRepository::complete(
            &conn,
            db_id,
            &transcript,
            summary.as_deref(),
            snapshot.history.len() as i64,
        )?;

        info!(
            "Call {} archived: {} turns{}",
            snapshot.call_id,
            snapshot.history.len(),
            if summary.is_some() {
                ", summary generated"
            } else {
                ""
            }
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::voice::error::{VoiceError, VoiceResult};
    use crate::voice::session::ChatTurn;
    use async_trait::async_trait;
    use chrono::Utc;

    struct StaticBackend(&'static str);

    #[async_trait]
    impl GenerationBackend for StaticBackend {
        fn name(&self) -> &'static str {
            "static"
        }

        async fn complete(&self, _prompt: &str) -> VoiceResult<String> {
            Ok(self.0.to_string())
        }
    }

    struct FailingBackend;

    #[async_trait]
    impl GenerationBackend for FailingBackend {
        fn name(&self) -> &'static str {
            "failing"
        }

        async fn complete(&self, _prompt: &str) -> VoiceResult<String> {
            Err(VoiceError::Generation("unreachable".to_string()))
        }
    }

    fn snapshot_without_db_id() -> SessionSnapshot {
        SessionSnapshot {
            call_id: "call-1".to_string(),
            instructions: "Be concise.".to_string(),
            history: vec![ChatTurn::user("hello"), ChatTurn::assistant("hi")],
            responses: Vec::new(),
            started_at: Utc::now(),
            ended_at: Utc::now(),
            db_id: None,
        }
    }

    #[test]
    fn test_summary_prompt_embeds_transcript() {
        let prompt = summary_prompt("User: hello");
        assert!(prompt.contains("User: hello"));
        assert!(prompt.starts_with("Summarize"));
    }

    #[tokio::test]
    async fn test_hook_without_db_record_is_noop() {
        let hook = SummaryHook::new(Some(Arc::new(StaticBackend("A chat."))));
        assert!(hook.execute(&snapshot_without_db_id()).await.is_ok());
    }

    #[tokio::test]
    async fn test_generate_summary_uses_backend() {
        let hook = SummaryHook::new(Some(Arc::new(StaticBackend("A short call."))));
        let summary = hook.generate_summary("User: hello").await;
        assert_eq!(summary.as_deref(), Some("A short call."));
    }

    #[tokio::test]
    async fn test_generate_summary_swallows_backend_failure() {
        let hook = SummaryHook::new(Some(Arc::new(FailingBackend)));
        assert!(hook.generate_summary("User: hello").await.is_none());
    }

    #[tokio::test]
    async fn test_generate_summary_disabled_without_backend() {
        let hook = SummaryHook::new(None);
        assert!(hook.generate_summary("User: hello").await.is_none());
    }
}
