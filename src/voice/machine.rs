//! Voice session orchestrator.
//!
//! Runs the per-turn pipeline for live calls:
//! ingest fragment → generate reply → synthesize speech → store audio → record
//!
//! All dependencies are injected via constructor — no concrete types hardcoded.
//! Ingest is fire-and-forget: callers observe results only through the
//! response feed.

use std::sync::Arc;

use tracing::{debug, error, info, trace, warn};

use crate::db::{self, calls::CallRepository};
use crate::storage::AudioStore;
use crate::summary::PostCallHook;

use super::generator::ResponseGenerator;
use super::registry::{SessionRegistry, TurnAdmission};
use super::session::ChatTurn;
use super::synthesizer::SpeechSynthesizer;
use super::VoiceResult;

pub struct VoiceMachine {
    registry: SessionRegistry,
    generator: ResponseGenerator,
    synthesizer: SpeechSynthesizer,
    store: Arc<dyn AudioStore>,
    hook: Option<Arc<dyn PostCallHook>>,
}

impl VoiceMachine {
    pub fn new(
        registry: SessionRegistry,
        generator: ResponseGenerator,
        synthesizer: SpeechSynthesizer,
        store: Arc<dyn AudioStore>,
        hook: Option<Arc<dyn PostCallHook>>,
    ) -> Self {
        Self {
            registry,
            generator,
            synthesizer,
            store,
            hook,
        }
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    /// Begin tracking a call. Replaces any prior session for the same id and
    /// opens a call record when the database is reachable; a database failure
    /// degrades to an untracked (but fully functional) session.
    pub async fn start_call(
        &self,
        call_id: &str,
        agent_participant_id: &str,
        instructions: &str,
    ) {
        self.registry
            .start_session(call_id, agent_participant_id, instructions)
            .await;

        // The connection must not live across an await; record first, then
        // attach the row id to the session.
        let db_id = match db::init_db() {
            Ok(conn) => match CallRepository::insert(&conn, call_id, instructions) {
                Ok(db_id) => Some(db_id),
                Err(e) => {
                    warn!("Failed to record call {}: {}", call_id, e);
                    None
                }
            },
            Err(e) => {
                warn!("Database unavailable, call {} not recorded: {}", call_id, e);
                None
            }
        };
        if let Some(db_id) = db_id {
            self.registry.set_db_id(call_id, db_id).await;
        }

        info!("Voice session started for call {}", call_id);
    }

    /// Tear down the call's session. Returns false when no session existed.
    /// The post-call hook runs in the background; its failure never affects
    /// teardown.
    pub async fn end_call(&self, call_id: &str) -> bool {
        let snapshot = match self.registry.end_session(call_id).await {
            Some(snapshot) => snapshot,
            None => return false,
        };

        info!(
            "Voice session ended for call {}: {} turns, {} responses",
            call_id,
            snapshot.history.len(),
            snapshot.responses.len()
        );

        if let Some(hook) = &self.hook {
            let hook = hook.clone();
            let call_id = call_id.to_string();
            tokio::spawn(async move {
                if let Err(e) = hook.execute(&snapshot).await {
                    warn!("Post-call hook failed for call {}: {}", call_id, e);
                }
            });
        }

        true
    }

    /// Process one speaker-attributed transcript fragment.
    ///
    /// Drops the fragment when the session is missing, when the speaker is
    /// the agent itself, or when a cycle is already in flight — no queueing,
    /// no retry. A pipeline failure is logged and swallowed; the single-flight
    /// guard is released on every path.
    pub async fn process_transcription(&self, call_id: &str, text: &str, speaker_id: &str) {
        if text.trim().is_empty() {
            trace!("Ignoring empty fragment for call {}", call_id);
            return;
        }

        let (epoch, instructions, history) = match self
            .registry
            .begin_turn(call_id, text, speaker_id)
            .await
        {
            TurnAdmission::Accepted {
                epoch,
                instructions,
                history,
            } => (epoch, instructions, history),
            TurnAdmission::NoSession => {
                trace!("No session for call {}, fragment dropped", call_id);
                return;
            }
            TurnAdmission::AgentEcho => {
                trace!("Fragment from agent on call {}, ignored", call_id);
                return;
            }
            TurnAdmission::Busy => {
                debug!("Generation in flight for call {}, fragment dropped", call_id);
                return;
            }
        };

        let outcome = self.run_turn(call_id, epoch, &instructions, &history).await;

        // Scoped release: whatever happened above, the guard clears here.
        self.registry.clear_busy(call_id, epoch).await;

        if let Err(e) = outcome {
            error!("Turn failed for call {}: {}", call_id, e);
        }
    }

    /// The generate → synthesize → store → record pipeline for one turn.
    async fn run_turn(
        &self,
        call_id: &str,
        epoch: u64,
        instructions: &str,
        history: &[ChatTurn],
    ) -> VoiceResult<()> {
        let reply = self.generator.generate(instructions, history).await?;

        let audio_locator = match self.synthesizer.synthesize(&reply).await {
            Ok(Some(pcm)) => match self.store.put(call_id, &pcm).await {
                Ok(locator) => Some(locator),
                Err(e) => {
                    warn!(
                        "Audio store failed for call {}, recording text-only: {}",
                        call_id, e
                    );
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!(
                    "Synthesis failed for call {}, recording text-only: {}",
                    call_id, e
                );
                None
            }
        };

        self.registry
            .complete_turn(call_id, epoch, &reply, audio_locator)
            .await;

        debug!("Recorded response for call {}: {} chars", call_id, reply.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::voice::error::{VoiceError, VoiceResult};
    use crate::voice::providers::GenerationBackend;
    use async_trait::async_trait;
    use std::sync::Mutex;

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

    struct MemoryStore {
        puts: Mutex<Vec<String>>,
    }

    impl MemoryStore {
        fn new() -> Self {
            Self {
                puts: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl AudioStore for MemoryStore {
        async fn put(&self, call_id: &str, _pcm: &[u8]) -> VoiceResult<String> {
            let mut puts = self.puts.lock().unwrap();
            let locator = format!("/audio/{}/mem-{}.wav", call_id, puts.len());
            puts.push(locator.clone());
            Ok(locator)
        }
    }

    fn machine_with(backend: Arc<dyn GenerationBackend>) -> VoiceMachine {
        VoiceMachine::new(
            SessionRegistry::new(),
            ResponseGenerator::new(backend),
            SpeechSynthesizer::disabled(),
            Arc::new(MemoryStore::new()),
            None,
        )
    }

    #[tokio::test]
    async fn test_text_only_turn_is_recorded() {
        let machine = machine_with(Arc::new(StaticBackend("It's sunny.")));
        let registry = machine.registry().clone();

        registry.start_session("call-1", "agent-x", "Be concise.").await;
        machine
            .process_transcription("call-1", "What's the weather?", "user-1")
            .await;

        let entry = registry.latest_response("call-1").await.unwrap();
        assert_eq!(entry.text, "It's sunny.");
        assert!(entry.audio_locator.is_none());

        let info = registry.session_info("call-1").await.unwrap();
        assert_eq!(info.turns, 2);
        assert!(!info.busy);
    }

    #[tokio::test]
    async fn test_generation_failure_clears_busy_and_keeps_user_turn() {
        let machine = machine_with(Arc::new(FailingBackend));
        let registry = machine.registry().clone();

        registry.start_session("call-1", "agent-x", "Be concise.").await;
        machine
            .process_transcription("call-1", "Anyone there?", "user-1")
            .await;

        let info = registry.session_info("call-1").await.unwrap();
        assert_eq!(info.turns, 1);
        assert_eq!(info.responses, 0);
        assert!(!info.busy);

        assert!(registry.latest_response("call-1").await.is_none());
    }

    #[tokio::test]
    async fn test_empty_fragment_is_ignored() {
        let machine = machine_with(Arc::new(StaticBackend("reply")));
        let registry = machine.registry().clone();

        registry.start_session("call-1", "agent-x", "Be concise.").await;
        machine.process_transcription("call-1", "   ", "user-1").await;

        let info = registry.session_info("call-1").await.unwrap();
        assert_eq!(info.turns, 0);
    }
}
