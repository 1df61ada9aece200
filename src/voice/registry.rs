//! Process-wide registry of live voice sessions.
//!
//! Maps call id → `VoiceSession` and owns the session lifecycle. The map is
//! the only shared mutable state in the pipeline; every mutation is a single
//! insert/remove/append on an independent entry, so a plain async mutex over
//! the map is sufficient.
//!
//! Turn admission (the single-flight `busy` check plus the user-turn append)
//! happens atomically under the map lock. The generation and synthesis awaits
//! run outside the lock; per-call ordering follows the order in which turns
//! were admitted.
//!
//! Sessions carry an epoch so that a cycle still in flight for a replaced or
//! torn-down session can never record into, or release the guard of, a newer
//! session under the same call id.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;

use super::session::{
    ChatTurn, ResponseEntry, SessionInfo, SessionSnapshot, VoiceSession,
};

/// Outcome of asking the registry to admit a transcription fragment.
#[derive(Debug)]
pub enum TurnAdmission {
    /// The fragment was appended as a user turn; the caller now owns the
    /// generation cycle and must release the session when done.
    Accepted {
        epoch: u64,
        instructions: String,
        history: Vec<ChatTurn>,
    },
    /// No session exists for the call id. Late fragments after teardown land
    /// here; dropping them silently is intended.
    NoSession,
    /// The fragment was attributed to the agent itself.
    AgentEcho,
    /// A generation cycle is already in flight for this call.
    Busy,
}

/// Thread-safe handle to the session map. Cheap to clone.
#[derive(Clone, Default)]
pub struct SessionRegistry {
    inner: Arc<Mutex<HashMap<String, VoiceSession>>>,
    epochs: Arc<AtomicU64>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a session for the call, replacing any prior session with the
    /// same id. Replacement, not merge: a stale session left behind by a
    /// crashed call setup must not leak old history into the new call.
    pub async fn start_session(
        &self,
        call_id: &str,
        agent_participant_id: &str,
        instructions: &str,
    ) {
        let mut session = VoiceSession::new(call_id, agent_participant_id, instructions);
        session.epoch = self.epochs.fetch_add(1, Ordering::Relaxed);
        self.inner
            .lock()
            .await
            .insert(call_id.to_string(), session);
    }

    /// Attach the call-record row id so the post-call hook can complete it.
    pub async fn set_db_id(&self, call_id: &str, db_id: i64) {
        if let Some(session) = self.inner.lock().await.get_mut(call_id) {
            session.db_id = Some(db_id);
        }
    }

    pub async fn has_session(&self, call_id: &str) -> bool {
        self.inner.lock().await.contains_key(call_id)
    }

    /// Remove the session and return its final state, or `None` if no session
    /// existed. An in-flight cycle for the call keeps running; its eventual
    /// record call becomes a no-op.
    pub async fn end_session(&self, call_id: &str) -> Option<SessionSnapshot> {
        let session = self.inner.lock().await.remove(call_id)?;
        Some(SessionSnapshot {
            call_id: session.call_id,
            instructions: session.instructions,
            history: session.history,
            responses: session.responses,
            started_at: session.started_at,
            ended_at: Utc::now(),
            db_id: session.db_id,
        })
    }

    pub async fn session_info(&self, call_id: &str) -> Option<SessionInfo> {
        let map = self.inner.lock().await;
        map.get(call_id).map(|session| SessionInfo {
            call_id: session.call_id.clone(),
            agent_participant_id: session.agent_participant_id.clone(),
            busy: session.busy,
            turns: session.history.len(),
            responses: session.responses.len(),
            started_at: session.started_at,
        })
    }

    /// Admit a transcription fragment for processing.
    ///
    /// On acceptance the `busy` flag is set and the user turn is appended in
    /// the same critical section, which is what guarantees both single-flight
    /// and per-call turn ordering.
    pub async fn begin_turn(
        &self,
        call_id: &str,
        text: &str,
        speaker_id: &str,
    ) -> TurnAdmission {
        let mut map = self.inner.lock().await;
        let session = match map.get_mut(call_id) {
            Some(session) => session,
            None => return TurnAdmission::NoSession,
        };

        if speaker_id == session.agent_participant_id {
            return TurnAdmission::AgentEcho;
        }
        if session.busy {
            return TurnAdmission::Busy;
        }

        session.busy = true;
        session.history.push(ChatTurn::user(text));

        TurnAdmission::Accepted {
            epoch: session.epoch,
            instructions: session.instructions.clone(),
            history: session.history.clone(),
        }
    }

    /// Record a completed turn: append the assistant reply to the history and
    /// the response entry to the feed. No-op when the session was torn down
    /// or replaced while the cycle was in flight.
    pub async fn complete_turn(
        &self,
        call_id: &str,
        epoch: u64,
        reply: &str,
        audio_locator: Option<String>,
    ) {
        if let Some(session) = self.inner.lock().await.get_mut(call_id) {
            if session.epoch != epoch {
                return;
            }
            session.history.push(ChatTurn::assistant(reply));
            session.responses.push(ResponseEntry {
                text: reply.to_string(),
                audio_locator,
                produced_at: Utc::now(),
            });
        }
    }

    /// Release the single-flight guard. Must run on every pipeline path,
    /// success or failure. No-op when the session no longer exists or was
    /// replaced since the turn was admitted.
    pub async fn clear_busy(&self, call_id: &str, epoch: u64) {
        if let Some(session) = self.inner.lock().await.get_mut(call_id) {
            if session.epoch == epoch {
                session.busy = false;
            }
        }
    }

    /// Most recent feed entry, or `None` when the session is missing or has
    /// produced nothing yet.
    pub async fn latest_response(&self, call_id: &str) -> Option<ResponseEntry> {
        let map = self.inner.lock().await;
        map.get(call_id)
            .and_then(|session| session.responses.last().cloned())
    }

    /// Full ordered feed for the call; empty when the session is missing.
    pub async fn all_responses(&self, call_id: &str) -> Vec<ResponseEntry> {
        let map = self.inner.lock().await;
        map.get(call_id)
            .map(|session| session.responses.clone())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn accept(registry: &SessionRegistry, call_id: &str, text: &str) -> u64 {
        match registry.begin_turn(call_id, text, "user-1").await {
            TurnAdmission::Accepted { epoch, .. } => epoch,
            other => panic!("expected Accepted, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_start_and_end_session() {
        let registry = SessionRegistry::new();
        registry.start_session("call-1", "agent-x", "Be concise.").await;
        assert!(registry.has_session("call-1").await);

        let snapshot = registry.end_session("call-1").await.unwrap();
        assert_eq!(snapshot.call_id, "call-1");
        assert!(!registry.has_session("call-1").await);
    }

    #[tokio::test]
    async fn test_end_unknown_session_returns_none() {
        let registry = SessionRegistry::new();
        assert!(registry.end_session("nope").await.is_none());
    }

    #[tokio::test]
    async fn test_start_session_replaces_existing() {
        let registry = SessionRegistry::new();
        registry.start_session("call-1", "agent-x", "First.").await;
        registry.begin_turn("call-1", "hello", "user-1").await;

        registry.start_session("call-1", "agent-y", "Second.").await;
        let info = registry.session_info("call-1").await.unwrap();
        assert_eq!(info.agent_participant_id, "agent-y");
        assert_eq!(info.turns, 0);
        assert!(!info.busy);
    }

    #[tokio::test]
    async fn test_begin_turn_admission() {
        let registry = SessionRegistry::new();
        registry.start_session("call-1", "agent-x", "Be concise.").await;

        // Agent's own speech never triggers a turn
        assert!(matches!(
            registry.begin_turn("call-1", "echo", "agent-x").await,
            TurnAdmission::AgentEcho
        ));

        // First real fragment is accepted and marks the session busy
        let admission = registry.begin_turn("call-1", "hello", "user-1").await;
        let epoch = match admission {
            TurnAdmission::Accepted { epoch, history, .. } => {
                assert_eq!(history.len(), 1);
                assert_eq!(history[0].content, "hello");
                epoch
            }
            other => panic!("expected Accepted, got {:?}", other),
        };

        // Second fragment while busy is dropped
        assert!(matches!(
            registry.begin_turn("call-1", "more", "user-1").await,
            TurnAdmission::Busy
        ));

        registry.clear_busy("call-1", epoch).await;
        assert!(matches!(
            registry.begin_turn("call-1", "again", "user-1").await,
            TurnAdmission::Accepted { .. }
        ));
    }

    #[tokio::test]
    async fn test_begin_turn_without_session_is_noop() {
        let registry = SessionRegistry::new();
        assert!(matches!(
            registry.begin_turn("ghost", "hello", "user-1").await,
            TurnAdmission::NoSession
        ));
    }

    #[tokio::test]
    async fn test_complete_turn_appends_history_and_feed() {
        let registry = SessionRegistry::new();
        registry.start_session("call-1", "agent-x", "Be concise.").await;
        let epoch = accept(&registry, "call-1", "hello").await;
        registry
            .complete_turn(
                "call-1",
                epoch,
                "hi there",
                Some("/audio/call-1/a.wav".to_string()),
            )
            .await;

        let info = registry.session_info("call-1").await.unwrap();
        assert_eq!(info.turns, 2);
        assert_eq!(info.responses, 1);

        let latest = registry.latest_response("call-1").await.unwrap();
        assert_eq!(latest.text, "hi there");
        assert_eq!(
            latest.audio_locator.as_deref(),
            Some("/audio/call-1/a.wav")
        );
    }

    #[tokio::test]
    async fn test_complete_turn_after_teardown_is_noop() {
        let registry = SessionRegistry::new();
        registry.start_session("call-1", "agent-x", "Be concise.").await;
        let epoch = accept(&registry, "call-1", "hello").await;
        registry.end_session("call-1").await;

        // The in-flight cycle lands after teardown; nothing to record into.
        registry.complete_turn("call-1", epoch, "late", None).await;
        registry.clear_busy("call-1", epoch).await;
        assert!(registry.latest_response("call-1").await.is_none());
    }

    #[tokio::test]
    async fn test_stale_cycle_cannot_touch_a_replacement_session() {
        let registry = SessionRegistry::new();
        registry.start_session("call-1", "agent-x", "First.").await;
        let stale_epoch = accept(&registry, "call-1", "old fragment").await;

        // The call restarts while the old cycle is still in flight, and the
        // replacement session admits its own turn.
        registry.start_session("call-1", "agent-x", "Second.").await;
        let fresh_epoch = accept(&registry, "call-1", "new fragment").await;

        // The stale cycle finishes late: it must not record a response or
        // release the fresh cycle's guard.
        registry.complete_turn("call-1", stale_epoch, "stale reply", None).await;
        registry.clear_busy("call-1", stale_epoch).await;

        let info = registry.session_info("call-1").await.unwrap();
        assert_eq!(info.turns, 1);
        assert_eq!(info.responses, 0);
        assert!(info.busy);

        registry.complete_turn("call-1", fresh_epoch, "fresh reply", None).await;
        registry.clear_busy("call-1", fresh_epoch).await;
        assert_eq!(
            registry.latest_response("call-1").await.unwrap().text,
            "fresh reply"
        );
    }

    #[tokio::test]
    async fn test_feed_reads_on_missing_session() {
        let registry = SessionRegistry::new();
        assert!(registry.latest_response("ghost").await.is_none());
        assert!(registry.all_responses("ghost").await.is_empty());
    }

    #[tokio::test]
    async fn test_latest_tracks_most_recent_entry() {
        let registry = SessionRegistry::new();
        registry.start_session("call-1", "agent-x", "Be concise.").await;

        assert!(registry.latest_response("call-1").await.is_none());

        let epoch = accept(&registry, "call-1", "one").await;
        registry.complete_turn("call-1", epoch, "first", None).await;
        registry.clear_busy("call-1", epoch).await;
        assert_eq!(registry.latest_response("call-1").await.unwrap().text, "first");

        let epoch = accept(&registry, "call-1", "two").await;
        registry.complete_turn("call-1", epoch, "second", None).await;
        registry.clear_busy("call-1", epoch).await;
        assert_eq!(registry.latest_response("call-1").await.unwrap().text, "second");

        let all = registry.all_responses("call-1").await;
        assert_eq!(all.len(), 2);
        assert!(all[0].produced_at <= all[1].produced_at);
    }
}
