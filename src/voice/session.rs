//! Voice session state types.
//!
//! A `VoiceSession` tracks one call's AI-voice conversation: the immutable
//! system instructions, the alternating conversation history, and the ordered
//! feed of produced responses. Sessions live only in the registry map and are
//! never persisted while live; completed calls are written to the database by
//! the post-call hook.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who produced a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

impl ChatRole {
    /// Label used when rendering the conversation as prompt or transcript text.
    pub fn label(&self) -> &'static str {
        match self {
            Self::User => "User",
            Self::Assistant => "Assistant",
        }
    }
}

/// One conversation turn, append-only once inserted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub content: String,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// Render a conversation as alternating `User:` / `Assistant:` lines.
pub fn render_transcript(history: &[ChatTurn]) -> String {
    history
        .iter()
        .map(|turn| format!("{}: {}", turn.role.label(), turn.content))
        .collect::<Vec<_>>()
        .join("\n")
}

/// One produced response in a session's feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseEntry {
    /// The generated assistant utterance.
    pub text: String,
    /// Locator for the stored audio artifact; `None` when synthesis was
    /// skipped or failed and the response is text-only.
    pub audio_locator: Option<String>,
    pub produced_at: DateTime<Utc>,
}

/// Live state for one call. Owned by the session registry.
#[derive(Debug)]
pub struct VoiceSession {
    pub call_id: String,
    /// Identifier of the synthetic participant; fragments attributed to it
    /// never trigger generation (self-echo suppression).
    pub agent_participant_id: String,
    pub instructions: String,
    pub history: Vec<ChatTurn>,
    /// Single-flight guard: true while a generation cycle is in flight.
    pub busy: bool,
    pub responses: Vec<ResponseEntry>,
    pub started_at: DateTime<Utc>,
    /// Distinguishes this session from any earlier one under the same call
    /// id, so a stale in-flight cycle cannot write into a replacement.
    pub epoch: u64,
    /// Row id of the call record, when the database was reachable at start.
    pub db_id: Option<i64>,
}

impl VoiceSession {
    pub fn new(
        call_id: impl Into<String>,
        agent_participant_id: impl Into<String>,
        instructions: impl Into<String>,
    ) -> Self {
        Self {
            call_id: call_id.into(),
            agent_participant_id: agent_participant_id.into(),
            instructions: instructions.into(),
            history: Vec::new(),
            busy: false,
            responses: Vec::new(),
            started_at: Utc::now(),
            epoch: 0,
            db_id: None,
        }
    }
}

/// Read-only view of a session, returned by status queries.
#[derive(Debug, Clone, Serialize)]
pub struct SessionInfo {
    pub call_id: String,
    pub agent_participant_id: String,
    pub busy: bool,
    pub turns: usize,
    pub responses: usize,
    pub started_at: DateTime<Utc>,
}

/// Final state of a session, handed to the post-call hook on teardown.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub call_id: String,
    pub instructions: String,
    pub history: Vec<ChatTurn>,
    pub responses: Vec<ResponseEntry>,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub db_id: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_labels() {
        assert_eq!(ChatRole::User.label(), "User");
        assert_eq!(ChatRole::Assistant.label(), "Assistant");
    }

    #[test]
    fn test_render_transcript() {
        let history = vec![
            ChatTurn::user("What's the agenda?"),
            ChatTurn::assistant("Reviewing the release plan."),
        ];

        assert_eq!(
            render_transcript(&history),
            "User: What's the agenda?\nAssistant: Reviewing the release plan."
        );
    }

    #[test]
    fn test_render_transcript_empty() {
        assert_eq!(render_transcript(&[]), "");
    }

    #[test]
    fn test_new_session_is_idle_and_empty() {
        let session = VoiceSession::new("call-1", "agent-x", "Be concise.");
        assert!(!session.busy);
        assert!(session.history.is_empty());
        assert!(session.responses.is_empty());
        assert_eq!(session.agent_participant_id, "agent-x");
    }

    #[test]
    fn test_response_entry_serialization() {
        let entry = ResponseEntry {
            text: "Hello".to_string(),
            audio_locator: None,
            produced_at: Utc::now(),
        };
        let json = serde_json::to_string(&entry).unwrap();
        assert!(json.contains("\"audio_locator\":null"));
    }
}
