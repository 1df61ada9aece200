//! Live voice-session orchestration.
//!
//! The core of the service: per-call sessions that turn incoming transcription
//! fragments into generated, optionally spoken, assistant responses.
//! - `registry` owns session lifecycle and the response feed
//! - `machine` runs the single-flight ingest pipeline
//! - `generator` / `synthesizer` wrap the pluggable backends
//! - `providers` holds the concrete backend implementations

pub mod error;
pub mod generator;
pub mod machine;
pub mod providers;
pub mod registry;
pub mod session;
pub mod synthesizer;

pub use error::{VoiceError, VoiceResult};
pub use generator::ResponseGenerator;
pub use machine::VoiceMachine;
pub use registry::{SessionRegistry, TurnAdmission};
pub use session::{ChatRole, ChatTurn, ResponseEntry, SessionInfo, SessionSnapshot};
pub use synthesizer::{SpeechSynthesizer, VoiceParams};
