use std::sync::Arc;

use crate::storage::FsAudioStore;
use crate::voice::{SessionRegistry, VoiceMachine};

pub mod audio;
pub mod calls;
pub mod responses;
pub mod sessions;
pub mod transcriptions;

/// Shared state handed to every route group.
#[derive(Clone)]
pub struct ApiState {
    pub machine: Arc<VoiceMachine>,
    pub registry: SessionRegistry,
    pub store: Arc<FsAudioStore>,
}
