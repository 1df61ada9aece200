//! Client-side playback poller.
//!
//! Repeatedly fetches the latest response for a call and plays its audio,
//! without ever interrupting an utterance mid-playback: a locator observed
//! while audio is playing is queued as a pending swap and started when the
//! current playback ends. The same locator is never played twice.
//!
//! The state machine is pure and synchronous; fetching and playback are
//! behind the `FeedClient` and `AudioPlayer` traits so it can be exercised
//! without a server or a sound device.

pub mod player;

use std::collections::HashSet;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info, warn};

/// The retrieval endpoint's response shape.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeedEntry {
    pub audio_url: Option<String>,
    pub text: Option<String>,
    pub timestamp: Option<String>,
}

/// Fetches feed entries and audio artifacts for the poller.
#[async_trait]
pub trait FeedClient: Send + Sync {
    async fn fetch_latest(&self, call_id: &str) -> Result<FeedEntry>;

    async fn fetch_audio(&self, locator: &str) -> Result<Vec<u8>>;
}

/// Plays audio bytes in the background. `play` must return immediately;
/// `is_finished` reports whether the queued audio has drained.
pub trait AudioPlayer {
    fn play(&mut self, locator: &str, bytes: Vec<u8>) -> Result<()>;

    fn is_finished(&self) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollerPhase {
    Idle,
    Playing,
}

/// Pure playback state machine.
#[derive(Debug, Default)]
pub struct PlaybackState {
    playing: bool,
    pending: Option<String>,
    seen: HashSet<String>,
}

impl PlaybackState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> PollerPhase {
        if self.playing {
            PollerPhase::Playing
        } else {
            PollerPhase::Idle
        }
    }

    /// Feed in an observed locator. Returns the locator to start playing now,
    /// or `None` when it was already seen or was queued as a pending swap.
    pub fn observe(&mut self, locator: &str) -> Option<String> {
        if !self.seen.insert(locator.to_string()) {
            return None;
        }

        if self.playing {
            // Never interrupt: queue as pending swap. A newer unseen locator
            // replaces an older pending one that was never started.
            self.pending = Some(locator.to_string());
            None
        } else {
            self.playing = true;
            Some(locator.to_string())
        }
    }

    /// Current playback ended. Returns the pending locator to start next, or
    /// `None` after transitioning back to idle.
    pub fn playback_ended(&mut self) -> Option<String> {
        match self.pending.take() {
            Some(next) => Some(next),
            None => {
                self.playing = false;
                None
            }
        }
    }
}

/// Polls the feed at a fixed interval and drives an `AudioPlayer`.
pub struct PlaybackPoller<C: FeedClient, P: AudioPlayer> {
    client: C,
    player: P,
    call_id: String,
    interval: Duration,
    state: PlaybackState,
    last_text: Option<String>,
}

impl<C: FeedClient, P: AudioPlayer> PlaybackPoller<C, P> {
    pub fn new(client: C, player: P, call_id: impl Into<String>, interval: Duration) -> Self {
        Self {
            client,
            player,
            call_id: call_id.into(),
            interval,
            state: PlaybackState::new(),
            last_text: None,
        }
    }

    /// Poll until the task is cancelled. Fetch failures are logged and
    /// polling continues; the cadence is independent of playback state.
    pub async fn run(mut self) -> Result<()> {
        info!(
            "Polling responses for call {} every {:?}",
            self.call_id, self.interval
        );

        let mut ticker = tokio::time::interval(self.interval);
        loop {
            ticker.tick().await;
            self.tick().await;
        }
    }

    /// One polling step. Exposed for tests.
    pub async fn tick(&mut self) {
        // Handle playback end before fetching so a queued swap starts without
        // waiting another interval.
        if self.state.phase() == PollerPhase::Playing && self.player.is_finished() {
            match self.state.playback_ended() {
                Some(next) => self.start_playback(&next).await,
                None => debug!("Playback finished, poller idle"),
            }
        }

        let entry = match self.client.fetch_latest(&self.call_id).await {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Failed to fetch latest response: {}", e);
                return;
            }
        };

        if let Some(text) = &entry.text {
            if self.last_text.as_deref() != Some(text.as_str()) {
                info!("Assistant: {}", text);
                self.last_text = Some(text.clone());
            }
        }

        if let Some(locator) = &entry.audio_url {
            if let Some(now) = self.state.observe(locator) {
                self.start_playback(&now).await;
            }
        }
    }

    async fn start_playback(&mut self, locator: &str) {
        match self.client.fetch_audio(locator).await {
            Ok(bytes) => {
                debug!("Playing {} ({} bytes)", locator, bytes.len());
                if let Err(e) = self.player.play(locator, bytes) {
                    warn!("Playback failed for {}: {}", locator, e);
                }
            }
            Err(e) => warn!("Failed to fetch audio {}: {}", locator, e),
        }
        // On failure the player stays empty, so the next tick transitions the
        // state machine back through playback_ended.
    }
}

/// HTTP client for the Vocalis retrieval endpoint.
pub struct HttpFeedClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpFeedClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("Failed to build HTTP client")?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self { client, base_url })
    }
}

#[async_trait]
impl FeedClient for HttpFeedClient {
    async fn fetch_latest(&self, call_id: &str) -> Result<FeedEntry> {
        let entry = self
            .client
            .get(format!("{}/responses/latest", self.base_url))
            .query(&[("call_id", call_id)])
            .send()
            .await
            .context("Failed to reach the response feed")?
            .error_for_status()
            .context("Response feed returned an error")?
            .json()
            .await
            .context("Malformed feed entry")?;
        Ok(entry)
    }

    async fn fetch_audio(&self, locator: &str) -> Result<Vec<u8>> {
        let url = if locator.starts_with("http://") || locator.starts_with("https://") {
            locator.to_string()
        } else {
            format!("{}{}", self.base_url, locator)
        };

        let bytes = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to fetch audio artifact")?
            .error_for_status()
            .context("Audio fetch returned an error")?
            .bytes()
            .await
            .context("Failed to read audio bytes")?;
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_observe_while_idle_starts_playback() {
        let mut state = PlaybackState::new();
        assert_eq!(state.phase(), PollerPhase::Idle);

        assert_eq!(state.observe("/audio/c/a.wav"), Some("/audio/c/a.wav".to_string()));
        assert_eq!(state.phase(), PollerPhase::Playing);
    }

    #[test]
    fn test_observe_while_playing_queues_pending_swap() {
        let mut state = PlaybackState::new();
        state.observe("/a");

        assert_eq!(state.observe("/b"), None);
        assert_eq!(state.phase(), PollerPhase::Playing);

        // A's playback ends; B starts without going idle
        assert_eq!(state.playback_ended(), Some("/b".to_string()));
        assert_eq!(state.phase(), PollerPhase::Playing);

        assert_eq!(state.playback_ended(), None);
        assert_eq!(state.phase(), PollerPhase::Idle);
    }

    #[test]
    fn test_same_locator_never_plays_twice() {
        let mut state = PlaybackState::new();
        assert!(state.observe("/a").is_some());
        assert!(state.observe("/a").is_none());

        state.playback_ended();
        assert_eq!(state.phase(), PollerPhase::Idle);

        // The feed still reports /a as latest; it must not restart.
        assert!(state.observe("/a").is_none());
        assert_eq!(state.phase(), PollerPhase::Idle);
    }

    #[test]
    fn test_newer_pending_replaces_unplayed_one() {
        let mut state = PlaybackState::new();
        state.observe("/a");
        state.observe("/b");
        state.observe("/c");

        assert_eq!(state.playback_ended(), Some("/c".to_string()));
        assert_eq!(state.playback_ended(), None);
    }

    struct StubClient {
        latest: Arc<Mutex<FeedEntry>>,
        fail: Arc<Mutex<bool>>,
    }

    #[async_trait]
    impl FeedClient for StubClient {
        async fn fetch_latest(&self, _call_id: &str) -> Result<FeedEntry> {
            if *self.fail.lock().unwrap() {
                anyhow::bail!("connection refused");
            }
            Ok(self.latest.lock().unwrap().clone())
        }

        async fn fetch_audio(&self, locator: &str) -> Result<Vec<u8>> {
            Ok(locator.as_bytes().to_vec())
        }
    }

    #[derive(Default)]
    struct StubPlayer {
        played: Vec<String>,
        finished: Arc<Mutex<bool>>,
    }

    impl AudioPlayer for StubPlayer {
        fn play(&mut self, locator: &str, _bytes: Vec<u8>) -> Result<()> {
            self.played.push(locator.to_string());
            *self.finished.lock().unwrap() = false;
            Ok(())
        }

        fn is_finished(&self) -> bool {
            *self.finished.lock().unwrap()
        }
    }

    fn entry(url: &str) -> FeedEntry {
        FeedEntry {
            audio_url: Some(url.to_string()),
            text: Some("text".to_string()),
            timestamp: None,
        }
    }

    #[tokio::test]
    async fn test_poller_plays_each_locator_once_in_order() {
        let latest = Arc::new(Mutex::new(FeedEntry::default()));
        let fail = Arc::new(Mutex::new(false));
        let finished = Arc::new(Mutex::new(true));

        let client = StubClient {
            latest: latest.clone(),
            fail: fail.clone(),
        };
        let player = StubPlayer {
            played: Vec::new(),
            finished: finished.clone(),
        };
        let mut poller =
            PlaybackPoller::new(client, player, "call-1", Duration::from_millis(10));

        // Nothing produced yet
        poller.tick().await;
        assert!(poller.player.played.is_empty());

        // First response appears and starts playing
        *latest.lock().unwrap() = entry("/a");
        poller.tick().await;
        assert_eq!(poller.player.played, vec!["/a"]);

        // A new response while /a is still playing is queued, not started
        *latest.lock().unwrap() = entry("/b");
        poller.tick().await;
        assert_eq!(poller.player.played, vec!["/a"]);

        // /a drains; next tick swaps to /b without replaying /a
        *finished.lock().unwrap() = true;
        poller.tick().await;
        assert_eq!(poller.player.played, vec!["/a", "/b"]);

        // Feed keeps reporting /b; it never plays twice
        *finished.lock().unwrap() = true;
        poller.tick().await;
        poller.tick().await;
        assert_eq!(poller.player.played, vec!["/a", "/b"]);
    }

    #[tokio::test]
    async fn test_poller_survives_fetch_failures() {
        let latest = Arc::new(Mutex::new(entry("/a")));
        let fail = Arc::new(Mutex::new(true));
        let finished = Arc::new(Mutex::new(true));

        let client = StubClient {
            latest: latest.clone(),
            fail: fail.clone(),
        };
        let player = StubPlayer {
            played: Vec::new(),
            finished: finished.clone(),
        };
        let mut poller =
            PlaybackPoller::new(client, player, "call-1", Duration::from_millis(10));

        // Transient failures: nothing plays, nothing panics
        poller.tick().await;
        poller.tick().await;
        assert!(poller.player.played.is_empty());

        // Feed recovers and playback resumes
        *fail.lock().unwrap() = false;
        poller.tick().await;
        assert_eq!(poller.player.played, vec!["/a"]);
    }
}
