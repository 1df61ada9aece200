//! Audio artifact storage.
//!
//! Persists synthesized PCM as WAV files and hands back a stable locator the
//! playback client can fetch. One persistence strategy only: durable files
//! under the data directory, served by the API's `/audio` route.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use hound::{SampleFormat, WavSpec, WavWriter};
use tracing::info;

use crate::voice::error::{VoiceError, VoiceResult};

/// Persists raw audio for a call and produces a retrievable locator.
#[async_trait]
pub trait AudioStore: Send + Sync {
    /// Persist 16-bit linear PCM bytes, returning the artifact's locator.
    async fn put(&self, call_id: &str, pcm: &[u8]) -> VoiceResult<String>;
}

/// File-system store: WAV artifacts under `<root>/<call_id>/`.
///
/// Locators are URL paths of the form `/audio/<call_id>/<file>.wav`, unique
/// within a session via a microsecond timestamp plus a collision counter.
pub struct FsAudioStore {
    root: PathBuf,
    sample_rate: u32,
}

impl FsAudioStore {
    pub fn new(root: PathBuf, sample_rate: u32) -> Self {
        Self { root, sample_rate }
    }

    /// Absolute path for a stored artifact, or `None` when the file name is
    /// not a plain component (rejects traversal attempts from the URL).
    pub fn resolve(&self, call_id: &str, file_name: &str) -> Option<PathBuf> {
        if !is_safe_component(call_id) || !is_safe_component(file_name) {
            return None;
        }
        Some(self.root.join(call_id).join(file_name))
    }

    fn artifact_path(&self, call_id: &str) -> (PathBuf, String) {
        let timestamp = Utc::now().timestamp_micros();
        let dir = self.root.join(call_id);

        let mut file_name = format!("response-{}.wav", timestamp);
        let mut path = dir.join(&file_name);
        // Collisions require two artifacts in the same microsecond; handle
        // them anyway with a counter suffix.
        for i in 1..100 {
            if !path.exists() {
                break;
            }
            file_name = format!("response-{}-{}.wav", timestamp, i);
            path = dir.join(&file_name);
        }

        (path, file_name)
    }

    fn write_wav(&self, path: &Path, pcm: &[u8]) -> VoiceResult<()> {
        let spec = WavSpec {
            channels: 1,
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };

        let mut writer = WavWriter::create(path, spec)
            .map_err(|e| VoiceError::Storage(format!("failed to create {path:?}: {e}")))?;

        for chunk in pcm.chunks_exact(2) {
            let sample = i16::from_le_bytes([chunk[0], chunk[1]]);
            writer
                .write_sample(sample)
                .map_err(|e| VoiceError::Storage(format!("failed to write sample: {e}")))?;
        }
        writer
            .finalize()
            .map_err(|e| VoiceError::Storage(format!("failed to finalize {path:?}: {e}")))?;

        Ok(())
    }
}

fn is_safe_component(s: &str) -> bool {
    !s.is_empty()
        && s.chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        && s != "."
        && s != ".."
}

#[async_trait]
impl AudioStore for FsAudioStore {
    async fn put(&self, call_id: &str, pcm: &[u8]) -> VoiceResult<String> {
        if !is_safe_component(call_id) {
            return Err(VoiceError::Storage(format!(
                "call id '{call_id}' is not usable as a path component"
            )));
        }

        let dir = self.root.join(call_id);
        std::fs::create_dir_all(&dir)
            .map_err(|e| VoiceError::Storage(format!("failed to create {dir:?}: {e}")))?;

        let (path, file_name) = self.artifact_path(call_id);
        self.write_wav(&path, pcm)?;

        info!(
            "Stored {} bytes of audio for call {}: {:?}",
            pcm.len(),
            call_id,
            path
        );

        Ok(format!("/audio/{}/{}", call_id, file_name))
    }
}

/// Decode a stored WAV artifact back to PCM bytes. Used by tests and by the
/// poller's local playback path.
pub fn read_wav_pcm(bytes: &[u8]) -> VoiceResult<Vec<i16>> {
    let reader = hound::WavReader::new(Cursor::new(bytes))
        .map_err(|e| VoiceError::Storage(format!("invalid WAV data: {e}")))?;
    reader
        .into_samples::<i16>()
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| VoiceError::Storage(format!("invalid WAV samples: {e}")))
}
