//! Audio playback via rodio.

use std::io::Cursor;

use anyhow::{Context, Result};
use rodio::{Decoder, OutputStream, Sink};

use super::AudioPlayer;

/// Plays WAV bytes on the default output device. The sink queues sources, so
/// `play` returns immediately and `is_finished` reports when audio drained.
pub struct RodioPlayer {
    // Dropping the stream stops playback; keep it alive with the sink.
    _stream: OutputStream,
    sink: Sink,
}

impl RodioPlayer {
    pub fn new() -> Result<Self> {
        let (stream, handle) =
            OutputStream::try_default().context("No audio output device available")?;
        let sink = Sink::try_new(&handle).context("Failed to open audio sink")?;
        Ok(Self {
            _stream: stream,
            sink,
        })
    }
}

impl AudioPlayer for RodioPlayer {
    fn play(&mut self, locator: &str, bytes: Vec<u8>) -> Result<()> {
        let source = Decoder::new(Cursor::new(bytes))
            .with_context(|| format!("Failed to decode audio for {locator}"))?;
        self.sink.append(source);
        Ok(())
    }

    fn is_finished(&self) -> bool {
        self.sink.empty()
    }
}
