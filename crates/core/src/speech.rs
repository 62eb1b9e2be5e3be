//! Speech capability seams and the output arbiter.
//!
//! Platform recognizers and synthesizers stay outside the core; the session
//! consumes them through two narrow traits so tests can substitute scripted
//! doubles.

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Fixed per-deployment voice parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceSettings {
    pub locale: String,
    pub rate: f32,
    pub pitch: f32,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            locale: "en-US".to_owned(),
            rate: 1.05,
            pitch: 1.1,
        }
    }
}

/// An utterance playback engine: speak and cancel, nothing more.
#[cfg_attr(test, mockall::automock)]
pub trait SpeechSink: Send + Sync {
    fn speak(&self, text: &str, voice: &VoiceSettings);
    /// Cancels the current utterance. Idempotent when nothing is playing.
    fn cancel(&self);
}

/// A source of finalized recognition results.
///
/// Interim results never reach the core. `None` means the source closed.
#[async_trait]
pub trait SpeechSource: Send {
    async fn next_final(&mut self) -> Option<Result<String>>;
}

/// Platform recognizers push results from callbacks; a channel bridges them
/// into the async world.
#[async_trait]
impl SpeechSource for mpsc::Receiver<Result<String>> {
    async fn next_final(&mut self) -> Option<Result<String>> {
        self.recv().await
    }
}

/// Single-flight speech output: a new utterance always preempts the current
/// one, nothing is queued.
pub struct Speaker {
    sink: Arc<dyn SpeechSink>,
    voice: VoiceSettings,
}

impl Speaker {
    pub fn new(sink: Arc<dyn SpeechSink>, voice: VoiceSettings) -> Self {
        Self { sink, voice }
    }

    /// Cancels whatever is playing, then starts the new utterance.
    pub fn play(&self, text: &str) {
        self.sink.cancel();
        self.sink.speak(text, &self.voice);
    }

    /// Stops playback if active.
    pub fn stop(&self) {
        self.sink.cancel();
    }
}
