//! Console speech collaborators.
//!
//! Platform synthesizers and recognizers are external collaborators; the
//! console client substitutes a sink that narrates playback through the log.
//! Recognition is fed through a channel (see the `/say` handling in the
//! binary), bridged into the core via its `SpeechSource` impl for receivers.

use reynard_core::speech::{SpeechSink, VoiceSettings};
use tracing::{debug, info};

/// A `SpeechSink` that logs what would be spoken instead of producing audio.
pub struct TracingSink;

impl SpeechSink for TracingSink {
    fn speak(&self, text: &str, voice: &VoiceSettings) {
        info!(locale = %voice.locale, rate = voice.rate, pitch = voice.pitch, "speaking: {text}");
    }

    fn cancel(&self) {
        debug!("speech canceled");
    }
}
