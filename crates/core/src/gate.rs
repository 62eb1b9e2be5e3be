//! Wake-word voice gate.
//!
//! Continuous recognition hears everything; the gate decides which finalized
//! transcripts are wake triggers, noise, or commands. Two states: Dormant
//! until the wake token is heard, then the very next transcript is consumed
//! as the command and the gate disarms again.

use crate::session::ConversationController;
use crate::speech::{Speaker, SpeechSource};
use rand::seq::IndexedRandom;
use std::sync::Arc;
use tracing::{debug, warn};

/// Phrases played back when the wake token is recognized.
const ACK_PHRASES: [&str; 5] = [
    "Yeah? I'm here.",
    "Listening, go ahead.",
    "You called?",
    "Hey, talk to me.",
    "At your service.",
];

/// Whether the next transcript is treated as a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    Dormant,
    Awake,
}

/// Outcome of one finalized transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateEvent {
    /// The wake token was heard; acknowledge, but submit nothing yet.
    Woken { ack: String },
    /// A command to hand to the conversation controller.
    Command { text: String },
    /// Noise while Dormant, or nothing left after stripping the token.
    Ignored,
}

pub struct WakeGate {
    wake_token: String,
    state: GateState,
}

impl WakeGate {
    /// Token matching is case-insensitive, so the token is stored lowercased.
    pub fn new(wake_token: &str) -> Self {
        Self {
            wake_token: wake_token.trim().to_lowercase(),
            state: GateState::Dormant,
        }
    }

    pub fn state(&self) -> GateState {
        self.state
    }

    /// Evaluates one finalized transcript and advances the state machine.
    pub fn observe(&mut self, transcript: &str) -> GateEvent {
        let heard = transcript.trim().to_lowercase();
        match self.state {
            GateState::Dormant => {
                if heard.contains(&self.wake_token) {
                    self.state = GateState::Awake;
                    let ack = ACK_PHRASES
                        .choose(&mut rand::rng())
                        .copied()
                        .unwrap_or(ACK_PHRASES[0]);
                    GateEvent::Woken {
                        ack: ack.to_owned(),
                    }
                } else {
                    GateEvent::Ignored
                }
            }
            GateState::Awake => {
                self.state = GateState::Dormant;
                let command = heard.replacen(&self.wake_token, "", 1);
                let command = command.trim();
                if command.is_empty() {
                    GateEvent::Ignored
                } else {
                    GateEvent::Command {
                        text: command.to_owned(),
                    }
                }
            }
        }
    }
}

/// Runs the voice side of the session until the recognition source closes.
///
/// Every finalized transcript first interrupts playback, independent of the
/// state transition: the assistant stops talking the instant the user talks.
/// Recognition errors are logged and leave the gate untouched.
pub async fn run_voice_gate<S: SpeechSource>(
    mut source: S,
    mut gate: WakeGate,
    controller: Arc<ConversationController>,
    speaker: Arc<Speaker>,
) {
    while let Some(result) = source.next_final().await {
        let transcript = match result {
            Ok(transcript) => transcript,
            Err(error) => {
                warn!(%error, "speech recognition error");
                continue;
            }
        };
        debug!(%transcript, "heard");
        speaker.stop();
        match gate.observe(&transcript) {
            GateEvent::Woken { ack } => {
                controller.announce(&ack);
                speaker.play(&ack);
            }
            GateEvent::Command { text } => controller.submit(&text).await,
            GateEvent::Ignored => {}
        }
    }
}
