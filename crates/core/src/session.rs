//! The conversation session controller.
//!
//! Owns the authoritative transcript and the single-flight admission flag,
//! drives one exchange at a time through the transport and frame decoder,
//! and republishes progress to observers. All failures are contained here:
//! a failed exchange leaves a fallback reply in the transcript instead of
//! propagating an error.

use crate::decoder::FrameDecoder;
use crate::speech::Speaker;
use crate::store::TranscriptStore;
use crate::transcript::{Message, Role, Transcript};
use crate::transport::{ChatTransport, ChatTurn};
use anyhow::Result;
use futures::StreamExt;
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, error, info, warn};

/// Observer protocol: everything a UI needs to mirror the session.
#[derive(Serialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// A committed message was appended to the transcript.
    MessageAdded { message: Message },
    /// The pending indicator: true while an exchange is in flight.
    Busy { sending: bool },
    /// A draft assistant reply was opened.
    ReplyStarted,
    /// One streamed delta arrived; `partial` is the full draft so far.
    ReplyDelta { chunk: String, partial: String },
    /// The draft was committed.
    ReplyEnded { message: Message },
    /// Display-only text (wake acknowledgements). Never persisted.
    Notice { text: String },
}

/// Tunables for one session.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Store key the transcript is persisted under.
    pub storage_key: String,
    /// Personality prompt seeded as the first system message.
    pub system_prompt: String,
    /// Assistant greeting seeded after the system prompt.
    pub greeting: String,
    /// Shown in place of a reply when an exchange fails.
    pub fallback_reply: String,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            storage_key: "history".to_owned(),
            system_prompt: "You are Reynard. You speak like a friendly, witty human. \
                            You are playful, humorous, and warm. Keep replies natural \
                            and casual."
                .to_owned(),
            greeting: "Hey! I'm Reynard. Say my name if you need me.".to_owned(),
            fallback_reply: "Oops, something went wrong.".to_owned(),
        }
    }
}

/// Clears the single-flight flag on every exit path, panics included.
struct SendingGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for SendingGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

/// Orchestrates the conversation: one exchange at a time, transcript behind
/// a mutex, observers fed through an event channel.
///
/// The controller is the only writer of the transcript. The mutex plus the
/// atomic admission flag keep that true even on a multi-threaded runtime.
pub struct ConversationController {
    transcript: Mutex<Transcript>,
    sending: AtomicBool,
    store: Arc<dyn TranscriptStore>,
    transport: Arc<dyn ChatTransport>,
    speaker: Arc<Speaker>,
    events: mpsc::UnboundedSender<SessionEvent>,
    options: SessionOptions,
}

impl ConversationController {
    /// Restores the persisted transcript, or seeds a fresh one when the
    /// store has nothing (or fails to load).
    pub async fn new(
        store: Arc<dyn TranscriptStore>,
        transport: Arc<dyn ChatTransport>,
        speaker: Arc<Speaker>,
        events: mpsc::UnboundedSender<SessionEvent>,
        options: SessionOptions,
    ) -> Self {
        let transcript = match store.load(&options.storage_key).await {
            Ok(Some(transcript)) => {
                info!(messages = transcript.len(), "restored transcript");
                transcript
            }
            Ok(None) => Transcript::seeded(&options.system_prompt, &options.greeting),
            Err(error) => {
                warn!(%error, "failed to load transcript, starting fresh");
                Transcript::seeded(&options.system_prompt, &options.greeting)
            }
        };
        Self {
            transcript: Mutex::new(transcript),
            sending: AtomicBool::new(false),
            store,
            transport,
            speaker,
            events,
            options,
        }
    }

    /// True while an exchange is in flight.
    pub fn is_sending(&self) -> bool {
        self.sending.load(Ordering::SeqCst)
    }

    /// A snapshot of the committed messages.
    pub async fn messages(&self) -> Vec<Message> {
        self.transcript.lock().await.messages().to_vec()
    }

    /// Publishes display-only text to observers.
    pub fn announce(&self, text: &str) {
        self.emit(SessionEvent::Notice {
            text: text.to_owned(),
        });
    }

    /// Submits one user utterance.
    ///
    /// Empty input and submissions made while an exchange is already in
    /// flight are ignored silently: at most one exchange at a time, late
    /// callers are rejected rather than queued.
    pub async fn submit(&self, input: &str) {
        let text = input.trim();
        if text.is_empty() {
            return;
        }
        if self
            .sending
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("submit ignored, an exchange is already in flight");
            return;
        }
        let _guard = SendingGuard {
            flag: &self.sending,
        };

        let context = {
            let mut transcript = self.transcript.lock().await;
            let message = transcript.push(Role::User, text);
            self.persist(&transcript).await;
            self.emit(SessionEvent::MessageAdded { message });
            self.emit(SessionEvent::Busy { sending: true });
            transcript.begin_draft();
            self.emit(SessionEvent::ReplyStarted);
            transcript.context()
        };

        match self.run_exchange(context).await {
            Ok(reply) if !reply.is_empty() => {
                {
                    let mut transcript = self.transcript.lock().await;
                    if let Some(message) = transcript.commit_draft() {
                        self.persist(&transcript).await;
                        self.emit(SessionEvent::ReplyEnded { message });
                    }
                }
                self.speaker.play(&reply);
            }
            Ok(_) => {
                warn!("stream ended with an empty reply");
                self.fail_exchange().await;
            }
            Err(error) => {
                error!(%error, "exchange failed");
                self.fail_exchange().await;
            }
        }

        self.emit(SessionEvent::Busy { sending: false });
    }

    /// Drives one request/response exchange and returns the accumulated
    /// reply text, which may be empty.
    async fn run_exchange(&self, context: Vec<ChatTurn>) -> Result<String> {
        let mut stream = self.transport.send(context).await?;
        let mut decoder = FrameDecoder::new();
        let mut reply = String::new();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            for delta in decoder.feed(&chunk) {
                reply.push_str(&delta);
                let partial = {
                    let mut transcript = self.transcript.lock().await;
                    transcript.append_draft(&delta).map(str::to_owned)
                };
                if let Some(partial) = partial {
                    self.emit(SessionEvent::ReplyDelta {
                        chunk: delta,
                        partial,
                    });
                }
            }
            if decoder.is_finished() {
                break;
            }
        }
        Ok(reply)
    }

    /// Replaces the draft with the fixed fallback reply. The fallback is
    /// persisted as transcript content, so history shows the failure.
    async fn fail_exchange(&self) {
        let mut transcript = self.transcript.lock().await;
        transcript.discard_draft();
        let message = transcript.push(Role::Assistant, &self.options.fallback_reply);
        self.persist(&transcript).await;
        self.emit(SessionEvent::MessageAdded { message });
    }

    async fn persist(&self, transcript: &Transcript) {
        if let Err(error) = self.store.save(&self.options.storage_key, transcript).await {
            warn!(%error, "failed to persist transcript");
        }
    }

    fn emit(&self, event: SessionEvent) {
        let _ = self.events.send(event);
    }
}
