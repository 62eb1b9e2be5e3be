//! Conversation transcript types.
//!
//! The transcript is the single authoritative record of a conversation: an
//! ordered list of committed messages plus at most one in-progress assistant
//! draft being assembled from streamed deltas. The draft lives in its own
//! field rather than as a half-written message, so "at most one message in
//! progress, and only the newest" holds by construction.

use crate::transport::ChatTurn;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The author of a transcript message.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// A committed transcript entry. Immutable once appended.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Message {
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Ordered conversation history plus the in-progress assistant draft.
///
/// Only committed messages are serialized; the draft is transient state
/// scoped to one in-flight exchange.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct Transcript {
    messages: Vec<Message>,
    #[serde(skip)]
    draft: Option<String>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a fresh transcript with the personality prompt and an opening
    /// assistant greeting.
    pub fn seeded(system_prompt: &str, greeting: &str) -> Self {
        let mut transcript = Self::new();
        transcript.push(Role::System, system_prompt);
        transcript.push(Role::Assistant, greeting);
        transcript
    }

    /// Appends a committed message stamped with the current time and returns
    /// a copy of it.
    pub fn push(&mut self, role: Role, content: &str) -> Message {
        let message = Message {
            role,
            content: content.to_owned(),
            created_at: Utc::now(),
        };
        self.messages.push(message.clone());
        message
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Role/content pairs for the outbound request. Timestamps stay local.
    pub fn context(&self) -> Vec<ChatTurn> {
        self.messages
            .iter()
            .map(|m| ChatTurn {
                role: m.role,
                content: m.content.clone(),
            })
            .collect()
    }

    /// Opens a new, empty assistant draft. Any previous draft is replaced.
    pub fn begin_draft(&mut self) {
        self.draft = Some(String::new());
    }

    pub fn has_draft(&self) -> bool {
        self.draft.is_some()
    }

    /// Appends a delta to the open draft and returns the updated partial
    /// text, or `None` when no draft is open.
    pub fn append_draft(&mut self, delta: &str) -> Option<&str> {
        let draft = self.draft.as_mut()?;
        draft.push_str(delta);
        Some(draft.as_str())
    }

    /// Freezes the draft into a committed assistant message.
    pub fn commit_draft(&mut self) -> Option<Message> {
        let content = self.draft.take()?;
        Some(self.push(Role::Assistant, &content))
    }

    /// Drops the draft without committing it, returning its content.
    pub fn discard_draft(&mut self) -> Option<String> {
        self.draft.take()
    }
}
