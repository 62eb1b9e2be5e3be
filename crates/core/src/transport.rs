//! Outbound chat transport.
//!
//! The controller sends the whole transcript as role/content pairs and reads
//! the reply back as a raw byte stream. The trait seam keeps the session
//! logic testable against scripted streams.

use crate::transcript::Role;
use anyhow::{Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, TryStreamExt};
use serde::{Deserialize, Serialize};
use std::pin::Pin;

/// One role/content pair as sent to the backend.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
}

/// JSON body of the chat request.
#[derive(Serialize, Debug)]
struct ChatRequest<'a> {
    messages: &'a [ChatTurn],
}

/// The reply body as an ordered sequence of raw byte chunks.
pub type ReplyStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// A transport capable of one streaming chat exchange.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Sends the conversation context and returns the streaming reply body.
    async fn send(&self, turns: Vec<ChatTurn>) -> Result<ReplyStream>;
}

/// `ChatTransport` over plain HTTP chunked responses.
pub struct HttpChatTransport {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpChatTransport {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl ChatTransport for HttpChatTransport {
    async fn send(&self, turns: Vec<ChatTurn>) -> Result<ReplyStream> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&ChatRequest { messages: &turns })
            .send()
            .await
            .context("chat request failed")?
            .error_for_status()
            .context("chat endpoint returned an error status")?;
        Ok(Box::pin(response.bytes_stream().map_err(anyhow::Error::from)))
    }
}
