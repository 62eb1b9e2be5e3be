//! Transcript persistence.
//!
//! A narrow keyed load/save interface. The session treats save failures as
//! non-fatal and keeps the conversation in memory, so implementations report
//! errors instead of panicking.

use crate::transcript::Transcript;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use tracing::debug;

/// A durable keyed store for conversation transcripts.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TranscriptStore: Send + Sync {
    /// Loads the transcript stored under `key`, if any.
    async fn load(&self, key: &str) -> Result<Option<Transcript>>;
    /// Durably replaces the transcript stored under `key`.
    async fn save(&self, key: &str, transcript: &Transcript) -> Result<()>;
}

/// One pretty-printed JSON file per key under a data directory.
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

#[async_trait]
impl TranscriptStore for JsonFileStore {
    async fn load(&self, key: &str) -> Result<Option<Transcript>> {
        let path = self.path_for(key);
        let raw = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                debug!(?path, "no stored transcript");
                return Ok(None);
            }
            Err(error) => {
                return Err(error).context("failed to read transcript file");
            }
        };
        let transcript =
            serde_json::from_str(&raw).context("failed to parse transcript file")?;
        Ok(Some(transcript))
    }

    async fn save(&self, key: &str, transcript: &Transcript) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .context("failed to create data directory")?;
        let raw = serde_json::to_string_pretty(transcript)?;
        tokio::fs::write(self.path_for(key), raw)
            .await
            .context("failed to write transcript file")?;
        Ok(())
    }
}
