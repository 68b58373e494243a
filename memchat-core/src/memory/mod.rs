//! # Conversation memory
//!
//! [`ConversationState`] is the unit of persistence: the verbatim recent
//! history plus a free-text summary of everything older. [`MemoryStore`] binds
//! a [`ConversationStore`] backend to the single session key this process
//! owns, and [`compaction::CompactionEngine`] keeps the history bounded by
//! folding its oldest entries into the summary.

pub mod compaction;

pub use compaction::{CompactionEngine, CompactionReport, render_transcript};

use crate::llm::Message;
use crate::storage::{ConversationStore, SessionKey, StorageError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

/// History and summary for one session
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationState {
    /// Chronological messages, oldest first
    #[serde(rename = "messages", default)]
    pub history: Vec<Message>,
    /// Condensed prior context; empty until the first compaction
    #[serde(default)]
    pub summary: String,
}

impl ConversationState {
    pub fn new(history: Vec<Message>, summary: impl Into<String>) -> Self {
        Self {
            history,
            summary: summary.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty() && self.summary.is_empty()
    }

    pub fn has_summary(&self) -> bool {
        !self.summary.is_empty()
    }

    pub fn push(&mut self, message: Message) {
        self.history.push(message);
    }
}

/// The persisted conversation behind the fixed session key
#[derive(Clone)]
pub struct MemoryStore {
    backend: Arc<dyn ConversationStore>,
    key: SessionKey,
}

impl MemoryStore {
    pub fn new(backend: Arc<dyn ConversationStore>, key: SessionKey) -> Self {
        Self { backend, key }
    }

    pub fn key(&self) -> &SessionKey {
        &self.key
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Fetch the stored state, or the empty state when nothing was saved yet
    pub async fn load(&self) -> Result<ConversationState, StorageError> {
        let state = self.backend.load(&self.key).await?.unwrap_or_default();
        info!(
            key = %self.key,
            messages = state.history.len(),
            has_summary = state.has_summary(),
            "conversation loaded"
        );
        Ok(state)
    }

    /// Overwrite the stored document with `state`
    pub async fn save(&self, state: &ConversationState) -> Result<(), StorageError> {
        self.backend.save(&self.key, state).await?;
        info!(
            key = %self.key,
            messages = state.history.len(),
            summary_chars = state.summary.chars().count(),
            "conversation saved"
        );
        Ok(())
    }

    /// Persist and return the empty state
    pub async fn reset(&self) -> Result<ConversationState, StorageError> {
        let empty = ConversationState::default();
        self.backend.save(&self.key, &empty).await?;
        info!(key = %self.key, "conversation reset");
        Ok(empty)
    }
}
