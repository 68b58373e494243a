//! Shared fixtures for the integration suites

#![allow(dead_code)]

use async_trait::async_trait;
use memchat_core::core::{ConversationLoop, SessionContext, TurnObserver};
use memchat_core::llm::{
    LLMError, LLMProvider, LLMRequest, LLMResponse, LLMStream, LLMStreamEvent,
};
use memchat_core::memory::compaction::CompactionConfig;
use memchat_core::memory::{CompactionReport, ConversationState, MemoryStore};
use memchat_core::storage::{InMemoryStore, SessionKey, StorageError};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

pub const PERSONA: &str = "You are a test persona.";

/// Provider with queued chat replies and summaries, recording every request.
///
/// Chat replies are streamed one whitespace-separated word at a time.
#[derive(Default)]
pub struct ScriptedProvider {
    replies: Mutex<VecDeque<String>>,
    summaries: Mutex<VecDeque<String>>,
    pub chat_requests: Mutex<Vec<LLMRequest>>,
    pub summary_requests: Mutex<Vec<LLMRequest>>,
    pub fail_summaries: bool,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_replies<I, S>(self, replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.replies
            .lock()
            .extend(replies.into_iter().map(Into::into));
        self
    }

    pub fn with_summaries<I, S>(self, summaries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.summaries
            .lock()
            .extend(summaries.into_iter().map(Into::into));
        self
    }

    pub fn failing_summaries(mut self) -> Self {
        self.fail_summaries = true;
        self
    }

    pub fn summary_calls(&self) -> usize {
        self.summary_requests.lock().len()
    }
}

#[async_trait]
impl LLMProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    fn supports_streaming(&self) -> bool {
        true
    }

    async fn generate(&self, request: LLMRequest) -> Result<LLMResponse, LLMError> {
        let call = {
            let mut requests = self.summary_requests.lock();
            requests.push(request);
            requests.len()
        };
        if self.fail_summaries {
            return Err(LLMError::Network("summary model unavailable".to_string()));
        }
        let summary = self
            .summaries
            .lock()
            .pop_front()
            .unwrap_or_else(|| format!("summary #{call}"));
        Ok(LLMResponse::text(summary))
    }

    async fn stream(&self, request: LLMRequest) -> Result<LLMStream, LLMError> {
        let last_user = request
            .messages
            .last()
            .map(|m| m.content.clone())
            .unwrap_or_default();
        self.chat_requests.lock().push(request);

        let reply = self
            .replies
            .lock()
            .pop_front()
            .unwrap_or_else(|| format!("echo {last_user}"));

        let mut events: Vec<Result<LLMStreamEvent, LLMError>> = Vec::new();
        for word in reply.split_inclusive(' ') {
            events.push(Ok(LLMStreamEvent::Token {
                delta: word.to_string(),
            }));
        }
        events.push(Ok(LLMStreamEvent::Completed {
            response: LLMResponse::text(reply),
        }));
        Ok(Box::pin(futures::stream::iter(events)))
    }
}

/// Observer that records what the terminal would have shown
#[derive(Default)]
pub struct RecordingObserver {
    pub fragments: Vec<String>,
    pub completed_replies: usize,
    pub compactions_started: Vec<usize>,
    pub compactions_finished: Vec<CompactionReport>,
    pub resets: usize,
}

impl TurnObserver for RecordingObserver {
    fn on_fragment(&mut self, fragment: &str) {
        self.fragments.push(fragment.to_string());
    }

    fn on_reply_complete(&mut self, _response: &LLMResponse) {
        self.completed_replies += 1;
    }

    fn on_compaction_started(&mut self, archiving: usize) {
        self.compactions_started.push(archiving);
    }

    fn on_compaction_finished(&mut self, report: &CompactionReport) {
        self.compactions_finished.push(report.clone());
    }

    fn on_reset(&mut self) {
        self.resets += 1;
    }
}

pub struct Harness {
    pub store: Arc<InMemoryStore>,
    pub provider: Arc<ScriptedProvider>,
    pub max_history: usize,
}

impl Harness {
    pub fn new(provider: ScriptedProvider, max_history: usize) -> Self {
        Self {
            store: Arc::new(InMemoryStore::new()),
            provider: Arc::new(provider),
            max_history,
        }
    }

    pub fn with_stored(
        provider: ScriptedProvider,
        max_history: usize,
        state: ConversationState,
    ) -> Self {
        Self {
            store: Arc::new(InMemoryStore::with_document(SessionKey::default(), state)),
            provider: Arc::new(provider),
            max_history,
        }
    }

    pub fn memory(&self) -> MemoryStore {
        MemoryStore::new(self.store.clone(), SessionKey::default())
    }

    pub fn context(&self) -> SessionContext {
        SessionContext::new(
            self.memory(),
            self.provider.clone(),
            CompactionConfig {
                max_history: self.max_history,
                ..CompactionConfig::default()
            },
            PERSONA,
            "gemma-friend",
        )
    }

    /// Start a loop the way the binary does, loading from the store
    pub async fn start(&self) -> Result<ConversationLoop, StorageError> {
        ConversationLoop::start(self.context()).await
    }

    pub fn stored(&self) -> Option<ConversationState> {
        self.store.snapshot(&SessionKey::default())
    }
}
