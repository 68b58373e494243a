//! Turn-taking state machine.
//!
//! ```text
//! AwaitingInput -> BuildingContext -> Generating -> UpdatingMemory -> Persisting -> AwaitingInput
//!       |
//!       +--> Stopped   (exit / quit, or any failure past AwaitingInput)
//! ```
//!
//! A failed turn is returned as a [`TurnError`] and leaves the loop in
//! [`LoopState::Stopped`]; nothing from that turn is persisted.

use super::command::Command;
use crate::config::MemchatConfig;
use crate::llm::{LLMError, LLMProvider, LLMRequest, LLMResponse, LLMStreamEvent, Message};
use crate::memory::compaction::CompactionConfig;
use crate::memory::{CompactionEngine, CompactionReport, ConversationState, MemoryStore};
use crate::prompts::build_context;
use crate::storage::{ConversationStore, SessionKey, StorageError};
use futures::StreamExt;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    AwaitingInput,
    BuildingContext,
    Generating,
    UpdatingMemory,
    Persisting,
    Stopped,
}

impl fmt::Display for LoopState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            LoopState::AwaitingInput => "awaiting_input",
            LoopState::BuildingContext => "building_context",
            LoopState::Generating => "generating",
            LoopState::UpdatingMemory => "updating_memory",
            LoopState::Persisting => "persisting",
            LoopState::Stopped => "stopped",
        };
        f.write_str(label)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TurnError {
    #[error("Reply generation failed: {0}")]
    Generation(#[source] LLMError),
    #[error("Memory summarization failed: {0}")]
    Summarization(#[source] LLMError),
    #[error("Saving the conversation failed: {0}")]
    Persistence(#[source] StorageError),
}

/// Result of feeding one input line to the loop
#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome {
    Replied {
        reply: String,
        compaction: Option<CompactionReport>,
    },
    Reset,
    Stopped,
    /// Blank input; nothing happened
    Skipped,
}

/// Display side of a turn. Reply accumulation does not depend on it.
pub trait TurnObserver {
    fn on_fragment(&mut self, _fragment: &str) {}
    fn on_reply_complete(&mut self, _response: &LLMResponse) {}
    fn on_compaction_started(&mut self, _archiving: usize) {}
    fn on_compaction_finished(&mut self, _report: &CompactionReport) {}
    fn on_reset(&mut self) {}
}

/// Observer that ignores everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl TurnObserver for NoopObserver {}

/// Collaborators of one session, constructed once at startup
pub struct SessionContext {
    pub memory: MemoryStore,
    pub provider: Arc<dyn LLMProvider>,
    pub compaction: CompactionEngine,
    pub persona: String,
    pub chat_model: String,
}

impl SessionContext {
    pub fn new(
        memory: MemoryStore,
        provider: Arc<dyn LLMProvider>,
        compaction: CompactionConfig,
        persona: impl Into<String>,
        chat_model: impl Into<String>,
    ) -> Self {
        let compaction = CompactionEngine::new(provider.clone(), compaction);
        Self {
            memory,
            provider,
            compaction,
            persona: persona.into(),
            chat_model: chat_model.into(),
        }
    }

    /// Wire a context from loaded configuration and ready-made gateways
    pub fn from_config(
        config: &MemchatConfig,
        store: Arc<dyn ConversationStore>,
        provider: Arc<dyn LLMProvider>,
        persona: impl Into<String>,
    ) -> Self {
        let memory = MemoryStore::new(store, SessionKey::from_config(&config.storage));
        Self::new(
            memory,
            provider,
            CompactionConfig::from_configs(&config.agent, &config.memory),
            persona,
            config.agent.chat_model.clone(),
        )
    }
}

pub struct ConversationLoop {
    ctx: SessionContext,
    state: ConversationState,
    phase: LoopState,
}

impl ConversationLoop {
    /// Load the persisted state and wait for the first input
    pub async fn start(ctx: SessionContext) -> Result<Self, StorageError> {
        let state = ctx.memory.load().await?;
        Ok(Self::with_state(ctx, state))
    }

    pub fn with_state(ctx: SessionContext, state: ConversationState) -> Self {
        Self {
            ctx,
            state,
            phase: LoopState::AwaitingInput,
        }
    }

    pub fn state(&self) -> &ConversationState {
        &self.state
    }

    pub fn phase(&self) -> LoopState {
        self.phase
    }

    pub fn is_stopped(&self) -> bool {
        self.phase == LoopState::Stopped
    }

    pub fn context(&self) -> &SessionContext {
        &self.ctx
    }

    /// Move to `Stopped` without persisting anything
    pub fn stop(&mut self) {
        self.transition(LoopState::Stopped);
    }

    /// Run one pass of the state machine for `line`
    pub async fn handle_line(
        &mut self,
        line: &str,
        observer: &mut dyn TurnObserver,
    ) -> Result<TurnOutcome, TurnError> {
        if self.is_stopped() {
            return Ok(TurnOutcome::Stopped);
        }

        match Command::parse(line) {
            Command::Empty => Ok(TurnOutcome::Skipped),
            Command::Exit => {
                self.stop();
                Ok(TurnOutcome::Stopped)
            }
            Command::Reset => self.reset(observer).await,
            Command::Message(input) => {
                let result = self.run_turn(input, observer).await;
                match &result {
                    Ok(_) => self.transition(LoopState::AwaitingInput),
                    Err(err) => {
                        warn!(error = %err, phase = %self.phase, "turn aborted");
                        self.stop();
                    }
                }
                result
            }
        }
    }

    async fn reset(&mut self, observer: &mut dyn TurnObserver) -> Result<TurnOutcome, TurnError> {
        match self.ctx.memory.reset().await {
            Ok(empty) => {
                self.state = empty;
                observer.on_reset();
                Ok(TurnOutcome::Reset)
            }
            Err(err) => {
                self.stop();
                Err(TurnError::Persistence(err))
            }
        }
    }

    async fn run_turn(
        &mut self,
        input: String,
        observer: &mut dyn TurnObserver,
    ) -> Result<TurnOutcome, TurnError> {
        self.state.push(Message::user(input));

        self.transition(LoopState::BuildingContext);
        let messages = build_context(&self.ctx.persona, &self.state);

        self.transition(LoopState::Generating);
        let reply = self.generate(messages, observer).await?;
        self.state.push(Message::assistant(reply.clone()));

        self.transition(LoopState::UpdatingMemory);
        let excess = self.ctx.compaction.excess(&self.state);
        if excess > 0 {
            observer.on_compaction_started(excess);
        }
        let compaction = self
            .ctx
            .compaction
            .compact(&mut self.state)
            .await
            .map_err(TurnError::Summarization)?;
        if let Some(report) = &compaction {
            observer.on_compaction_finished(report);
        }

        self.transition(LoopState::Persisting);
        self.ctx
            .memory
            .save(&self.state)
            .await
            .map_err(TurnError::Persistence)?;

        Ok(TurnOutcome::Replied { reply, compaction })
    }

    /// Stream the reply, forwarding fragments to the observer while accumulating them
    async fn generate(
        &self,
        messages: Vec<Message>,
        observer: &mut dyn TurnObserver,
    ) -> Result<String, TurnError> {
        let request = LLMRequest::new(self.ctx.chat_model.clone(), messages).streaming();
        let mut stream = self
            .ctx
            .provider
            .stream(request)
            .await
            .map_err(TurnError::Generation)?;

        let mut reply = String::new();
        while let Some(event) = stream.next().await {
            match event.map_err(TurnError::Generation)? {
                LLMStreamEvent::Token { delta } => {
                    reply.push_str(&delta);
                    observer.on_fragment(&delta);
                }
                LLMStreamEvent::Completed { response } => {
                    debug!(
                        chars = reply.chars().count(),
                        usage = ?response.usage,
                        finish_reason = ?response.finish_reason,
                        "reply complete"
                    );
                    observer.on_reply_complete(&response);
                    break;
                }
            }
        }

        if reply.is_empty() {
            warn!(model = %self.ctx.chat_model, "model returned an empty reply");
        }
        Ok(reply)
    }

    fn transition(&mut self, next: LoopState) {
        if self.phase != next {
            debug!(from = %self.phase, to = %next, "loop transition");
            self.phase = next;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{LLMResponse, LLMStream};
    use crate::storage::InMemoryStore;
    use async_trait::async_trait;

    struct FailingStream;

    #[async_trait]
    impl LLMProvider for FailingStream {
        fn name(&self) -> &str {
            "failing"
        }

        async fn generate(&self, _request: LLMRequest) -> Result<LLMResponse, LLMError> {
            Ok(LLMResponse::text("unused"))
        }

        async fn stream(&self, _request: LLMRequest) -> Result<LLMStream, LLMError> {
            let events = vec![
                Ok(LLMStreamEvent::Token {
                    delta: "par".to_string(),
                }),
                Err(LLMError::Stream("connection reset".to_string())),
            ];
            Ok(Box::pin(futures::stream::iter(events)))
        }
    }

    fn context(store: Arc<InMemoryStore>, provider: Arc<dyn LLMProvider>) -> SessionContext {
        SessionContext::new(
            MemoryStore::new(store, SessionKey::default()),
            provider,
            CompactionConfig {
                max_history: 4,
                ..CompactionConfig::default()
            },
            "persona",
            "gemma-friend",
        )
    }

    #[tokio::test]
    async fn blank_lines_are_skipped() {
        let store = Arc::new(InMemoryStore::new());
        let mut chat = ConversationLoop::with_state(
            context(store.clone(), Arc::new(FailingStream)),
            ConversationState::default(),
        );
        let outcome = chat.handle_line("   ", &mut NoopObserver).await.unwrap();
        assert_eq!(outcome, TurnOutcome::Skipped);
        assert_eq!(chat.phase(), LoopState::AwaitingInput);
        assert_eq!(store.save_count(), 0);
    }

    #[tokio::test]
    async fn exit_stops_without_saving() {
        let store = Arc::new(InMemoryStore::new());
        let mut chat = ConversationLoop::with_state(
            context(store.clone(), Arc::new(FailingStream)),
            ConversationState::default(),
        );
        assert_eq!(
            chat.handle_line("Quit", &mut NoopObserver).await.unwrap(),
            TurnOutcome::Stopped
        );
        assert!(chat.is_stopped());
        assert_eq!(
            chat.handle_line("hello", &mut NoopObserver).await.unwrap(),
            TurnOutcome::Stopped
        );
        assert_eq!(store.save_count(), 0);
    }

    #[tokio::test]
    async fn stream_failure_stops_loop_and_skips_persistence() {
        let store = Arc::new(InMemoryStore::new());
        let mut chat = ConversationLoop::with_state(
            context(store.clone(), Arc::new(FailingStream)),
            ConversationState::default(),
        );

        let err = chat.handle_line("hi", &mut NoopObserver).await.unwrap_err();
        assert!(matches!(err, TurnError::Generation(LLMError::Stream(_))));
        assert_eq!(chat.phase(), LoopState::Stopped);
        assert_eq!(store.save_count(), 0);
        assert!(store.snapshot(&SessionKey::default()).is_none());
    }
}
