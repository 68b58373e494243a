//! Interactive terminal session around [`ConversationLoop`].

mod input;
mod observer;
mod welcome;

use anyhow::{Context, Result};
use memchat_core::config::MemchatConfig;
use memchat_core::config::constants::ui;
use memchat_core::core::{Command, ConversationLoop, SessionContext, TurnOutcome};
use memchat_core::ui::{AnsiRenderer, MessageStyle};
use observer::TerminalObserver;
use std::future::Future;
use std::io::{self, BufReader};
use std::process::ExitCode;
use tokio::sync::mpsc;
use tracing::{error, warn};

/// How an interactive session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SessionEnd {
    /// exit / quit, end of input, or Ctrl-C
    Farewell,
    /// A turn failed; the error has been shown
    Failed,
}

impl SessionEnd {
    fn exit_code(self) -> ExitCode {
        match self {
            SessionEnd::Farewell => ExitCode::SUCCESS,
            SessionEnd::Failed => ExitCode::FAILURE,
        }
    }
}

pub async fn run_chat(ctx: SessionContext, config: &MemchatConfig) -> Result<ExitCode> {
    let mut renderer = AnsiRenderer::stdout();
    let backend = ctx.memory.backend_name();

    let chat = ConversationLoop::start(ctx)
        .await
        .context("Failed to load conversation memory")?;
    welcome::render(&mut renderer, chat.state(), &config.agent, backend)?;

    let input = input::spawn_line_reader(BufReader::new(io::stdin()))
        .context("Failed to start the input reader")?;
    let session = ChatSession::new(chat, renderer, &config.agent.assistant_label);
    let end = session.run(input, interrupted()).await?;
    Ok(end.exit_code())
}

/// Resolves on Ctrl-C. Never resolves when the handler cannot be installed.
async fn interrupted() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "cannot listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}

struct ChatSession {
    chat: ConversationLoop,
    renderer: AnsiRenderer,
    observer: TerminalObserver,
    assistant_label: String,
}

impl ChatSession {
    fn new(chat: ConversationLoop, renderer: AnsiRenderer, assistant_label: &str) -> Self {
        Self {
            chat,
            renderer,
            observer: TerminalObserver::new(assistant_label),
            assistant_label: assistant_label.to_string(),
        }
    }

    /// Feed input lines to the loop until exit, end of input, `shutdown`, or a failed turn
    async fn run(
        mut self,
        mut input: mpsc::Receiver<io::Result<String>>,
        shutdown: impl Future<Output = ()>,
    ) -> Result<SessionEnd> {
        tokio::pin!(shutdown);

        loop {
            self.renderer.inline(MessageStyle::User, ui::USER_PROMPT)?;

            let line = tokio::select! {
                _ = &mut shutdown => None,
                line = input.recv() => line.transpose().context("Failed to read input")?,
            };
            // interrupted while idle, or end of input
            let Some(line) = line else {
                return self.farewell(true);
            };

            match Command::parse(&line) {
                Command::Message(_) => {
                    let label = format!("{}: ", self.assistant_label);
                    self.renderer.inline(MessageStyle::Response, &label)?;
                }
                Command::Reset => self.renderer.line(MessageStyle::Info, "Clearing memory...")?,
                Command::Exit | Command::Empty => {}
            }

            let outcome = tokio::select! {
                _ = &mut shutdown => None,
                outcome = self.chat.handle_line(&line, &mut self.observer) => Some(outcome),
            };
            let Some(outcome) = outcome else {
                // the in-flight turn is dropped; nothing from it is saved
                self.observer.abort();
                self.chat.stop();
                return self.farewell(true);
            };

            match outcome {
                Ok(TurnOutcome::Stopped) => return self.farewell(false),
                Ok(TurnOutcome::Replied { .. } | TurnOutcome::Reset | TurnOutcome::Skipped) => {}
                Err(err) => {
                    self.observer.abort();
                    error!(error = %err, "conversation loop stopped");
                    self.renderer.blank_line()?;
                    self.renderer
                        .line(MessageStyle::Error, &format!("Error: {err}"))?;
                    return Ok(SessionEnd::Failed);
                }
            }
        }
    }

    fn farewell(&mut self, break_line: bool) -> Result<SessionEnd> {
        if break_line {
            self.renderer.blank_line()?;
        }
        self.renderer.line(MessageStyle::Info, ui::FAREWELL)?;
        Ok(SessionEnd::Farewell)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use memchat_core::llm::{
        LLMError, LLMProvider, LLMRequest, LLMResponse, LLMStream, LLMStreamEvent,
    };
    use memchat_core::memory::MemoryStore;
    use memchat_core::memory::compaction::CompactionConfig;
    use memchat_core::storage::{InMemoryStore, SessionKey};
    use std::sync::Arc;
    use tokio::sync::Notify;

    #[derive(Clone, Copy)]
    enum Reply {
        Text,
        Stall,
        Fail,
    }

    struct StubModel {
        reply: Reply,
        streaming: Arc<Notify>,
    }

    #[async_trait]
    impl LLMProvider for StubModel {
        fn name(&self) -> &str {
            "stub"
        }

        fn supports_streaming(&self) -> bool {
            true
        }

        async fn generate(&self, _request: LLMRequest) -> Result<LLMResponse, LLMError> {
            Ok(LLMResponse::text("summary"))
        }

        async fn stream(&self, _request: LLMRequest) -> Result<LLMStream, LLMError> {
            self.streaming.notify_one();
            match self.reply {
                Reply::Text => {
                    let events: Vec<Result<LLMStreamEvent, LLMError>> = vec![
                        Ok(LLMStreamEvent::Token {
                            delta: "hi".to_string(),
                        }),
                        Ok(LLMStreamEvent::Completed {
                            response: LLMResponse::text("hi"),
                        }),
                    ];
                    Ok(Box::pin(futures::stream::iter(events)))
                }
                Reply::Stall => Ok(Box::pin(futures::stream::pending::<
                    Result<LLMStreamEvent, LLMError>,
                >())),
                Reply::Fail => Err(LLMError::Network("model offline".to_string())),
            }
        }
    }

    struct Fixture {
        store: Arc<InMemoryStore>,
        streaming: Arc<Notify>,
        session: ChatSession,
    }

    async fn fixture(reply: Reply) -> Fixture {
        let store = Arc::new(InMemoryStore::new());
        let streaming = Arc::new(Notify::new());
        let model = Arc::new(StubModel {
            reply,
            streaming: streaming.clone(),
        });
        let ctx = SessionContext::new(
            MemoryStore::new(store.clone(), SessionKey::default()),
            model,
            CompactionConfig::default(),
            "persona",
            "gemma-friend",
        );
        let chat = ConversationLoop::start(ctx).await.unwrap();
        Fixture {
            store,
            streaming,
            session: ChatSession::new(chat, AnsiRenderer::stdout(), "Gemma"),
        }
    }

    #[tokio::test]
    async fn interrupt_while_idle_says_goodbye_without_saving() {
        let fx = fixture(Reply::Text).await;
        let (_tx, rx) = mpsc::channel(1);

        let end = fx.session.run(rx, std::future::ready(())).await.unwrap();

        assert_eq!(end, SessionEnd::Farewell);
        assert_eq!(fx.store.save_count(), 0);
    }

    #[tokio::test]
    async fn interrupt_mid_turn_discards_the_turn() {
        let fx = fixture(Reply::Stall).await;
        let (tx, rx) = mpsc::channel(1);
        tx.send(Ok("hello".to_string())).await.unwrap();

        let streaming = fx.streaming.clone();
        let end = fx
            .session
            .run(rx, async move { streaming.notified().await })
            .await
            .unwrap();

        assert_eq!(end, SessionEnd::Farewell);
        assert_eq!(fx.store.save_count(), 0);
        assert!(fx.store.snapshot(&SessionKey::default()).is_none());
    }

    #[tokio::test]
    async fn end_of_input_after_a_turn_exits_cleanly() {
        let fx = fixture(Reply::Text).await;
        let (tx, rx) = mpsc::channel(2);
        tx.send(Ok("hello".to_string())).await.unwrap();
        drop(tx);

        let end = fx
            .session
            .run(rx, std::future::pending())
            .await
            .unwrap();

        assert_eq!(end, SessionEnd::Farewell);
        assert_eq!(fx.store.save_count(), 1);
        let saved = fx.store.snapshot(&SessionKey::default()).unwrap();
        assert_eq!(saved.history.len(), 2);
    }

    #[tokio::test]
    async fn quit_stops_without_calling_the_model() {
        let fx = fixture(Reply::Fail).await;
        let (tx, rx) = mpsc::channel(1);
        tx.send(Ok("Quit".to_string())).await.unwrap();

        let end = fx
            .session
            .run(rx, std::future::pending())
            .await
            .unwrap();

        assert_eq!(end, SessionEnd::Farewell);
        assert_eq!(fx.store.save_count(), 0);
    }

    #[tokio::test]
    async fn failed_turn_ends_with_failure() {
        let fx = fixture(Reply::Fail).await;
        let (tx, rx) = mpsc::channel(1);
        tx.send(Ok("hello".to_string())).await.unwrap();

        let end = fx
            .session
            .run(rx, std::future::pending())
            .await
            .unwrap();

        assert_eq!(end, SessionEnd::Failed);
        assert_eq!(fx.store.save_count(), 0);
    }
}
