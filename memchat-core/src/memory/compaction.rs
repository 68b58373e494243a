//! Sliding-window compaction.
//!
//! After each completed turn the history is checked against `max_history`.
//! When it overflows by `excess` messages, exactly the `excess` oldest ones
//! are rendered into a role-labelled transcript and handed to the summary
//! model together with the current summary; its answer replaces the summary
//! and the archived prefix is dropped from the history.
//!
//! The archived prefix is not rounded to user/assistant pairs, so an odd
//! overflow can leave an assistant reply at the head of the window.

use super::ConversationState;
use crate::config::constants::ui;
use crate::config::{AgentConfig, MemoryConfig};
use crate::llm::{LLMError, LLMProvider, LLMRequest, Message, MessageRole, Usage};
use crate::prompts::summary_prompt;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompactionConfig {
    pub max_history: usize,
    pub summary_model: String,
    /// Transcript label for every non-user role
    pub assistant_label: String,
}

impl CompactionConfig {
    pub fn from_configs(agent: &AgentConfig, memory: &MemoryConfig) -> Self {
        Self {
            max_history: memory.max_history,
            summary_model: agent.summary_model.clone(),
            assistant_label: agent.assistant_label.clone(),
        }
    }
}

impl Default for CompactionConfig {
    fn default() -> Self {
        Self::from_configs(&AgentConfig::default(), &MemoryConfig::default())
    }
}

/// What a compaction pass did
#[derive(Debug, Clone, PartialEq)]
pub struct CompactionReport {
    pub archived_messages: usize,
    pub retained_messages: usize,
    pub summary_chars: usize,
    pub usage: Option<Usage>,
}

pub struct CompactionEngine {
    provider: Arc<dyn LLMProvider>,
    config: CompactionConfig,
}

impl CompactionEngine {
    pub fn new(provider: Arc<dyn LLMProvider>, config: CompactionConfig) -> Self {
        Self { provider, config }
    }

    pub fn config(&self) -> &CompactionConfig {
        &self.config
    }

    /// Number of oldest messages that have to be archived, zero when within bounds
    pub fn excess(&self, state: &ConversationState) -> usize {
        state.history.len().saturating_sub(self.config.max_history)
    }

    pub fn needs_compaction(&self, state: &ConversationState) -> bool {
        self.excess(state) > 0
    }

    /// Fold the overflow of `state.history` into `state.summary`.
    ///
    /// Returns `Ok(None)` without calling the model when the history is within
    /// bounds. `state` is left untouched if summarization fails.
    pub async fn compact(
        &self,
        state: &mut ConversationState,
    ) -> Result<Option<CompactionReport>, LLMError> {
        let excess = self.excess(state);
        if excess == 0 {
            return Ok(None);
        }

        let (summary, usage) = self
            .summarize(&state.summary, &state.history[..excess])
            .await?;

        state.history.drain(..excess);
        state.summary = summary;

        let report = CompactionReport {
            archived_messages: excess,
            retained_messages: state.history.len(),
            summary_chars: state.summary.chars().count(),
            usage,
        };
        info!(
            archived = report.archived_messages,
            retained = report.retained_messages,
            summary_chars = report.summary_chars,
            "history compacted into summary"
        );
        Ok(Some(report))
    }

    /// Merge `archived` into `current_summary` with one non-streaming call.
    ///
    /// An empty slice returns the current summary unchanged without a call.
    pub async fn summarize(
        &self,
        current_summary: &str,
        archived: &[Message],
    ) -> Result<(String, Option<Usage>), LLMError> {
        if archived.is_empty() {
            return Ok((current_summary.to_string(), None));
        }

        let transcript = render_transcript(archived, &self.config.assistant_label);
        let prompt = summary_prompt(current_summary, &transcript);
        debug!(
            model = %self.config.summary_model,
            archived = archived.len(),
            transcript_chars = transcript.chars().count(),
            "requesting summary"
        );

        let request = LLMRequest::new(
            self.config.summary_model.clone(),
            vec![Message::user(prompt)],
        );
        let response = self.provider.generate(request).await?;
        Ok((response.content.trim().to_string(), response.usage))
    }
}

/// One `"{label}: {content}\n"` line per message, chronological
pub fn render_transcript(messages: &[Message], assistant_label: &str) -> String {
    messages
        .iter()
        .map(|message| {
            let label = match message.role {
                MessageRole::User => ui::TRANSCRIPT_USER_LABEL,
                _ => assistant_label,
            };
            format!("{label}: {}\n", message.content)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::LLMResponse;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct RecordingSummarizer {
        requests: Mutex<Vec<LLMRequest>>,
        fail: bool,
    }

    #[async_trait]
    impl LLMProvider for RecordingSummarizer {
        fn name(&self) -> &str {
            "recording"
        }

        async fn generate(&self, request: LLMRequest) -> Result<LLMResponse, LLMError> {
            self.requests.lock().push(request);
            if self.fail {
                return Err(LLMError::Network("offline".to_string()));
            }
            Ok(LLMResponse::text("  merged summary \n"))
        }
    }

    fn engine(provider: Arc<RecordingSummarizer>, max_history: usize) -> CompactionEngine {
        CompactionEngine::new(
            provider,
            CompactionConfig {
                max_history,
                ..CompactionConfig::default()
            },
        )
    }

    fn history(n: usize) -> Vec<Message> {
        (0..n)
            .map(|i| {
                if i % 2 == 0 {
                    Message::user(format!("u{i}"))
                } else {
                    Message::assistant(format!("a{i}"))
                }
            })
            .collect()
    }

    #[test]
    fn transcript_labels_roles() {
        let messages = vec![
            Message::user("hi"),
            Message::assistant("hello"),
            Message::system("note"),
        ];
        assert_eq!(
            render_transcript(&messages, "Gemma"),
            "User: hi\nGemma: hello\nGemma: note\n"
        );
    }

    #[tokio::test]
    async fn within_bounds_is_a_no_op() {
        let provider = Arc::new(RecordingSummarizer::default());
        let engine = engine(provider.clone(), 4);
        let mut state = ConversationState::new(history(4), "keep");

        assert!(engine.compact(&mut state).await.unwrap().is_none());
        assert_eq!(state.summary, "keep");
        assert_eq!(state.history.len(), 4);
        assert!(provider.requests.lock().is_empty());
    }

    #[tokio::test]
    async fn archives_exact_prefix_and_replaces_summary() {
        let provider = Arc::new(RecordingSummarizer::default());
        let engine = engine(provider.clone(), 4);
        let mut state = ConversationState::new(history(7), "old facts");

        let report = engine.compact(&mut state).await.unwrap().unwrap();
        assert_eq!(report.archived_messages, 3);
        assert_eq!(report.retained_messages, 4);
        assert_eq!(state.history, history(7)[3..].to_vec());
        assert_eq!(state.summary, "merged summary");

        let requests = provider.requests.lock();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].model, "gemma3:4b");
        assert!(!requests[0].stream);
        assert_eq!(requests[0].messages.len(), 1);
        assert_eq!(requests[0].messages[0].role, MessageRole::User);
        let prompt = &requests[0].messages[0].content;
        assert!(prompt.contains("old facts"));
        assert!(prompt.contains("User: u0\nGemma: a1\nUser: u2\n"));
        assert!(!prompt.contains("a3"));
    }

    #[tokio::test]
    async fn failed_summary_leaves_state_untouched() {
        let provider = Arc::new(RecordingSummarizer {
            fail: true,
            ..Default::default()
        });
        let engine = engine(provider, 2);
        let mut state = ConversationState::new(history(3), "before");
        let original = state.clone();

        assert!(engine.compact(&mut state).await.is_err());
        assert_eq!(state, original);
    }

    #[tokio::test]
    async fn empty_archive_skips_the_model() {
        let provider = Arc::new(RecordingSummarizer::default());
        let engine = engine(provider.clone(), 2);
        let (summary, usage) = engine.summarize("existing", &[]).await.unwrap();
        assert_eq!(summary, "existing");
        assert!(usage.is_none());
        assert!(provider.requests.lock().is_empty());
    }
}
