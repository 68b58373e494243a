//! Provider-neutral generation interface.
//!
//! A provider turns an [`LLMRequest`] (model id plus role-tagged messages) into
//! either one complete [`LLMResponse`] or an [`LLMStream`] of incremental
//! events. Each call to [`LLMProvider::stream`] yields a fresh, finite, ordered
//! stream: zero or more [`LLMStreamEvent::Token`] fragments followed by exactly
//! one [`LLMStreamEvent::Completed`].

use crate::config::constants::message_roles;
use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::pin::Pin;

/// Chat message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::System => message_roles::SYSTEM,
            MessageRole::User => message_roles::USER,
            MessageRole::Assistant => message_roles::ASSISTANT,
        }
    }
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single chat message. Ordering within a history is chronological.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

impl Message {
    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    /// Create an assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }

    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub stream: bool,
}

impl LLMRequest {
    pub fn new(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            messages,
            stream: false,
        }
    }

    pub fn streaming(mut self) -> Self {
        self.stream = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LLMResponse {
    pub content: String,
    pub usage: Option<Usage>,
    pub finish_reason: FinishReason,
}

impl LLMResponse {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            usage: None,
            finish_reason: FinishReason::Stop,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinishReason {
    Stop,
    Length,
    Other(String),
}

impl FinishReason {
    pub fn from_provider(reason: &str) -> Self {
        match reason {
            "stop" => FinishReason::Stop,
            "length" => FinishReason::Length,
            other => FinishReason::Other(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LLMStreamEvent {
    /// Next text fragment of the reply
    Token { delta: String },
    /// Terminal event carrying the aggregated reply
    Completed { response: LLMResponse },
}

pub type LLMStream = Pin<Box<dyn Stream<Item = Result<LLMStreamEvent, LLMError>> + Send>>;

/// Text-generation backend
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Provider name (e.g. "ollama")
    fn name(&self) -> &str;

    /// Generate a complete reply
    async fn generate(&self, request: LLMRequest) -> Result<LLMResponse, LLMError>;

    fn supports_streaming(&self) -> bool {
        false
    }

    /// Stream a reply incrementally.
    ///
    /// Providers without native streaming fall back to [`LLMProvider::generate`]
    /// and emit the whole reply as a single token.
    async fn stream(&self, request: LLMRequest) -> Result<LLMStream, LLMError> {
        let response = self.generate(request).await?;
        let mut events = Vec::with_capacity(2);
        if !response.content.is_empty() {
            events.push(Ok(LLMStreamEvent::Token {
                delta: response.content.clone(),
            }));
        }
        events.push(Ok(LLMStreamEvent::Completed { response }));
        Ok(Box::pin(futures::stream::iter(events)))
    }

    /// Validate request for this provider
    fn validate_request(&self, request: &LLMRequest) -> Result<(), LLMError> {
        if request.messages.is_empty() {
            return Err(LLMError::InvalidRequest(
                "Messages cannot be empty".to_string(),
            ));
        }

        if request.model.trim().is_empty() {
            return Err(LLMError::InvalidRequest("Model cannot be empty".to_string()));
        }

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LLMError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("Network error: {0}")]
    Network(String),
    #[error("Provider error: {0}")]
    Provider(String),
    #[error("Stream error: {0}")]
    Stream(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    struct EchoProvider;

    #[async_trait]
    impl LLMProvider for EchoProvider {
        fn name(&self) -> &str {
            "echo"
        }

        async fn generate(&self, request: LLMRequest) -> Result<LLMResponse, LLMError> {
            let last = request
                .messages
                .last()
                .map(|m| m.content.clone())
                .unwrap_or_default();
            Ok(LLMResponse::text(last))
        }
    }

    #[test]
    fn roles_serialize_lowercase() {
        let json = serde_json::to_string(&Message::assistant("hi")).unwrap();
        assert_eq!(json, r#"{"role":"assistant","content":"hi"}"#);
        let parsed: Message = serde_json::from_str(r#"{"role":"system","content":"x"}"#).unwrap();
        assert_eq!(parsed, Message::system("x"));
    }

    #[tokio::test]
    async fn default_stream_falls_back_to_generate() {
        let provider = EchoProvider;
        let request = LLMRequest::new("echo-1", vec![Message::user("ping")]).streaming();
        let events: Vec<_> = provider.stream(request).await.unwrap().collect().await;

        assert_eq!(events.len(), 2);
        assert_eq!(
            events[0],
            Ok(LLMStreamEvent::Token {
                delta: "ping".to_string()
            })
        );
        assert!(matches!(events[1], Ok(LLMStreamEvent::Completed { .. })));
    }

    #[test]
    fn validate_rejects_empty_messages() {
        let provider = EchoProvider;
        let request = LLMRequest::new("echo-1", Vec::new());
        assert!(matches!(
            provider.validate_request(&request),
            Err(LLMError::InvalidRequest(_))
        ));
    }
}
