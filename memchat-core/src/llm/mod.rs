//! # Generation gateway
//!
//! A small provider abstraction ([`provider::LLMProvider`]) with an Ollama
//! implementation. The conversation loop only ever sees the trait, so tests
//! substitute scripted providers and deployments could add other backends.
//!
//! ```rust,no_run
//! use futures::StreamExt;
//! use memchat_core::llm::{LLMProvider, LLMRequest, LLMStreamEvent, Message, OllamaProvider};
//!
//! # async fn demo() -> Result<(), memchat_core::llm::LLMError> {
//! let provider = OllamaProvider::new("http://localhost:11434");
//! let request = LLMRequest::new("gemma3:4b", vec![Message::user("Hello!")]);
//! let mut stream = provider.stream(request).await?;
//! while let Some(event) = stream.next().await {
//!     if let LLMStreamEvent::Token { delta } = event? {
//!         print!("{delta}");
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod error_display;
pub mod provider;
pub mod providers;

pub use provider::{
    FinishReason, LLMError, LLMProvider, LLMRequest, LLMResponse, LLMStream, LLMStreamEvent,
    Message, MessageRole, Usage,
};
pub use providers::OllamaProvider;
