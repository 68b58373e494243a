//! # memchat-core - Runtime for memchat
//!
//! `memchat-core` powers the memchat terminal companion: a chat loop against a
//! local Ollama model whose memory survives restarts and never grows without
//! bound.
//!
//! ## Highlights
//!
//! - **Sliding-window memory**: the most recent `max_history` messages are kept
//!   verbatim; older ones are folded into a running summary by a second model.
//! - **Durable state**: the whole conversation document is written after every
//!   turn to Firestore, a local JSON file, or process memory.
//! - **Streaming replies**: reply fragments reach the terminal as they arrive
//!   while the full text is accumulated for the history.
//! - **Configuration-first**: an optional `memchat.toml` plus `.env`, with
//!   defaults centralized in `config::constants`.
//!
//! ## Architecture Overview
//!
//! - `config/`: configuration loader, defaults, environment handling.
//! - `llm/`: provider trait and the Ollama adapter.
//! - `storage/`: conversation document stores.
//! - `memory/`: conversation state, memory store, compaction engine.
//! - `prompts/`: persona directive, summary templates, context assembly.
//! - `core/`: input commands and the conversation state machine.
//! - `ui/`: terminal styling and spinner.
//!
//! ## Quickstart
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use memchat_core::config::ConfigManager;
//! use memchat_core::core::{ConversationLoop, NoopObserver, SessionContext};
//! use memchat_core::llm::OllamaProvider;
//! use memchat_core::prompts::resolve_persona;
//! use memchat_core::storage::build_store;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), anyhow::Error> {
//!     let config = ConfigManager::load()?.into_config();
//!     let store = build_store(&config.storage, "my-project").await?;
//!     let provider = Arc::new(OllamaProvider::new(config.ollama.resolved_base_url()));
//!     let persona = resolve_persona(&config.agent)?;
//!
//!     let ctx = SessionContext::from_config(&config, store, provider, persona);
//!     let mut chat = ConversationLoop::start(ctx).await?;
//!     chat.handle_line("Hello!", &mut NoopObserver).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod core;
pub mod llm;
pub mod memory;
pub mod prompts;
pub mod storage;
pub mod ui;

pub use config::{ConfigManager, MemchatConfig};
pub use crate::core::{ConversationLoop, SessionContext, TurnError, TurnObserver, TurnOutcome};
pub use memory::{ConversationState, MemoryStore};
