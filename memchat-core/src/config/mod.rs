//! memchat Configuration Module
//!
//! Settings come from an optional `memchat.toml` plus a handful of environment
//! variables. Every section has serde defaults, so an absent file simply yields
//! the built-in behaviour.

pub mod constants;
pub mod env;
pub mod loader;

pub use env::{load_dotenv, require_env};
pub use loader::{ConfigManager, MemchatConfig};

use constants::{defaults, env_vars, models, storage, urls};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error(
        "{name} environment variable is not set. Please check your .env file or export it in your shell."
    )]
    MissingEnv { name: String },
    #[error("Invalid configuration: {0}")]
    Invalid(String),
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Model and persona settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AgentConfig {
    /// Model used for conversational replies
    #[serde(default = "default_chat_model")]
    pub chat_model: String,

    /// Model used for memory summarization
    #[serde(default = "default_summary_model")]
    pub summary_model: String,

    /// Label used for non-user turns in summarization transcripts
    #[serde(default = "default_assistant_label")]
    pub assistant_label: String,

    /// Optional markdown file replacing the built-in persona directive
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persona_path: Option<PathBuf>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            chat_model: default_chat_model(),
            summary_model: default_summary_model(),
            assistant_label: default_assistant_label(),
            persona_path: None,
        }
    }
}

fn default_chat_model() -> String {
    models::DEFAULT_CHAT_MODEL.to_string()
}
fn default_summary_model() -> String {
    models::DEFAULT_SUMMARY_MODEL.to_string()
}
fn default_assistant_label() -> String {
    defaults::DEFAULT_ASSISTANT_LABEL.to_string()
}

/// Sliding-window settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MemoryConfig {
    /// Messages kept verbatim; older ones are folded into the summary
    #[serde(default = "default_max_history")]
    pub max_history: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            max_history: default_max_history(),
        }
    }
}

fn default_max_history() -> usize {
    defaults::DEFAULT_MAX_HISTORY
}

/// Durable storage settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// One of `firestore`, `file`, `memory`
    #[serde(default = "default_backend")]
    pub backend: String,

    #[serde(default = "default_collection")]
    pub collection: String,

    #[serde(default = "default_document_id")]
    pub document_id: String,

    /// Firestore database id
    #[serde(default = "default_database")]
    pub database: String,

    /// Environment variable holding the required project identifier
    #[serde(default = "default_project_id_env")]
    pub project_id_env: String,

    /// Environment variable holding an OAuth bearer token for Firestore
    #[serde(default = "default_access_token_env")]
    pub access_token_env: String,

    /// Root directory for the file backend (defaults to `~/.memchat/data`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            collection: default_collection(),
            document_id: default_document_id(),
            database: default_database(),
            project_id_env: default_project_id_env(),
            access_token_env: default_access_token_env(),
            data_dir: None,
        }
    }
}

fn default_backend() -> String {
    storage::BACKEND_FIRESTORE.to_string()
}
fn default_collection() -> String {
    storage::DEFAULT_COLLECTION.to_string()
}
fn default_document_id() -> String {
    storage::DEFAULT_DOCUMENT_ID.to_string()
}
fn default_database() -> String {
    storage::DEFAULT_DATABASE.to_string()
}
fn default_project_id_env() -> String {
    env_vars::PROJECT_ID.to_string()
}
fn default_access_token_env() -> String {
    env_vars::ACCESS_TOKEN.to_string()
}

/// Ollama endpoint settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OllamaConfig {
    #[serde(default = "default_ollama_base_url")]
    pub base_url: String,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: default_ollama_base_url(),
        }
    }
}

fn default_ollama_base_url() -> String {
    urls::OLLAMA_BASE_URL.to_string()
}

impl OllamaConfig {
    /// Base URL after applying the `OLLAMA_HOST` override
    pub fn resolved_base_url(&self) -> String {
        match env::optional_env(env_vars::OLLAMA_HOST) {
            Some(host) => normalize_host(&host),
            None => self.base_url.trim_end_matches('/').to_string(),
        }
    }
}

fn normalize_host(host: &str) -> String {
    let host = host.trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("http://{host}")
    }
}

/// Logging settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TelemetryConfig {
    /// Fallback filter when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    defaults::DEFAULT_LOG_LEVEL.to_string()
}
