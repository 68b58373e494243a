use crate::config::constants::{files, storage};
use crate::config::{
    AgentConfig, ConfigError, MemoryConfig, OllamaConfig, StorageConfig, TelemetryConfig,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure for memchat
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct MemchatConfig {
    /// Model and persona settings
    #[serde(default)]
    pub agent: AgentConfig,

    /// Sliding-window settings
    #[serde(default)]
    pub memory: MemoryConfig,

    /// Durable storage settings
    #[serde(default)]
    pub storage: StorageConfig,

    /// Ollama endpoint
    #[serde(default)]
    pub ollama: OllamaConfig,

    /// Logging
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl MemchatConfig {
    /// Reject settings the rest of the program cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.memory.max_history == 0 {
            return Err(ConfigError::Invalid(
                "memory.max_history must be at least 1".to_string(),
            ));
        }

        let backend = self.storage.backend.as_str();
        if !matches!(
            backend,
            storage::BACKEND_FIRESTORE | storage::BACKEND_FILE | storage::BACKEND_MEMORY
        ) {
            return Err(ConfigError::Invalid(format!(
                "unknown storage.backend '{backend}' (expected firestore, file, or memory)"
            )));
        }

        if self.storage.collection.trim().is_empty() || self.storage.document_id.trim().is_empty()
        {
            return Err(ConfigError::Invalid(
                "storage.collection and storage.document_id must not be empty".to_string(),
            ));
        }

        if self.agent.chat_model.trim().is_empty() || self.agent.summary_model.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "agent.chat_model and agent.summary_model must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}

/// Configuration manager for loading and validating configurations
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config: MemchatConfig,
    config_path: Option<PathBuf>,
}

impl ConfigManager {
    /// Load configuration from the default locations
    pub fn load() -> Result<Self, ConfigError> {
        let cwd = std::env::current_dir().map_err(|source| ConfigError::Read {
            path: PathBuf::from("."),
            source,
        })?;
        Self::load_from_workspace(cwd)
    }

    /// Load configuration from a specific workspace
    pub fn load_from_workspace(workspace: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let workspace = workspace.as_ref();

        // memchat.toml in the workspace root first
        let config_path = workspace.join(files::CONFIG_FILE_NAME);
        if config_path.exists() {
            return Self::load_from_file(&config_path);
        }

        let fallback_path = workspace
            .join(files::CONFIG_DIR_NAME)
            .join(files::CONFIG_FILE_NAME);
        if fallback_path.exists() {
            return Self::load_from_file(&fallback_path);
        }

        if let Some(home_dir) = dirs::home_dir() {
            let home_config_path = home_dir
                .join(files::CONFIG_DIR_NAME)
                .join(files::CONFIG_FILE_NAME);
            if home_config_path.exists() {
                return Self::load_from_file(&home_config_path);
            }
        }

        Ok(Self {
            config: MemchatConfig::default(),
            config_path: None,
        })
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let config: MemchatConfig = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;

        Ok(Self {
            config,
            config_path: Some(path.to_path_buf()),
        })
    }

    /// Get the loaded configuration
    pub fn config(&self) -> &MemchatConfig {
        &self.config
    }

    /// Consume the manager, keeping only the configuration
    pub fn into_config(self) -> MemchatConfig {
        self.config
    }

    /// Get the configuration file path (if loaded from file)
    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }
}
