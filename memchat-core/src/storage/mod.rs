//! # Persistence gateway
//!
//! Durable key-value storage for [`ConversationState`] documents. Every
//! backend has full-replace semantics: `save` overwrites the whole document,
//! `load` returns the whole document or `None`. There is no locking or
//! versioning; a single process is assumed to own the session key.

pub mod auth;
pub mod file;
pub mod firestore;
pub mod memory;

pub use auth::{AccessTokenSource, ApplicationDefaultCredentials, StaticToken};
pub use file::FileStore;
pub use firestore::FirestoreStore;
pub use memory::InMemoryStore;

use crate::config::StorageConfig;
use crate::config::constants::{files, storage as storage_defaults};
use crate::config::env::optional_env;
use crate::memory::ConversationState;
use async_trait::async_trait;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Fixed location of the conversation document
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionKey {
    pub collection: String,
    pub document_id: String,
}

impl SessionKey {
    pub fn new(collection: impl Into<String>, document_id: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            document_id: document_id.into(),
        }
    }

    pub fn from_config(config: &StorageConfig) -> Self {
        Self::new(config.collection.clone(), config.document_id.clone())
    }
}

impl Default for SessionKey {
    fn default() -> Self {
        Self::new(
            storage_defaults::DEFAULT_COLLECTION,
            storage_defaults::DEFAULT_DOCUMENT_ID,
        )
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.collection, self.document_id)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Failed to connect to {backend}: {message}")]
    Connection { backend: &'static str, message: String },
    #[error("{backend} request failed: {message}")]
    Backend { backend: &'static str, message: String },
    #[error("Stored conversation is unreadable: {0}")]
    Decode(String),
}

/// Document store holding one conversation per [`SessionKey`]
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Backend name for logs and messages
    fn name(&self) -> &'static str;

    /// Fetch the document, `None` when it does not exist
    async fn load(&self, key: &SessionKey) -> Result<Option<ConversationState>, StorageError>;

    /// Overwrite the document with `state`
    async fn save(&self, key: &SessionKey, state: &ConversationState) -> Result<(), StorageError>;
}

/// Build the configured backend. Failure here is a startup-fatal connection error.
pub async fn build_store(
    config: &StorageConfig,
    project_id: &str,
) -> Result<Arc<dyn ConversationStore>, StorageError> {
    let store: Arc<dyn ConversationStore> = match config.backend.as_str() {
        storage_defaults::BACKEND_FILE => {
            let root = match &config.data_dir {
                Some(dir) => dir.clone(),
                None => default_data_dir()?,
            };
            Arc::new(FileStore::new(root, project_id)?)
        }
        storage_defaults::BACKEND_MEMORY => Arc::new(InMemoryStore::new()),
        _ => {
            let tokens = firestore_tokens(config).await?;
            Arc::new(FirestoreStore::new(project_id, &config.database, tokens)?)
        }
    };

    info!(backend = store.name(), project = project_id, "storage client ready");
    Ok(store)
}

/// Emulator: anonymous. An explicit token in `access_token_env`: used as is.
/// Otherwise Application Default Credentials, refreshed as they expire.
async fn firestore_tokens(
    config: &StorageConfig,
) -> Result<Arc<dyn AccessTokenSource>, StorageError> {
    if firestore::emulator_host().is_some() {
        return Ok(Arc::new(StaticToken::anonymous()));
    }
    if let Some(token) = optional_env(&config.access_token_env) {
        info!(variable = %config.access_token_env, "using static Firestore access token");
        return Ok(Arc::new(StaticToken::new(Some(token))));
    }
    Ok(Arc::new(ApplicationDefaultCredentials::discover().await?))
}

fn default_data_dir() -> Result<PathBuf, StorageError> {
    let home = dirs::home_dir().ok_or_else(|| StorageError::Connection {
        backend: "file",
        message: "cannot determine home directory; set storage.data_dir".to_string(),
    })?;
    Ok(home
        .join(files::CONFIG_DIR_NAME)
        .join(storage_defaults::DATA_SUBDIR))
}
