use super::{ConversationStore, SessionKey, StorageError};
use crate::memory::ConversationState;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::debug;

const BACKEND: &str = "file";
const DOCUMENT_EXTENSION: &str = "json";

/// One pretty-printed JSON document per session key under
/// `{root}/{project}/{collection}/{document_id}.json`.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl AsRef<Path>, project_id: &str) -> Result<Self, StorageError> {
        let root = root.as_ref().join(sanitize_component(project_id));
        std::fs::create_dir_all(&root).map_err(|e| StorageError::Connection {
            backend: BACKEND,
            message: format!("failed to create data directory {}: {e}", root.display()),
        })?;
        Ok(Self { root })
    }

    pub fn document_path(&self, key: &SessionKey) -> PathBuf {
        self.root
            .join(sanitize_component(&key.collection))
            .join(format!(
                "{}.{}",
                sanitize_component(&key.document_id),
                DOCUMENT_EXTENSION
            ))
    }
}

#[async_trait]
impl ConversationStore for FileStore {
    fn name(&self) -> &'static str {
        BACKEND
    }

    async fn load(&self, key: &SessionKey) -> Result<Option<ConversationState>, StorageError> {
        let path = self.document_path(key);
        let data = match tokio::fs::read_to_string(&path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(StorageError::Backend {
                    backend: BACKEND,
                    message: format!("failed to read {}: {e}", path.display()),
                });
            }
        };

        let state: ConversationState = serde_json::from_str(&data).map_err(|e| {
            StorageError::Decode(format!("{}: {e}", path.display()))
        })?;
        debug!(path = %path.display(), messages = state.history.len(), "loaded conversation file");
        Ok(Some(state))
    }

    async fn save(&self, key: &SessionKey, state: &ConversationState) -> Result<(), StorageError> {
        let path = self.document_path(key);
        let backend_error = |message: String| StorageError::Backend {
            backend: BACKEND,
            message,
        };

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                backend_error(format!("failed to create {}: {e}", parent.display()))
            })?;
        }

        let payload = serde_json::to_string_pretty(state)
            .map_err(|e| backend_error(format!("failed to serialize conversation: {e}")))?;

        // write-then-rename so a crash never leaves a truncated document
        let tmp_path = path.with_extension(format!("{DOCUMENT_EXTENSION}.tmp"));
        tokio::fs::write(&tmp_path, payload)
            .await
            .map_err(|e| backend_error(format!("failed to write {}: {e}", tmp_path.display())))?;
        tokio::fs::rename(&tmp_path, &path)
            .await
            .map_err(|e| backend_error(format!("failed to replace {}: {e}", path.display())))?;

        debug!(path = %path.display(), messages = state.history.len(), "saved conversation file");
        Ok(())
    }
}

fn sanitize_component(value: &str) -> String {
    let mut normalized = String::new();
    let mut last_was_separator = false;
    for ch in value.chars() {
        if ch.is_ascii_alphanumeric() {
            normalized.push(ch.to_ascii_lowercase());
            last_was_separator = false;
        } else if matches!(ch, '-' | '_') {
            if !last_was_separator {
                normalized.push(ch);
                last_was_separator = true;
            }
        } else if !last_was_separator {
            normalized.push('-');
            last_was_separator = true;
        }
    }

    let trimmed = normalized.trim_matches(|c| c == '-' || c == '_');
    if trimmed.is_empty() {
        "default".to_string()
    } else {
        trimmed.to_string()
    }
}
