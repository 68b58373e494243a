use super::{ConversationStore, SessionKey, StorageError};
use crate::memory::ConversationState;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Process-local store. Backs `backend = "memory"` and the test suites.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    documents: RwLock<HashMap<SessionKey, ConversationState>>,
    saves: AtomicUsize,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a document, as if a previous process had saved it
    pub fn with_document(key: SessionKey, state: ConversationState) -> Self {
        let store = Self::new();
        store.documents.write().insert(key, state);
        store
    }

    /// Number of successful `save` calls so far
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// Current stored document, bypassing the async interface
    pub fn snapshot(&self, key: &SessionKey) -> Option<ConversationState> {
        self.documents.read().get(key).cloned()
    }
}

#[async_trait]
impl ConversationStore for InMemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn load(&self, key: &SessionKey) -> Result<Option<ConversationState>, StorageError> {
        Ok(self.documents.read().get(key).cloned())
    }

    async fn save(&self, key: &SessionKey, state: &ConversationState) -> Result<(), StorageError> {
        self.documents.write().insert(key.clone(), state.clone());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::Message;

    #[tokio::test]
    async fn save_replaces_whole_document() {
        let store = InMemoryStore::new();
        let key = SessionKey::default();

        let first = ConversationState {
            history: vec![Message::user("a"), Message::assistant("b")],
            summary: "old".to_string(),
        };
        store.save(&key, &first).await.unwrap();

        let second = ConversationState {
            history: vec![Message::user("c")],
            summary: String::new(),
        };
        store.save(&key, &second).await.unwrap();

        assert_eq!(store.load(&key).await.unwrap(), Some(second));
        assert_eq!(store.save_count(), 2);
    }

    #[tokio::test]
    async fn keys_are_isolated() {
        let store = InMemoryStore::new();
        let other = SessionKey::new("gemma_conversations", "someone_else");
        store
            .save(&other, &ConversationState::default())
            .await
            .unwrap();
        assert!(store.load(&SessionKey::default()).await.unwrap().is_none());
    }
}
