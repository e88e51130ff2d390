//! In-memory conversation store.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;

use super::{ConversationStore, StorageError, StorageResult, sort_newest_first};
use crate::conversation::{
    AssistantMessage, Conversation, ConversationMessage, ConversationMetadata,
};

/// Thread-safe, process-local conversation store.
///
/// Cloning shares the underlying map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<HashMap<String, Conversation>>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored conversations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Whether the store holds no conversations.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn update<F>(&self, id: &str, f: F) -> StorageResult<()>
    where
        F: FnOnce(&mut Conversation),
    {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let conv = guard
            .get_mut(id)
            .ok_or_else(|| StorageError::NotFound(id.to_string()))?;
        f(conv);
        Ok(())
    }
}

#[async_trait]
impl ConversationStore for MemoryStore {
    async fn create(&self, id: &str, mode: &str) -> StorageResult<Conversation> {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if guard.contains_key(id) {
            return Err(StorageError::AlreadyExists(id.to_string()));
        }
        let conv = Conversation::new(id, mode);
        guard.insert(id.to_string(), conv.clone());
        Ok(conv)
    }

    async fn get(&self, id: &str) -> StorageResult<Option<Conversation>> {
        let guard = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        Ok(guard.get(id).cloned())
    }

    async fn list(&self) -> StorageResult<Vec<ConversationMetadata>> {
        let guard = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        let mut list: Vec<_> = guard.values().map(Conversation::metadata).collect();
        sort_newest_first(&mut list);
        Ok(list)
    }

    async fn add_user_message(&self, id: &str, content: &str) -> StorageResult<()> {
        self.update(id, |conv| {
            conv.messages.push(ConversationMessage::User {
                content: content.to_string(),
            });
        })
    }

    async fn add_assistant_message(
        &self,
        id: &str,
        message: AssistantMessage,
    ) -> StorageResult<()> {
        self.update(id, |conv| {
            conv.messages.push(ConversationMessage::Assistant(message));
        })
    }

    async fn update_title(&self, id: &str, title: &str) -> StorageResult<()> {
        self.update(id, |conv| conv.title = title.to_string())
    }

    async fn delete(&self, id: &str) -> StorageResult<bool> {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        Ok(guard.remove(id).is_some())
    }
}
