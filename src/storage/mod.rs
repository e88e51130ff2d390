//! Conversation persistence.
//!
//! The [`ConversationStore`] trait is the only way handlers and the council
//! pipeline touch stored conversations. Two providers are available:
//!
//! - [`JsonFileStore`]: one JSON document per conversation in a directory
//! - [`MemoryStore`]: process-local map, used by tests and `--ephemeral`
//!
//! # Example
//!
//! ```rust
//! # tokio_test_block_on(async {
//! use llm_council::storage::{ConversationStore, MemoryStore};
//!
//! let store = MemoryStore::new();
//! store.create("c1", "standard").await.unwrap();
//! store.add_user_message("c1", "Hello!").await.unwrap();
//!
//! let conv = store.get("c1").await.unwrap().unwrap();
//! assert_eq!(conv.messages.len(), 1);
//! # });
//! # fn tokio_test_block_on<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Runtime::new().unwrap().block_on(f)
//! # }
//! ```

mod json_file;
mod memory;

pub use json_file::JsonFileStore;
pub use memory::MemoryStore;

use async_trait::async_trait;

use crate::conversation::{AssistantMessage, Conversation, ConversationMetadata};

/// Errors raised by conversation stores.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The conversation does not exist.
    #[error("Conversation {0} not found")]
    NotFound(String),

    /// A conversation with this id already exists.
    #[error("Conversation {0} already exists")]
    AlreadyExists(String),

    /// Conversation ids must be safe to use as file names.
    #[error("Invalid conversation id: {0}")]
    InvalidId(String),

    /// An I/O error occurred while reading or writing a conversation.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A stored document could not be encoded or decoded.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result alias for store operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Storage for conversations and their messages.
#[async_trait]
pub trait ConversationStore: Send + Sync + std::fmt::Debug {
    /// Create an empty conversation with the given id and mode.
    async fn create(&self, id: &str, mode: &str) -> StorageResult<Conversation>;

    /// Load a conversation.
    async fn get(&self, id: &str) -> StorageResult<Option<Conversation>>;

    /// Summaries of every conversation, newest first.
    async fn list(&self) -> StorageResult<Vec<ConversationMetadata>>;

    /// Append a user message.
    async fn add_user_message(&self, id: &str, content: &str) -> StorageResult<()>;

    /// Append the council's answer.
    async fn add_assistant_message(&self, id: &str, message: AssistantMessage)
    -> StorageResult<()>;

    /// Replace the conversation title.
    async fn update_title(&self, id: &str, title: &str) -> StorageResult<()>;

    /// Delete a conversation. Returns whether it existed.
    async fn delete(&self, id: &str) -> StorageResult<bool>;
}

/// Sort summaries newest first, ties broken by id for a stable order.
pub(crate) fn sort_newest_first(list: &mut [ConversationMetadata]) {
    list.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
}
