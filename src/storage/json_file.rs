//! JSON file conversation store.
//!
//! Each conversation lives in `<data_dir>/<id>.json`. Writes go through a
//! temporary file and a rename so a crash never leaves a truncated document,
//! and a single async mutex serializes read-modify-write cycles.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{ConversationStore, StorageError, StorageResult, sort_newest_first};
use crate::conversation::{
    AssistantMessage, Conversation, ConversationMessage, ConversationMetadata,
};

/// Conversation store backed by a directory of JSON files.
#[derive(Debug)]
pub struct JsonFileStore {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    /// Open (and create if needed) a store rooted at `dir`.
    pub async fn open(dir: impl Into<PathBuf>) -> StorageResult<Self> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;
        tracing::info!(dir = %dir.display(), "Conversation store opened");
        Ok(Self {
            dir,
            write_lock: Mutex::new(()),
        })
    }

    /// Directory holding the conversation files.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, id: &str) -> StorageResult<PathBuf> {
        let valid = !id.is_empty()
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(StorageError::InvalidId(id.to_string()));
        }
        Ok(self.dir.join(format!("{id}.json")))
    }

    async fn read(&self, path: &Path) -> StorageResult<Option<Conversation>> {
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn write(&self, conv: &Conversation) -> StorageResult<()> {
        let path = self.path_for(&conv.id)?;
        let tmp = path.with_extension("json.tmp");
        let bytes = serde_json::to_vec_pretty(conv)?;
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    async fn update<F>(&self, id: &str, f: F) -> StorageResult<()>
    where
        F: FnOnce(&mut Conversation) + Send,
    {
        let path = self.path_for(id)?;
        let _guard = self.write_lock.lock().await;
        let mut conv = self
            .read(&path)
            .await?
            .ok_or_else(|| StorageError::NotFound(id.to_string()))?;
        f(&mut conv);
        self.write(&conv).await
    }
}

#[async_trait]
impl ConversationStore for JsonFileStore {
    async fn create(&self, id: &str, mode: &str) -> StorageResult<Conversation> {
        let path = self.path_for(id)?;
        let _guard = self.write_lock.lock().await;
        if tokio::fs::try_exists(&path).await? {
            return Err(StorageError::AlreadyExists(id.to_string()));
        }
        let conv = Conversation::new(id, mode);
        self.write(&conv).await?;
        tracing::debug!(conversation_id = %id, mode = %mode, "Conversation created");
        Ok(conv)
    }

    async fn get(&self, id: &str) -> StorageResult<Option<Conversation>> {
        let path = self.path_for(id)?;
        self.read(&path).await
    }

    async fn list(&self) -> StorageResult<Vec<ConversationMetadata>> {
        let mut list = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match self.read(&path).await {
                Ok(Some(conv)) => list.push(conv.metadata()),
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable conversation");
                }
            }
        }

        sort_newest_first(&mut list);
        Ok(list)
    }

    async fn add_user_message(&self, id: &str, content: &str) -> StorageResult<()> {
        let content = content.to_string();
        self.update(id, move |conv| {
            conv.messages.push(ConversationMessage::User { content });
        })
        .await
    }

    async fn add_assistant_message(
        &self,
        id: &str,
        message: AssistantMessage,
    ) -> StorageResult<()> {
        self.update(id, move |conv| {
            conv.messages.push(ConversationMessage::Assistant(message));
        })
        .await
    }

    async fn update_title(&self, id: &str, title: &str) -> StorageResult<()> {
        let title = title.to_string();
        self.update(id, move |conv| conv.title = title).await
    }

    async fn delete(&self, id: &str) -> StorageResult<bool> {
        let path = self.path_for(id)?;
        let _guard = self.write_lock.lock().await;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}
