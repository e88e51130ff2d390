//! Conversation records and council stage results.
//!
//! These are plain snapshots: the pipeline produces them once, the store
//! persists them, and the UI renders them without mutation.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::modes::DEFAULT_MODE;

/// Title shown for conversations that have not been titled yet.
pub const PLACEHOLDER_TITLE: &str = "New Conversation";

/// A full conversation with all messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub title: String,
    #[serde(default = "default_mode_id")]
    pub mode: String,
    #[serde(default)]
    pub messages: Vec<ConversationMessage>,
}

impl Conversation {
    /// Create an empty conversation.
    #[must_use]
    pub fn new(id: impl Into<String>, mode: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            created_at: Utc::now(),
            title: PLACEHOLDER_TITLE.to_string(),
            mode: mode.into(),
            messages: Vec::new(),
        }
    }

    /// Summary used by conversation lists.
    #[must_use]
    pub fn metadata(&self) -> ConversationMetadata {
        ConversationMetadata {
            id: self.id.clone(),
            created_at: self.created_at,
            title: self.title.clone(),
            message_count: self.messages.len(),
            mode: self.mode.clone(),
        }
    }

    /// Whether no message has been exchanged yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Conversation summary for list views.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationMetadata {
    pub id: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub title: String,
    pub message_count: usize,
    #[serde(default = "default_mode_id")]
    pub mode: String,
}

impl ConversationMetadata {
    /// Title to display, with the placeholder for blank titles.
    #[must_use]
    pub fn display_title(&self) -> &str {
        let trimmed = self.title.trim();
        if trimmed.is_empty() {
            PLACEHOLDER_TITLE
        } else {
            trimmed
        }
    }
}

fn default_mode_id() -> String {
    DEFAULT_MODE.to_string()
}

/// One entry in a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum ConversationMessage {
    /// The user's question.
    User { content: String },
    /// The council's answer, one field per stage.
    Assistant(AssistantMessage),
}

/// All stage outputs of a council run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssistantMessage {
    pub stage1: Vec<Stage1Response>,
    pub stage2: Vec<Stage2Ranking>,
    pub stage3: Stage3Result,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub research: Option<ResearchResult>,
}

impl AssistantMessage {
    /// Anonymization map rebuilt from stage 1 order.
    #[must_use]
    pub fn label_to_model(&self) -> BTreeMap<String, String> {
        crate::council::ranking::label_map(&self.stage1)
    }
}

/// A single council member's answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stage1Response {
    pub model: String,
    pub response: String,
}

/// A council member's evaluation of the anonymized answers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stage2Ranking {
    pub model: String,
    pub ranking: String,
    #[serde(default)]
    pub parsed_ranking: Vec<String>,
}

/// The chairman's synthesis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stage3Result {
    pub model: String,
    pub response: String,
}

/// Output of a deep research model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchResult {
    pub model: String,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning_details: Option<serde_json::Value>,
}

/// Average peer position of one model across all stage 2 rankings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateRanking {
    pub model: String,
    pub average_rank: f64,
    pub rankings_count: usize,
}

/// Short display name of a model id: its second `/`-separated segment.
///
/// Ids without a `/` (or with nothing after it) are returned unchanged.
///
/// ```rust
/// use llm_council::conversation::short_model_name;
///
/// assert_eq!(short_model_name("openai/gpt-5.1"), "gpt-5.1");
/// assert_eq!(short_model_name("local-model"), "local-model");
/// ```
#[must_use]
pub fn short_model_name(model: &str) -> &str {
    match model.split('/').nth(1) {
        Some(name) if !name.is_empty() => name,
        _ => model,
    }
}
