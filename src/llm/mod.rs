//! LLM driver traits and implementations.
//!
//! This module provides the model-agnostic plumbing the council is built on.
//! Every council member, the chairman, the title model and the deep research
//! model are reached through the same OpenAI-compatible Chat Completions
//! endpoint (`OpenRouter` by default), selected per request by model id.
//!
//! # Overview
//!
//! The [`LlmDriver`] trait defines the core streaming interface. The
//! [`LlmClient`] builds on top of a driver to provide single-shot queries with
//! timeouts and parallel fan-out across several models.
//!
//! # Drivers
//!
//! - [`ChatCompletionsDriver`]: `OpenAI` Chat Completions API (`/v1/chat/completions`)
//! - [`ScriptedDriver`]: deterministic in-process replies for tests and offline runs
//!
//! # Example
//!
//! ```rust,ignore
//! use llm_council::llm::{ChatCompletionsDriver, LlmClient, LlmSettings, Message, QueryOptions};
//!
//! let client = LlmClient::new(Arc::new(ChatCompletionsDriver::new(settings)));
//! let reply = client
//!     .query_model("openai/gpt-5.1", vec![Message::user("Hello")], QueryOptions::default())
//!     .await;
//! ```

pub mod chat_completions;
pub mod client;
pub mod provider;
pub mod scripted;

pub use chat_completions::ChatCompletionsDriver;
pub use client::{LlmClient, ModelReply, QueryOptions};
pub use provider::Provider;
pub use scripted::ScriptedDriver;

use futures::Stream;

/// Default base URL when `LLM_BASE_URL` is not set.
pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api";

/// LLM connection settings.
#[derive(Debug, Clone)]
pub struct LlmSettings {
    /// Base URL for the LLM API (e.g., `https://openrouter.ai/api`).
    pub base_url: String,
    /// Optional API key for authentication.
    pub api_key: Option<String>,
    /// Provider type (auto-detected from `base_url`).
    pub provider: Provider,
}

/// A message sent to a model.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Message {
    /// Role of the message author.
    pub role: MessageRole,
    /// Text content of the message.
    pub content: String,
}

impl Message {
    /// Create a user message.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }
}

/// Role of a message author.
///
/// Every council prompt is a single user turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// User message.
    User,
}

/// Request to an LLM driver.
#[derive(Debug, Clone)]
pub struct LlmRequest {
    /// Model identifier (e.g., `anthropic/claude-sonnet-4.5`).
    pub model: String,
    /// Conversation messages.
    pub messages: Vec<Message>,
    /// Optional sampling temperature.
    pub temperature: Option<f32>,
}

/// Streaming events emitted by a driver.
#[derive(Debug, Clone, PartialEq)]
pub enum LlmEvent {
    /// Incremental text from the assistant.
    ContentDelta(String),
    /// Provider reasoning detail entry (opaque, passed through as-is).
    ReasoningDetail(serde_json::Value),
    /// The model finished its reply.
    Done,
}

/// Boxed stream of driver events.
pub type LlmEventStream = std::pin::Pin<Box<dyn Stream<Item = anyhow::Result<LlmEvent>> + Send>>;

/// Trait for LLM streaming drivers.
///
/// Implementations provide streaming access to a model reply, emitting
/// [`LlmEvent`]s as the model generates output.
#[async_trait::async_trait]
pub trait LlmDriver: Send + Sync + std::fmt::Debug {
    /// Stream a response from the LLM.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the connection is interrupted.
    async fn stream(&self, req: LlmRequest) -> anyhow::Result<LlmEventStream>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_wire_format() {
        let json = serde_json::to_value(Message::user("hi")).unwrap();
        assert_eq!(json, serde_json::json!({"role": "user", "content": "hi"}));
    }
}
