//! HTTP handlers.
//!
//! - [`conversations`]: JSON API for conversations and modes
//! - [`stream`]: server-sent council events
//! - [`ui`]: HTML pages and HTMX fragments

pub mod conversations;
pub mod stream;
pub mod ui;

use serde::Deserialize;

use crate::error::{ApiError, ApiResult};

/// Body of the message endpoints.
#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    #[serde(default)]
    pub content: String,
}

impl SendMessageRequest {
    /// The message content, rejected when blank.
    pub fn validated(self) -> ApiResult<String> {
        if self.content.trim().is_empty() {
            return Err(ApiError::BadRequest("Message content is required".to_string()));
        }
        Ok(self.content)
    }
}
