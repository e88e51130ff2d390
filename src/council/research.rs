//! Deep research ahead of council deliberation.
//!
//! Deep research models browse and reason for minutes, so they get their own
//! timeout. Their findings are injected into the stage 1 prompt as a fenced
//! context block.

use std::time::Duration;

use crate::conversation::ResearchResult;
use crate::llm::{LlmClient, Message, QueryOptions};

use super::prompts::research_prompt;

/// Timeout for deep research models (5 minutes).
pub const DEEP_RESEARCH_TIMEOUT: Duration = Duration::from_secs(300);

/// Whether a model id names a deep research model.
#[must_use]
pub fn is_deep_research_model(model: &str) -> bool {
    model.contains("deep-research")
}

/// Run deep research on `query` with `model`.
///
/// Returns `None` when the model fails or times out.
pub async fn run_deep_research(
    client: &LlmClient,
    query: &str,
    model: &str,
    timeout: Duration,
) -> Option<ResearchResult> {
    tracing::info!(model = %model, "Starting deep research");

    let options = QueryOptions {
        timeout,
        temperature: None,
    };
    let reply = client
        .query_model(model, vec![Message::user(research_prompt(query))], options)
        .await?;

    tracing::info!(
        model = %model,
        content_length = reply.content.len(),
        "Deep research complete"
    );

    Some(ResearchResult {
        model: model.to_string(),
        content: reply.content,
        reasoning_details: reply.reasoning_details,
    })
}

/// Format research findings as context for council prompts.
///
/// Absent or empty research yields an empty string.
#[must_use]
pub fn format_research_context(research: Option<&ResearchResult>) -> String {
    let Some(result) = research.filter(|r| !r.content.is_empty()) else {
        return String::new();
    };

    format!(
        "=== DEEP RESEARCH CONTEXT ===
The following research was conducted before this council deliberation:

{}

=== END RESEARCH CONTEXT ===

Please consider this research context when formulating your response.",
        result.content
    )
}
