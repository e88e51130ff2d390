//! The three-stage council.
//!
//! 1. Every council model answers the question independently.
//! 2. Every council model ranks the anonymized stage 1 answers.
//! 3. The chairman synthesizes a final answer from both.
//!
//! Stage functions never fail: a model that errors or times out is logged and
//! left out, and stage 3 substitutes an error message for a missing synthesis.
//!
//! # Modules
//!
//! - [`prompts`]: prompt templates
//! - [`ranking`]: anonymous labels, ranking parsing and aggregation
//! - [`research`]: deep research and research context formatting
//! - [`pipeline`]: mode-aware streaming run that persists its results

pub mod pipeline;
pub mod prompts;
pub mod ranking;
pub mod research;

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Serialize;

use crate::conversation::{AggregateRanking, Stage1Response, Stage2Ranking, Stage3Result};
use crate::llm::{LlmClient, Message, QueryOptions};

use ranking::{calculate_aggregate_rankings, label_map, parse_ranking_from_text};

/// Response used when the chairman fails.
pub const SYNTHESIS_ERROR: &str = "Error: Unable to generate final synthesis.";

/// Response used when no council model answered stage 1.
pub const ALL_MODELS_FAILED: &str = "All models failed to respond. Please try again.";

/// Maximum title length, ellipsis included.
const MAX_TITLE_CHARS: usize = 50;

/// Council membership and timing.
#[derive(Debug, Clone)]
pub struct CouncilSettings {
    /// Models queried in stages 1 and 2.
    pub models: Vec<String>,
    /// Chairman used when the mode does not name one.
    pub chairman_model: String,
    /// Model used to title new conversations.
    pub title_model: String,
    /// Timeout for regular queries.
    pub request_timeout: Duration,
    /// Timeout for deep research models.
    pub deep_research_timeout: Duration,
}

impl Default for CouncilSettings {
    fn default() -> Self {
        Self {
            models: vec![
                "openai/gpt-5.1".to_string(),
                "google/gemini-3-pro-preview".to_string(),
                "anthropic/claude-sonnet-4.5".to_string(),
                "x-ai/grok-4".to_string(),
            ],
            chairman_model: "google/gemini-3-pro-preview".to_string(),
            title_model: "google/gemini-2.5-flash".to_string(),
            request_timeout: crate::llm::client::DEFAULT_TIMEOUT,
            deep_research_timeout: research::DEEP_RESEARCH_TIMEOUT,
        }
    }
}

/// Stage 2 metadata sent alongside the rankings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankingMetadata {
    pub label_to_model: BTreeMap<String, String>,
    pub aggregate_rankings: Vec<AggregateRanking>,
}

/// Result of a complete, non-streaming council run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CouncilOutcome {
    pub stage1: Vec<Stage1Response>,
    pub stage2: Vec<Stage2Ranking>,
    pub stage3: Stage3Result,
    pub metadata: Option<RankingMetadata>,
}

/// Runs council stages against an [`LlmClient`].
#[derive(Debug, Clone)]
pub struct Council {
    client: LlmClient,
    settings: CouncilSettings,
}

impl Council {
    /// Create a council.
    #[must_use]
    pub fn new(client: LlmClient, settings: CouncilSettings) -> Self {
        Self { client, settings }
    }

    /// Council settings.
    #[must_use]
    pub fn settings(&self) -> &CouncilSettings {
        &self.settings
    }

    /// Underlying model client.
    #[must_use]
    pub fn client(&self) -> &LlmClient {
        &self.client
    }

    /// Timeout for a chairman: deep research chairmen get the long one.
    #[must_use]
    pub fn chairman_timeout(&self, chairman: &str) -> Duration {
        if research::is_deep_research_model(chairman) {
            self.settings.deep_research_timeout
        } else {
            self.settings.request_timeout
        }
    }

    fn options(&self, temperature: Option<f32>) -> QueryOptions {
        QueryOptions {
            timeout: self.settings.request_timeout,
            temperature,
        }
    }

    /// Stage 1: collect individual answers from every council model.
    pub async fn stage1_collect_responses(
        &self,
        query: &str,
        temperature: Option<f32>,
        research_context: Option<&str>,
    ) -> Vec<Stage1Response> {
        let messages = [Message::user(prompts::stage1_prompt(query, research_context))];
        let replies = self
            .client
            .query_models_parallel(&self.settings.models, &messages, self.options(temperature))
            .await;

        let results: Vec<Stage1Response> = replies
            .into_iter()
            .filter_map(|(model, reply)| {
                reply.map(|r| Stage1Response {
                    model,
                    response: r.content,
                })
            })
            .collect();

        tracing::info!(
            requested = self.settings.models.len(),
            answered = results.len(),
            "Stage 1 complete"
        );
        results
    }

    /// Stage 2: every council model ranks the anonymized stage 1 answers.
    ///
    /// Returns the rankings and the label to model map used to anonymize.
    pub async fn stage2_collect_rankings(
        &self,
        query: &str,
        stage1: &[Stage1Response],
        temperature: Option<f32>,
    ) -> (Vec<Stage2Ranking>, BTreeMap<String, String>) {
        let label_to_model = label_map(stage1);
        let messages = [Message::user(prompts::ranking_prompt(query, stage1))];
        let replies = self
            .client
            .query_models_parallel(&self.settings.models, &messages, self.options(temperature))
            .await;

        let rankings: Vec<Stage2Ranking> = replies
            .into_iter()
            .filter_map(|(model, reply)| {
                reply.map(|r| Stage2Ranking {
                    model,
                    parsed_ranking: parse_ranking_from_text(&r.content),
                    ranking: r.content,
                })
            })
            .collect();

        tracing::info!(rankings = rankings.len(), "Stage 2 complete");
        (rankings, label_to_model)
    }

    /// Stage 3: the chairman synthesizes the final answer.
    ///
    /// `chairman` overrides the configured chairman model.
    pub async fn stage3_synthesize_final(
        &self,
        query: &str,
        stage1: &[Stage1Response],
        stage2: &[Stage2Ranking],
        chairman: Option<&str>,
        timeout: Duration,
    ) -> Stage3Result {
        let chairman = chairman.unwrap_or(&self.settings.chairman_model);
        let messages = vec![Message::user(prompts::chairman_prompt(query, stage1, stage2))];
        let options = QueryOptions {
            timeout,
            temperature: None,
        };

        match self.client.query_model(chairman, messages, options).await {
            Some(reply) => Stage3Result {
                model: chairman.to_string(),
                response: reply.content,
            },
            None => {
                tracing::error!(chairman = %chairman, "Chairman failed to synthesize");
                Stage3Result {
                    model: chairman.to_string(),
                    response: SYNTHESIS_ERROR.to_string(),
                }
            }
        }
    }

    /// Generate a short title for a conversation from its first message.
    pub async fn generate_conversation_title(&self, query: &str) -> String {
        let options = QueryOptions {
            timeout: Duration::from_secs(30),
            temperature: None,
        };
        let reply = self
            .client
            .query_model(
                &self.settings.title_model,
                vec![Message::user(prompts::title_prompt(query))],
                options,
            )
            .await;

        reply.map_or_else(
            || crate::conversation::PLACEHOLDER_TITLE.to_string(),
            |r| clean_title(&r.content),
        )
    }

    /// Run all three stages with the default chairman.
    pub async fn run_full_council(&self, query: &str) -> CouncilOutcome {
        let stage1 = self.stage1_collect_responses(query, None, None).await;

        if stage1.is_empty() {
            tracing::warn!("No council model answered; skipping stages 2 and 3");
            return CouncilOutcome {
                stage1,
                stage2: Vec::new(),
                stage3: Stage3Result {
                    model: "error".to_string(),
                    response: ALL_MODELS_FAILED.to_string(),
                },
                metadata: None,
            };
        }

        let (stage2, label_to_model) = self.stage2_collect_rankings(query, &stage1, None).await;
        let aggregate_rankings = calculate_aggregate_rankings(&stage2, &label_to_model);
        let stage3 = self
            .stage3_synthesize_final(query, &stage1, &stage2, None, self.settings.request_timeout)
            .await;

        CouncilOutcome {
            stage1,
            stage2,
            stage3,
            metadata: Some(RankingMetadata {
                label_to_model,
                aggregate_rankings,
            }),
        }
    }
}

/// Strip quotes and whitespace, cap length, fall back to the placeholder.
fn clean_title(raw: &str) -> String {
    let title = raw.trim().trim_matches(|c| c == '"' || c == '\'').trim();
    if title.is_empty() {
        return crate::conversation::PLACEHOLDER_TITLE.to_string();
    }
    if title.chars().count() > MAX_TITLE_CHARS {
        let cut: String = title.chars().take(MAX_TITLE_CHARS - 3).collect();
        return format!("{cut}...");
    }
    title.to_string()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::llm::ScriptedDriver;

    fn settings() -> CouncilSettings {
        CouncilSettings {
            models: vec!["x/a".to_string(), "x/b".to_string(), "x/c".to_string()],
            chairman_model: "x/chair".to_string(),
            title_model: "x/title".to_string(),
            ..CouncilSettings::default()
        }
    }

    fn council_with(driver: ScriptedDriver) -> Council {
        Council::new(LlmClient::new(Arc::new(driver)), settings())
    }

    /// Every model answers; rankers prefer the reverse of stage 1 order.
    fn cooperative() -> ScriptedDriver {
        ScriptedDriver::new(|req| {
            let prompt = &req.messages[0].content;
            if prompt.starts_with("You are the Chairman") {
                Some("synthesis".to_string())
            } else if prompt.starts_with("You are evaluating") {
                Some("FINAL RANKING:\n1. Response C\n2. Response B\n3. Response A".to_string())
            } else if prompt.starts_with("Generate a very short title") {
                Some("\"Why Is The Sky Blue\"".to_string())
            } else {
                Some(format!("answer from {}", req.model))
            }
        })
        .recording()
    }

    #[tokio::test]
    async fn test_stage1_skips_failed_models() {
        let council = council_with(ScriptedDriver::new(|req| {
            (req.model != "x/b").then(|| format!("hi from {}", req.model))
        }));
        let stage1 = council.stage1_collect_responses("q", None, None).await;
        let models: Vec<_> = stage1.iter().map(|r| r.model.as_str()).collect();
        assert_eq!(models, ["x/a", "x/c"]);
    }

    #[tokio::test]
    async fn test_stage1_passes_temperature_and_context() {
        let driver = cooperative();
        let council = council_with(driver.clone());
        council
            .stage1_collect_responses("q", Some(1.0), Some("CTX"))
            .await;
        let seen = driver.requests();
        assert_eq!(seen.len(), 3);
        assert!(seen.iter().all(|r| r.temperature == Some(1.0)));
        assert!(seen.iter().all(|r| r.messages[0].content.starts_with("CTX")));
    }

    #[tokio::test]
    async fn test_full_council() {
        let outcome = council_with(cooperative()).run_full_council("why?").await;
        assert_eq!(outcome.stage1.len(), 3);
        assert_eq!(outcome.stage2.len(), 3);
        assert_eq!(
            outcome.stage2[0].parsed_ranking,
            ["Response C", "Response B", "Response A"]
        );
        assert_eq!(outcome.stage3.model, "x/chair");
        assert_eq!(outcome.stage3.response, "synthesis");

        let meta = outcome.metadata.unwrap();
        assert_eq!(meta.label_to_model["Response A"], "x/a");
        assert_eq!(meta.aggregate_rankings[0].model, "x/c");
        assert!((meta.aggregate_rankings[0].average_rank - 1.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_full_council_all_failed() {
        let outcome = council_with(ScriptedDriver::new(|_| None))
            .run_full_council("why?")
            .await;
        assert!(outcome.stage1.is_empty());
        assert!(outcome.stage2.is_empty());
        assert_eq!(outcome.stage3.model, "error");
        assert_eq!(outcome.stage3.response, ALL_MODELS_FAILED);
        assert!(outcome.metadata.is_none());
    }

    #[tokio::test]
    async fn test_chairman_failure_message() {
        let council = council_with(ScriptedDriver::new(|req| {
            (req.model != "x/chair").then(|| "ok".to_string())
        }));
        let result = council
            .stage3_synthesize_final("q", &[], &[], None, Duration::from_secs(5))
            .await;
        assert_eq!(result.model, "x/chair");
        assert_eq!(result.response, SYNTHESIS_ERROR);
    }

    #[tokio::test]
    async fn test_chairman_override() {
        let driver = cooperative();
        let council = council_with(driver.clone());
        let result = council
            .stage3_synthesize_final("q", &[], &[], Some("openai/o3-deep-research"), Duration::from_secs(5))
            .await;
        assert_eq!(result.model, "openai/o3-deep-research");
        assert_eq!(driver.requests()[0].model, "openai/o3-deep-research");
    }

    #[tokio::test]
    async fn test_title_generation() {
        let title = council_with(cooperative())
            .generate_conversation_title("why is the sky blue")
            .await;
        assert_eq!(title, "Why Is The Sky Blue");
    }

    #[tokio::test]
    async fn test_title_fallback() {
        let title = council_with(ScriptedDriver::new(|_| None))
            .generate_conversation_title("q")
            .await;
        assert_eq!(title, "New Conversation");
    }

    #[test]
    fn test_clean_title_truncates() {
        let long = "a".repeat(80);
        let title = clean_title(&long);
        assert_eq!(title.chars().count(), 50);
        assert!(title.ends_with("..."));
        assert_eq!(clean_title("  'Short'  "), "Short");
        assert_eq!(clean_title("\"\""), "New Conversation");
    }

    #[test]
    fn test_chairman_timeout() {
        let council = council_with(cooperative());
        assert_eq!(
            council.chairman_timeout("openai/o3-deep-research"),
            research::DEEP_RESEARCH_TIMEOUT
        );
        assert_eq!(
            council.chairman_timeout("x/chair"),
            crate::llm::client::DEFAULT_TIMEOUT
        );
    }
}
