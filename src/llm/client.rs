//! Single-shot model queries on top of a streaming driver.
//!
//! The council never shows partial model output, so the client drains the
//! driver stream into one [`ModelReply`]. Failures are logged and reported as
//! `None`: a slow or broken council member must not take the stage down.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::StreamExt;
use uuid::Uuid;

use super::{LlmDriver, LlmEvent, LlmRequest, Message};

/// Default per-request timeout for regular council queries.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Options for a single model query.
#[derive(Debug, Clone, Copy)]
pub struct QueryOptions {
    /// Upper bound for the whole reply, connection included.
    pub timeout: Duration,
    /// Optional sampling temperature.
    pub temperature: Option<f32>,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            temperature: None,
        }
    }
}

/// A complete reply from one model.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelReply {
    /// Assistant text.
    pub content: String,
    /// Provider reasoning details, when the model exposes them.
    pub reasoning_details: Option<serde_json::Value>,
}

/// Client that turns driver streams into complete replies.
#[derive(Clone, Debug)]
pub struct LlmClient {
    driver: Arc<dyn LlmDriver>,
}

impl LlmClient {
    /// Create a client over the given driver.
    #[must_use]
    pub fn new(driver: Arc<dyn LlmDriver>) -> Self {
        Self { driver }
    }

    /// Query a single model, returning `None` on error or timeout.
    pub async fn query_model(
        &self,
        model: &str,
        messages: Vec<Message>,
        options: QueryOptions,
    ) -> Option<ModelReply> {
        let request_id = Uuid::new_v4().to_string();
        let started = Instant::now();

        tracing::debug!(
            request_id = %request_id,
            model = %model,
            message_count = messages.len(),
            timeout_secs = options.timeout.as_secs(),
            "Querying model"
        );

        let req = LlmRequest {
            model: model.to_string(),
            messages,
            temperature: options.temperature,
        };

        let outcome = tokio::time::timeout(options.timeout, self.collect(req)).await;
        let elapsed = started.elapsed().as_secs_f64();

        let result = match outcome {
            Ok(Ok(reply)) => {
                tracing::debug!(
                    request_id = %request_id,
                    model = %model,
                    content_length = reply.content.len(),
                    elapsed_secs = elapsed,
                    "Model query completed"
                );
                Some(reply)
            }
            Ok(Err(e)) => {
                tracing::warn!(
                    request_id = %request_id,
                    model = %model,
                    error = %e,
                    "Model query failed"
                );
                None
            }
            Err(_elapsed) => {
                tracing::warn!(
                    request_id = %request_id,
                    model = %model,
                    timeout_secs = options.timeout.as_secs(),
                    "Model query timed out"
                );
                None
            }
        };

        let outcome_label = if result.is_some() { "ok" } else { "failed" };
        metrics::counter!(
            "council_model_queries_total",
            "model" => model.to_string(),
            "outcome" => outcome_label
        )
        .increment(1);
        metrics::histogram!("council_model_query_seconds", "model" => model.to_string())
            .record(elapsed);

        result
    }

    /// Query several models concurrently with the same messages.
    ///
    /// Results keep the order of `models`.
    pub async fn query_models_parallel(
        &self,
        models: &[String],
        messages: &[Message],
        options: QueryOptions,
    ) -> Vec<(String, Option<ModelReply>)> {
        let tasks = models.iter().map(|model| {
            let messages = messages.to_vec();
            async move {
                let reply = self.query_model(model, messages, options).await;
                (model.clone(), reply)
            }
        });

        futures::future::join_all(tasks).await
    }

    async fn collect(&self, req: LlmRequest) -> anyhow::Result<ModelReply> {
        let mut stream = self.driver.stream(req).await?;
        let mut content = String::new();
        let mut reasoning = Vec::new();

        while let Some(event) = stream.next().await {
            match event? {
                LlmEvent::ContentDelta(text) => content.push_str(&text),
                LlmEvent::ReasoningDetail(detail) => reasoning.push(detail),
                LlmEvent::Done => break,
            }
        }

        Ok(ModelReply {
            content,
            reasoning_details: (!reasoning.is_empty()).then(|| serde_json::Value::Array(reasoning)),
        })
    }
}
