//! LLM Council
//!
//! A question goes to several LLMs at once; each model then ranks its peers'
//! anonymized answers, and a chairman model writes the final answer.
//! Conversations carry a mode (standard, research-first, creative) that
//! shapes the flow.
//!
//! # Architecture
//!
//! - **Server**: Axum HTTP server with a JSON API and SSE streaming
//! - **Council**: three-stage deliberation over an OpenAI-compatible driver
//! - **Storage**: conversations as JSON files (or in memory)
//! - **UI**: Leptos SSR + HTMX fragments
//!
//! # Modules
//!
//! - [`llm`]: LLM driver trait, Chat Completions driver and query client
//! - [`council`]: stages, ranking, deep research and the streaming pipeline
//! - [`modes`]: council mode definitions
//! - [`storage`]: conversation persistence
//! - [`events`]: streamed council events
//! - [`api`]: HTTP handlers
//! - [`ui`]: server-rendered components

// Allow pedantic clippy warnings that don't add value for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::missing_fields_in_debug)]
#![allow(clippy::implicit_hasher)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::cargo_common_metadata)]
#![allow(clippy::multiple_crate_versions)]
#![allow(clippy::default_trait_access)]
#![allow(clippy::unused_async)]
#![allow(clippy::needless_pass_by_value)]
#![recursion_limit = "256"]

pub mod api;
pub mod config;
pub mod conversation;
pub mod council;
pub mod error;
pub mod events;
pub mod llm;
pub mod modes;
pub mod rate_limit;
pub mod server;
pub mod storage;
pub mod telemetry;
pub mod ui;

use crate::config::AppConfig;
use crate::council::Council;
use crate::rate_limit::SimpleRateLimiter;
use crate::storage::ConversationStore;

use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Council runner (models, chairman, LLM client).
    pub council: Arc<Council>,
    /// Conversation storage.
    pub store: Arc<dyn ConversationStore>,
    /// Global Rate Limiter
    pub rate_limiter: Arc<SimpleRateLimiter>,
    /// Global Configuration
    pub config: Arc<AppConfig>,
    /// Prometheus handle, present when metrics are enabled.
    pub metrics: Option<PrometheusHandle>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("council", &self.council)
            .field("store", &self.store)
            .field("metrics", &self.metrics.is_some())
            .finish_non_exhaustive()
    }
}

impl AppState {
    /// Assemble state from its parts; the rate limiter follows `config`.
    #[must_use]
    pub fn new(
        council: Council,
        store: Arc<dyn ConversationStore>,
        config: AppConfig,
        metrics: Option<PrometheusHandle>,
    ) -> Self {
        let rate_limiter = Arc::new(SimpleRateLimiter::new(
            config.resilience.requests_per_second,
            config.resilience.burst_size,
        ));
        Self {
            council: Arc::new(council),
            store,
            rate_limiter,
            config: Arc::new(config),
            metrics,
        }
    }
}
