use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::TelemetryConfig;

/// Initialize application telemetry (logging and metrics).
///
/// - `tracing-subscriber::fmt` for structured logging, compact or JSON.
/// - `EnvFilter` for dynamic log levels (`RUST_LOG`).
/// - A Prometheus recorder when metrics are enabled; its handle renders the
///   `/metrics` page.
pub fn init(config: &TelemetryConfig) -> Option<PrometheusHandle> {
    let filter_layer = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,llm_council=debug,tower_http=info"));

    let registry = tracing_subscriber::registry().with(filter_layer);
    if config.log_format.eq_ignore_ascii_case("json") {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(false)
                    .with_target(true),
            )
            .init();
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_line_number(true)
                    .compact(),
            )
            .init();
    }

    if !config.metrics_enabled {
        return None;
    }

    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => Some(handle),
        Err(e) => {
            tracing::warn!(error = %e, "Metrics recorder not installed");
            None
        }
    }
}
