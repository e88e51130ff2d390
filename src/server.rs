//! Router assembly and server startup.

use axum::{
    Router,
    extract::{DefaultBodyLimit, Request, State},
    http::{HeaderValue, Method, StatusCode, header},
    middleware::Next,
    response::IntoResponse,
    routing::{get, post},
};
use std::time::Duration;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::AppState;
use crate::api::{conversations, stream, ui};

/// Effectively no timeout, while keeping one middleware type in the stack.
const TIMEOUT_DISABLED: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Build the application router.
///
/// Blocking council routes get a budget long enough for deep research plus
/// the other stages; everything else uses the plain request timeout. The SSE
/// route only waits for its headers, so the plain timeout applies.
pub fn build_router(state: AppState) -> Router {
    let config = &state.config;
    let (quick, council) = if config.resilience.timeout_disabled {
        (TIMEOUT_DISABLED, TIMEOUT_DISABLED)
    } else {
        let request = Duration::from_secs(config.server.request_timeout_secs);
        let council = Duration::from_secs(
            config.council.deep_research_timeout_secs
                + 3 * config.council.request_timeout_secs
                + config.server.request_timeout_secs,
        );
        (request, council)
    };

    let council_routes = Router::new()
        .route(
            "/api/conversations/{id}/message",
            post(conversations::send_message),
        )
        .route("/ui/conversations/{id}/message", post(ui::send_message))
        .route_layer(axum::middleware::from_fn(move |req: Request, next: Next| {
            with_timeout(council, req, next)
        }));

    let routes = Router::new()
        // JSON API
        .route("/api/health", get(conversations::health))
        .route("/api/modes", get(conversations::modes))
        .route(
            "/api/conversations",
            get(conversations::list_conversations).post(conversations::create_conversation),
        )
        .route(
            "/api/conversations/{id}",
            get(conversations::get_conversation).delete(conversations::delete_conversation),
        )
        .route(
            "/api/conversations/{id}/message/stream",
            post(stream::send_message_stream),
        )
        // Pages and HTMX fragments
        .route("/", get(ui::index))
        .route("/c/{id}", get(ui::conversation_page))
        .route("/ui/sidebar", get(ui::sidebar))
        .route("/ui/conversations", post(ui::create_conversation))
        .route("/ui/conversations/{id}", get(ui::conversation))
        .route(
            "/ui/conversations/{id}/messages/{index}/stage1",
            get(ui::stage1_panel),
        )
        .route(
            "/ui/conversations/{id}/messages/{index}/stage2",
            get(ui::stage2_panel),
        )
        .route("/metrics", get(metrics_handler))
        .route_layer(axum::middleware::from_fn(move |req: Request, next: Next| {
            with_timeout(quick, req, next)
        }));

    Router::new()
        .merge(routes)
        .merge(council_routes)
        .nest_service("/static", ServeDir::new("static"))
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            crate::rate_limit::rate_limit_middleware,
        ))
        .layer(cors_layer(&state.config.server.cors_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn with_timeout(duration: Duration, req: Request, next: Next) -> axum::response::Response {
    match tokio::time::timeout(duration, next.run(req)).await {
        Ok(res) => res,
        Err(_) => {
            metrics::counter!("http_requests_timed_out_total").increment(1);
            (StatusCode::REQUEST_TIMEOUT, "Request timed out").into_response()
        }
    }
}

/// Build the CORS layer for an explicit origin list.
///
/// `*` is skipped: credentialed CORS cannot use a wildcard origin.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter(|o| {
            let wildcard = o.trim() == "*";
            if wildcard {
                tracing::warn!("Ignoring wildcard CORS origin; list origins explicitly");
            }
            !wildcard
        })
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::warn!(origin = %o, error = %e, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .allow_credentials(true)
}

/// GET /metrics - Prometheus text exposition.
async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    match &state.metrics {
        Some(handle) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            handle.render(),
        )
            .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Bind the configured address and serve until shutdown.
pub async fn start_server(state: AppState) -> anyhow::Result<()> {
    let addr = state.config.bind_address();
    let storage = state.config.storage.provider.clone();
    let models = state.council.settings().models.len();

    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!(
        name: "server.started",
        address = %addr,
        storage = %storage,
        council_models = models,
        "Server started"
    );

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!(name: "server.shutdown", "Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::council::Council;
    use crate::llm::{LlmClient, ScriptedDriver};
    use crate::storage::MemoryStore;
    use axum::body::Body;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn router(timeout_disabled: bool) -> Router {
        let mut config = AppConfig::load_from_args(["llm-council", "--ephemeral"]).unwrap();
        config.resilience.timeout_disabled = timeout_disabled;
        let council = Council::new(
            LlmClient::new(Arc::new(ScriptedDriver::offline())),
            config.council.settings(),
        );
        build_router(AppState::new(council, Arc::new(MemoryStore::new()), config, None))
    }

    #[tokio::test]
    async fn test_cors_preflight_allows_configured_origin() {
        let req = axum::http::Request::builder()
            .method(Method::OPTIONS)
            .uri("/api/conversations")
            .header(header::ORIGIN, "http://localhost:5173")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .body(Body::empty())
            .unwrap();
        let res = router(false).oneshot(req).await.unwrap();
        assert_eq!(
            res.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "http://localhost:5173"
        );
    }

    #[tokio::test]
    async fn test_wildcard_origin_is_skipped() {
        let mut config = AppConfig::load_from_args(["llm-council", "--ephemeral"]).unwrap();
        config.server.cors_origins = vec!["*".to_string(), "http://localhost:3000".to_string()];
        let council = Council::new(
            LlmClient::new(Arc::new(ScriptedDriver::offline())),
            config.council.settings(),
        );
        let app = build_router(AppState::new(council, Arc::new(MemoryStore::new()), config, None));

        let req = axum::http::Request::builder()
            .uri("/api/health")
            .header(header::ORIGIN, "http://localhost:3000")
            .body(Body::empty())
            .unwrap();
        let res = app.oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(
            res.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "http://localhost:3000"
        );
    }

    #[tokio::test]
    async fn test_unknown_origin_gets_no_cors_header() {
        let req = axum::http::Request::builder()
            .uri("/api/health")
            .header(header::ORIGIN, "http://evil.example")
            .body(Body::empty())
            .unwrap();
        let res = router(true).oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert!(!res.headers().contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
    }

    #[tokio::test]
    async fn test_timeout_middleware_returns_408() {
        let req = Request::new(Body::empty());
        let app = Router::new()
            .route(
                "/",
                get(|| async {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    "late"
                }),
            )
            .layer(axum::middleware::from_fn(|req: Request, next: Next| {
                with_timeout(Duration::from_millis(10), req, next)
            }));
        let res = app.oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::REQUEST_TIMEOUT);
    }
}
