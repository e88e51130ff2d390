//! Streaming council endpoint.

use std::convert::Infallible;

use axum::{
    Json,
    body::Body,
    extract::{Path, State},
    response::Response,
};
use futures::StreamExt;

use super::SendMessageRequest;
use super::conversations::load;
use crate::AppState;
use crate::council::pipeline::stream_council;
use crate::error::ApiResult;
use crate::events::sse_event;

/// POST /api/conversations/{id}/message/stream
///
/// Validation errors are plain HTTP errors; once the stream has started,
/// failures arrive as an `error` event.
pub async fn send_message_stream(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<SendMessageRequest>,
) -> ApiResult<Response> {
    let conv = load(&state, &id).await?;
    let content = req.validated()?;

    tracing::info!(
        conversation_id = %id,
        mode = %conv.mode,
        "Starting council stream"
    );

    let events = stream_council(state.council.clone(), state.store.clone(), conv, content)
        .map(move |event| {
            tracing::debug!(conversation_id = %id, event = event.name(), "Council event");
            Ok::<String, Infallible>(sse_event(&event))
        });

    Ok(build_sse_response(Body::from_stream(events)))
}

/// Wrap a body in SSE response headers.
pub fn build_sse_response(body: Body) -> Response {
    Response::builder()
        .header("Content-Type", "text/event-stream")
        .header("Cache-Control", "no-cache")
        .header("Connection", "keep-alive")
        .header("X-Accel-Buffering", "no")
        .body(body)
        .unwrap_or_else(|_| Response::new(Body::empty()))
}
