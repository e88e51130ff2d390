//! JSON API: conversations, modes and the blocking message endpoint.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};

use super::SendMessageRequest;
use crate::AppState;
use crate::conversation::{Conversation, ConversationMetadata};
use crate::council::CouncilOutcome;
use crate::council::pipeline::run_message;
use crate::error::{ApiError, ApiResult};
use crate::modes::{CouncilMode, DEFAULT_MODE, find_mode, list_modes};

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: &'static str,
    service: &'static str,
}

/// Body of `POST /api/conversations`.
#[derive(Debug, Default, Deserialize)]
pub struct CreateConversationRequest {
    #[serde(default)]
    pub mode: Option<String>,
}

/// GET /api/health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        service: "LLM Council API",
    })
}

/// GET /api/modes
pub async fn modes() -> Json<&'static [CouncilMode]> {
    Json(list_modes())
}

/// GET /api/conversations
pub async fn list_conversations(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<ConversationMetadata>>> {
    Ok(Json(state.store.list().await?))
}

/// POST /api/conversations
///
/// Unknown or missing modes fall back to the default mode.
pub async fn create_conversation(
    State(state): State<AppState>,
    body: Option<Json<CreateConversationRequest>>,
) -> ApiResult<Json<Conversation>> {
    let request = body.map(|Json(b)| b).unwrap_or_default();
    let conv = create_with_mode(&state, request.mode.as_deref()).await?;
    Ok(Json(conv))
}

/// Create a conversation with a fresh id in the requested (or default) mode.
pub(crate) async fn create_with_mode(
    state: &AppState,
    mode: Option<&str>,
) -> ApiResult<Conversation> {
    let mode = mode.and_then(find_mode).map_or(DEFAULT_MODE, |m| m.id);
    let id = uuid::Uuid::new_v4().to_string();
    let conv = state.store.create(&id, mode).await?;

    metrics::counter!("council_conversations_created_total", "mode" => mode).increment(1);
    tracing::info!(name: "conversation.created", conversation_id = %id, mode = %mode, "Conversation created");
    Ok(conv)
}

/// GET /api/conversations/{id}
pub async fn get_conversation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Conversation>> {
    Ok(Json(load(&state, &id).await?))
}

/// DELETE /api/conversations/{id}
pub async fn delete_conversation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    if state.store.delete(&id).await? {
        tracing::info!(conversation_id = %id, "Conversation deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::conversation_not_found())
    }
}

/// POST /api/conversations/{id}/message
///
/// Runs the whole council before answering.
pub async fn send_message(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<SendMessageRequest>,
) -> ApiResult<Json<CouncilOutcome>> {
    let conv = load(&state, &id).await?;
    let content = req.validated()?;
    let outcome = run_message(state.council.clone(), state.store.clone(), conv, content).await?;
    Ok(Json(outcome))
}

/// Load a conversation or fail with 404.
pub(crate) async fn load(state: &AppState, id: &str) -> ApiResult<Conversation> {
    state
        .store
        .get(id)
        .await?
        .ok_or_else(ApiError::conversation_not_found)
}
