//! HTML pages and HTMX fragments.
//!
//! Fragments that change the conversation list carry an out-of-band sidebar
//! so both panes stay in sync after a single request.

use axum::{
    Form,
    extract::{Path, Query, State},
    http::{HeaderName, StatusCode},
    response::{Html, IntoResponse, Response},
};
use leptos::prelude::*;
use serde::Deserialize;

use super::SendMessageRequest;
use super::conversations::{create_with_mode, load};
use crate::AppState;
use crate::conversation::{Conversation, ConversationMessage};
use crate::council::pipeline::run_message;
use crate::council::ranking::calculate_aggregate_rankings;
use crate::error::{ApiError, ApiResult};
use crate::modes::DEFAULT_MODE;
use crate::ui::chat::ChatPane;
use crate::ui::page::app_page;
use crate::ui::render;
use crate::ui::sidebar::Sidebar;
use crate::ui::stages::{Stage1Panel, Stage2Panel};

const HX_PUSH_URL: HeaderName = HeaderName::from_static("hx-push-url");

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub mode: Option<String>,
}

impl PageQuery {
    fn mode(&self) -> &str {
        self.mode.as_deref().unwrap_or(DEFAULT_MODE)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct SidebarQuery {
    pub current: Option<String>,
    pub mode: Option<String>,
    #[serde(default)]
    pub open: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct TabQuery {
    #[serde(default)]
    pub tab: usize,
}

#[derive(Debug, Deserialize)]
pub struct NewConversationForm {
    pub mode: Option<String>,
}

/// GET /
pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> ApiResult<Html<String>> {
    let conversations = state.store.list().await?;
    Ok(Html(app_page(conversations, None, query.mode())))
}

/// GET /c/{id}
pub async fn conversation_page(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<PageQuery>,
) -> ApiResult<Response> {
    let conversations = state.store.list().await?;
    let page = match state.store.get(&id).await {
        Ok(Some(conv)) => Html(app_page(conversations, Some(conv), query.mode())).into_response(),
        Ok(None) | Err(crate::storage::StorageError::InvalidId(_)) => (
            StatusCode::NOT_FOUND,
            Html(app_page(conversations, None, query.mode())),
        )
            .into_response(),
        Err(e) => return Err(e.into()),
    };
    Ok(page)
}

/// GET /ui/sidebar?current=&mode=&open=
pub async fn sidebar(
    State(state): State<AppState>,
    Query(query): Query<SidebarQuery>,
) -> ApiResult<Html<String>> {
    let conversations = state.store.list().await?;
    let mode = query.mode.unwrap_or_else(|| DEFAULT_MODE.to_string());
    let html = render(move || {
        view! {
            <Sidebar
                conversations=conversations
                current=query.current
                selected_mode=mode
                dropdown_open=query.open
            />
        }
    });
    Ok(Html(html))
}

/// POST /ui/conversations (form `mode`)
pub async fn create_conversation(
    State(state): State<AppState>,
    Form(form): Form<NewConversationForm>,
) -> ApiResult<Response> {
    let conv = create_with_mode(&state, form.mode.as_deref()).await?;
    let url = format!("/c/{}", conv.id);
    let mode = conv.mode.clone();
    let html = chat_with_sidebar(&state, conv, &mode).await?;
    Ok(([(HX_PUSH_URL, url)], html).into_response())
}

/// GET /ui/conversations/{id}
pub async fn conversation(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<PageQuery>,
) -> ApiResult<Html<String>> {
    let conv = load(&state, &id).await?;
    chat_with_sidebar(&state, conv, query.mode()).await
}

/// POST /ui/conversations/{id}/message (form `content`)
///
/// Runs the council to completion and returns the updated chat pane.
pub async fn send_message(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Form(form): Form<SendMessageRequest>,
) -> ApiResult<Html<String>> {
    let conv = load(&state, &id).await?;
    let content = form.validated()?;
    let mode = conv.mode.clone();
    run_message(state.council.clone(), state.store.clone(), conv, content).await?;

    let conv = load(&state, &id).await?;
    chat_with_sidebar(&state, conv, &mode).await
}

/// GET /ui/conversations/{id}/messages/{index}/stage1?tab=
pub async fn stage1_panel(
    State(state): State<AppState>,
    Path((id, index)): Path<(String, usize)>,
    Query(query): Query<TabQuery>,
) -> ApiResult<Html<String>> {
    let conv = load(&state, &id).await?;
    let answer = assistant_message(conv, index)?;
    let html = render(move || {
        view! {
            <Stage1Panel
                conversation_id=id
                message_index=index
                responses=answer.stage1
                active_tab=query.tab
                open=true
            />
        }
    });
    Ok(Html(html))
}

/// GET /ui/conversations/{id}/messages/{index}/stage2?tab=
pub async fn stage2_panel(
    State(state): State<AppState>,
    Path((id, index)): Path<(String, usize)>,
    Query(query): Query<TabQuery>,
) -> ApiResult<Html<String>> {
    let conv = load(&state, &id).await?;
    let answer = assistant_message(conv, index)?;
    let label_to_model = answer.label_to_model();
    let aggregate = calculate_aggregate_rankings(&answer.stage2, &label_to_model);
    let html = render(move || {
        view! {
            <Stage2Panel
                conversation_id=id
                message_index=index
                rankings=answer.stage2
                label_to_model=label_to_model
                aggregate=aggregate
                active_tab=query.tab
                open=true
            />
        }
    });
    Ok(Html(html))
}

fn assistant_message(
    conv: Conversation,
    index: usize,
) -> ApiResult<crate::conversation::AssistantMessage> {
    match conv.messages.into_iter().nth(index) {
        Some(ConversationMessage::Assistant(answer)) => Ok(answer),
        _ => Err(ApiError::NotFound("Message not found".to_string())),
    }
}

/// Chat pane plus an out-of-band sidebar with `conv` selected.
async fn chat_with_sidebar(
    state: &AppState,
    conv: Conversation,
    mode: &str,
) -> ApiResult<Html<String>> {
    let conversations = state.store.list().await?;
    let current = conv.id.clone();
    let mode = mode.to_string();
    let html = render(move || {
        view! {
            <ChatPane conversation=Some(conv) />
            <Sidebar
                conversations=conversations
                current=Some(current)
                selected_mode=mode
                oob=true
            />
        }
    });
    Ok(Html(html))
}
