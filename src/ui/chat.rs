//! Chat pane: the selected conversation and the message form.

use leptos::prelude::*;

use crate::conversation::{AssistantMessage, Conversation, ConversationMessage};
use crate::council::ranking::calculate_aggregate_rankings;
use crate::ui::components::{Badge, BadgeVariant, Button, LoaderIcon, SendIcon};
use crate::ui::markdown::markdown_to_html;
use crate::ui::sidebar::mode_details;
use crate::ui::stages::{ResearchStage, Stage1Panel, Stage2Panel, Stage3Panel};

/// The chat pane. Without a conversation it shows the welcome screen.
#[component]
pub fn ChatPane(conversation: Option<Conversation>) -> impl IntoView {
    let body = match conversation {
        Some(conv) => view! { <ConversationView conversation=conv /> }.into_any(),
        None => view! {
            <div class="empty-state">
                <h2>"Welcome to LLM Council"</h2>
                <p>"Create a new conversation to get started"</p>
            </div>
        }
        .into_any(),
    };

    view! { <section id="chat" class="chat">{body}</section> }
}

#[component]
fn ConversationView(conversation: Conversation) -> impl IntoView {
    let (icon, label) = mode_details(&conversation.mode);
    let mode_badge = format!("{icon} {label}");
    let title = conversation.metadata().display_title().to_string();
    let action = format!("/ui/conversations/{}/message", conversation.id);
    let is_empty = conversation.is_empty();

    let messages = conversation
        .messages
        .into_iter()
        .enumerate()
        .map(|(index, message)| match message {
            ConversationMessage::User { content } => {
                let html = markdown_to_html(&content);
                view! {
                    <div class="message user-message">
                        <div class="message-label">"You"</div>
                        <div class="message-content markdown-content" inner_html=html></div>
                    </div>
                }
                .into_any()
            }
            ConversationMessage::Assistant(answer) => view! {
                <AssistantView conversation_id=conversation.id.clone() index=index answer=answer />
            }
            .into_any(),
        })
        .collect_view();

    let empty_hint = is_empty.then(|| {
        view! {
            <div class="empty-state">
                <h2>"Start a conversation"</h2>
                <p>"Ask a question to consult the LLM Council"</p>
            </div>
        }
    });

    view! {
        <header class="chat-header">
            <h2>{title}</h2>
            <Badge variant=BadgeVariant::Outline>{mode_badge}</Badge>
        </header>

        <div class="messages">
            {empty_hint}
            {messages}
        </div>

        <div id="council-loading" class="loading-indicator">
            <LoaderIcon />
            <span>"Consulting the council..."</span>
        </div>

        <form
            class="input-form"
            hx-post=action
            hx-trigger="submit, keydown[key=='Enter'&&!shiftKey] from:find textarea"
            hx-target="#chat"
            hx-swap="outerHTML"
            hx-indicator="#council-loading"
            hx-disabled-elt="find button"
        >
            <textarea
                name="content"
                class="message-input"
                placeholder="Ask your question... (Shift+Enter for new line, Enter to send)"
                rows="3"
                required
            ></textarea>
            <Button button_type="submit" class="send-button">
                <SendIcon />
                <span>"Send"</span>
            </Button>
        </form>
    }
}

/// One council answer: research (if any) and the three stages.
#[component]
fn AssistantView(conversation_id: String, index: usize, answer: AssistantMessage) -> impl IntoView {
    let label_to_model = answer.label_to_model();
    let aggregate = calculate_aggregate_rankings(&answer.stage2, &label_to_model);

    view! {
        <div class="message assistant-message">
            <div class="message-label">"LLM Council"</div>
            <ResearchStage research=answer.research />
            <Stage1Panel
                conversation_id=conversation_id.clone()
                message_index=index
                responses=answer.stage1
            />
            <Stage2Panel
                conversation_id=conversation_id
                message_index=index
                rankings=answer.stage2
                label_to_model=label_to_model
                aggregate=aggregate
            />
            <Stage3Panel result=answer.stage3 />
        </div>
    }
}
