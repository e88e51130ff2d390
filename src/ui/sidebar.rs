//! Conversation sidebar with the mode selector.
//!
//! The dropdown state and the selected mode travel in the fragment URL
//! (`/ui/sidebar?current=&mode=&open=`); every click asks the server for a
//! freshly rendered sidebar.

use leptos::prelude::*;

use crate::conversation::ConversationMetadata;
use crate::modes::{DEFAULT_MODE, find_mode, get_mode, list_modes};
use crate::ui::components::{Button, SparklesIcon};

/// Icon and label shown for a mode id, falling back to the default mode.
#[must_use]
pub fn mode_details(mode_id: &str) -> (&'static str, &'static str) {
    let mode = find_mode(mode_id).unwrap_or_else(|| get_mode(DEFAULT_MODE));
    (mode.icon, mode.name)
}

/// URL of the sidebar fragment for the given UI state.
#[must_use]
pub fn sidebar_url(current: Option<&str>, mode: &str, open: bool) -> String {
    let mode = find_mode(mode).map_or(DEFAULT_MODE, |m| m.id);
    match current {
        Some(id) => format!("/ui/sidebar?current={id}&mode={mode}&open={open}"),
        None => format!("/ui/sidebar?mode={mode}&open={open}"),
    }
}

/// Sidebar listing conversations, newest first.
#[component]
pub fn Sidebar(
    conversations: Vec<ConversationMetadata>,
    /// Id of the conversation shown in the chat pane.
    #[prop(default = None, into)]
    current: Option<String>,
    /// Mode used for new conversations.
    #[prop(into)]
    selected_mode: String,
    /// Whether the mode dropdown is expanded.
    #[prop(default = false)]
    dropdown_open: bool,
    /// Render as an out-of-band swap next to another fragment.
    #[prop(default = false)]
    oob: bool,
) -> impl IntoView {
    let (icon, label) = mode_details(&selected_mode);
    let mode_id = find_mode(&selected_mode).map_or(DEFAULT_MODE, |m| m.id);
    let toggle_url = sidebar_url(current.as_deref(), mode_id, !dropdown_open);

    let dropdown = dropdown_open.then(|| {
        let options = list_modes()
            .iter()
            .map(|mode| {
                let selected = mode.id == mode_id;
                let class = if selected { "mode-option selected" } else { "mode-option" };
                view! {
                    <div
                        class=class
                        hx-get=sidebar_url(current.as_deref(), mode.id, false)
                        hx-target="#sidebar"
                        hx-swap="outerHTML"
                    >
                        <span class="mode-option-icon">{mode.icon}</span>
                        <div class="mode-option-content">
                            <div class="mode-option-name">{mode.name}</div>
                            <div class="mode-option-desc">{mode.description}</div>
                        </div>
                        {selected.then(|| view! { <span class="mode-check">"✓"</span> })}
                    </div>
                }
            })
            .collect_view();
        view! { <div class="mode-dropdown">{options}</div> }
    });

    let list = if conversations.is_empty() {
        view! { <div class="no-conversations">"No conversations yet"</div> }.into_any()
    } else {
        conversations
            .into_iter()
            .map(|conv| {
                let active = current.as_deref() == Some(conv.id.as_str());
                let class = if active { "conversation-item active" } else { "conversation-item" };
                let (conv_icon, _) = mode_details(&conv.mode);
                let title = conv.display_title().to_string();
                let meta = format!("{} messages", conv.message_count);
                view! {
                    <a
                        class=class
                        href=format!("/c/{}", conv.id)
                        hx-get=format!("/ui/conversations/{}?mode={mode_id}", conv.id)
                        hx-target="#chat"
                        hx-swap="outerHTML"
                        hx-push-url=format!("/c/{}", conv.id)
                    >
                        <div class="conversation-title">
                            <span class="conv-mode-icon">{conv_icon}</span>
                            <span>{title}</span>
                        </div>
                        <div class="conversation-meta">{meta}</div>
                    </a>
                }
            })
            .collect_view()
            .into_any()
    };

    view! {
        <aside id="sidebar" class="sidebar" hx-swap-oob=oob.then_some("true")>
            <div class="sidebar-header">
                <h1>
                    <SparklesIcon class="logo" />
                    <span>"LLM Council"</span>
                </h1>

                <div class="mode-selector">
                    <button
                        type="button"
                        class="mode-selector-btn"
                        hx-get=toggle_url
                        hx-target="#sidebar"
                        hx-swap="outerHTML"
                    >
                        <span class="mode-icon">{icon}</span>
                        <span class="mode-label">{label}</span>
                        <span class="mode-arrow">{if dropdown_open { "▲" } else { "▼" }}</span>
                    </button>
                    {dropdown}
                </div>

                <form hx-post="/ui/conversations" hx-target="#chat" hx-swap="outerHTML">
                    <input type="hidden" name="mode" value=mode_id />
                    <Button button_type="submit" class="new-conversation-btn">
                        "+ New Conversation"
                    </Button>
                </form>
            </div>

            <nav class="conversation-list">{list}</nav>
        </aside>
    }
}
