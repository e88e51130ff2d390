//! Full HTML pages.

use leptos::prelude::*;

use crate::conversation::{Conversation, ConversationMetadata};
use crate::ui::chat::ChatPane;
use crate::ui::render;
use crate::ui::sidebar::Sidebar;

/// HTMX build loaded by every page.
const HTMX_SRC: &str = "https://unpkg.com/htmx.org@2.0.8/dist/htmx.min.js";

/// Wrap rendered body markup in the document shell.
#[must_use]
pub fn html_shell(title: &str, content: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <meta name="description" content="Multi-model LLM council">
    <title>{title} - LLM Council</title>
    <script src="{HTMX_SRC}"></script>
    <link rel="stylesheet" href="/static/app.css">
</head>
<body>
    <div id="app-shell" class="app">
        {content}
    </div>
</body>
</html>"#
    )
}

/// Render the application page: sidebar plus the chat pane.
#[must_use]
pub fn app_page(
    conversations: Vec<ConversationMetadata>,
    conversation: Option<Conversation>,
    selected_mode: &str,
) -> String {
    let title = conversation.as_ref().map_or_else(
        || "Home".to_string(),
        |c| c.metadata().display_title().to_string(),
    );
    let current = conversation.as_ref().map(|c| c.id.clone());
    let selected_mode = selected_mode.to_string();

    let body = render(move || {
        view! {
            <Sidebar
                conversations=conversations
                current=current
                selected_mode=selected_mode
            />
            <ChatPane conversation=conversation />
        }
    });
    html_shell(&escape_text(&title), &body)
}

/// Minimal HTML text escaping for values placed in the shell template.
fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
