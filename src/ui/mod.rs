//! Server-rendered UI.
//!
//! Leptos components rendered to HTML strings on the server; HTMX swaps the
//! fragments in the browser. UI state such as the open dropdown or the
//! active tab lives in fragment URLs, so the server keeps none.
//!
//! # Structure
//!
//! - [`page`]: document shell and the full application page
//! - [`sidebar`]: conversation list and mode selector
//! - [`chat`]: selected conversation and the message form
//! - [`stages`]: research and stage 1/2/3 panels
//! - [`markdown`]: markdown rendering for model output
//! - [`components`]: buttons, badges, icons

pub mod chat;
pub mod components;
pub mod markdown;
pub mod page;
pub mod sidebar;
pub mod stages;

use leptos::prelude::*;

/// Render a view to an HTML string inside a fresh reactive owner.
pub fn render<F, V>(view: F) -> String
where
    F: FnOnce() -> V,
    V: IntoView,
{
    Owner::new().with(|| view().to_html())
}
