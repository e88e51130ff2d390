//! Badge component for modes and ranks.

use leptos::prelude::*;

/// Badge visual variant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BadgeVariant {
    /// Neutral label.
    #[default]
    Default,
    /// Highlighted, used for the top-ranked model.
    Success,
    /// Low-key outline.
    Outline,
}

impl BadgeVariant {
    /// CSS class for this variant.
    #[must_use]
    pub fn class(self) -> &'static str {
        match self {
            Self::Default => "badge",
            Self::Success => "badge badge-success",
            Self::Outline => "badge badge-outline",
        }
    }
}

/// Badge component.
///
/// ```rust,ignore
/// view! { <Badge variant=BadgeVariant::Success>"#1"</Badge> }
/// ```
#[component]
pub fn Badge(
    #[prop(default = BadgeVariant::Default)] variant: BadgeVariant,
    children: Children,
) -> impl IntoView {
    view! { <span class=variant.class()>{children()}</span> }
}
