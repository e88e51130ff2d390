//! Button component.

use leptos::prelude::*;

/// Button visual variant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ButtonVariant {
    /// Primary action.
    #[default]
    Primary,
    /// Tab in a tab strip.
    Tab,
    /// The selected tab.
    ActiveTab,
}

impl ButtonVariant {
    /// CSS classes for this variant.
    #[must_use]
    pub fn classes(self) -> &'static str {
        match self {
            Self::Primary => "btn btn-primary",
            Self::Tab => "tab",
            Self::ActiveTab => "tab active",
        }
    }

    /// Variant for a tab, given whether it is selected.
    #[must_use]
    pub fn tab(active: bool) -> Self {
        if active { Self::ActiveTab } else { Self::Tab }
    }
}

/// Button component.
///
/// HTMX behavior is attached with `hx_get`/`hx_target`; a button without
/// them is a plain form button.
///
/// ```rust,ignore
/// view! {
///     <Button variant=ButtonVariant::Primary button_type="submit">"Send"</Button>
/// }
/// ```
#[component]
pub fn Button(
    #[prop(default = ButtonVariant::Primary)] variant: ButtonVariant,
    #[prop(default = "button")] button_type: &'static str,
    /// Fragment URL fetched on click.
    #[prop(optional, into)]
    hx_get: Option<String>,
    /// Element replaced by the fetched fragment.
    #[prop(optional)]
    hx_target: Option<&'static str>,
    #[prop(default = "")] class: &'static str,
    children: Children,
) -> impl IntoView {
    let classes = if class.is_empty() {
        variant.classes().to_string()
    } else {
        format!("{} {class}", variant.classes())
    };
    let swap = hx_get.as_ref().map(|_| "outerHTML");

    view! {
        <button
            type=button_type
            class=classes
            hx-get=hx_get
            hx-target=hx_target
            hx-swap=swap
        >
            {children()}
        </button>
    }
}
