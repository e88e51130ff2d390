//! Markdown rendering for model output.

use pulldown_cmark::{Event, Options, Parser, html};

/// Render markdown to HTML.
///
/// Raw HTML in the source is escaped and shown as text: model output is
/// untrusted and ends up in the page via `inner_html`.
#[must_use]
pub fn markdown_to_html(md: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_TASKLISTS);
    options.insert(Options::ENABLE_FOOTNOTES);

    let parser = Parser::new_ext(md, options).map(|event| match event {
        Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
        other => other,
    });

    let mut out = String::new();
    html::push_html(&mut out, parser);
    out
}
