//! Main-content extraction from a fetched travel-wiki page.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};

use crate::error::RetrievalError;

static INLINE_SPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[ \t\u{a0}]+").unwrap());

const SKIPPED_TAGS: &[&str] = &["script", "style", "noscript"];
const BLOCK_TAGS: &[&str] = &[
    "p", "div", "li", "ul", "ol", "h1", "h2", "h3", "h4", "h5", "h6", "tr", "table", "br",
    "section", "dd", "dt",
];

/// Parse a CSS selector, keeping the parse error as text.
pub fn parse_selector(selector: &str) -> Result<Selector, RetrievalError> {
    Selector::parse(selector).map_err(|e| RetrievalError::InvalidSelector {
        selector: selector.to_string(),
        reason: format!("{e:?}"),
    })
}

/// Return the normalized text of the first element matching `selector`, or
/// `None` when the page has no such container.
pub fn extract_main_text(html: &str, selector: &Selector) -> Option<String> {
    let document = Html::parse_document(html);
    let container = document.select(selector).next()?;

    let mut raw = String::new();
    for node in container.descendants() {
        if let Some(element) = node.value().as_element() {
            if BLOCK_TAGS.contains(&element.name()) {
                raw.push('\n');
            }
            continue;
        }
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let in_skipped = node.ancestors().any(|a| {
            a.value()
                .as_element()
                .is_some_and(|e| SKIPPED_TAGS.contains(&e.name()))
        });
        if !in_skipped {
            raw.push_str(text);
        }
    }

    Some(normalize_whitespace(&raw))
}

/// Collapse runs of inline whitespace and drop blank lines.
pub fn normalize_whitespace(raw: &str) -> String {
    raw.lines()
        .map(|line| INLINE_SPACE.replace_all(line, " ").trim().to_string())
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
