use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};

/// Longest body excerpt kept in a [`PageContext`], in characters.
pub const CONTENT_LIMIT: usize = 500;

/// What an explanation request knows about the page the selection came from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageContext {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub content: String,
}

impl PageContext {
    /// Title, meta description and the start of the visible body text of `html`.
    pub fn extract(html: &str, url: &str) -> Self {
        let document = Html::parse_document(html);

        let title = first_text(&document, "title");
        let description = Selector::parse(r#"meta[name="description"]"#)
            .ok()
            .and_then(|sel| {
                document
                    .select(&sel)
                    .find_map(|m| m.value().attr("content").map(|c| c.trim().to_string()))
            })
            .unwrap_or_default();

        Self {
            title,
            url: url.to_string(),
            description,
            content: truncate_chars(&body_text(&document), CONTENT_LIMIT),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_empty() && self.description.is_empty() && self.content.is_empty()
    }
}

fn first_text(document: &Html, selector: &str) -> String {
    let Ok(sel) = Selector::parse(selector) else {
        return String::new();
    };
    document
        .select(&sel)
        .next()
        .map(|el| collapse_whitespace(&el.text().collect::<String>()))
        .unwrap_or_default()
}

/// Visible body text: script, style and noscript contents dropped, whitespace collapsed.
fn body_text(document: &Html) -> String {
    let Ok(body_sel) = Selector::parse("body") else {
        return String::new();
    };
    let Some(body) = document.select(&body_sel).next() else {
        return String::new();
    };

    let mut raw = String::new();
    for node in body.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node.ancestors().any(|a| {
            a.value()
                .as_element()
                .is_some_and(|e| matches!(e.name(), "script" | "style" | "noscript" | "template"))
        });
        if !hidden {
            raw.push_str(text);
            raw.push(' ');
        }
    }
    collapse_whitespace(&raw)
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// First `limit` characters of `s`, cut on a char boundary.
pub fn truncate_chars(s: &str, limit: usize) -> String {
    match s.char_indices().nth(limit) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}
