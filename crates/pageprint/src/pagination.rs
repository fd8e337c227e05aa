//! Detection of next-page controls: pure data production for the host's
//! pagination logic, which stays outside this engine.

use crate::document::Document;
use crate::node::DomNode;
use crate::selector::{Selector, SelectorKind};
use serde::{Deserialize, Serialize};

/// Multilingual next-page keywords, checked against the control's text.
const NEXT_KEYWORDS: &[&str] = &[
    "下一页", "下一条", "Next", "next", "下页", "后一页", "翻页", "下一步", "向后", "››", "»",
    ">>", ">", "→",
];

/// One candidate next-page control.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaginationControl {
    pub text: String,
    pub tag: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub class_list: String,
    pub selector: Selector,
}

fn is_button_like(node: &DomNode) -> bool {
    match node.tag().as_str() {
        "button" | "a" => true,
        "input" => matches!(
            node.attr_or_empty("type").to_lowercase().as_str(),
            "button" | "submit"
        ),
        _ => {
            node.attr_or_empty("role") == "button"
                || node.has_class("btn")
                || node.has_class("page-btn")
        }
    }
}

fn control_text(node: &DomNode) -> String {
    for candidate in [
        node.text_content(),
        node.attr_or_empty("value"),
        node.attr_or_empty("aria-label"),
        node.attr_or_empty("title"),
    ] {
        let trimmed = candidate.trim().to_string();
        if !trimmed.is_empty() {
            return trimmed;
        }
    }
    String::new()
}

/// Id-anchored XPath when possible, else a parent path below `<body>` with
/// sibling ordinals only where needed.
fn control_xpath(node: &DomNode) -> String {
    if let Some(id) = node.id() {
        return format!("//*[@id=\"{id}\"]");
    }
    let mut segments = Vec::new();
    let mut current = node.clone();
    loop {
        if current.tag() == "body" || current.parent().is_none() {
            break;
        }
        let mut segment = current.tag();
        if current.same_tag_sibling_count() > 1 {
            segment.push_str(&format!("[{}]", current.same_tag_ordinal()));
        }
        segments.push(segment);
        match current.parent() {
            Some(parent) => current = parent,
            None => break,
        }
    }
    segments.reverse();
    format!("//{}", segments.join("/"))
}

fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

/// Enumerate button-like elements matching the next-page conventions.
pub fn find_pagination_controls(doc: &Document) -> Vec<PaginationControl> {
    let mut out = Vec::new();
    for node in doc.root().descendants() {
        if !is_button_like(&node) {
            continue;
        }
        let text = control_text(&node);
        let class = node.class_attr();
        let id = node.attr_or_empty("id");

        let keyword_match = NEXT_KEYWORDS.iter().find(|kw| text.contains(**kw));
        let attr_match = class.to_lowercase().contains("next") || id.to_lowercase().contains("next");
        if keyword_match.is_none() && !attr_match {
            continue;
        }
        if text.chars().count() >= 50 {
            continue;
        }

        let display = if text.is_empty() {
            keyword_match.map(|kw| kw.to_string()).unwrap_or_default()
        } else {
            text
        };

        out.push(PaginationControl {
            text: truncate_chars(&display, 30),
            tag: node.tag(),
            id,
            class_list: truncate_chars(&class, 50),
            selector: Selector::new(SelectorKind::XPath, control_xpath(&node), 0),
        });
    }
    out
}
