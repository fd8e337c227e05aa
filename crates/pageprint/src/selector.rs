//! Selector generation: an ordered chain of locator strategies plus an
//! independent CSS-path generator.
//!
//! Every candidate except the positional fallback is verified against the
//! current snapshot before it is retained: a selector that resolves to a
//! different node (duplicate aria-labels, repeated form-item labels) is
//! useless as a relocator and is dropped instead of shipped.

use crate::config::EngineConfig;
use crate::document::Document;
use crate::label;
use crate::locator;
use crate::node::DomNode;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{trace, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectorKind {
    Id,
    Css,
    XPath,
}

/// One locator candidate. Lower `confidence` rank means a stronger anchor;
/// the list produced by [`locate`] is ordered by rank, first entry primary.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Selector {
    pub kind: SelectorKind,
    pub value: String,
    pub confidence: u8,
}

impl Selector {
    pub fn new(kind: SelectorKind, value: impl Into<String>, confidence: u8) -> Self {
        Self {
            kind,
            value: value.into(),
            confidence,
        }
    }
}

/// Auto-generated class prefixes that never survive a rebuild and are
/// useless inside selectors.
static GENERATED_CLASS: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(ng-|v-|_)").unwrap());

/// XPath string literal, or `None` when the value mixes both quote kinds.
fn xpath_literal(value: &str) -> Option<String> {
    if !value.contains('"') {
        Some(format!("\"{value}\""))
    } else if !value.contains('\'') {
        Some(format!("'{value}'"))
    } else {
        None
    }
}

/// Produce the ordered selector set for a node.
///
/// A detached node (no parent chain) yields an empty list, which callers
/// treat as a fatal per-element failure. For attached nodes the positional
/// fallback guarantees the list is never empty.
pub fn locate(node: &DomNode, doc: &Document, config: &EngineConfig) -> Vec<Selector> {
    if node.parent().is_none() {
        return Vec::new();
    }

    let mut out = Vec::new();

    if let Some(id) = node.id() {
        let value = format!("#{id}");
        if verified(doc, &value, node) {
            out.push(Selector::new(SelectorKind::Id, value, 0));
        }
    }

    let candidates: [(u8, Option<String>); 5] = [
        (1, aria_label_xpath(node)),
        (2, placeholder_xpath(node)),
        (3, label_anchored_xpath(node, config)),
        (4, table_position_xpath(node, config)),
        (5, grid_position_xpath(node, config)),
    ];
    for (rank, candidate) in candidates {
        if let Some(value) = candidate {
            if verified(doc, &value, node) {
                out.push(Selector::new(SelectorKind::XPath, value, rank));
            } else {
                trace!(selector = %value, "dropping ambiguous selector candidate");
            }
        }
    }

    let positional = positional_xpath(node);
    if !verified(doc, &positional, node) {
        warn!(selector = %positional, "positional selector failed verification");
    }
    out.push(Selector::new(SelectorKind::XPath, positional, 6));

    let css = css_selector(node);
    if !out.iter().any(|s| s.value == css) && verified(doc, &css, node) {
        out.push(Selector::new(SelectorKind::Css, css, 7));
    }

    out
}

fn verified(doc: &Document, raw: &str, node: &DomNode) -> bool {
    matches!(locator::resolve(doc, raw), Ok(found) if found == *node)
}

fn aria_label_xpath(node: &DomNode) -> Option<String> {
    let value = node.attribute("aria-label").filter(|v| !v.is_empty())?;
    let literal = xpath_literal(&value)?;
    Some(format!("//{}[@aria-label={literal}]", node.tag()))
}

fn placeholder_xpath(node: &DomNode) -> Option<String> {
    let value = node.attribute("placeholder").filter(|v| !v.is_empty())?;
    let literal = xpath_literal(&value)?;
    Some(format!("//{}[@placeholder={literal}]", node.tag()))
}

/// Relative XPath anchored on the enclosing form-item's label text. Exists
/// specifically to avoid brittle auto-generated DOM ids.
fn label_anchored_xpath(node: &DomNode, config: &EngineConfig) -> Option<String> {
    let (item, text) = label::form_item_label(node, config)?;
    let fragment = config
        .form_item_fragments
        .iter()
        .find(|f| item.has_class_fragment(f))?;
    let fragment_lit = xpath_literal(fragment)?;
    let text_lit = xpath_literal(&text)?;
    Some(format!(
        "//*[contains(@class,{fragment_lit})][contains(.,{text_lit})]//{}",
        node.tag()
    ))
}

fn cell_step(row: &DomNode, cell: &DomNode) -> Option<String> {
    let tag = cell.tag();
    let index = row
        .element_children()
        .into_iter()
        .filter(|c| c.tag() == tag)
        .position(|c| c == *cell)?;
    Some(format!("{tag}[{}]", index + 1))
}

/// Ordinal step for the target inside its cell, disambiguated only when the
/// cell holds several same-tag elements.
fn target_step(container: &DomNode, node: &DomNode) -> String {
    let tag = node.tag();
    let matches: Vec<DomNode> = container
        .descendants()
        .into_iter()
        .filter(|d| d.tag() == tag)
        .collect();
    if matches.len() > 1 {
        let index = matches.iter().position(|m| m == node).unwrap_or(0);
        format!("//{tag}[{}]", index + 1)
    } else {
        format!("//{tag}")
    }
}

fn table_position_xpath(node: &DomNode, _config: &EngineConfig) -> Option<String> {
    let cell = node.closest_tag(&["td", "th"])?;
    let row = cell.closest_tag(&["tr"])?;
    let table = cell.closest_tag(&["table"])?;

    let scope = node.scope_root();
    let anchor = match table.id().and_then(|id| xpath_literal(&id)) {
        Some(literal) => format!("//table[@id={literal}]"),
        None => {
            let ordinal = scope
                .descendants()
                .into_iter()
                .filter(|n| n.tag() == "table")
                .position(|n| n == table)?;
            format!("//table[{}]", ordinal + 1)
        }
    };

    let row_ordinal = crate::context::table_rows(&table)
        .iter()
        .position(|r| *r == row)?;
    let cell_step = cell_step(&row, &cell)?;
    Some(format!(
        "{anchor}//tr[{}]/{cell_step}{}",
        row_ordinal + 1,
        target_step(&cell, node)
    ))
}

/// Row/cell ordinal XPath for virtualized grids that use class conventions
/// instead of table markup.
fn grid_position_xpath(node: &DomNode, config: &EngineConfig) -> Option<String> {
    let row = node.ancestors().into_iter().find(|a| {
        config
            .grid_row_fragments
            .iter()
            .any(|f| a.has_class_fragment(f))
    })?;
    let row_fragment = config
        .grid_row_fragments
        .iter()
        .find(|f| row.has_class_fragment(f))?;
    let row_lit = xpath_literal(row_fragment)?;

    let scope = node.scope_root();
    let row_ordinal = scope
        .descendants()
        .into_iter()
        .filter(|n| n.has_class_fragment(row_fragment))
        .position(|n| n == row)?;

    // Cell ancestor between the node and its row, when the grid has one.
    let cell = node.ancestors().into_iter().take_while(|a| *a != row).find(|a| {
        config
            .grid_cell_fragments
            .iter()
            .any(|f| a.has_class_fragment(f))
    });

    match cell {
        Some(cell) => {
            let cell_fragment = config
                .grid_cell_fragments
                .iter()
                .find(|f| cell.has_class_fragment(f))?;
            let cell_lit = xpath_literal(cell_fragment)?;
            let cell_ordinal = row
                .descendants()
                .into_iter()
                .filter(|n| n.has_class_fragment(cell_fragment))
                .position(|n| n == cell)?;
            Some(format!(
                "//*[contains(@class,{row_lit})][{}]//*[contains(@class,{cell_lit})][{}]{}",
                row_ordinal + 1,
                cell_ordinal + 1,
                target_step(&cell, node)
            ))
        }
        None => Some(format!(
            "//*[contains(@class,{row_lit})][{}]{}",
            row_ordinal + 1,
            target_step(&row, node)
        )),
    }
}

/// Positional fallback: always produces a selector, even with no semantic
/// anchors. Light-DOM nodes get an absolute parent path; shadow content
/// gets a document-order ordinal that the resolver evaluates with shadow
/// piercing.
fn positional_xpath(node: &DomNode) -> String {
    let scope = node.scope_root();
    if scope.is_shadow_root() {
        return pierced_ordinal_xpath(node);
    }

    let mut segments = Vec::new();
    let mut current = node.clone();
    loop {
        let tag = current.tag();
        match current.parent() {
            Some(parent) => {
                if tag == "body" {
                    segments.push("body".to_string());
                    segments.push("html".to_string());
                    break;
                }
                segments.push(format!("{tag}[{}]", current.same_tag_ordinal()));
                current = parent;
            }
            None => {
                segments.push(tag);
                break;
            }
        }
    }
    segments.reverse();
    format!("/{}", segments.join("/"))
}

fn pierced_ordinal_xpath(node: &DomNode) -> String {
    let tag = node.tag();
    // Ordinal among all same-tag elements in pierce order; the resolver's
    // descendant axis enumerates in the same order.
    let document_root = top_document_root(node);
    let ordinal = document_root
        .descendants_piercing(locator::MAX_SHADOW_PIERCE)
        .into_iter()
        .filter(|n| n.tag() == tag)
        .position(|n| n == *node)
        .unwrap_or(0);
    format!("//{tag}[{}]", ordinal + 1)
}

/// Walk out of nested shadow scopes to the light-DOM document root.
fn top_document_root(node: &DomNode) -> DomNode {
    let mut scope = node.scope_root();
    while scope.is_shadow_root() {
        match scope.shadow_host() {
            Some(host) => scope = host.scope_root(),
            None => break,
        }
    }
    scope
}

/// Independent CSS path: id-first, else an ancestor walk collecting tag +
/// up to two stable class tokens + nth-of-type disambiguation, stopping at
/// an ID ancestor or a fixed depth bound.
pub fn css_selector(node: &DomNode) -> String {
    if let Some(id) = node.id() {
        return format!("#{id}");
    }

    let mut parts: Vec<String> = Vec::new();
    let mut current = Some(node.clone());
    while let Some(el) = current {
        if el.is_text() || el.is_shadow_root() {
            break;
        }
        if !parts.is_empty() {
            if let Some(id) = el.id() {
                parts.insert(0, format!("#{id}"));
                break;
            }
        }
        let mut part = el.tag();
        let classes: Vec<String> = el
            .classes()
            .into_iter()
            .filter(|c| !GENERATED_CLASS.is_match(c))
            .take(2)
            .collect();
        if !classes.is_empty() {
            part.push('.');
            part.push_str(&classes.join("."));
        }
        if el.same_tag_sibling_count() > 1 {
            part.push_str(&format!(":nth-of-type({})", el.same_tag_ordinal()));
        }
        parts.insert(0, part);
        if parts.len() > 5 {
            break;
        }
        current = el.parent();
    }
    parts.join(" > ")
}
