//! Interactive picker: hover highlighting and double-click commit.
//!
//! State machine `idle → hovering → (flashing) → idle`, with an orthogonal
//! pick-mode flag checked at the top of every handler. The committed
//! result lands in a single-slot mailbox with take-and-clear semantics; a
//! commit overwrites any unconsumed previous value, and a commit racing a
//! host's read-then-clear may be dropped — that is documented behavior,
//! not a queue waiting to happen.

use crate::config::EngineConfig;
use crate::context;
use crate::document::Document;
use crate::fingerprint::{PickResult, SiblingRef};
use crate::label::{InferenceMode, Label, LabelSource};
use crate::node::DomNode;
use crate::scanner;
use crate::selector;
use std::cell::{Cell, RefCell};
use tracing::debug;

/// Class applied to the currently hovered candidate.
pub const HOVER_CLASS: &str = "pageprint-pick-hover";

/// Events the host feeds into the engine from its document-level capturing
/// listeners.
#[derive(Debug, Clone)]
pub enum PageEvent {
    MouseOver(DomNode),
    MouseOut(DomNode),
    DoubleClick(DomNode),
}

/// What the engine did with an event. `Committed` means the host must
/// suppress the default action and stop propagation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventDisposition {
    Ignored,
    Highlighted,
    Committed,
}

pub(crate) enum HandlerResult {
    Ignored,
    Highlighted,
    Committed(DomNode),
}

pub(crate) struct Picker {
    pick_mode: Cell<bool>,
    hovered: RefCell<Option<DomNode>>,
    slot: RefCell<Option<PickResult>>,
}

impl Picker {
    pub(crate) fn new() -> Self {
        Self {
            pick_mode: Cell::new(false),
            hovered: RefCell::new(None),
            slot: RefCell::new(None),
        }
    }

    pub(crate) fn pick_mode(&self) -> bool {
        self.pick_mode.get()
    }

    pub(crate) fn set_pick_mode(&self, enabled: bool) {
        self.pick_mode.set(enabled);
        if !enabled {
            if let Some(previous) = self.hovered.borrow_mut().take() {
                previous.set_class_enabled(HOVER_CLASS, false);
            }
        }
    }

    /// Atomic take-and-clear of the hand-off slot.
    pub(crate) fn take_picked(&self) -> Option<PickResult> {
        self.slot.borrow_mut().take()
    }

    pub(crate) fn handle_event(
        &self,
        event: PageEvent,
        doc: &Document,
        config: &EngineConfig,
    ) -> HandlerResult {
        if !self.pick_mode.get() {
            return HandlerResult::Ignored;
        }
        match event {
            PageEvent::MouseOver(node) => self.on_mouse_over(node, config),
            PageEvent::MouseOut(node) => self.on_mouse_out(node),
            PageEvent::DoubleClick(node) => self.on_double_click(node, doc, config),
        }
    }

    fn on_mouse_over(&self, node: DomNode, config: &EngineConfig) -> HandlerResult {
        if !is_input_like(&node, config) {
            return HandlerResult::Ignored;
        }
        let mut hovered = self.hovered.borrow_mut();
        if let Some(previous) = hovered.take() {
            if previous != node {
                previous.set_class_enabled(HOVER_CLASS, false);
            }
        }
        node.set_class_enabled(HOVER_CLASS, true);
        *hovered = Some(node);
        HandlerResult::Highlighted
    }

    fn on_mouse_out(&self, node: DomNode) -> HandlerResult {
        node.set_class_enabled(HOVER_CLASS, false);
        let mut hovered = self.hovered.borrow_mut();
        if hovered.as_ref() == Some(&node) {
            *hovered = None;
        }
        HandlerResult::Ignored
    }

    fn on_double_click(
        &self,
        node: DomNode,
        doc: &Document,
        config: &EngineConfig,
    ) -> HandlerResult {
        // Commit requires a strictly-input element, not a header or label
        // that happens to sit under the cursor.
        if !scanner::is_interactive(&node) {
            return HandlerResult::Ignored;
        }

        let scope = node.scope_root();
        let mut fingerprint = match scanner::assemble_fingerprint(
            &node,
            doc,
            &scope,
            shadow_depth_of(&node),
            None,
            config,
            InferenceMode::Pick,
        ) {
            Ok(fingerprint) => fingerprint,
            Err(error) => {
                debug!(%error, "pick commit failed to assemble fingerprint");
                return HandlerResult::Ignored;
            }
        };

        if let Some(label) = associated_header_text(&node, &scope, config) {
            fingerprint.label = label;
        }

        let siblings = collect_siblings(&node, &scope, doc, config);
        let sibling_count = siblings.len();
        let has_siblings = sibling_count >= 2;

        let result = PickResult {
            fingerprint,
            sibling_count,
            has_siblings,
            siblings: if has_siblings { siblings } else { Vec::new() },
        };

        // Overwrite semantics: at most one pending pick is retained.
        *self.slot.borrow_mut() = Some(result);
        HandlerResult::Committed(node)
    }
}

/// Hover predicate: native inputs, ARIA input roles, framework input
/// wrappers, or children of a wrapper-like container.
fn is_input_like(node: &DomNode, config: &EngineConfig) -> bool {
    if scanner::is_interactive(node) {
        return true;
    }
    let wraps = |n: &DomNode| {
        config
            .input_wrapper_fragments
            .iter()
            .any(|f| n.has_class_fragment(f))
    };
    if wraps(node) {
        return true;
    }
    node.parent().map(|p| wraps(&p)).unwrap_or(false)
}

fn shadow_depth_of(node: &DomNode) -> usize {
    let mut depth = 0;
    let mut scope = node.scope_root();
    while scope.is_shadow_root() {
        depth += 1;
        match scope.shadow_host() {
            Some(host) => scope = host.scope_root(),
            None => break,
        }
    }
    depth
}

/// Dedicated header search for picked elements, distinct from the scan
/// label chain's visual fallback: column header when inside a table, else
/// the nearest preceding heading/label among ancestor siblings.
fn associated_header_text(
    node: &DomNode,
    scope: &DomNode,
    config: &EngineConfig,
) -> Option<Label> {
    if let Some(ctx) = context::table_context(node, scope) {
        if !ctx.header_text.is_empty() {
            return Some(Label {
                text: ctx.header_text,
                source: LabelSource::TableHeader,
            });
        }
    }

    let heading_like = |n: &DomNode| {
        matches!(
            n.tag().as_str(),
            "label" | "th" | "h1" | "h2" | "h3" | "h4" | "h5" | "h6"
        ) || ["title", "header", "label", "caption"]
            .iter()
            .any(|f| n.has_class_fragment(f))
    };

    let mut current = node.clone();
    for _ in 0..6 {
        let mut sibling = current.previous_element_sibling();
        while let Some(candidate) = sibling {
            if heading_like(&candidate) {
                let text = candidate.text_content();
                if !text.is_empty() && text.chars().count() <= config.proximity.max_text_len {
                    return Some(Label {
                        text,
                        source: LabelSource::AdjacentSibling,
                    });
                }
            }
            sibling = candidate.previous_element_sibling();
        }
        current = current.parent()?;
    }
    None
}

/// Same-column inputs across table rows, else same-`name` inputs within
/// the nearest form container. Excludes the picked element itself.
fn collect_siblings(
    node: &DomNode,
    scope: &DomNode,
    doc: &Document,
    config: &EngineConfig,
) -> Vec<SiblingRef> {
    let mut matches: Vec<DomNode> = Vec::new();

    if let Some(cell) = node.closest_tag(&["td", "th"]) {
        if let (Some(row), Some(table)) =
            (cell.closest_tag(&["tr"]), cell.closest_tag(&["table"]))
        {
            let col = row
                .element_children()
                .into_iter()
                .filter(|c| matches!(c.tag().as_str(), "td" | "th"))
                .position(|c| c == cell);
            if let Some(col) = col {
                for other_row in context::table_rows(&table) {
                    let cells: Vec<DomNode> = other_row
                        .element_children()
                        .into_iter()
                        .filter(|c| matches!(c.tag().as_str(), "td" | "th"))
                        .collect();
                    if let Some(other_cell) = cells.get(col) {
                        for input in other_cell.descendants() {
                            if scanner::is_interactive(&input) && input != *node {
                                matches.push(input);
                            }
                        }
                    }
                }
            }
        }
    } else {
        let name = node.attr_or_empty("name");
        if !name.is_empty() {
            let form = node
                .closest(|n| n.tag() == "form" || n.has_class_fragment("form"))
                .unwrap_or_else(|| scope.clone());
            for input in form.descendants() {
                if scanner::is_interactive(&input)
                    && input != *node
                    && input.attr_or_empty("name") == name
                {
                    matches.push(input);
                }
            }
        }
    }

    matches
        .into_iter()
        .map(|input| SiblingRef {
            selectors: selector::locate(&input, doc, config),
            dom_id: input.attr_or_empty("id"),
            placeholder: input.attr_or_empty("placeholder"),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::{NodeBuilder, SnapshotDocument};

    fn doc_with(body_children: Vec<NodeBuilder>) -> Document {
        SnapshotDocument::build(
            NodeBuilder::new("html").child(NodeBuilder::new("body").children(body_children)),
        )
        .as_document()
    }

    fn hover(picker: &Picker, doc: &Document, id: &str) {
        let node = doc.element_by_id(id).unwrap();
        picker.handle_event(
            PageEvent::MouseOver(node),
            doc,
            &EngineConfig::default(),
        );
    }

    #[test]
    fn at_most_one_element_is_highlighted() {
        let doc = doc_with(vec![
            NodeBuilder::new("input").id("a"),
            NodeBuilder::new("input").id("b"),
        ]);
        let picker = Picker::new();
        picker.set_pick_mode(true);
        hover(&picker, &doc, "a");
        hover(&picker, &doc, "b");
        assert!(!doc.element_by_id("a").unwrap().has_class(HOVER_CLASS));
        assert!(doc.element_by_id("b").unwrap().has_class(HOVER_CLASS));
    }

    #[test]
    fn mouse_out_clears_outline_unconditionally() {
        let doc = doc_with(vec![NodeBuilder::new("input").id("a")]);
        let picker = Picker::new();
        picker.set_pick_mode(true);
        hover(&picker, &doc, "a");
        let node = doc.element_by_id("a").unwrap();
        picker.handle_event(PageEvent::MouseOut(node.clone()), &doc, &EngineConfig::default());
        assert!(!node.has_class(HOVER_CLASS));
    }

    #[test]
    fn pick_mode_off_ignores_everything() {
        let doc = doc_with(vec![NodeBuilder::new("input").id("a")]);
        let picker = Picker::new();
        let node = doc.element_by_id("a").unwrap();
        let result = picker.handle_event(
            PageEvent::DoubleClick(node),
            &doc,
            &EngineConfig::default(),
        );
        assert!(matches!(result, HandlerResult::Ignored));
        assert!(picker.take_picked().is_none());
    }

    #[test]
    fn double_click_commits_once() {
        let doc = doc_with(vec![NodeBuilder::new("input").id("a")]);
        let picker = Picker::new();
        picker.set_pick_mode(true);
        let node = doc.element_by_id("a").unwrap();
        let result = picker.handle_event(
            PageEvent::DoubleClick(node),
            &doc,
            &EngineConfig::default(),
        );
        assert!(matches!(result, HandlerResult::Committed(_)));
        let picked = picker.take_picked().unwrap();
        assert_eq!(picked.fingerprint.dom_id, "a");
        assert!(picker.take_picked().is_none());
    }

    #[test]
    fn double_click_on_label_is_ignored() {
        let doc = doc_with(vec![NodeBuilder::new("label").id("l").text("金额")]);
        let picker = Picker::new();
        picker.set_pick_mode(true);
        let node = doc.element_by_id("l").unwrap();
        let result = picker.handle_event(
            PageEvent::DoubleClick(node),
            &doc,
            &EngineConfig::default(),
        );
        assert!(matches!(result, HandlerResult::Ignored));
    }

    #[test]
    fn same_name_siblings_are_detected_in_form() {
        let doc = doc_with(vec![NodeBuilder::new("form").children(vec![
            NodeBuilder::new("input").id("r1").attr("name", "qty"),
            NodeBuilder::new("input").id("r2").attr("name", "qty"),
            NodeBuilder::new("input").id("r3").attr("name", "qty"),
            NodeBuilder::new("input").id("other").attr("name", "price"),
        ])]);
        let picker = Picker::new();
        picker.set_pick_mode(true);
        let node = doc.element_by_id("r1").unwrap();
        picker.handle_event(PageEvent::DoubleClick(node), &doc, &EngineConfig::default());
        let picked = picker.take_picked().unwrap();
        assert!(picked.has_siblings);
        assert_eq!(picked.sibling_count, 2);
        assert_eq!(picked.siblings.len(), 2);
        assert_eq!(picked.siblings[0].dom_id, "r2");
    }

    #[test]
    fn single_sibling_does_not_flip_flag() {
        let doc = doc_with(vec![NodeBuilder::new("form").children(vec![
            NodeBuilder::new("input").id("r1").attr("name", "qty"),
            NodeBuilder::new("input").id("r2").attr("name", "qty"),
        ])]);
        let picker = Picker::new();
        picker.set_pick_mode(true);
        let node = doc.element_by_id("r1").unwrap();
        picker.handle_event(PageEvent::DoubleClick(node), &doc, &EngineConfig::default());
        let picked = picker.take_picked().unwrap();
        assert!(!picked.has_siblings);
        assert_eq!(picked.sibling_count, 1);
        assert!(picked.siblings.is_empty());
    }

    #[test]
    fn table_pick_collects_column_inputs() {
        let doc = doc_with(vec![NodeBuilder::new("table").children(vec![
            NodeBuilder::new("tr").children(vec![
                NodeBuilder::new("td").child(NodeBuilder::new("input").id("r1c1")),
                NodeBuilder::new("td").child(NodeBuilder::new("input").id("r1c2")),
            ]),
            NodeBuilder::new("tr").children(vec![
                NodeBuilder::new("td").child(NodeBuilder::new("input").id("r2c1")),
                NodeBuilder::new("td").child(NodeBuilder::new("input").id("r2c2")),
            ]),
            NodeBuilder::new("tr").children(vec![
                NodeBuilder::new("td").child(NodeBuilder::new("input").id("r3c1")),
                NodeBuilder::new("td").child(NodeBuilder::new("input").id("r3c2")),
            ]),
        ])]);
        let picker = Picker::new();
        picker.set_pick_mode(true);
        let node = doc.element_by_id("r2c2").unwrap();
        picker.handle_event(PageEvent::DoubleClick(node), &doc, &EngineConfig::default());
        let picked = picker.take_picked().unwrap();
        assert!(picked.has_siblings);
        assert_eq!(picked.sibling_count, 2);
        let ids: Vec<&str> = picked.siblings.iter().map(|s| s.dom_id.as_str()).collect();
        assert_eq!(ids, vec!["r1c2", "r3c2"]);
    }

    #[test]
    fn disabling_pick_mode_clears_hover() {
        let doc = doc_with(vec![NodeBuilder::new("input").id("a")]);
        let picker = Picker::new();
        picker.set_pick_mode(true);
        hover(&picker, &doc, "a");
        picker.set_pick_mode(false);
        assert!(!doc.element_by_id("a").unwrap().has_class(HOVER_CLASS));
    }
}
