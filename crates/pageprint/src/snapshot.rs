//! In-memory snapshot DOM backend.
//!
//! One concrete implementation of the node/document capability traits: a
//! shared-ownership tree built either programmatically (`NodeBuilder`, used
//! heavily by tests) or from a serialized snapshot (`SnapshotDocument::
//! from_json`, used by the CLI). Interior mutability covers the only writes
//! the engine performs: cosmetic class toggles, dialog arming and the two
//! idempotent injections.

use crate::document::{Document, DocumentImpl, DialogKind, ReadyState};
use crate::errors::EngineError;
use crate::node::{ComputedStyle, DomNode, DomNodeImpl, Rect};
use serde::Deserialize;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::{Rc, Weak};

struct NodeData {
    tag: String,
    text: String,
    attrs: BTreeMap<String, String>,
    value: Option<String>,
    style: ComputedStyle,
    rect: Rect,
    children: Vec<SnapshotNode>,
    parent: Option<Weak<RefCell<NodeData>>>,
    shadow: Option<SnapshotNode>,
    shadow_host: Option<Weak<RefCell<NodeData>>>,
    content_document: Option<SnapshotDocument>,
}

/// A node in the snapshot tree. Cheap to clone; clones share identity.
#[derive(Clone)]
pub struct SnapshotNode(Rc<RefCell<NodeData>>);

impl SnapshotNode {
    fn new_element(tag: &str) -> Self {
        Self(Rc::new(RefCell::new(NodeData {
            tag: tag.to_lowercase(),
            text: String::new(),
            attrs: BTreeMap::new(),
            value: None,
            style: ComputedStyle::default(),
            rect: Rect::default(),
            children: Vec::new(),
            parent: None,
            shadow: None,
            shadow_host: None,
            content_document: None,
        })))
    }

    fn new_text(text: &str, rect: Rect) -> Self {
        let node = Self::new_element("#text");
        {
            let mut data = node.0.borrow_mut();
            data.text = text.to_string();
            data.rect = rect;
        }
        node
    }

    fn append_child(&self, child: &SnapshotNode) {
        child.0.borrow_mut().parent = Some(Rc::downgrade(&self.0));
        self.0.borrow_mut().children.push(child.clone());
    }

    fn attach_shadow(&self, shadow_children: Vec<SnapshotNode>) {
        let shadow = SnapshotNode::new_element("#shadow-root");
        for child in &shadow_children {
            shadow.append_child(child);
        }
        shadow.0.borrow_mut().shadow_host = Some(Rc::downgrade(&self.0));
        self.0.borrow_mut().shadow = Some(shadow);
    }

    fn collect_text(&self, out: &mut String) {
        let data = self.0.borrow();
        if data.tag == "#text" {
            out.push_str(&data.text);
            return;
        }
        for child in &data.children {
            child.collect_text(out);
        }
    }

    /// Handle as the engine-facing node type.
    pub fn as_dom_node(&self) -> DomNode {
        DomNode::new(Box::new(self.clone()))
    }
}

impl fmt::Debug for SnapshotNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = self.0.borrow();
        write!(f, "SnapshotNode(<{}>)", data.tag)
    }
}

impl DomNodeImpl for SnapshotNode {
    fn object_id(&self) -> usize {
        Rc::as_ptr(&self.0) as usize
    }

    fn tag(&self) -> String {
        self.0.borrow().tag.clone()
    }

    fn own_text(&self) -> String {
        self.0.borrow().text.clone()
    }

    fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out.trim().to_string()
    }

    fn attribute(&self, name: &str) -> Option<String> {
        self.0.borrow().attrs.get(name).cloned()
    }

    fn value(&self) -> Option<String> {
        self.0.borrow().value.clone()
    }

    fn children(&self) -> Vec<DomNode> {
        self.0
            .borrow()
            .children
            .iter()
            .map(|c| c.as_dom_node())
            .collect()
    }

    fn parent(&self) -> Option<DomNode> {
        let parent = self.0.borrow().parent.clone()?;
        parent.upgrade().map(|rc| SnapshotNode(rc).as_dom_node())
    }

    fn shadow_root(&self) -> Option<DomNode> {
        self.0.borrow().shadow.as_ref().map(|s| s.as_dom_node())
    }

    fn shadow_host(&self) -> Option<DomNode> {
        let host = self.0.borrow().shadow_host.clone()?;
        host.upgrade().map(|rc| SnapshotNode(rc).as_dom_node())
    }

    fn content_document(&self) -> Option<Document> {
        self.0
            .borrow()
            .content_document
            .as_ref()
            .map(|d| d.as_document())
    }

    fn computed_style(&self) -> ComputedStyle {
        self.0.borrow().style.clone()
    }

    fn bounds(&self) -> Rect {
        self.0.borrow().rect
    }

    fn set_class_enabled(&self, class: &str, enabled: bool) {
        let mut data = self.0.borrow_mut();
        let current = data.attrs.get("class").cloned().unwrap_or_default();
        let mut tokens: Vec<&str> = current.split_whitespace().collect();
        let present = tokens.contains(&class);
        if enabled && !present {
            tokens.push(class);
        } else if !enabled && present {
            tokens.retain(|t| *t != class);
        } else {
            return;
        }
        data.attrs.insert("class".to_string(), tokens.join(" "));
    }

    fn clone_box(&self) -> Box<dyn DomNodeImpl> {
        Box::new(self.clone())
    }
}

/// One intercepted (or declined) native dialog, recorded for diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct DialogRecord {
    pub kind: DialogKind,
    pub message: String,
    pub blocked: bool,
}

struct DocState {
    root: SnapshotNode,
    ready_state: RefCell<ReadyState>,
    silenced: RefCell<bool>,
    dialog_log: RefCell<Vec<DialogRecord>>,
}

impl fmt::Debug for DocState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SnapshotDocument")
    }
}

/// Document over a snapshot tree. Clones share state.
#[derive(Debug, Clone)]
pub struct SnapshotDocument(Rc<DocState>);

impl SnapshotDocument {
    /// Build a document from a root node description, readyState complete.
    pub fn build(root: NodeBuilder) -> Self {
        Self::build_with_ready_state(root, ReadyState::Complete)
    }

    pub fn build_with_ready_state(root: NodeBuilder, ready_state: ReadyState) -> Self {
        Self(Rc::new(DocState {
            root: root.build(),
            ready_state: RefCell::new(ready_state),
            silenced: RefCell::new(false),
            dialog_log: RefCell::new(Vec::new()),
        }))
    }

    /// Parse a serialized snapshot document.
    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        let spec: DocumentSpec = serde_json::from_str(json)
            .map_err(|e| EngineError::BackendError(format!("invalid snapshot JSON: {e}")))?;
        Ok(spec.into_document())
    }

    pub fn set_ready_state(&self, state: ReadyState) {
        *self.0.ready_state.borrow_mut() = state;
    }

    /// Handle as the engine-facing document type.
    pub fn as_document(&self) -> Document {
        Document::new(Rc::new(self.clone()))
    }

    /// Simulated native alert.
    pub fn alert(&self, message: &str) {
        let blocked = *self.0.silenced.borrow();
        self.log_dialog(DialogKind::Alert, message, blocked);
    }

    /// Simulated native confirm: auto-approved while silenced.
    pub fn confirm(&self, message: &str) -> bool {
        let blocked = *self.0.silenced.borrow();
        self.log_dialog(DialogKind::Confirm, message, blocked);
        blocked
    }

    /// Simulated native prompt: resolves to its default while silenced.
    pub fn prompt(&self, message: &str, default: &str) -> Option<String> {
        let blocked = *self.0.silenced.borrow();
        self.log_dialog(DialogKind::Prompt, message, blocked);
        if blocked {
            Some(default.to_string())
        } else {
            None
        }
    }

    pub fn dialog_log(&self) -> Vec<DialogRecord> {
        self.0.dialog_log.borrow().clone()
    }

    fn log_dialog(&self, kind: DialogKind, message: &str, blocked: bool) {
        self.0.dialog_log.borrow_mut().push(DialogRecord {
            kind,
            message: message.to_string(),
            blocked,
        });
    }

    fn find_container(&self, tag: &str) -> SnapshotNode {
        fn find(node: &SnapshotNode, tag: &str) -> Option<SnapshotNode> {
            if node.0.borrow().tag == tag {
                return Some(node.clone());
            }
            let children = node.0.borrow().children.clone();
            children.iter().find_map(|c| find(c, tag))
        }
        find(&self.0.root, tag).unwrap_or_else(|| self.0.root.clone())
    }

    fn has_element_with_id(&self, id: &str) -> bool {
        fn find(node: &SnapshotNode, id: &str) -> bool {
            if node.0.borrow().attrs.get("id").map(|v| v.as_str()) == Some(id) {
                return true;
            }
            let children = node.0.borrow().children.clone();
            children.iter().any(|c| find(c, id))
        }
        find(&self.0.root, id)
    }
}

impl DocumentImpl for SnapshotDocument {
    fn root(&self) -> DomNode {
        self.0.root.as_dom_node()
    }

    fn ready_state(&self) -> ReadyState {
        *self.0.ready_state.borrow()
    }

    fn dialogs_silenced(&self) -> bool {
        *self.0.silenced.borrow()
    }

    fn set_dialogs_silenced(&self, silenced: bool) {
        *self.0.silenced.borrow_mut() = silenced;
    }

    fn inject_style(&self, id: &str, css: &str) -> bool {
        if self.has_element_with_id(id) {
            return false;
        }
        let style = NodeBuilder::new("style").id(id).text(css).build();
        self.find_container("head").append_child(&style);
        true
    }

    fn inject_badge(&self, id: &str, text: &str) -> bool {
        if self.has_element_with_id(id) {
            return false;
        }
        let badge = NodeBuilder::new("div")
            .id(id)
            .attr(
                "style",
                "position:fixed;right:8px;bottom:8px;z-index:2147483647",
            )
            .text(text)
            .build();
        self.find_container("body").append_child(&badge);
        true
    }
}

enum ChildSpec {
    Node(NodeBuilder),
    Text { text: String, rect: Rect },
}

/// Fluent builder for snapshot trees.
pub struct NodeBuilder {
    tag: String,
    attrs: Vec<(String, String)>,
    value: Option<String>,
    style: ComputedStyle,
    rect: Rect,
    children: Vec<ChildSpec>,
    shadow: Option<Vec<NodeBuilder>>,
    content_document: Option<SnapshotDocument>,
}

impl NodeBuilder {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            attrs: Vec::new(),
            value: None,
            style: ComputedStyle::default(),
            rect: Rect::default(),
            children: Vec::new(),
            shadow: None,
            content_document: None,
        }
    }

    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attrs.push((name.to_string(), value.to_string()));
        self
    }

    pub fn id(self, id: &str) -> Self {
        self.attr("id", id)
    }

    pub fn class(self, class: &str) -> Self {
        self.attr("class", class)
    }

    pub fn value(mut self, value: &str) -> Self {
        self.value = Some(value.to_string());
        self
    }

    pub fn rect(mut self, x: f64, y: f64, width: f64, height: f64) -> Self {
        self.rect = Rect::new(x, y, width, height);
        self
    }

    pub fn display(mut self, display: &str) -> Self {
        self.style.display = display.to_string();
        self
    }

    pub fn visibility(mut self, visibility: &str) -> Self {
        self.style.visibility = visibility.to_string();
        self
    }

    pub fn opacity(mut self, opacity: f64) -> Self {
        self.style.opacity = opacity;
        self
    }

    /// Append a text child with no layout box.
    pub fn text(mut self, text: &str) -> Self {
        self.children.push(ChildSpec::Text {
            text: text.to_string(),
            rect: Rect::default(),
        });
        self
    }

    /// Append a text child with an explicit layout box (for the proximity
    /// fallback, which measures text-node rectangles).
    pub fn text_at(mut self, text: &str, x: f64, y: f64, width: f64, height: f64) -> Self {
        self.children.push(ChildSpec::Text {
            text: text.to_string(),
            rect: Rect::new(x, y, width, height),
        });
        self
    }

    pub fn child(mut self, child: NodeBuilder) -> Self {
        self.children.push(ChildSpec::Node(child));
        self
    }

    pub fn children(mut self, children: Vec<NodeBuilder>) -> Self {
        for child in children {
            self.children.push(ChildSpec::Node(child));
        }
        self
    }

    /// Attach a shadow root containing the given children.
    pub fn shadow(mut self, children: Vec<NodeBuilder>) -> Self {
        self.shadow = Some(children);
        self
    }

    /// Attach an iframe content document.
    pub fn content_document(mut self, doc: SnapshotDocument) -> Self {
        self.content_document = Some(doc);
        self
    }

    fn build(self) -> SnapshotNode {
        let node = SnapshotNode::new_element(&self.tag);
        {
            let mut data = node.0.borrow_mut();
            for (name, value) in self.attrs {
                data.attrs.insert(name, value);
            }
            data.value = self.value;
            data.style = self.style;
            data.rect = self.rect;
            data.content_document = self.content_document;
        }
        for child in self.children {
            match child {
                ChildSpec::Node(builder) => node.append_child(&builder.build()),
                ChildSpec::Text { text, rect } => {
                    node.append_child(&SnapshotNode::new_text(&text, rect))
                }
            }
        }
        if let Some(shadow_children) = self.shadow {
            node.attach_shadow(shadow_children.into_iter().map(|b| b.build()).collect());
        }
        node
    }
}

// ---------------------------------------------------------------------------
// Serialized snapshot format
// ---------------------------------------------------------------------------

fn default_tag() -> String {
    "div".to_string()
}

fn default_opacity() -> f64 {
    1.0
}

#[derive(Debug, Deserialize)]
struct StyleSpec {
    #[serde(default)]
    display: Option<String>,
    #[serde(default)]
    visibility: Option<String>,
    #[serde(default = "default_opacity")]
    opacity: f64,
}

#[derive(Debug, Deserialize)]
struct RectSpec {
    #[serde(default)]
    x: f64,
    #[serde(default)]
    y: f64,
    #[serde(default)]
    width: f64,
    #[serde(default)]
    height: f64,
}

#[derive(Debug, Deserialize)]
struct NodeSpec {
    #[serde(default = "default_tag")]
    tag: String,
    #[serde(default)]
    attrs: BTreeMap<String, String>,
    /// Element shorthand: appended as a text child. For `#text` nodes this
    /// is the node content itself.
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    value: Option<String>,
    #[serde(default)]
    style: Option<StyleSpec>,
    #[serde(default)]
    rect: Option<RectSpec>,
    #[serde(default)]
    children: Vec<NodeSpec>,
    #[serde(default)]
    shadow: Vec<NodeSpec>,
    #[serde(default, rename = "contentDocument")]
    content_document: Option<Box<DocumentSpec>>,
}

fn default_ready_state() -> ReadyState {
    ReadyState::Complete
}

#[derive(Debug, Deserialize)]
struct DocumentSpec {
    #[serde(default = "default_ready_state", rename = "readyState")]
    ready_state: ReadyState,
    root: NodeSpec,
}

impl DocumentSpec {
    fn into_document(self) -> SnapshotDocument {
        SnapshotDocument::build_with_ready_state(self.root.into_builder(), self.ready_state)
    }
}

impl NodeSpec {
    fn into_builder(self) -> NodeBuilder {
        let mut builder = NodeBuilder::new(&self.tag);
        for (name, value) in &self.attrs {
            builder = builder.attr(name, value);
        }
        if let Some(value) = &self.value {
            builder = builder.value(value);
        }
        if let Some(style) = self.style {
            if let Some(display) = style.display {
                builder = builder.display(&display);
            }
            if let Some(visibility) = style.visibility {
                builder = builder.visibility(&visibility);
            }
            builder = builder.opacity(style.opacity);
        }
        if let Some(rect) = self.rect {
            builder = builder.rect(rect.x, rect.y, rect.width, rect.height);
        }
        if let Some(text) = &self.text {
            builder = builder.text(text);
        }
        for child in self.children {
            if child.tag == "#text" {
                let rect = child
                    .rect
                    .as_ref()
                    .map(|r| (r.x, r.y, r.width, r.height))
                    .unwrap_or((0.0, 0.0, 0.0, 0.0));
                builder = builder.text_at(
                    child.text.as_deref().unwrap_or_default(),
                    rect.0,
                    rect.1,
                    rect.2,
                    rect.3,
                );
            } else {
                builder = builder.child(child.into_builder());
            }
        }
        if !self.shadow.is_empty() {
            builder = builder.shadow(self.shadow.into_iter().map(|s| s.into_builder()).collect());
        }
        if let Some(content) = self.content_document {
            builder = builder.content_document(content.into_document());
        }
        builder
    }
}
