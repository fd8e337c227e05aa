use serde::{Deserialize, Serialize};
use std::fmt;
use std::fmt::Debug;

/// Viewport-relative bounding box of a node, in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// A node with no layout box (the `offsetParent === null` case).
    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}

/// The subset of computed style the engine inspects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComputedStyle {
    pub display: String,
    pub visibility: String,
    pub opacity: f64,
}

impl Default for ComputedStyle {
    fn default() -> Self {
        Self {
            display: "block".to_string(),
            visibility: "visible".to_string(),
            opacity: 1.0,
        }
    }
}

impl ComputedStyle {
    /// Hidden for scan purposes: `display:none` or `visibility:hidden`.
    pub fn is_hidden(&self) -> bool {
        self.display == "none" || self.visibility == "hidden"
    }

    /// Invisible for loader purposes, where a fully transparent spinner is
    /// treated as inactive as well.
    pub fn is_invisible(&self) -> bool {
        self.is_hidden() || self.opacity == 0.0
    }
}

/// Capability interface every DOM backend must implement for a single node.
///
/// The engine never sees a concrete node type; structural walks, attribute
/// reads and the two cosmetic class writes (hover outline, flash) all go
/// through this trait. Text nodes are represented as nodes whose `tag()` is
/// `"#text"`.
pub trait DomNodeImpl: Debug {
    /// Stable identity of the underlying node within one document snapshot.
    fn object_id(&self) -> usize;

    /// Lowercase tag name, or `"#text"` for text nodes.
    fn tag(&self) -> String;

    /// The literal content of a text node, empty for elements.
    fn own_text(&self) -> String;

    /// Concatenated descendant text (light DOM only), whitespace-trimmed.
    fn text_content(&self) -> String;

    fn attribute(&self, name: &str) -> Option<String>;

    /// Live value of form controls (`input.value` and friends), which is not
    /// an attribute.
    fn value(&self) -> Option<String>;

    /// Light-DOM children, including text nodes, in document order.
    fn children(&self) -> Vec<DomNode>;

    /// Light-DOM parent. `None` at the document root and at the top of a
    /// shadow tree (shadow boundaries are not pierced by parent traversal).
    fn parent(&self) -> Option<DomNode>;

    /// Attached shadow root, if any. Modeled as a node with tag
    /// `"#shadow-root"` whose children are the shadow tree.
    fn shadow_root(&self) -> Option<DomNode>;

    /// Host element of a `"#shadow-root"` node (`shadowRoot.host`), `None`
    /// for every other node.
    fn shadow_host(&self) -> Option<DomNode>;

    /// For `<iframe>` nodes: the content document, when same-origin and
    /// reachable.
    fn content_document(&self) -> Option<crate::document::Document>;

    fn computed_style(&self) -> ComputedStyle;

    /// Viewport-relative bounding box.
    fn bounds(&self) -> Rect;

    /// Toggle a single class token. The only DOM mutation this engine
    /// performs (hover outline and flash classes).
    fn set_class_enabled(&self, class: &str, enabled: bool);

    fn clone_box(&self) -> Box<dyn DomNodeImpl>;
}

/// A DOM node handle, polymorphic over the backend implementation.
pub struct DomNode {
    inner: Box<dyn DomNodeImpl>,
}

impl DomNode {
    pub fn new(impl_: Box<dyn DomNodeImpl>) -> Self {
        Self { inner: impl_ }
    }

    pub fn object_id(&self) -> usize {
        self.inner.object_id()
    }

    pub fn tag(&self) -> String {
        self.inner.tag()
    }

    pub fn is_text(&self) -> bool {
        self.inner.tag() == "#text"
    }

    pub fn is_shadow_root(&self) -> bool {
        self.inner.tag() == "#shadow-root"
    }

    pub fn own_text(&self) -> String {
        self.inner.own_text()
    }

    pub fn text_content(&self) -> String {
        self.inner.text_content()
    }

    pub fn attribute(&self, name: &str) -> Option<String> {
        self.inner.attribute(name)
    }

    /// Attribute value or empty string.
    pub fn attr_or_empty(&self, name: &str) -> String {
        self.inner.attribute(name).unwrap_or_default()
    }

    /// Non-empty `id` attribute.
    pub fn id(&self) -> Option<String> {
        self.inner.attribute("id").filter(|s| !s.is_empty())
    }

    pub fn value(&self) -> Option<String> {
        self.inner.value()
    }

    pub fn value_or_empty(&self) -> String {
        self.inner.value().unwrap_or_default()
    }

    pub fn children(&self) -> Vec<DomNode> {
        self.inner.children()
    }

    /// Element children only (text nodes filtered out).
    pub fn element_children(&self) -> Vec<DomNode> {
        self.inner
            .children()
            .into_iter()
            .filter(|c| !c.is_text())
            .collect()
    }

    pub fn parent(&self) -> Option<DomNode> {
        self.inner.parent()
    }

    pub fn shadow_root(&self) -> Option<DomNode> {
        self.inner.shadow_root()
    }

    pub fn shadow_host(&self) -> Option<DomNode> {
        self.inner.shadow_host()
    }

    pub fn content_document(&self) -> Option<crate::document::Document> {
        self.inner.content_document()
    }

    pub fn computed_style(&self) -> ComputedStyle {
        self.inner.computed_style()
    }

    pub fn bounds(&self) -> Rect {
        self.inner.bounds()
    }

    pub fn set_class_enabled(&self, class: &str, enabled: bool) {
        self.inner.set_class_enabled(class, enabled)
    }

    /// The raw class attribute, empty string if absent.
    pub fn class_attr(&self) -> String {
        self.attr_or_empty("class")
    }

    /// Class tokens, whitespace-split.
    pub fn classes(&self) -> Vec<String> {
        self.class_attr()
            .split_whitespace()
            .map(|s| s.to_string())
            .collect()
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.class_attr().split_whitespace().any(|c| c == class)
    }

    /// Substring match against the class attribute (the `[class*=..]` case).
    pub fn has_class_fragment(&self, fragment: &str) -> bool {
        self.class_attr().contains(fragment)
    }

    pub fn is_hidden(&self) -> bool {
        self.computed_style().is_hidden()
    }

    /// Ancestor chain, nearest first, excluding `self`. Stops at shadow
    /// boundaries.
    pub fn ancestors(&self) -> Vec<DomNode> {
        let mut out = Vec::new();
        let mut current = self.parent();
        while let Some(node) = current {
            current = node.parent();
            out.push(node);
        }
        out
    }

    /// Nearest ancestor-or-self matching the predicate (the `closest()`
    /// idiom). Does not pierce shadow boundaries.
    pub fn closest(&self, pred: impl Fn(&DomNode) -> bool) -> Option<DomNode> {
        if pred(self) {
            return Some(self.clone());
        }
        self.ancestors().into_iter().find(|a| pred(a))
    }

    pub fn closest_tag(&self, tags: &[&str]) -> Option<DomNode> {
        self.closest(|n| tags.contains(&n.tag().as_str()))
    }

    /// The topmost reachable ancestor: the document root for light-DOM
    /// nodes, the `#shadow-root` node for shadow content.
    pub fn scope_root(&self) -> DomNode {
        let mut current = self.clone();
        while let Some(parent) = current.parent() {
            current = parent;
        }
        current
    }

    /// Element descendants in document order, light DOM only, excluding
    /// `self`.
    pub fn descendants(&self) -> Vec<DomNode> {
        let mut out = Vec::new();
        collect_descendants(self, false, &mut out);
        out
    }

    /// Element descendants in document order, descending into shadow roots
    /// up to `max_shadow_depth` boundaries. Light children are visited
    /// before each node's shadow content.
    pub fn descendants_piercing(&self, max_shadow_depth: usize) -> Vec<DomNode> {
        fn walk(node: &DomNode, depth: usize, max: usize, out: &mut Vec<DomNode>) {
            for child in node.children() {
                if !child.is_text() {
                    out.push(child.clone());
                    walk(&child, depth, max, out);
                }
            }
            if depth < max {
                if let Some(shadow) = node.shadow_root() {
                    for child in shadow.children() {
                        if !child.is_text() {
                            out.push(child.clone());
                            walk(&child, depth + 1, max, out);
                        }
                    }
                }
            }
        }
        let mut out = Vec::new();
        walk(self, 0, max_shadow_depth, &mut out);
        out
    }

    /// All descendant nodes including text nodes, light DOM only.
    pub fn descendants_with_text(&self) -> Vec<DomNode> {
        let mut out = Vec::new();
        collect_descendants(self, true, &mut out);
        out
    }

    /// Descendant text nodes with non-empty trimmed content.
    pub fn text_descendants(&self) -> Vec<DomNode> {
        self.descendants_with_text()
            .into_iter()
            .filter(|n| n.is_text() && !n.own_text().trim().is_empty())
            .collect()
    }

    /// 1-based position among same-tag element siblings, as used by
    /// positional XPath steps and `:nth-of-type`.
    pub fn same_tag_ordinal(&self) -> usize {
        let tag = self.tag();
        match self.parent() {
            Some(parent) => {
                let mut ordinal = 0;
                for sibling in parent.element_children() {
                    if sibling.tag() == tag {
                        ordinal += 1;
                    }
                    if sibling == *self {
                        return ordinal;
                    }
                }
                1
            }
            None => 1,
        }
    }

    /// Number of same-tag element siblings, including `self`.
    pub fn same_tag_sibling_count(&self) -> usize {
        match self.parent() {
            Some(parent) => {
                let tag = self.tag();
                parent
                    .element_children()
                    .iter()
                    .filter(|s| s.tag() == tag)
                    .count()
            }
            None => 1,
        }
    }

    /// Immediately preceding element sibling, if any.
    pub fn previous_element_sibling(&self) -> Option<DomNode> {
        let parent = self.parent()?;
        let mut previous: Option<DomNode> = None;
        for sibling in parent.element_children() {
            if sibling == *self {
                return previous;
            }
            previous = Some(sibling);
        }
        None
    }
}

fn collect_descendants(node: &DomNode, include_text: bool, out: &mut Vec<DomNode>) {
    for child in node.children() {
        let is_text = child.is_text();
        if !is_text || include_text {
            out.push(child.clone());
        }
        if !is_text {
            collect_descendants(&child, include_text, out);
        }
    }
}

impl fmt::Debug for DomNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DomNode(<{}>", self.tag())?;
        if let Some(id) = self.id() {
            write!(f, " #{id}")?;
        }
        write!(f, ")")
    }
}

impl PartialEq for DomNode {
    fn eq(&self, other: &Self) -> bool {
        self.inner.object_id() == other.inner.object_id()
    }
}

impl Eq for DomNode {}

impl std::hash::Hash for DomNode {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.inner.object_id().hash(state);
    }
}

impl Clone for DomNode {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone_box(),
        }
    }
}
