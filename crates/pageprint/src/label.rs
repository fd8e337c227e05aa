//! Label inference: a priority-ordered chain of independent strategies,
//! evaluated left-to-right, first non-empty result wins.
//!
//! Ordering encodes decreasing reliability: explicit semantic association
//! survives redesigns that move pixels, so geometry runs last and only in
//! scan mode (it is also the only strategy that walks every text node in
//! the scope).

use crate::config::EngineConfig;
use crate::context;
use crate::node::DomNode;
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Which strategy produced the label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LabelSource {
    ExplicitFor,
    WrappingLabel,
    AriaLabel,
    AriaLabelledby,
    AdjacentSibling,
    FrameworkFormItem,
    TableHeader,
    VisualProximity,
    PlaceholderFallback,
}

/// Inferred label. `text` may be empty (final fallback), never absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    pub text: String,
    pub source: LabelSource,
}

impl Label {
    fn new(text: impl Into<String>, source: LabelSource) -> Self {
        Self {
            text: text.into(),
            source,
        }
    }
}

/// Scan mode enables the visual-proximity fallback; pick mode does not
/// (the picker has its own dedicated header search).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InferenceMode {
    Scan,
    Pick,
}

type Strategy = fn(&DomNode, &DomNode, &EngineConfig) -> Option<Label>;

/// Infer the best label for `node`. `scope` is the node's scope root (the
/// document root, or the shadow root for shadow content).
pub fn infer_label(
    node: &DomNode,
    scope: &DomNode,
    config: &EngineConfig,
    mode: InferenceMode,
) -> Label {
    let strategies: &[Strategy] = &[
        explicit_for,
        wrapping_label,
        aria_label,
        aria_labelledby,
        adjacent_sibling,
        framework_form_item,
        table_header,
    ];
    for strategy in strategies {
        if let Some(label) = strategy(node, scope, config) {
            if !label.text.is_empty() {
                trace!(source = ?label.source, text = %label.text, "label strategy matched");
                return label;
            }
        }
    }
    if mode == InferenceMode::Scan {
        if let Some(label) = visual_proximity(node, scope, config) {
            return label;
        }
    }
    fallback(node)
}

fn scope_elements(scope: &DomNode) -> Vec<DomNode> {
    let mut out = vec![scope.clone()];
    out.extend(scope.descendants());
    out
}

/// Strip trailing colon/asterisk punctuation, ASCII and full-width.
pub(crate) fn trim_label_punctuation(text: &str) -> String {
    text.trim()
        .trim_end_matches(|c| matches!(c, ':' | '：' | '*' | '＊') || c.is_whitespace())
        .to_string()
}

fn explicit_for(node: &DomNode, scope: &DomNode, _config: &EngineConfig) -> Option<Label> {
    let id = node.id()?;
    let label = scope_elements(scope).into_iter().find(|n| {
        n.tag() == "label" && n.attribute("for").as_deref() == Some(id.as_str())
    })?;
    Some(Label::new(label.text_content(), LabelSource::ExplicitFor))
}

fn wrapping_label(node: &DomNode, _scope: &DomNode, _config: &EngineConfig) -> Option<Label> {
    let label = node.ancestors().into_iter().find(|a| a.tag() == "label")?;
    let mut text = String::new();
    collect_text_excluding_controls(&label, &mut text);
    let mut text = text.trim().to_string();
    if let Some(value) = node.value() {
        if !value.is_empty() {
            text = text.replacen(&value, "", 1).trim().to_string();
        }
    }
    Some(Label::new(text, LabelSource::WrappingLabel))
}

fn collect_text_excluding_controls(node: &DomNode, out: &mut String) {
    for child in node.children() {
        if child.is_text() {
            out.push_str(&child.own_text());
        } else if !matches!(child.tag().as_str(), "input" | "select" | "textarea") {
            collect_text_excluding_controls(&child, out);
        }
    }
}

fn aria_label(node: &DomNode, _scope: &DomNode, _config: &EngineConfig) -> Option<Label> {
    let text = node.attribute("aria-label")?;
    Some(Label::new(text.trim(), LabelSource::AriaLabel))
}

fn aria_labelledby(node: &DomNode, scope: &DomNode, _config: &EngineConfig) -> Option<Label> {
    let ids = node.attribute("aria-labelledby")?;
    let elements = scope_elements(scope);
    let parts: Vec<String> = ids
        .split_whitespace()
        .filter_map(|id| {
            elements
                .iter()
                .find(|n| n.id().as_deref() == Some(id))
                .map(|n| n.text_content())
        })
        .filter(|t| !t.is_empty())
        .collect();
    Some(Label::new(parts.join(" "), LabelSource::AriaLabelledby))
}

fn adjacent_sibling(node: &DomNode, _scope: &DomNode, _config: &EngineConfig) -> Option<Label> {
    let sibling = node.previous_element_sibling()?;
    if !matches!(sibling.tag().as_str(), "label" | "span") {
        return None;
    }
    Some(Label::new(
        sibling.text_content(),
        LabelSource::AdjacentSibling,
    ))
}

/// Nearest framework form-item ancestor plus its label-child text, shared
/// with the selector chain's label-anchored strategy.
pub(crate) fn form_item_label(
    node: &DomNode,
    config: &EngineConfig,
) -> Option<(DomNode, String)> {
    let item = node.ancestors().into_iter().find(|a| {
        config
            .form_item_fragments
            .iter()
            .any(|f| a.has_class_fragment(f))
    })?;
    let label_node = item
        .descendants()
        .into_iter()
        .find(|d| {
            config
                .form_item_label_fragments
                .iter()
                .any(|f| d.has_class_fragment(f))
        })
        .or_else(|| item.descendants().into_iter().find(|d| d.tag() == "label"))?;
    let text = trim_label_punctuation(&label_node.text_content());
    if text.is_empty() {
        return None;
    }
    Some((item, text))
}

fn framework_form_item(node: &DomNode, _scope: &DomNode, config: &EngineConfig) -> Option<Label> {
    let (_, text) = form_item_label(node, config)?;
    Some(Label::new(text, LabelSource::FrameworkFormItem))
}

fn table_header(node: &DomNode, scope: &DomNode, _config: &EngineConfig) -> Option<Label> {
    let ctx = context::table_context(node, scope)?;
    if ctx.header_text.is_empty() {
        return None;
    }
    Some(Label::new(ctx.header_text, LabelSource::TableHeader))
}

/// Geometric fallback: bucket nearby text nodes left/above/right of the
/// target, prefer left over above over right, halve the priority number
/// when target and text share a section-like container, and break ties by
/// center distance.
fn visual_proximity(node: &DomNode, scope: &DomNode, config: &EngineConfig) -> Option<Label> {
    let target = node.bounds();
    if target.is_empty() {
        return None;
    }
    let p = &config.proximity;
    let (tcx, tcy) = target.center();

    let mut best: Option<(f64, f64, String)> = None;
    for text_node in scope.text_descendants() {
        let content = text_node.own_text().trim().to_string();
        if content.is_empty() || content.chars().count() > p.max_text_len {
            continue;
        }
        if let Some(parent) = text_node.parent() {
            if matches!(parent.tag().as_str(), "script" | "style") {
                continue;
            }
        }
        let rect = text_node.bounds();
        if rect.is_empty() {
            continue;
        }
        let (cx, cy) = rect.center();

        let priority = if rect.right() <= target.x
            && target.x - rect.right() <= p.left_radius
            && (cy - tcy).abs() <= p.max_cross_gap
        {
            1.0
        } else if rect.bottom() <= target.y
            && target.y - rect.bottom() <= p.above_radius
            && (cx - tcx).abs() <= p.max_cross_gap
        {
            2.0
        } else if rect.x >= target.right()
            && rect.x - target.right() <= p.right_radius
            && (cy - tcy).abs() <= p.max_cross_gap
        {
            3.0
        } else {
            continue;
        };

        let priority = if shares_section_container(node, &text_node, config) {
            priority / 2.0
        } else {
            priority
        };
        let distance = ((cx - tcx).powi(2) + (cy - tcy).powi(2)).sqrt();

        let candidate = (priority, distance, content);
        match &best {
            Some((bp, bd, _)) if (priority, distance) >= (*bp, *bd) => {}
            _ => best = Some(candidate),
        }
    }

    best.map(|(_, _, text)| Label::new(text, LabelSource::VisualProximity))
}

fn shares_section_container(a: &DomNode, b: &DomNode, config: &EngineConfig) -> bool {
    let matches_pattern = |n: &DomNode| {
        config
            .section_container_fragments
            .iter()
            .any(|f| n.has_class_fragment(f))
            || matches!(n.tag().as_str(), "form" | "fieldset" | "section")
    };
    let a_containers: Vec<DomNode> = a
        .ancestors()
        .into_iter()
        .filter(|n| matches_pattern(n))
        .collect();
    b.ancestors()
        .into_iter()
        .filter(|n| matches_pattern(n))
        .any(|n| a_containers.contains(&n))
}

fn fallback(node: &DomNode) -> Label {
    for attr in ["placeholder", "name", "id"] {
        if let Some(value) = node.attribute(attr) {
            if !value.is_empty() {
                return Label::new(value, LabelSource::PlaceholderFallback);
            }
        }
    }
    Label::new("", LabelSource::PlaceholderFallback)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::{NodeBuilder, SnapshotDocument};

    fn doc_with(body: NodeBuilder) -> crate::document::Document {
        SnapshotDocument::build(NodeBuilder::new("html").child(NodeBuilder::new("body").child(body)))
            .as_document()
    }

    fn infer(doc: &crate::document::Document, id: &str) -> Label {
        let node = doc.element_by_id(id).unwrap();
        infer_label(
            &node,
            &doc.root(),
            &EngineConfig::default(),
            InferenceMode::Scan,
        )
    }

    #[test]
    fn explicit_for_wins() {
        let doc = doc_with(NodeBuilder::new("div").children(vec![
            NodeBuilder::new("label").attr("for", "user").text("用户名："),
            NodeBuilder::new("input").id("user").attr("placeholder", "输入用户名"),
        ]));
        let label = infer(&doc, "user");
        assert_eq!(label.source, LabelSource::ExplicitFor);
        assert_eq!(label.text, "用户名：");
    }

    #[test]
    fn wrapping_label_strips_own_value() {
        let doc = doc_with(
            NodeBuilder::new("label")
                .text("Quantity")
                .child(NodeBuilder::new("input").id("qty").value("3")),
        );
        let label = infer(&doc, "qty");
        assert_eq!(label.source, LabelSource::WrappingLabel);
        assert_eq!(label.text, "Quantity");
    }

    #[test]
    fn aria_labelledby_resolves_ids() {
        let doc = doc_with(NodeBuilder::new("div").children(vec![
            NodeBuilder::new("span").id("t1").text("Billing"),
            NodeBuilder::new("span").id("t2").text("Address"),
            NodeBuilder::new("input")
                .id("addr")
                .attr("aria-labelledby", "t1 t2"),
        ]));
        let label = infer(&doc, "addr");
        assert_eq!(label.source, LabelSource::AriaLabelledby);
        assert_eq!(label.text, "Billing Address");
    }

    #[test]
    fn preceding_span_is_used() {
        let doc = doc_with(NodeBuilder::new("div").children(vec![
            NodeBuilder::new("span").text("电话"),
            NodeBuilder::new("input").id("tel"),
        ]));
        let label = infer(&doc, "tel");
        assert_eq!(label.source, LabelSource::AdjacentSibling);
        assert_eq!(label.text, "电话");
    }

    #[test]
    fn form_item_label_trims_fullwidth_punctuation() {
        let doc = doc_with(
            NodeBuilder::new("div").class("el-form-item").children(vec![
                NodeBuilder::new("div")
                    .class("el-form-item__label")
                    .text("身份证号：*"),
                NodeBuilder::new("div")
                    .class("el-form-item__content")
                    .child(NodeBuilder::new("input").id("idno").class("el-input__inner")),
            ]),
        );
        let label = infer(&doc, "idno");
        assert_eq!(label.source, LabelSource::FrameworkFormItem);
        assert_eq!(label.text, "身份证号");
    }

    #[test]
    fn left_text_beats_text_above() {
        let doc = doc_with(NodeBuilder::new("div").children(vec![
            NodeBuilder::new("span").text_at("上方标题", 100.0, 10.0, 60.0, 20.0),
            NodeBuilder::new("span").text_at("左侧标题", 10.0, 52.0, 80.0, 16.0),
            NodeBuilder::new("input").id("f").rect(100.0, 50.0, 150.0, 20.0),
        ]));
        let label = infer(&doc, "f");
        assert_eq!(label.source, LabelSource::VisualProximity);
        assert_eq!(label.text, "左侧标题");
    }

    #[test]
    fn long_text_is_rejected_by_proximity() {
        let long = "x".repeat(60);
        let doc = doc_with(NodeBuilder::new("div").children(vec![
            NodeBuilder::new("span").text_at(&long, 10.0, 50.0, 80.0, 16.0),
            NodeBuilder::new("input")
                .id("f")
                .attr("name", "amount")
                .rect(100.0, 50.0, 150.0, 20.0),
        ]));
        let label = infer(&doc, "f");
        assert_eq!(label.source, LabelSource::PlaceholderFallback);
        assert_eq!(label.text, "amount");
    }

    #[test]
    fn pick_mode_skips_proximity() {
        let doc = doc_with(NodeBuilder::new("div").children(vec![
            NodeBuilder::new("span").text_at("旁边", 10.0, 50.0, 40.0, 16.0),
            NodeBuilder::new("input").id("f").rect(100.0, 50.0, 150.0, 20.0),
        ]));
        let node = doc.element_by_id("f").unwrap();
        let label = infer_label(
            &node,
            &doc.root(),
            &EngineConfig::default(),
            InferenceMode::Pick,
        );
        assert_eq!(label.source, LabelSource::PlaceholderFallback);
        assert_eq!(label.text, "f");
    }

    #[test]
    fn empty_everything_yields_empty_text() {
        let doc = doc_with(NodeBuilder::new("input").id("x"));
        let node = doc.element_by_id("x").unwrap();
        // Strip the id to exercise the final empty fallback.
        let doc2 = doc_with(NodeBuilder::new("input").attr("type", "text"));
        let anon = doc2
            .root()
            .descendants()
            .into_iter()
            .find(|n| n.tag() == "input")
            .unwrap();
        let label = infer_label(
            &anon,
            &doc2.root(),
            &EngineConfig::default(),
            InferenceMode::Pick,
        );
        assert_eq!(label.text, "");
        assert_eq!(label.source, LabelSource::PlaceholderFallback);
        // id fallback still applies for the first doc
        let label = infer_label(
            &node,
            &doc.root(),
            &EngineConfig::default(),
            InferenceMode::Pick,
        );
        assert_eq!(label.text, "x");
    }
}
