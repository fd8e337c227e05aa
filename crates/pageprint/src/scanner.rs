//! Full-page traversal: enumerate interactive elements through light DOM,
//! shadow roots and modeled iframes, and assemble one fingerprint per
//! element. Per-element failures are logged and skipped; one broken
//! element never aborts the batch.

use crate::config::EngineConfig;
use crate::context;
use crate::document::Document;
use crate::errors::EngineError;
use crate::fingerprint::{
    stability_score, ElementState, Fingerprint, FrameContext, StabilityInputs,
};
use crate::label::{self, InferenceMode};
use crate::node::DomNode;
use crate::selector;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Descriptor of one iframe on the page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameInfo {
    pub index: usize,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub src: String,
    pub width: i32,
    pub height: i32,
}

/// The fixed allow-list of interactive elements.
pub(crate) fn is_interactive(node: &DomNode) -> bool {
    match node.tag().as_str() {
        "input" => {
            let kind = node.attr_or_empty("type").to_lowercase();
            !matches!(
                kind.as_str(),
                "hidden" | "button" | "submit" | "reset" | "image" | "file"
            )
        }
        "select" | "textarea" => true,
        _ => {
            node.attribute("contenteditable").as_deref() == Some("true")
                || matches!(
                    node.attr_or_empty("role").as_str(),
                    "textbox" | "combobox" | "spinbutton"
                )
        }
    }
}

/// Scan a whole document: light DOM, shadow roots (bounded), autocomplete
/// panels, then modeled iframes (bounded).
pub fn scan_document(doc: &Document, config: &EngineConfig) -> Vec<Fingerprint> {
    let mut out = Vec::new();
    scan_tree(doc, &doc.root(), 0, None, config, &mut out);
    harvest_autocomplete(doc, None, config, &mut out);
    scan_frames(doc, "", 0, config, &mut out);
    out
}

fn scan_tree(
    doc: &Document,
    scope_root: &DomNode,
    shadow_depth: usize,
    frame: Option<&FrameContext>,
    config: &EngineConfig,
    out: &mut Vec<Fingerprint>,
) {
    for node in scope_root.descendants() {
        if !is_interactive(&node) {
            continue;
        }
        if node.is_hidden() {
            continue;
        }
        match assemble_fingerprint(
            &node,
            doc,
            scope_root,
            shadow_depth,
            frame,
            config,
            InferenceMode::Scan,
        ) {
            Ok(fingerprint) => out.push(fingerprint),
            Err(error) => debug!(node = ?node, %error, "skipping element"),
        }
    }

    // Two levels of shadow nesting cover observed real-world usage; the
    // bound is a latency cap, not a correctness requirement.
    if shadow_depth < config.max_shadow_depth {
        for element in scope_root.descendants() {
            if let Some(shadow) = element.shadow_root() {
                scan_tree(doc, &shadow, shadow_depth + 1, frame, config, out);
            }
        }
    }
}

/// Build the full fingerprint for one element.
pub(crate) fn assemble_fingerprint(
    node: &DomNode,
    doc: &Document,
    scope: &DomNode,
    shadow_depth: usize,
    frame: Option<&FrameContext>,
    config: &EngineConfig,
    mode: InferenceMode,
) -> Result<Fingerprint, EngineError> {
    let selectors = selector::locate(node, doc, config);
    if selectors.is_empty() {
        return Err(EngineError::ElementDetached(format!("{node:?}")));
    }

    let tag = node.tag();
    let input_kind = if tag == "input" {
        let kind = node.attr_or_empty("type").to_lowercase();
        if kind.is_empty() {
            "text".to_string()
        } else {
            kind
        }
    } else {
        tag.clone()
    };

    let label = label::infer_label(node, scope, config, mode);
    let name = node.attr_or_empty("name");
    let class_list = node.classes();

    let inputs = StabilityInputs {
        id_selector: selectors
            .iter()
            .any(|s| s.kind == crate::selector::SelectorKind::Id),
        aria_label: !node.attr_or_empty("aria-label").is_empty(),
        form_item_label: label::form_item_label(node, config).is_some(),
        name: !name.is_empty(),
        label: !label.text.is_empty(),
        class_list: !class_list.is_empty(),
    };

    Ok(Fingerprint {
        selectors,
        tag,
        input_kind,
        name,
        dom_id: node.attr_or_empty("id"),
        class_list,
        placeholder: node.attr_or_empty("placeholder"),
        current_value: node.value_or_empty(),
        label,
        geometry: node.bounds().into(),
        table_context: context::table_context(node, scope),
        dialog_context: context::dialog_context(node, config),
        shadow_depth,
        state: ElementState {
            disabled: node.attribute("disabled").is_some(),
            readonly: node.attribute("readonly").is_some(),
            required: node.attribute("required").is_some(),
        },
        frame_context: frame.cloned(),
        is_autocomplete_option: false,
        associated_input: None,
        stability_score: stability_score(inputs),
        captured_at: Utc::now(),
    })
}

/// Second, independent pass: harvest transient floating dropdown and
/// autocomplete option lists.
fn harvest_autocomplete(
    doc: &Document,
    frame: Option<&FrameContext>,
    config: &EngineConfig,
    out: &mut Vec<Fingerprint>,
) {
    let root = doc.root();
    for panel in root.descendants() {
        let is_panel = config
            .autocomplete_panel_fragments
            .iter()
            .any(|f| panel.has_class_fragment(f));
        if !is_panel || panel.is_hidden() {
            continue;
        }

        let associated_input = associated_input_selector(&panel, doc, config);

        for option in panel.descendants() {
            let is_option = option.tag() == "li"
                || config
                    .autocomplete_option_fragments
                    .iter()
                    .any(|f| option.has_class_fragment(f));
            if !is_option || option.is_hidden() {
                continue;
            }
            let text = option.text_content();
            if text.is_empty() {
                continue;
            }

            match assemble_option_record(&option, &text, doc, frame, config) {
                Ok(mut record) => {
                    record.associated_input = associated_input.clone();
                    out.push(record);
                }
                Err(error) => debug!(node = ?option, %error, "skipping dropdown option"),
            }
        }
    }
}

fn assemble_option_record(
    option: &DomNode,
    text: &str,
    doc: &Document,
    frame: Option<&FrameContext>,
    config: &EngineConfig,
) -> Result<Fingerprint, EngineError> {
    let scope = option.scope_root();
    let mut record =
        assemble_fingerprint(option, doc, &scope, 0, frame, config, InferenceMode::Pick)?;
    record.is_autocomplete_option = true;
    record.current_value = text.to_string();
    Ok(record)
}

/// Primary selector of the input belonging to the panel's nearest
/// combobox/autocomplete wrapper, when the panel is rendered inline.
fn associated_input_selector(
    panel: &DomNode,
    doc: &Document,
    config: &EngineConfig,
) -> Option<String> {
    let wrapper = panel.ancestors().into_iter().find(|a| {
        config
            .autocomplete_wrapper_fragments
            .iter()
            .any(|f| a.has_class_fragment(f))
    })?;
    let input = wrapper
        .descendants()
        .into_iter()
        .find(|n| is_interactive(n))?;
    selector::locate(&input, doc, config)
        .first()
        .map(|s| s.value.clone())
}

/// Descend into modeled iframe content documents, bounded by
/// `max_frame_depth`, skipping frames with no reachable document or a
/// negligible layout box.
fn scan_frames(
    doc: &Document,
    parent_path: &str,
    depth: usize,
    config: &EngineConfig,
    out: &mut Vec<Fingerprint>,
) {
    if depth >= config.max_frame_depth {
        warn!(depth, "frame descent bound reached");
        return;
    }
    for (index, iframe) in doc
        .root()
        .descendants()
        .into_iter()
        .filter(|n| n.tag() == "iframe")
        .enumerate()
    {
        let rect = iframe.bounds();
        if rect.width < config.min_frame_size || rect.height < config.min_frame_size {
            continue;
        }
        let Some(frame_doc) = iframe.content_document() else {
            continue;
        };
        let path = if parent_path.is_empty() {
            format!("iframe[{index}]")
        } else {
            format!("{parent_path}->iframe[{index}]")
        };
        let frame = FrameContext {
            frame_path: path.clone(),
            frame_depth: depth + 1,
        };
        scan_tree(&frame_doc, &frame_doc.root(), 0, Some(&frame), config, out);
        harvest_autocomplete(&frame_doc, Some(&frame), config, out);
        scan_frames(&frame_doc, &path, depth + 1, config, out);
    }
}

/// Enumerate iframes on the page without entering them.
pub fn list_frames(doc: &Document) -> Vec<FrameInfo> {
    doc.root()
        .descendants()
        .into_iter()
        .filter(|n| n.tag() == "iframe")
        .enumerate()
        .map(|(index, iframe)| {
            let rect = iframe.bounds();
            FrameInfo {
                index,
                id: iframe.attr_or_empty("id"),
                name: iframe.attr_or_empty("name"),
                src: iframe.attr_or_empty("src"),
                width: rect.width.round() as i32,
                height: rect.height.round() as i32,
            }
        })
        .collect()
}
