//! The unit of output: a portable, multi-selector description of one DOM
//! element, sufficient to relocate it after markup change.
//!
//! Fingerprints are immutable value records once assembled; nothing in the
//! engine mutates one after it is appended to a batch, and they are never
//! persisted here — a fresh batch is produced on every scan.

use crate::context::TableContext;
use crate::label::Label;
use crate::node::Rect;
use crate::selector::{Selector, SelectorKind};
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Viewport-relative geometry, integer-rounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Geometry {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl From<Rect> for Geometry {
    fn from(rect: Rect) -> Self {
        Self {
            x: rect.x.round() as i32,
            y: rect.y.round() as i32,
            width: rect.width.round() as i32,
            height: rect.height.round() as i32,
        }
    }
}

/// Interactive state of the element at capture time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ElementState {
    pub disabled: bool,
    pub readonly: bool,
    pub required: bool,
}

/// Where the element sits when it was reached through iframe content
/// documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameContext {
    pub frame_path: String,
    pub frame_depth: usize,
}

fn is_false(value: &bool) -> bool {
    !value
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fingerprint {
    /// Ordered locators; the first entry is the primary, the rest are
    /// fallbacks tried in order.
    pub selectors: Vec<Selector>,
    pub tag: String,
    /// Native input `type`, or the tag name for non-inputs.
    pub input_kind: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub dom_id: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub class_list: Vec<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub placeholder: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub current_value: String,
    pub label: Label,
    pub geometry: Geometry,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_context: Option<TableContext>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dialog_context: Option<String>,
    /// Shadow-root boundaries crossed to reach the element.
    pub shadow_depth: usize,
    pub state: ElementState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_context: Option<FrameContext>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_autocomplete_option: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub associated_input: Option<String>,
    pub stability_score: u8,
    /// Staleness diagnostics only, never identity.
    pub captured_at: DateTime<Utc>,
}

impl Fingerprint {
    pub fn primary_selector(&self) -> Option<&Selector> {
        self.selectors.first()
    }

    /// Human-readable element name, best anchor first.
    pub fn display_name(&self) -> String {
        if !self.label.text.is_empty() {
            return self.label.text.clone();
        }
        if !self.placeholder.is_empty() {
            return self.placeholder.clone();
        }
        if !self.name.is_empty() {
            return self.name.clone();
        }
        if !self.dom_id.is_empty() {
            return self.dom_id.clone();
        }
        format!("[{}]", self.tag)
    }

    /// Derive a same-column selector for another row by rewriting the row
    /// ordinal inside the stored XPath. Selectors with no recognizable row
    /// pattern are returned unchanged, so every row resolves to the
    /// originally captured element.
    pub fn selector_for_row(&self, row_index: usize) -> Option<Selector> {
        static TR_ORDINAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"tr\[\d+\]").unwrap());
        static GRID_ROW_ORDINAL: Lazy<Regex> =
            Lazy::new(|| Regex::new(r#"(\[contains\(@class,"[^"]*row[^"]*"\)\])\[\d+\]"#).unwrap());
        static DIV_ORDINAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"div\[\d+\]").unwrap());

        let selector = self.selectors.iter().find(|s| s.kind == SelectorKind::XPath)?;
        let ordinal = row_index + 1;

        let value = if TR_ORDINAL.is_match(&selector.value) {
            TR_ORDINAL
                .replace_all(&selector.value, format!("tr[{ordinal}]"))
                .into_owned()
        } else if GRID_ROW_ORDINAL.is_match(&selector.value) {
            GRID_ROW_ORDINAL
                .replace_all(&selector.value, format!("${{1}}[{ordinal}]"))
                .into_owned()
        } else if selector.value.to_lowercase().contains("row")
            && DIV_ORDINAL.is_match(&selector.value)
        {
            DIV_ORDINAL
                .replace_all(&selector.value, format!("div[{ordinal}]"))
                .into_owned()
        } else {
            selector.value.clone()
        };

        Some(Selector::new(SelectorKind::XPath, value, selector.confidence))
    }
}

/// Anchors feeding the stability score.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct StabilityInputs {
    pub id_selector: bool,
    pub aria_label: bool,
    pub form_item_label: bool,
    pub name: bool,
    pub label: bool,
    pub class_list: bool,
}

/// Additive selector-stability score, capped at 100.
pub(crate) fn stability_score(inputs: StabilityInputs) -> u8 {
    let mut score: u32 = 0;
    if inputs.id_selector {
        score += 40;
    }
    if inputs.aria_label {
        score += 35;
    }
    if inputs.form_item_label {
        score += 25;
    }
    if inputs.name {
        score += 20;
    }
    if inputs.label {
        score += 15;
    }
    if inputs.class_list {
        score += 10;
    }
    score.min(100) as u8
}

/// Compact descriptor of one same-column/same-name sibling, enough for
/// batch operations downstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiblingRef {
    pub selectors: Vec<Selector>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub dom_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub placeholder: String,
}

/// Output of an interactive pick: the fingerprint plus sibling/column
/// context for "apply to whole column" operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PickResult {
    pub fingerprint: Fingerprint,
    pub sibling_count: usize,
    pub has_siblings: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub siblings: Vec<SiblingRef>,
}
