//! Pre-scan readiness gate: reject results while the page is still
//! asynchronously loading.
//!
//! Every probe match is verified actually visible before it short-circuits
//! the scan — frameworks routinely leave stale, hidden loader nodes in the
//! DOM and those must not block scanning forever.

use crate::config::{EngineConfig, LoaderProbe};
use crate::document::{Document, ReadyState};
use crate::node::DomNode;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Outcome of the single, bounded readiness check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Readiness {
    Ready,
    Loading { loader: String },
}

impl Readiness {
    pub fn is_ready(&self) -> bool {
        matches!(self, Readiness::Ready)
    }
}

fn probe_matches(probe: &LoaderProbe, node: &DomNode) -> bool {
    if probe
        .excluded_tags
        .iter()
        .any(|t| node.tag() == t.as_str())
    {
        return false;
    }
    if !probe.classes.iter().all(|c| node.has_class(c)) {
        return false;
    }
    if let Some(fragment) = &probe.fragment {
        if !node.has_class_fragment(fragment) {
            return false;
        }
    }
    !probe.classes.is_empty() || probe.fragment.is_some()
}

/// An active loader has a computed style that renders and a layout box.
fn is_actively_visible(node: &DomNode) -> bool {
    !node.computed_style().is_invisible() && !node.bounds().is_empty()
}

/// Run the gate once. The first visible loader convention wins; native
/// document readiness is the final check.
pub fn check_ready(doc: &Document, config: &EngineConfig) -> Readiness {
    let elements = doc.all_elements();
    for probe in &config.loader_probes {
        let matched = elements
            .iter()
            .find(|n| probe_matches(probe, n) && is_actively_visible(n));
        if let Some(node) = matched {
            debug!(loader = %probe.selector, node = ?node, "page still loading");
            return Readiness::Loading {
                loader: probe.selector.clone(),
            };
        }
    }

    if doc.ready_state() != ReadyState::Complete {
        return Readiness::Loading {
            loader: "document.readyState=loading".to_string(),
        };
    }

    Readiness::Ready
}
