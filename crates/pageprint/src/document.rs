use crate::node::DomNode;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::rc::Rc;

/// Native document readiness. The gate only cares whether loading has
/// finished, so `interactive` is folded into `Loading`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadyState {
    Loading,
    Complete,
}

/// The native dialog kinds intercepted while the engine is armed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DialogKind {
    Alert,
    Confirm,
    Prompt,
}

/// Capability interface for the hosting document.
///
/// Implementations are expected to preserve the original dialog handlers
/// when `set_dialogs_silenced(true)` is applied so they can be restored;
/// this engine only arms the override, it never restores it.
pub trait DocumentImpl: Debug {
    /// The root element (`<html>` in a full document).
    fn root(&self) -> DomNode;

    fn ready_state(&self) -> ReadyState;

    fn dialogs_silenced(&self) -> bool;

    /// Arm or disarm the blocking-dialog override: alert becomes a no-op,
    /// confirm resolves true, prompt resolves to its default value.
    fn set_dialogs_silenced(&self, silenced: bool);

    /// Inject a style element with the given id. Returns false when an
    /// element with that id already exists (the call is then a no-op).
    fn inject_style(&self, id: &str, css: &str) -> bool;

    /// Inject the fixed-position ready-indicator element. Same idempotence
    /// contract as `inject_style`.
    fn inject_badge(&self, id: &str, text: &str) -> bool;
}

/// Document handle, polymorphic over the backend implementation.
#[derive(Debug, Clone)]
pub struct Document {
    inner: Rc<dyn DocumentImpl>,
}

impl Document {
    pub fn new(impl_: Rc<dyn DocumentImpl>) -> Self {
        Self { inner: impl_ }
    }

    pub fn root(&self) -> DomNode {
        self.inner.root()
    }

    pub fn ready_state(&self) -> ReadyState {
        self.inner.ready_state()
    }

    pub fn dialogs_silenced(&self) -> bool {
        self.inner.dialogs_silenced()
    }

    pub fn set_dialogs_silenced(&self, silenced: bool) {
        self.inner.set_dialogs_silenced(silenced)
    }

    pub fn inject_style(&self, id: &str, css: &str) -> bool {
        self.inner.inject_style(id, css)
    }

    pub fn inject_badge(&self, id: &str, text: &str) -> bool {
        self.inner.inject_badge(id, text)
    }

    /// All light-DOM elements in document order, root included.
    pub fn all_elements(&self) -> Vec<DomNode> {
        let root = self.root();
        let mut out = vec![root.clone()];
        out.extend(root.descendants());
        out
    }

    /// Light-DOM lookup by id attribute.
    pub fn element_by_id(&self, id: &str) -> Option<DomNode> {
        self.all_elements()
            .into_iter()
            .find(|n| n.id().as_deref() == Some(id))
    }
}
