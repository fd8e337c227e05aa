//! The public facade: one `Page` per hosted document, exposing the scan,
//! pick and flash entry points at the engine's external boundary.
//!
//! Nothing escapes these entry points as an unhandled failure: scans
//! return tagged outcomes, per-selector flash failures are swallowed and
//! logged, and a panic anywhere below the scan entry point is converted
//! into the `{error, stack}` outcome rather than crashing the host.

use crate::config::EngineConfig;
use crate::document::Document;
use crate::fingerprint::{Fingerprint, PickResult};
use crate::locator;
use crate::node::DomNode;
use crate::pagination::{self, PaginationControl};
use crate::picker::{EventDisposition, HandlerResult, PageEvent, Picker};
use crate::readiness::{self, Readiness};
use crate::scanner::{self, FrameInfo};
use serde::Serialize;
use std::cell::{Cell, RefCell};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, instrument, warn};

/// Class carrying the injected flash animation (three pulses).
pub const FLASH_CLASS: &str = "pageprint-flash";

const STYLE_ID: &str = "pageprint-style";
const BADGE_ID: &str = "pageprint-indicator";

const ENGINE_CSS: &str = "\
.pageprint-pick-hover{outline:2px solid #636366 !important;outline-offset:1px;}\
.pageprint-flash{animation:pageprint-flash-pulse 0.3s ease-in-out 3;}\
@keyframes pageprint-flash-pulse{0%,100%{background-color:rgba(142,142,147,0.08);}\
50%{background-color:rgba(142,142,147,0.2);}}";

/// Result of a full-page scan, serialized in the boundary shape: a plain
/// element array, a loading sentinel, or a caught fatal error.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ScanOutcome {
    Elements(Vec<Fingerprint>),
    Loading {
        status: String,
        loader: String,
        elements: Vec<Fingerprint>,
    },
    Error {
        error: String,
        stack: String,
    },
}

impl ScanOutcome {
    fn loading(loader: String) -> Self {
        ScanOutcome::Loading {
            status: "loading".to_string(),
            loader,
            elements: Vec::new(),
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, ScanOutcome::Loading { .. })
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ScanOutcome::Error { .. })
    }

    /// The fingerprint batch of a completed scan.
    pub fn elements(&self) -> Option<&[Fingerprint]> {
        match self {
            ScanOutcome::Elements(elements) => Some(elements),
            _ => None,
        }
    }
}

/// Cosmetic flash bookkeeping. Expiry is deferred outside the scan/pick
/// call stack: expired entries are swept at the next engine entry point
/// (or an explicit sweep) and the removal only drops a CSS class.
struct Flasher {
    active: RefCell<Vec<(DomNode, Instant)>>,
    duration: Duration,
}

impl Flasher {
    fn new(duration: Duration) -> Self {
        Self {
            active: RefCell::new(Vec::new()),
            duration,
        }
    }

    fn apply(&self, node: &DomNode) {
        let mut active = self.active.borrow_mut();
        active.retain(|(existing, _)| existing != node);
        node.set_class_enabled(FLASH_CLASS, true);
        active.push((node.clone(), Instant::now() + self.duration));
    }

    fn sweep(&self) {
        let now = Instant::now();
        self.active.borrow_mut().retain(|(node, deadline)| {
            if *deadline <= now {
                node.set_class_enabled(FLASH_CLASS, false);
                false
            } else {
                true
            }
        });
    }
}

/// One engine instance bound to one hosted document.
pub struct Page {
    doc: Document,
    config: EngineConfig,
    picker: Picker,
    flasher: Flasher,
    environment_ready: Cell<bool>,
}

impl Page {
    pub fn new(doc: Document) -> Self {
        Self::with_config(doc, EngineConfig::default())
    }

    pub fn with_config(doc: Document, config: EngineConfig) -> Self {
        let flasher = Flasher::new(Duration::from_millis(config.flash_duration_ms));
        Self {
            doc,
            config,
            picker: Picker::new(),
            flasher,
            environment_ready: Cell::new(false),
        }
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Arm the silent environment once per page: dialog overrides, the
    /// engine stylesheet and the ready indicator. Every injection is
    /// guarded by an existence check, so repeats are no-ops.
    fn ensure_environment(&self) {
        if self.environment_ready.get() {
            return;
        }
        self.doc.set_dialogs_silenced(true);
        if self.doc.inject_style(STYLE_ID, ENGINE_CSS) {
            debug!("engine stylesheet injected");
        }
        if self.doc.inject_badge(BADGE_ID, "ready") {
            debug!("ready indicator injected");
        }
        self.environment_ready.set(true);
    }

    /// Synchronous full-page scan: a complete fingerprint batch, a
    /// `loading` sentinel, or a caught fatal error. Never panics across
    /// the boundary.
    #[instrument(skip(self))]
    pub fn scan_page(&self) -> ScanOutcome {
        self.flasher.sweep();
        self.ensure_environment();

        let outcome = catch_unwind(AssertUnwindSafe(|| {
            match readiness::check_ready(&self.doc, &self.config) {
                Readiness::Loading { loader } => {
                    info!(%loader, "scan deferred, page still loading");
                    ScanOutcome::loading(loader)
                }
                Readiness::Ready => {
                    let elements = scanner::scan_document(&self.doc, &self.config);
                    info!(count = elements.len(), "scan complete");
                    ScanOutcome::Elements(elements)
                }
            }
        }));

        match outcome {
            Ok(outcome) => outcome,
            Err(payload) => {
                let message = panic_message(payload);
                error!(%message, "scan failed");
                ScanOutcome::Error {
                    error: message,
                    stack: String::new(),
                }
            }
        }
    }

    #[instrument(skip(self))]
    pub fn set_pick_mode(&self, enabled: bool) {
        self.flasher.sweep();
        self.ensure_environment();
        self.picker.set_pick_mode(enabled);
        info!(enabled, "pick mode toggled");
    }

    pub fn pick_mode(&self) -> bool {
        self.picker.pick_mode()
    }

    /// Atomic read-and-clear of the single-slot pick hand-off.
    pub fn get_and_clear_picked(&self) -> Option<PickResult> {
        self.flasher.sweep();
        self.picker.take_picked()
    }

    /// Feed one captured document event through the interaction surface.
    /// `Committed` instructs the host to suppress the default action and
    /// stop propagation.
    pub fn handle_event(&self, event: PageEvent) -> EventDisposition {
        self.flasher.sweep();
        match self.picker.handle_event(event, &self.doc, &self.config) {
            HandlerResult::Ignored => EventDisposition::Ignored,
            HandlerResult::Highlighted => EventDisposition::Highlighted,
            HandlerResult::Committed(node) => {
                self.flasher.apply(&node);
                EventDisposition::Committed
            }
        }
    }

    /// Best-effort visual feedback for previously produced locators.
    /// Per-selector failures are swallowed and logged, never thrown.
    #[instrument(skip(self, selectors))]
    pub fn flash_elements(&self, selectors: &[String]) {
        self.flasher.sweep();
        self.ensure_environment();
        for raw in selectors {
            match locator::resolve(&self.doc, raw) {
                Ok(node) => self.flasher.apply(&node),
                Err(reason) => {
                    warn!(selector = %raw, %reason, "flash target not resolved");
                }
            }
        }
    }

    /// Drop expired flash classes. Also runs at every entry point; hosts
    /// with their own cadence may call it directly.
    pub fn sweep_flashes(&self) {
        self.flasher.sweep();
    }

    pub fn list_frames(&self) -> Vec<FrameInfo> {
        scanner::list_frames(&self.doc)
    }

    pub fn find_pagination_controls(&self) -> Vec<PaginationControl> {
        pagination::find_pagination_controls(&self.doc)
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unidentified panic".to_string()
    }
}
