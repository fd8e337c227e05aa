//! DOM fingerprinting and semantic inference for third-party web pages.
//!
//! This crate identifies interactive elements inside arbitrary pages and
//! describes each one as a portable fingerprint — an ordered set of
//! re-resolvable selectors plus inferred label, structural context and
//! state — built to survive markup churn, framework quirks (Ant Design,
//! Element UI, iView, Vant, LayUI, Bootstrap), shadow DOM and
//! asynchronous loading.
//!
//! Two operating modes share one data model: a full-page scanner that
//! synchronously enumerates every interactive element behind a
//! page-readiness gate, and an interactive picker that highlights
//! candidates on hover and commits one fingerprint on double-click.
//!
//! The DOM itself is reached through capability traits ([`DomNodeImpl`],
//! [`DocumentImpl`]); the bundled [`snapshot`] backend provides an
//! in-memory implementation for hosts, tests and the CLI.

pub mod config;
pub mod context;
pub mod document;
pub mod engine;
pub mod errors;
pub mod fingerprint;
pub mod label;
pub mod locator;
pub mod node;
pub mod pagination;
pub mod picker;
pub mod readiness;
pub mod scanner;
pub mod selector;
pub mod snapshot;

pub use config::{DialogConvention, EngineConfig, LoaderProbe, ProximityConfig};
pub use context::TableContext;
pub use document::{DialogKind, Document, DocumentImpl, ReadyState};
pub use engine::{Page, ScanOutcome, FLASH_CLASS};
pub use errors::EngineError;
pub use fingerprint::{
    ElementState, Fingerprint, FrameContext, Geometry, PickResult, SiblingRef,
};
pub use label::{InferenceMode, Label, LabelSource};
pub use node::{ComputedStyle, DomNode, DomNodeImpl, Rect};
pub use pagination::PaginationControl;
pub use picker::{EventDisposition, PageEvent, HOVER_CLASS};
pub use readiness::Readiness;
pub use scanner::FrameInfo;
pub use selector::{Selector, SelectorKind};
pub use snapshot::{NodeBuilder, SnapshotDocument, SnapshotNode};
