//! Collaborator contracts — the platform-facing seams of hint mode.
//!
//! The engine never talks to a windowing system directly. Hint
//! enumeration, overlay drawing, keyboard capture, pointer synthesis,
//! cursor visibility and telemetry are all reached through the traits
//! here. Platform adapters (see [`crate::x11`]) implement them and are
//! composed into a [`ProviderSet`] at startup.

use std::sync::Arc;

pub mod cursor;
pub mod hints;
pub mod input;
pub mod overlay;
pub mod pointer;
pub mod telemetry;

pub use cursor::{CursorVisibility, HiddenCursor};
pub use hints::{
    AppHandle, FileHintSource, Hint, HintRequest, HintSource, TargetElement, WindowHandle,
};
pub use input::{
    InputEventSource, InputSubscription, Key, KeyEventKind, KeyGrab, Modifiers, RawKeyEvent,
};
pub use overlay::{LogOverlayRenderer, Overlay, OverlayRenderer, OverlayStyle};
pub use pointer::{DryRunPointer, PointerDriver};
pub use telemetry::{EventLogger, JsonlEventLogger, TracingEventLogger};

/// Errors returned by collaborator adapters.
#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum ProviderError {
    /// The Hint Source could not produce a hint list (e.g. unreadable
    /// target file, duplicate labels, query task died).
    #[error("hints: {0}")]
    Hints(String),

    /// Keyboard subscription failed (e.g. another client holds the grab,
    /// display connection lost).
    #[error("input: {0}")]
    Input(String),

    /// Synthetic pointer movement or click failed.
    #[error("pointer: {0}")]
    Pointer(String),
}

/// A composed set of collaborators.
///
/// Built once at startup and cloned into each session. Only one adapter
/// per collaborator is active at runtime.
#[derive(Clone)]
pub struct ProviderSet {
    /// Produces the labelled targets for a session.
    pub hints: Arc<dyn HintSource>,

    /// Draws labels over the selected display.
    pub overlay: Arc<dyn OverlayRenderer>,

    /// Delivers raw key presses while a session is active.
    pub input: Arc<dyn InputEventSource>,

    /// Moves the pointer and clicks on resolution.
    pub pointer: Arc<dyn PointerDriver>,

    /// Process-wide pointer cursor visibility toggle.
    pub cursor: Arc<dyn CursorVisibility>,

    /// Fire-and-forget session telemetry.
    pub telemetry: Arc<dyn EventLogger>,
}
