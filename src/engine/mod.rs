//! The hint mode engine: classification, matching, display selection,
//! action execution and the session state machine that ties them together.
//!
//! Nothing in here touches a windowing system. Everything platform-facing
//! goes through [`crate::provider`].

pub mod action;
pub mod controller;
pub mod driver;
pub mod intent;
pub mod screen;
pub mod session;

pub use action::ActionError;
pub use controller::HintModeController;
pub use intent::{HintAction, Intent, classify};
pub use screen::{Display, select_display};
pub use session::{
    Outcome, PendingQuery, PhaseKind, Resolution, Session, SessionError, SessionId,
    SessionObserver, SessionTarget, Step, TargetWindow, resolve,
};
