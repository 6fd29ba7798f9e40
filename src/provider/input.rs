//! InputEventSource trait — exclusive keyboard capture and event delivery.

use tokio::sync::mpsc::UnboundedReceiver;

use super::ProviderError;

/// Whether a key went down or came up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyEventKind {
    Down,
    Up,
}

/// The keys hint mode treats specially. Everything else is `Other`
/// and only matters if it carries text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Escape,
    /// Backward delete (BackSpace on PC keyboards).
    Delete,
    Space,
    /// Platform key symbol.
    Other(u32),
}

/// Modifier keys held while the event was generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    pub shift: bool,
    pub control: bool,
    pub alt: bool,
    /// Command / Super / Windows key.
    pub meta: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        shift: false,
        control: false,
        alt: false,
        meta: false,
    };
}

/// A key event as delivered by the platform, before classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawKeyEvent {
    pub kind: KeyEventKind,
    pub key: Key,
    /// Character the key produces with modifiers ignored, if printable.
    pub text: Option<char>,
    pub modifiers: Modifiers,
}

impl RawKeyEvent {
    /// A key-down for a printable character.
    pub fn char(c: char, modifiers: Modifiers) -> Self {
        Self {
            kind: KeyEventKind::Down,
            key: Key::Other(c as u32),
            text: Some(c),
            modifiers,
        }
    }

    /// A key-down for a named key with no text.
    pub fn named(key: Key) -> Self {
        Self {
            kind: KeyEventKind::Down,
            key,
            text: None,
            modifiers: Modifiers::NONE,
        }
    }
}

/// Handle to an active keyboard capture.
///
/// Releasing stops delivery (the event channel closes) and gives the
/// keyboard back to other clients.
///
/// `release` may block while the source stops its delivery thread. It is
/// called from session teardown on the driving task.
pub trait KeyGrab: Send {
    fn release(self: Box<Self>);
}

/// Result of a successful `InputEventSource::subscribe()` call.
pub struct InputSubscription {
    /// Raw key events, in arrival order. Closes once the grab is released.
    pub events: UnboundedReceiver<RawKeyEvent>,
    /// Capture handle. Must be released exactly once.
    pub grab: Box<dyn KeyGrab>,
}

/// Captures the keyboard and streams raw key events.
///
/// While subscribed the source suppresses default propagation, so the
/// focused application never sees keys typed into hint mode.
///
/// `subscribe` is synchronous and may block briefly (e.g. retrying a
/// contended grab). It runs on the task driving the session.
pub trait InputEventSource: Send + Sync {
    fn subscribe(&self) -> Result<InputSubscription, ProviderError>;
}
