//! Intent classification — raw key events to hint mode intents.

use crate::provider::{Key, KeyEventKind, RawKeyEvent};

/// Pointer action performed on the resolved target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HintAction {
    Primary,
    Secondary,
    DoublePrimary,
}

impl HintAction {
    /// Derive the action from the modifiers held on the resolving key.
    /// Shift wins over meta.
    pub fn from_modifiers(shift: bool, meta: bool) -> Self {
        if shift {
            HintAction::Secondary
        } else if meta {
            HintAction::DoublePrimary
        } else {
            HintAction::Primary
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HintAction::Primary => "primary",
            HintAction::Secondary => "secondary",
            HintAction::DoublePrimary => "double_primary",
        }
    }
}

/// What a key press means to an active session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Exit,
    Rotate,
    Backspace,
    Advance { ch: char, action: HintAction },
}

/// Classify one raw key event. `None` means the event is ignored.
///
/// First match wins: key-up events, then escape, delete, space, then
/// anything carrying printable text.
pub fn classify(event: &RawKeyEvent) -> Option<Intent> {
    if event.kind != KeyEventKind::Down {
        return None;
    }

    match event.key {
        Key::Escape => return Some(Intent::Exit),
        Key::Delete => return Some(Intent::Backspace),
        Key::Space => return Some(Intent::Rotate),
        Key::Other(_) => {}
    }

    let ch = event.text.filter(|c| !c.is_control())?;
    let action = HintAction::from_modifiers(event.modifiers.shift, event.modifiers.meta);
    Some(Intent::Advance { ch, action })
}
