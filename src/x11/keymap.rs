//! Keycode → keysym translation for key press events.
//!
//! Only the unshifted keysym (column 0) of each keycode is used, which
//! gives the character a key produces with modifiers ignored. Modifiers
//! are reported separately from the event state.

use x11rb::connection::Connection;
use x11rb::protocol::xproto::{self, KeyButMask, Keycode};
use x11rb::rust_connection::RustConnection;

use super::X11Error;
use crate::provider::{Key, KeyEventKind, Modifiers, RawKeyEvent};

const XK_BACKSPACE: u32 = 0xff08;
const XK_ESCAPE: u32 = 0xff1b;
const XK_DELETE: u32 = 0xffff;
const XK_SPACE: u32 = 0x0020;

/// Keyboard mapping snapshot taken when a grab starts.
#[derive(Debug, Clone)]
pub struct Keymap {
    min_keycode: Keycode,
    keysyms_per_keycode: u8,
    keysyms: Vec<u32>,
}

impl Keymap {
    /// Fetch the current mapping from the server.
    pub fn load(conn: &RustConnection) -> Result<Self, X11Error> {
        let setup = conn.setup();
        let min_keycode = setup.min_keycode;
        let count = setup.max_keycode - min_keycode + 1;

        let reply = xproto::get_keyboard_mapping(conn, min_keycode, count)
            .map_err(X11Error::request("get_keyboard_mapping"))?
            .reply()
            .map_err(X11Error::request("get_keyboard_mapping reply"))?;

        Ok(Self::from_parts(
            min_keycode,
            reply.keysyms_per_keycode,
            reply.keysyms,
        ))
    }

    pub fn from_parts(min_keycode: Keycode, keysyms_per_keycode: u8, keysyms: Vec<u32>) -> Self {
        Self {
            min_keycode,
            keysyms_per_keycode,
            keysyms,
        }
    }

    /// Unshifted keysym for `keycode`, or `None` if unmapped.
    pub fn keysym(&self, keycode: Keycode) -> Option<u32> {
        let per = usize::from(self.keysyms_per_keycode);
        if per == 0 {
            return None;
        }
        let index = usize::from(keycode.checked_sub(self.min_keycode)?) * per;
        self.keysyms.get(index).copied().filter(|&sym| sym != 0)
    }

    /// Build a raw key event from a press/release's keycode and state.
    pub fn translate(
        &self,
        kind: KeyEventKind,
        keycode: Keycode,
        state: KeyButMask,
    ) -> RawKeyEvent {
        let keysym = self.keysym(keycode).unwrap_or(0);
        let (key, text) = classify_keysym(keysym);
        RawKeyEvent {
            kind,
            key,
            text,
            modifiers: modifiers_from_state(state),
        }
    }
}

/// Map a keysym to the keys hint mode names, plus its text if printable.
pub fn classify_keysym(keysym: u32) -> (Key, Option<char>) {
    match keysym {
        XK_ESCAPE => (Key::Escape, None),
        XK_BACKSPACE | XK_DELETE => (Key::Delete, None),
        XK_SPACE => (Key::Space, Some(' ')),
        // Latin-1 keysyms equal their code points.
        0x21..=0x7e | 0xa0..=0xff => (Key::Other(keysym), char::from_u32(keysym)),
        _ => (Key::Other(keysym), None),
    }
}

/// Decode the modifier bits of an event state. Super (Mod4) is `meta`.
pub fn modifiers_from_state(state: KeyButMask) -> Modifiers {
    Modifiers {
        shift: state.contains(KeyButMask::SHIFT),
        control: state.contains(KeyButMask::CONTROL),
        alt: state.contains(KeyButMask::MOD1),
        meta: state.contains(KeyButMask::MOD4),
    }
}
