//! core-events: the key / mouse / focus event model.
//!
//! These are the normalized events a host (GTK, winit, a test harness)
//! hands to the terminal core. The host owns raw input translation —
//! keysym lookup, numlock state, click timing — and the core only ever
//! sees this vocabulary. Keypad keys come pre-split by numlock state
//! because the encodings differ: a numlocked KP4 is a digit or an
//! application-keypad sequence, a non-numlocked KP4 aliases Left.

use std::fmt;

bitflags::bitflags! {
    /// Modifier state accompanying a key or mouse event.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct Mods: u8 {
        const CTRL  = 1 << 0;
        const SHIFT = 1 << 1;
        const ALT   = 1 << 2;
        const META  = 1 << 3;
    }
}

impl Mods {
    /// xterm's modifier parameter: `1 + shift(1) + alt(2) + ctrl(4) +
    /// meta(8)`, as substituted into `CSI 1;P` style sequences.
    pub fn xterm_param(self) -> u32 {
        1 + self.contains(Mods::SHIFT) as u32
            + 2 * self.contains(Mods::ALT) as u32
            + 4 * self.contains(Mods::CTRL) as u32
            + 8 * self.contains(Mods::META) as u32
    }
}

/// A logical key. `Ascii` covers 0x00..=0x7F exactly as the host decoded
/// it (so Ctrl-translated control bytes do NOT appear here; the keymap
/// does that translation itself). Everything else is a named key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Key {
    /// A printable-range or control keycode, 0x00..=0x7F.
    Ascii(u8),
    Home,
    End,
    Insert,
    Delete,
    PgUp,
    PgDn,
    Backspace,
    Enter,
    Tab,
    Esc,
    Up,
    Down,
    Right,
    Left,
    /// Numlocked keypad digit 0..=9.
    Kp(u8),
    KpAsterisk,
    KpMinus,
    KpPlus,
    KpComma,
    KpSlash,
    KpEnter,
    /// Keypad digit 0..=9 without numlock (aliases navigation keys).
    KpUnlocked(u8),
    KpCommaUnlocked,
    /// Function key 1..=63.
    F(u8),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct KeyEvent {
    pub key: Key,
    pub mods: Mods,
}

impl KeyEvent {
    pub fn new(key: Key, mods: Mods) -> Self {
        Self { key, mods }
    }
}

impl fmt::Display for KeyEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}+{:?}", self.mods, self.key)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Middle,
    Right,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MouseEventKind {
    Press(MouseButton),
    Release(MouseButton),
    /// Pointer motion; carries the held button, if any.
    Motion(Option<MouseButton>),
    ScrollUp,
    ScrollDown,
}

/// A mouse event in terminal cell coordinates (0-based column/row of the
/// visible window).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MouseEvent {
    pub kind: MouseEventKind,
    pub x: usize,
    pub y: usize,
    pub mods: Mods,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn xterm_param_weights() {
        assert_eq!(Mods::empty().xterm_param(), 1);
        assert_eq!(Mods::SHIFT.xterm_param(), 2);
        assert_eq!(Mods::ALT.xterm_param(), 3);
        assert_eq!((Mods::CTRL | Mods::SHIFT).xterm_param(), 6);
        assert_eq!(
            (Mods::CTRL | Mods::SHIFT | Mods::ALT | Mods::META).xterm_param(),
            16
        );
    }

    #[test]
    fn key_event_display_names_mods() {
        let ev = KeyEvent::new(Key::Ascii(b'a'), Mods::CTRL);
        assert!(format!("{ev}").contains("CTRL"));
    }
}
