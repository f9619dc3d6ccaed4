//! Input encoding: key, mouse, focus, and paste events become bytes on
//! the writable queue.

use core_events::{Key, Mods, MouseButton, MouseEvent, MouseEventKind};
use core_keymap::{KeyModes, KeyOutput};

use crate::term::{Term, TermMode, WinMode};

fn button_code(b: MouseButton) -> u32 {
    match b {
        MouseButton::Left => 0,
        MouseButton::Middle => 1,
        MouseButton::Right => 2,
    }
}

impl Term {
    fn key_modes(&self) -> KeyModes {
        let mut m = KeyModes::empty();
        if self.win.contains(WinMode::APPCURSOR) {
            m |= KeyModes::APPCURSOR;
        }
        if self.win.contains(WinMode::APPKEYPAD) {
            m |= KeyModes::APPKEYPAD;
        }
        match self.mok {
            1 => m |= KeyModes::MOK1,
            2 => m |= KeyModes::MOK2,
            _ => {}
        }
        m
    }

    /// Queue bytes the application typed at us; with local echo on they
    /// also render into the grid, control bytes shown as `^X`.
    fn tty_write_input(&mut self, bytes: &[u8]) -> bool {
        self.writable.append(bytes);
        if self.mode.contains(TermMode::ECHO) {
            self.write_codepoints(bytes, true);
            true
        } else {
            false
        }
    }

    /// Translate a key press. Returns true when the view changed and the
    /// host should redraw.
    pub fn key_event(&mut self, key: Key, mods: Mods) -> bool {
        if self.win.contains(WinMode::KBDLOCK) {
            return false;
        }
        match self.keymap.encode(key, mods, self.key_modes()) {
            None => false,
            Some(KeyOutput::Bytes(bytes)) => {
                if bytes.is_empty() {
                    false
                } else {
                    self.tty_write_input(&bytes)
                }
            }
            Some(KeyOutput::ScrollHalfPageUp) => self.scroll_view((self.row / 2) as i64),
            Some(KeyOutput::ScrollHalfPageDown) => self.scroll_view(-((self.row / 2) as i64)),
            Some(KeyOutput::PasteSelection) => {
                self.hooks.paste_request();
                false
            }
        }
    }

    /// Scroll the view window: positive goes back into history. Returns
    /// true when the offset actually moved.
    pub fn scroll_view(&mut self, delta: i64) -> bool {
        let max = (self.scr().len() - self.row) as i64;
        let new = (self.scroll as i64 + delta).clamp(0, max) as usize;
        let changed = new != self.scroll;
        self.scroll = new;
        changed
    }

    /// Focus change reports, when the application asked for them.
    pub fn focus_event(&mut self, focused: bool) {
        if self.win.contains(WinMode::FOCUS) {
            self.tty_write(if focused { b"\x1b[I" } else { b"\x1b[O" });
        }
    }

    /// Deliver pasted text, framed when bracketed paste is on. Typed
    /// keys never get the framing; only this entry point does.
    pub fn paste(&mut self, text: &str) {
        let converted = text.replace('\n', "\r");
        if self.mode.contains(TermMode::BRCKTPASTE) {
            self.tty_write(b"\x1b[200~");
        }
        self.tty_write_input(converted.as_bytes());
        if self.mode.contains(TermMode::BRCKTPASTE) {
            self.tty_write(b"\x1b[201~");
        }
    }

    /// Encode a mouse event per the active reporting mode, if any.
    pub fn mouse_event(&mut self, ev: MouseEvent) {
        if !self.win.intersects(WinMode::MOUSE) {
            return;
        }
        let x10 = self.win.contains(WinMode::MOUSEX10);
        let sgr = self.win.contains(WinMode::MOUSESGR);

        let (mut cb, release) = match ev.kind {
            MouseEventKind::Press(b) => (button_code(b), false),
            MouseEventKind::Release(b) => {
                if x10 {
                    // X10 reports presses only
                    return;
                }
                (button_code(b), true)
            }
            MouseEventKind::Motion(held) => {
                let wanted = self.win.contains(WinMode::MOUSEMANY)
                    || (self.win.contains(WinMode::MOUSEMOTION) && held.is_some());
                if !wanted || x10 {
                    return;
                }
                (held.map(button_code).unwrap_or(3) + 32, false)
            }
            MouseEventKind::ScrollUp => (64, false),
            MouseEventKind::ScrollDown => (65, false),
        };

        if !x10 {
            cb += 4 * ev.mods.contains(Mods::SHIFT) as u32
                + 8 * ev.mods.contains(Mods::ALT) as u32
                + 16 * ev.mods.contains(Mods::CTRL) as u32;
        }

        if sgr {
            let reply = format!(
                "\x1b[<{};{};{}{}",
                cb,
                ev.x + 1,
                ev.y + 1,
                if release { 'm' } else { 'M' }
            );
            self.tty_write(reply.as_bytes());
        } else {
            // the legacy framing tops out at coordinate 222
            if ev.x + 1 > 222 || ev.y + 1 > 222 {
                return;
            }
            let cb = if release { (cb & !0x3) | 3 } else { cb };
            let report = [
                0x1b,
                b'[',
                b'M',
                (32 + cb) as u8,
                (32 + ev.x as u32 + 1) as u8,
                (32 + ev.y as u32 + 1) as u8,
            ];
            self.tty_write(&report);
        }
    }
}
