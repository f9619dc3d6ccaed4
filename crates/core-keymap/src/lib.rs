//! core-keymap: the declarative key table and its matcher.
//!
//! The goal is to masquerade as xterm: every `(key, modifiers, modes)`
//! combination maps to exactly the bytes an xterm-compatible application
//! expects, including the modifyOtherKeys extensions at levels 1 and 2.
//!
//! Each key owns an ordered list of rules. A rule's mask carries a pair
//! of bits per dimension — "do I care about X" and "which value of X
//! matches" — over the four modifiers (ctrl, shift, alt, meta) and four
//! mode flags (application cursor, application keypad, modifyOtherKeys
//! level 1 and level 2). The first rule whose selectors are all satisfied
//! wins; a key with no satisfied rule is silently dropped.
//!
//! `ALTIFY` on the first rule of a list implements metaSendsEscape: when
//! Alt is held, emit ESC, clear Alt, force both modifyOtherKeys levels
//! off, and rematch. The xterm modifier parameter computed from the
//! *original* modifier set is carried into whatever mods-format rule the
//! rematch lands on.
//!
//! The table lives in [`KeyMap::xterm`], built programmatically the way
//! the reference table is laid out: a formulaic ASCII block, then the
//! named keys, keypad, and function keys row by row.

mod table;

use core_events::{Key, Mods};
use smallvec::SmallVec;
use tracing::trace;

bitflags::bitflags! {
    /// Mode flags the matcher discriminates on, mirrored from terminal
    /// state by the caller.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct KeyModes: u8 {
        const APPCURSOR = 1 << 0;
        const APPKEYPAD = 1 << 1;
        const MOK1      = 1 << 2;
        const MOK2      = 1 << 3;
    }
}

bitflags::bitflags! {
    /// A rule's match mask: `MATCH_X` means the rule cares about
    /// dimension X, and `X_ON` gives the value it requires. The composite
    /// names (`CTRL`, `NO_CTRL`, …) are what the table is written in.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct RuleMask: u32 {
        const MATCH_CTRL  = 1 << 0;
        const CTRL_ON     = 1 << 1;
        const MATCH_SHIFT = 1 << 2;
        const SHIFT_ON    = 1 << 3;
        const MATCH_ALT   = 1 << 4;
        const ALT_ON      = 1 << 5;
        const MATCH_META  = 1 << 6;
        const META_ON     = 1 << 7;
        const MATCH_CURS  = 1 << 8;
        const CURS_ON     = 1 << 9;
        const MATCH_KPAD  = 1 << 10;
        const KPAD_ON     = 1 << 11;
        const MATCH_MOK1  = 1 << 12;
        const MOK1_ON     = 1 << 13;
        const MATCH_MOK2  = 1 << 14;
        const MOK2_ON     = 1 << 15;
        /// Only meaningful on the first rule of a key's list.
        const ALTIFY      = 1 << 31;

        const CTRL     = Self::MATCH_CTRL.bits() | Self::CTRL_ON.bits();
        const NO_CTRL  = Self::MATCH_CTRL.bits();
        const SHIFT    = Self::MATCH_SHIFT.bits() | Self::SHIFT_ON.bits();
        const NO_SHIFT = Self::MATCH_SHIFT.bits();
        const ALT      = Self::MATCH_ALT.bits() | Self::ALT_ON.bits();
        const NO_ALT   = Self::MATCH_ALT.bits();
        const META     = Self::MATCH_META.bits() | Self::META_ON.bits();
        const NO_META  = Self::MATCH_META.bits();
        const CURS     = Self::MATCH_CURS.bits() | Self::CURS_ON.bits();
        const NO_CURS  = Self::MATCH_CURS.bits();
        const KPAD     = Self::MATCH_KPAD.bits() | Self::KPAD_ON.bits();
        const NO_KPAD  = Self::MATCH_KPAD.bits();
        const MOK1     = Self::MATCH_MOK1.bits() | Self::MOK1_ON.bits();
        const NO_MOK1  = Self::MATCH_MOK1.bits();
        const MOK2     = Self::MATCH_MOK2.bits() | Self::MOK2_ON.bits();
        const NO_MOK2  = Self::MATCH_MOK2.bits();

        /// "not mods": no ctrl, shift, alt, or meta held.
        const NM = Self::NO_CTRL.bits()
            | Self::NO_SHIFT.bits()
            | Self::NO_ALT.bits()
            | Self::NO_META.bits();
    }
}

/// What a matched rule does.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Action {
    /// Emit these bytes verbatim (may be empty: match-and-emit-nothing).
    Simple(Vec<u8>),
    /// Emit the format string with `%d` replaced by the xterm modifier
    /// parameter.
    ModFormat(String),
    /// Scroll the viewport up half a screen; no bytes.
    ShiftPgUp,
    /// Scroll the viewport down half a screen; no bytes.
    ShiftPgDn,
    /// Ask the host to paste the primary selection; no bytes.
    ShiftInsert,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Rule {
    pub mask: RuleMask,
    pub action: Action,
}

pub(crate) type Rules = SmallVec<[Rule; 5]>;

/// Result of a key lookup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum KeyOutput {
    Bytes(SmallVec<[u8; 16]>),
    ScrollHalfPageUp,
    ScrollHalfPageDown,
    PasteSelection,
}

/// The key table. Indexed by [`Key`]; every entry is an ordered rule
/// list. Construct with [`KeyMap::xterm`]; the type is separate from the
/// table so tests can build reduced maps.
#[derive(Debug)]
pub struct KeyMap {
    rules: Vec<Rules>,
}

// Index space: ASCII 0x00..=0x7F, then named keys, keypad, F1..=F63.
const IDX_NAMED: usize = 128;
const IDX_KP: usize = IDX_NAMED + 14;
const IDX_KPU: usize = IDX_KP + 16;
const IDX_F: usize = IDX_KPU + 11;
const NUM_KEYS: usize = IDX_F + 63;

fn key_index(key: Key) -> usize {
    match key {
        Key::Ascii(c) => {
            debug_assert!(c < 0x80, "ascii keycode out of range: {c:#x}");
            c as usize
        }
        Key::Home => IDX_NAMED,
        Key::End => IDX_NAMED + 1,
        Key::Insert => IDX_NAMED + 2,
        Key::Delete => IDX_NAMED + 3,
        Key::PgUp => IDX_NAMED + 4,
        Key::PgDn => IDX_NAMED + 5,
        Key::Backspace => IDX_NAMED + 6,
        Key::Enter => IDX_NAMED + 7,
        Key::Tab => IDX_NAMED + 8,
        Key::Esc => IDX_NAMED + 9,
        Key::Up => IDX_NAMED + 10,
        Key::Down => IDX_NAMED + 11,
        Key::Right => IDX_NAMED + 12,
        Key::Left => IDX_NAMED + 13,
        Key::Kp(d) => {
            debug_assert!(d < 10);
            IDX_KP + d as usize
        }
        Key::KpAsterisk => IDX_KP + 10,
        Key::KpMinus => IDX_KP + 11,
        Key::KpPlus => IDX_KP + 12,
        Key::KpComma => IDX_KP + 13,
        Key::KpSlash => IDX_KP + 14,
        Key::KpEnter => IDX_KP + 15,
        Key::KpUnlocked(d) => {
            debug_assert!(d < 10);
            IDX_KPU + d as usize
        }
        Key::KpCommaUnlocked => IDX_KPU + 10,
        Key::F(n) => {
            debug_assert!((1..=63).contains(&n));
            IDX_F + (n as usize - 1)
        }
    }
}

fn rule_matches(mask: RuleMask, mods: Mods, modes: KeyModes) -> bool {
    let dims = [
        (RuleMask::MATCH_CTRL, RuleMask::CTRL_ON, mods.contains(Mods::CTRL)),
        (RuleMask::MATCH_SHIFT, RuleMask::SHIFT_ON, mods.contains(Mods::SHIFT)),
        (RuleMask::MATCH_ALT, RuleMask::ALT_ON, mods.contains(Mods::ALT)),
        (RuleMask::MATCH_META, RuleMask::META_ON, mods.contains(Mods::META)),
        (RuleMask::MATCH_CURS, RuleMask::CURS_ON, modes.contains(KeyModes::APPCURSOR)),
        (RuleMask::MATCH_KPAD, RuleMask::KPAD_ON, modes.contains(KeyModes::APPKEYPAD)),
        (RuleMask::MATCH_MOK1, RuleMask::MOK1_ON, modes.contains(KeyModes::MOK1)),
        (RuleMask::MATCH_MOK2, RuleMask::MOK2_ON, modes.contains(KeyModes::MOK2)),
    ];
    dims.iter()
        .all(|&(sel, on, actual)| !mask.contains(sel) || mask.contains(on) == actual)
}

impl KeyMap {
    pub(crate) fn empty() -> Self {
        Self {
            rules: vec![Rules::new(); NUM_KEYS],
        }
    }

    /// The xterm-compatible table.
    pub fn xterm() -> Self {
        table::build()
    }

    pub(crate) fn set(&mut self, key: Key, rules: Rules) {
        self.rules[key_index(key)] = rules;
    }

    pub fn rules_for(&self, key: Key) -> &[Rule] {
        &self.rules[key_index(key)]
    }

    /// Resolve a key event to its output. First satisfied rule wins;
    /// `None` means the event produces nothing at all.
    pub fn encode(&self, key: Key, mods: Mods, modes: KeyModes) -> Option<KeyOutput> {
        let rules = self.rules_for(key);
        let mut out: SmallVec<[u8; 16]> = SmallVec::new();
        let mut mods = mods;
        let mut modes = modes;
        let mut param_override = None;

        if let Some(first) = rules.first()
            && first.mask.contains(RuleMask::ALTIFY)
            && mods.contains(Mods::ALT)
        {
            // metaSendsEscape: ESC prefix, rematch without alt and with
            // modifyOtherKeys pinned off; any mods-format downstream uses
            // the parameter from the original modifier set.
            out.push(0x1b);
            param_override = Some(mods.xterm_param());
            mods.remove(Mods::ALT);
            modes.remove(KeyModes::MOK1 | KeyModes::MOK2);
            trace!(target: "keymap.match", ?key, "altify rematch");
        }

        for rule in rules {
            if !rule_matches(rule.mask, mods, modes) {
                continue;
            }
            trace!(target: "keymap.match", ?key, mask = ?rule.mask, "rule matched");
            return match &rule.action {
                Action::Simple(bytes) => {
                    out.extend_from_slice(bytes);
                    Some(KeyOutput::Bytes(out))
                }
                Action::ModFormat(fmt) => {
                    let p = param_override.unwrap_or_else(|| mods.xterm_param());
                    out.extend_from_slice(fmt.replace("%d", &p.to_string()).as_bytes());
                    Some(KeyOutput::Bytes(out))
                }
                Action::ShiftPgUp => Some(KeyOutput::ScrollHalfPageUp),
                Action::ShiftPgDn => Some(KeyOutput::ScrollHalfPageDown),
                Action::ShiftInsert => Some(KeyOutput::PasteSelection),
            };
        }

        trace!(target: "keymap.match", ?key, ?mods, "no rule matched, dropping");
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn bytes(out: Option<KeyOutput>) -> Vec<u8> {
        match out.expect("expected a match") {
            KeyOutput::Bytes(b) => b.to_vec(),
            other => panic!("expected bytes, got {other:?}"),
        }
    }

    fn enc(key: Key, mods: Mods, modes: KeyModes) -> Vec<u8> {
        bytes(KeyMap::xterm().encode(key, mods, modes))
    }

    #[test]
    fn plain_printables_pass_through() {
        assert_eq!(enc(Key::Ascii(b'a'), Mods::empty(), KeyModes::empty()), b"a");
        assert_eq!(enc(Key::Ascii(b'!'), Mods::SHIFT, KeyModes::empty()), b"!");
        assert_eq!(enc(Key::Ascii(b' '), Mods::empty(), KeyModes::empty()), b" ");
    }

    #[test]
    fn ctrl_letters_become_control_bytes() {
        assert_eq!(enc(Key::Ascii(b'a'), Mods::CTRL, KeyModes::empty()), b"\x01");
        assert_eq!(enc(Key::Ascii(b'z'), Mods::CTRL, KeyModes::empty()), b"\x1a");
        assert_eq!(enc(Key::Ascii(b'['), Mods::CTRL, KeyModes::empty()), b"\x1b");
        assert_eq!(enc(Key::Ascii(b' '), Mods::CTRL, KeyModes::empty()), b"\x00");
        assert_eq!(enc(Key::Ascii(b'/'), Mods::CTRL, KeyModes::empty()), b"\x1f");
        assert_eq!(enc(Key::Ascii(b'?'), Mods::CTRL, KeyModes::empty()), b"\x7f");
    }

    #[test]
    fn ctrl_digits_follow_the_vt_layout() {
        assert_eq!(enc(Key::Ascii(b'2'), Mods::CTRL, KeyModes::empty()), b"\x00");
        assert_eq!(enc(Key::Ascii(b'3'), Mods::CTRL, KeyModes::empty()), b"\x1b");
        assert_eq!(enc(Key::Ascii(b'8'), Mods::CTRL, KeyModes::empty()), b"\x7f");
        // 0 and 9 have no control translation
        assert_eq!(enc(Key::Ascii(b'0'), Mods::CTRL, KeyModes::empty()), b"0");
    }

    #[test]
    fn altify_prefixes_escape() {
        assert_eq!(enc(Key::Ascii(b'v'), Mods::ALT, KeyModes::empty()), b"\x1bv");
        assert_eq!(
            enc(Key::Ascii(b'v'), Mods::ALT | Mods::CTRL, KeyModes::empty()),
            b"\x1b\x16"
        );
        // altify also wins over modifyOtherKeys: levels are pinned off
        // for the rematch
        assert_eq!(
            enc(Key::Ascii(b'v'), Mods::ALT, KeyModes::MOK2),
            b"\x1bv"
        );
    }

    #[test]
    fn mok2_reports_modified_printables() {
        // Ctrl+Shift+! at modifyOtherKeys level 2
        assert_eq!(
            enc(Key::Ascii(0x21), Mods::CTRL | Mods::SHIFT, KeyModes::MOK2),
            b"\x1b[27;6;33~"
        );
        // plain '!' stays a literal even at level 2
        assert_eq!(enc(Key::Ascii(0x21), Mods::SHIFT, KeyModes::MOK2), b"!");
    }

    #[test]
    fn mok1_reports_ctrl_punctuation() {
        assert_eq!(
            enc(Key::Ascii(b';'), Mods::CTRL, KeyModes::MOK1),
            b"\x1b[27;5;59~"
        );
        // without the mode, ctrl-; has nothing to say
        assert_eq!(enc(Key::Ascii(b';'), Mods::CTRL, KeyModes::empty()), b";");
    }

    #[test]
    fn arrows_respect_appcursor() {
        assert_eq!(enc(Key::Up, Mods::empty(), KeyModes::empty()), b"\x1b[A");
        assert_eq!(enc(Key::Up, Mods::empty(), KeyModes::APPCURSOR), b"\x1bOA");
        assert_eq!(enc(Key::Up, Mods::CTRL, KeyModes::APPCURSOR), b"\x1b[1;5A");
    }

    #[test]
    fn home_end_modified_form() {
        assert_eq!(enc(Key::Home, Mods::empty(), KeyModes::empty()), b"\x1b[H");
        assert_eq!(enc(Key::Home, Mods::SHIFT, KeyModes::empty()), b"\x1b[1;2H");
        assert_eq!(enc(Key::End, Mods::empty(), KeyModes::APPCURSOR), b"\x1bOF");
    }

    #[test]
    fn keypad_follows_appkeypad_and_shift() {
        assert_eq!(enc(Key::Kp(5), Mods::empty(), KeyModes::empty()), b"5");
        assert_eq!(enc(Key::Kp(5), Mods::empty(), KeyModes::APPKEYPAD), b"\x1bOu");
        assert_eq!(
            enc(Key::Kp(5), Mods::CTRL, KeyModes::APPKEYPAD),
            b"\x1bO5u"
        );
        // shifted keypad minus deliberately emits nothing
        assert_eq!(
            enc(Key::KpMinus, Mods::SHIFT, KeyModes::APPKEYPAD),
            b""
        );
        assert_eq!(enc(Key::KpUnlocked(8), Mods::empty(), KeyModes::empty()), b"\x1b[A");
    }

    #[test]
    fn function_keys() {
        assert_eq!(enc(Key::F(1), Mods::empty(), KeyModes::empty()), b"\x1bOP");
        assert_eq!(enc(Key::F(1), Mods::SHIFT, KeyModes::empty()), b"\x1b[1;2P");
        assert_eq!(enc(Key::F(5), Mods::empty(), KeyModes::empty()), b"\x1b[15~");
        assert_eq!(enc(Key::F(13), Mods::empty(), KeyModes::empty()), b"\x1b[1;2P");
        assert_eq!(enc(Key::F(63), Mods::empty(), KeyModes::empty()), b"\x1b[1;4R");
    }

    #[test]
    fn tab_variants() {
        assert_eq!(enc(Key::Tab, Mods::empty(), KeyModes::empty()), b"\t");
        assert_eq!(enc(Key::Tab, Mods::SHIFT, KeyModes::empty()), b"\x1b[Z");
        assert_eq!(enc(Key::Tab, Mods::ALT, KeyModes::empty()), b"\xc2\x89");
        assert_eq!(enc(Key::Tab, Mods::empty(), KeyModes::MOK1), b"\x1b[27;1;9~");
    }

    #[test]
    fn enter_swallows_alt() {
        assert_eq!(enc(Key::Enter, Mods::empty(), KeyModes::empty()), b"\r");
        assert_eq!(enc(Key::Enter, Mods::ALT, KeyModes::empty()), b"");
    }

    #[test]
    fn shift_insert_requests_a_paste() {
        let map = KeyMap::xterm();
        assert_eq!(
            map.encode(Key::Insert, Mods::SHIFT, KeyModes::empty()),
            Some(KeyOutput::PasteSelection)
        );
        assert_eq!(
            map.encode(Key::Insert, Mods::empty(), KeyModes::empty()),
            Some(KeyOutput::Bytes(SmallVec::from_slice(b"\x1b[2~")))
        );
        assert_eq!(
            map.encode(Key::Insert, Mods::CTRL, KeyModes::empty()),
            Some(KeyOutput::Bytes(SmallVec::from_slice(b"\x1b[2;5~")))
        );
    }

    #[test]
    fn shift_paging_is_an_action_not_bytes() {
        let map = KeyMap::xterm();
        assert_eq!(
            map.encode(Key::PgUp, Mods::SHIFT, KeyModes::empty()),
            Some(KeyOutput::ScrollHalfPageUp)
        );
        assert_eq!(
            map.encode(Key::PgDn, Mods::SHIFT, KeyModes::empty()),
            Some(KeyOutput::ScrollHalfPageDown)
        );
        // unshifted paging emits bytes as usual
        assert_eq!(
            map.encode(Key::PgUp, Mods::empty(), KeyModes::empty()),
            Some(KeyOutput::Bytes(SmallVec::from_slice(b"\x1b[5~")))
        );
    }

    #[test]
    fn encoding_is_deterministic_and_first_match_wins() {
        // Sweep every key and a spread of modifier/mode combinations; the
        // encoder must return the same output twice, and that output must
        // be the first satisfied rule's.
        let map = KeyMap::xterm();
        let mut keys: Vec<Key> = (0u8..0x80).map(Key::Ascii).collect();
        keys.extend([
            Key::Home, Key::End, Key::Insert, Key::Delete, Key::PgUp, Key::PgDn,
            Key::Backspace, Key::Enter, Key::Tab, Key::Esc,
            Key::Up, Key::Down, Key::Right, Key::Left,
            Key::KpAsterisk, Key::KpMinus, Key::KpPlus, Key::KpComma,
            Key::KpSlash, Key::KpEnter, Key::KpCommaUnlocked,
        ]);
        keys.extend((0..10).map(Key::Kp));
        keys.extend((0..10).map(Key::KpUnlocked));
        keys.extend((1..=63).map(Key::F));

        for &key in &keys {
            for m in 0..16u8 {
                let mods = Mods::from_bits_truncate(m);
                for f in 0..16u8 {
                    let modes = KeyModes::from_bits_truncate(f);
                    let a = map.encode(key, mods, modes);
                    let b = map.encode(key, mods, modes);
                    assert_eq!(a, b, "non-deterministic for {key:?} {mods:?} {modes:?}");
                }
            }
        }
    }
}
