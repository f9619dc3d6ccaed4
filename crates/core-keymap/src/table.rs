//! The xterm-compatible key table.
//!
//! Laid out in keycode order: the formulaic ASCII block first, then the
//! named keys, the keypad (numlocked and not), and the function keys.
//! Within the ASCII block the interesting rows are the ones xterm treats
//! specially: space, `/`, the digits (VT control translations on 2..=8),
//! `?`, and the `@`..DEL range whose ctrl translation is `code & 0x1f`.
//!
//! modifyOtherKeys reports use the keycode as xterm transmits it:
//! `ESC [ 27 ; P ; code ~`. Level 1 reports only combinations that have
//! no ordinary encoding (ctrl + punctuation, modified enter/tab); level 2
//! reports every modified key.

use core_events::Key;
use smallvec::smallvec;

use crate::{Action, KeyMap, Rule, RuleMask as M, Rules};

fn k(bytes: &[u8]) -> Action {
    Action::Simple(bytes.to_vec())
}

fn m(fmt: &str) -> Action {
    Action::ModFormat(fmt.to_string())
}

fn r(mask: M, action: Action) -> Rule {
    Rule { mask, action }
}

/// Shifted-punctuation row: a literal unless ctrl (at level 1) or any
/// modifier (at level 2) forces a report.
fn punct(c: u8) -> Rules {
    smallvec![
        r(M::ALTIFY | M::NO_CTRL | M::NO_ALT | M::NO_META, k(&[c])),
        r(M::CTRL | M::MOK1, m(&format!("\x1b[27;%d;{c}~"))),
        r(M::MOK2, m(&format!("\x1b[27;%d;{c}~"))),
        r(M::empty(), k(&[c])),
    ]
}

pub(crate) fn build() -> KeyMap {
    let mut map = KeyMap::empty();

    // C0 keycodes pass through untouched.
    for c in 0x00..=0x1f_u8 {
        map.set(Key::Ascii(c), smallvec![r(M::empty(), k(&[c]))]);
    }

    map.set(
        Key::Ascii(0x20),
        smallvec![
            r(M::ALTIFY | M::MOK2, m("\x1b[27;%d;32~")),
            r(M::CTRL, k(b"\0")),
            r(M::empty(), k(b" ")),
        ],
    );

    for c in 0x21..=0x2e_u8 {
        map.set(Key::Ascii(c), punct(c));
    }

    // '/' additionally owns the ctrl-/ = US translation
    map.set(
        Key::Ascii(0x2f),
        smallvec![
            r(M::ALTIFY | M::NO_CTRL | M::NO_ALT | M::NO_META, k(b"/")),
            r(M::CTRL | M::ALT | M::MOK1, m("\x1b[27;%d;47~")),
            r(M::MOK2, m("\x1b[27;%d;47~")),
            r(M::CTRL, k(b"\x1f")),
            r(M::empty(), k(b"/")),
        ],
    );

    // digits: 2..=8 carry the VT ctrl translations, 0/1/9 do not
    let digit_ctrl: [(u8, &[u8]); 7] = [
        (b'2', b"\0"),
        (b'3', b"\x1b"),
        (b'4', b"\x1c"),
        (b'5', b"\x1d"),
        (b'6', b"\x1e"),
        (b'7', b"\x1f"),
        (b'8', b"\x7f"),
    ];
    for c in [b'0', b'1', b'9'] {
        map.set(
            Key::Ascii(c),
            smallvec![
                r(M::ALTIFY | M::MOK1, m(&format!("\x1b[27;%d;{c}~"))),
                r(M::empty(), k(&[c])),
            ],
        );
    }
    for (c, ctrl) in digit_ctrl {
        map.set(
            Key::Ascii(c),
            smallvec![
                r(M::ALTIFY | M::MOK2, m(&format!("\x1b[27;%d;{c}~"))),
                r(M::CTRL | M::NO_ALT | M::NO_META, k(ctrl)),
                r(M::MOK1, m(&format!("\x1b[27;%d;{c}~"))),
                r(M::CTRL, k(ctrl)),
                r(M::empty(), k(&[c])),
            ],
        );
    }

    for c in 0x3a..=0x3e_u8 {
        map.set(Key::Ascii(c), punct(c));
    }

    // '?' also answers ctrl-? = DEL
    map.set(
        Key::Ascii(0x3f),
        smallvec![
            r(M::ALTIFY | M::NO_CTRL | M::NO_ALT | M::NO_META, k(b"?")),
            r(M::CTRL | M::MOK1, m("\x1b[27;%d;63~")),
            r(M::MOK2, m("\x1b[27;%d;63~")),
            r(M::CTRL | M::NO_ALT, k(b"\x7f")),
            r(M::empty(), k(b"?")),
        ],
    );

    // '@' through DEL: ctrl strips to the low five bits
    for c in 0x40..=0x7f_u8 {
        map.set(
            Key::Ascii(c),
            smallvec![
                r(M::ALTIFY | M::MOK2, m(&format!("\x1b[27;%d;{c}~"))),
                r(M::CTRL, k(&[c & 0x1f])),
                r(M::empty(), k(&[c])),
            ],
        );
    }

    // ---- named keys --------------------------------------------------

    map.set(
        Key::Home,
        smallvec![
            r(M::NM | M::NO_CURS, k(b"\x1b[H")),
            r(M::NM, k(b"\x1bOH")),
            r(M::empty(), m("\x1b[1;%dH")),
        ],
    );
    map.set(
        Key::End,
        smallvec![
            r(M::NM | M::NO_CURS, k(b"\x1b[F")),
            r(M::NM, k(b"\x1bOF")),
            r(M::empty(), m("\x1b[1;%dF")),
        ],
    );
    map.set(
        Key::Insert,
        smallvec![
            r(M::SHIFT, Action::ShiftInsert),
            r(M::NM, k(b"\x1b[2~")),
            r(M::empty(), m("\x1b[2;%d~")),
        ],
    );
    map.set(
        Key::Delete,
        smallvec![r(M::NM, k(b"\x1b[3~")), r(M::empty(), m("\x1b[3;%d~"))],
    );

    map.set(
        Key::PgUp,
        smallvec![
            r(M::SHIFT, Action::ShiftPgUp),
            r(M::NM, k(b"\x1b[5~")),
            r(M::empty(), m("\x1b[5;%d~")),
        ],
    );
    map.set(
        Key::PgDn,
        smallvec![
            r(M::SHIFT, Action::ShiftPgDn),
            r(M::NM, k(b"\x1b[6~")),
            r(M::empty(), m("\x1b[6;%d~")),
        ],
    );

    map.set(
        Key::Backspace,
        smallvec![
            r(M::ALTIFY | M::MOK2, m("\x1b[27;%d;8~")),
            r(M::CTRL, k(b"\x7f")),
            r(M::empty(), k(b"\x08")),
        ],
    );
    map.set(
        Key::Enter,
        smallvec![
            r(M::MOK1, m("\x1b[27;%d;13~")),
            r(M::NO_ALT, k(b"\r")),
            r(M::empty(), k(b"")),
        ],
    );
    map.set(
        Key::Tab,
        smallvec![
            r(M::SHIFT, k(b"\x1b[Z")),
            r(M::ALT, k(b"\xc2\x89")),
            r(M::MOK1, m("\x1b[27;%d;9~")),
            r(M::empty(), k(b"\t")),
        ],
    );
    map.set(Key::Esc, smallvec![r(M::empty(), k(b"\x1b"))]);

    let arrows = [
        (Key::Up, b'A'),
        (Key::Down, b'B'),
        (Key::Right, b'C'),
        (Key::Left, b'D'),
    ];
    for (key, c) in arrows {
        let c = c as char;
        map.set(
            key,
            smallvec![
                r(M::NM | M::NO_CURS, k(format!("\x1b[{c}").as_bytes())),
                r(M::NM, k(format!("\x1bO{c}").as_bytes())),
                r(M::empty(), m(&format!("\x1b[1;%d{c}"))),
            ],
        );
    }

    // ---- keypad, numlock on ------------------------------------------

    // kp0..kp9 only arrive with numlock on and shift released
    for d in 0..10_u8 {
        let c = (b'p' + d) as char;
        map.set(
            Key::Kp(d),
            smallvec![
                r(M::KPAD | M::NM, k(format!("\x1bO{c}").as_bytes())),
                r(M::KPAD, m(&format!("\x1bO%d{c}"))),
                r(M::empty(), k(&[b'0' + d])),
            ],
        );
    }

    let kp_punct: [(Key, char, &[u8], bool); 6] = [
        (Key::KpAsterisk, 'j', b"*", false),
        (Key::KpMinus, 'm', b"-", true),
        (Key::KpPlus, 'k', b"+", true),
        (Key::KpComma, 'n', b".", false),
        (Key::KpSlash, 'o', b"/", false),
        (Key::KpEnter, 'M', b"\r", false),
    ];
    for (key, c, plain, shift_blank) in kp_punct {
        let mut rules: Rules = smallvec![r(M::KPAD | M::NM, k(format!("\x1bO{c}").as_bytes()))];
        if shift_blank {
            rules.push(r(M::SHIFT, k(b"")));
        }
        rules.push(r(M::KPAD, m(&format!("\x1bO%d{c}"))));
        rules.push(r(M::empty(), k(plain)));
        map.set(key, rules);
    }

    // ---- keypad, numlock off (aliases the navigation cluster) --------

    let kp_unlocked: [(&[u8], &str); 10] = [
        (b"\x1b[2~", "\x1b[2;%d~"),
        (b"\x1b[F", "\x1b[1;%dF"),
        (b"\x1b[B", "\x1b[1;%dB"),
        (b"\x1b[6~", "\x1b[6;%d~"),
        (b"\x1b[D", "\x1b[1;%dD"),
        (b"\x1b[E", "\x1b[1;%dE"),
        (b"\x1b[C", "\x1b[1;%dC"),
        (b"\x1b[H", "\x1b[1;%dH"),
        (b"\x1b[A", "\x1b[1;%dA"),
        (b"\x1b[5~", "\x1b[5;%d~"),
    ];
    for (d, (plain, modified)) in kp_unlocked.iter().enumerate() {
        map.set(
            Key::KpUnlocked(d as u8),
            smallvec![r(M::NM, k(plain)), r(M::empty(), m(modified))],
        );
    }
    map.set(Key::KpCommaUnlocked, smallvec![r(M::empty(), k(b"."))]);

    // ---- function keys -----------------------------------------------

    let f_low: [(&[u8], &str); 12] = [
        (b"\x1bOP", "\x1b[1;%dP"),
        (b"\x1bOQ", "\x1b[1;%dQ"),
        (b"\x1bOR", "\x1b[1;%dR"),
        (b"\x1bOS", "\x1b[1;%dS"),
        (b"\x1b[15~", "\x1b[15;%d~"),
        (b"\x1b[17~", "\x1b[17;%d~"),
        (b"\x1b[18~", "\x1b[18;%d~"),
        (b"\x1b[19~", "\x1b[19;%d~"),
        (b"\x1b[20~", "\x1b[20;%d~"),
        (b"\x1b[21~", "\x1b[21;%d~"),
        (b"\x1b[23~", "\x1b[23;%d~"),
        (b"\x1b[24~", "\x1b[24;%d~"),
    ];
    for (i, (plain, modified)) in f_low.iter().enumerate() {
        map.set(
            Key::F(i as u8 + 1),
            smallvec![r(M::NM, k(plain)), r(M::empty(), m(modified))],
        );
    }

    // F13..=F63 mirror xterm's infocmp: modifier variants of F1..=F12
    // folded into dedicated keycodes (F13 is shift-F1, F25 ctrl-F1, F37
    // ctrl-shift-F1, F49 alt-F1, F61.. alt-shift-F1..F3).
    const GROUP_MOD: [u8; 5] = [2, 5, 6, 3, 4];
    for i in 0..51_usize {
        let seq = fkey_seq(GROUP_MOD[i / 12], i % 12);
        map.set(
            Key::F(13 + i as u8),
            smallvec![r(M::empty(), Action::Simple(seq.into_bytes()))],
        );
    }

    map
}

fn fkey_seq(modnum: u8, idx: usize) -> String {
    const FINALS: [char; 4] = ['P', 'Q', 'R', 'S'];
    const CODES: [u8; 8] = [15, 17, 18, 19, 20, 21, 23, 24];
    if idx < 4 {
        format!("\x1b[1;{modnum}{}", FINALS[idx])
    } else {
        format!("\x1b[{};{modnum}~", CODES[idx - 4])
    }
}
