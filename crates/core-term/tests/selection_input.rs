//! Selections, mouse reporting, and focus events.

mod common;

use common::{drain, select, term, term_recorded, term_with_history};
use core_events::{Key, Mods, MouseButton, MouseEvent, MouseEventKind};
use core_term::{SelSnap, SelType};
use pretty_assertions::assert_eq;

fn mouse(kind: MouseEventKind, x: usize, y: usize) -> MouseEvent {
    MouseEvent {
        kind,
        x,
        y,
        mods: Mods::empty(),
    }
}

#[test]
fn drag_selection_extracts_text() {
    let mut t = term(20, 5);
    t.feed(b"hello world\r\nsecond line");

    select(&mut t, (6, 0), (10, 0), SelType::Regular);
    assert_eq!(t.selection_text().as_deref(), Some("world"));
    assert!(t.selected(8, t.view2abs(0)));
    assert!(!t.selected(2, t.view2abs(0)));
}

#[test]
fn multiline_selection_gets_hard_newlines() {
    let mut t = term(20, 5);
    t.feed(b"alpha\r\nbeta");
    select(&mut t, (0, 0), (3, 1), SelType::Regular);
    assert_eq!(t.selection_text().as_deref(), Some("alpha\nbeta"));
}

#[test]
fn soft_wrapped_selection_joins_without_newline() {
    let mut t = term(5, 5);
    t.feed(b"abcdefgh"); // wraps: "abcde" + "fgh"
    select(&mut t, (0, 0), (4, 1), SelType::Regular);
    assert_eq!(t.selection_text().as_deref(), Some("abcdefgh"));
}

#[test]
fn rectangular_selection_takes_the_block() {
    let mut t = term(10, 5);
    t.feed(b"abcdef\r\nghijkl\r\nmnopqr");
    select(&mut t, (1, 0), (3, 2), SelType::Rectangular);
    assert_eq!(t.selection_text().as_deref(), Some("bcd\nhij\nnop"));
}

#[test]
fn word_snap_expands_to_word_edges() {
    let mut t = term(30, 5);
    t.feed(b"one  two-three  four");
    t.sel_start(7, 0, Some(SelSnap::Word));
    // "two-three" is one word under the default delimiters (space only)
    assert_eq!(t.selection_text().as_deref(), Some("two-three"));
}

#[test]
fn line_snap_takes_whole_logical_line() {
    let mut t = term(5, 5);
    t.feed(b"abcdefgh\r\nxyz");
    t.sel_start(2, 0, Some(SelSnap::Line));
    let text = t.selection_text().expect("selection");
    assert_eq!(text.trim_end_matches('\n'), "abcdefgh");
}

#[test]
fn printing_over_a_selection_clears_it() {
    let mut t = term(20, 5);
    t.feed(b"hello");
    select(&mut t, (0, 0), (4, 0), SelType::Regular);
    assert!(t.selection_text().is_some());
    t.feed(b"\rX");
    assert!(t.selection_text().is_none());
}

#[test]
fn selection_is_invisible_from_the_other_screen() {
    let mut t = term(20, 5);
    t.feed(b"mainline");
    select(&mut t, (0, 0), (7, 0), SelType::Regular);
    let abs = t.view2abs(0);
    assert!(t.selected(0, abs));

    t.feed(b"\x1b[?1049h");
    assert!(!t.selected(0, abs), "altscreen hides a main-screen selection");
    t.feed(b"\x1b[?1049l");
    assert!(t.selected(0, abs));
}

#[test]
fn selection_survives_scrollback_growth() {
    let mut t = term_with_history(10, 3, 100);
    t.feed(b"target\r\n");
    select(&mut t, (0, 0), (5, 0), SelType::Regular);
    // new output scrolls the buffer; the selection stays on its line
    for i in 0..5 {
        t.feed(format!("x{i}\r\n").as_bytes());
    }
    assert_eq!(t.selection_text().as_deref(), Some("target"));
}

#[test]
fn region_scroll_drags_the_selection_off() {
    let mut t = term(10, 4);
    t.feed(b"AAA\r\nBBB\r\nCCC\r\nDDD");
    select(&mut t, (0, 1), (2, 1), SelType::Regular);
    assert_eq!(t.selection_text().as_deref(), Some("BBB"));
    // scroll the full screen up enough to push the line past the top
    t.feed(b"\x1b[4S");
    assert!(t.selection_text().is_none());
}

#[test]
fn focus_reports_only_when_enabled() {
    let mut t = term(10, 3);
    t.focus_event(true);
    t.focus_event(false);
    assert!(drain(&mut t).is_empty());

    t.feed(b"\x1b[?1004h");
    t.focus_event(true);
    assert_eq!(drain(&mut t), b"\x1b[I");
    t.focus_event(false);
    assert_eq!(drain(&mut t), b"\x1b[O");
}

#[test]
fn mouse_reporting_off_by_default() {
    let mut t = term(10, 3);
    t.mouse_event(mouse(MouseEventKind::Press(MouseButton::Left), 0, 0));
    assert!(drain(&mut t).is_empty());
}

#[test]
fn normal_mouse_mode_reports_press_and_release() {
    let mut t = term(80, 24);
    t.feed(b"\x1b[?1000h");
    t.mouse_event(mouse(MouseEventKind::Press(MouseButton::Left), 4, 2));
    assert_eq!(drain(&mut t), [0x1b, b'[', b'M', 32, 32 + 5, 32 + 3]);

    t.mouse_event(mouse(MouseEventKind::Release(MouseButton::Left), 4, 2));
    assert_eq!(drain(&mut t), [0x1b, b'[', b'M', 32 + 3, 32 + 5, 32 + 3]);

    // motion is not reported at this level
    t.mouse_event(mouse(MouseEventKind::Motion(Some(MouseButton::Left)), 5, 2));
    assert!(drain(&mut t).is_empty());
}

#[test]
fn x10_mode_reports_presses_only() {
    let mut t = term(80, 24);
    t.feed(b"\x1b[?9h");
    t.mouse_event(mouse(MouseEventKind::Press(MouseButton::Middle), 0, 0));
    assert_eq!(drain(&mut t), [0x1b, b'[', b'M', 32 + 1, 32 + 1, 32 + 1]);
    t.mouse_event(mouse(MouseEventKind::Release(MouseButton::Middle), 0, 0));
    assert!(drain(&mut t).is_empty());
}

#[test]
fn button_motion_mode_reports_drags() {
    let mut t = term(80, 24);
    t.feed(b"\x1b[?1002h");
    t.mouse_event(mouse(MouseEventKind::Motion(Some(MouseButton::Left)), 7, 1));
    assert_eq!(drain(&mut t), [0x1b, b'[', b'M', 32 + 32, 32 + 8, 32 + 2]);
    // plain hover is still silent
    t.mouse_event(mouse(MouseEventKind::Motion(None), 7, 1));
    assert!(drain(&mut t).is_empty());

    t.feed(b"\x1b[?1003h");
    t.mouse_event(mouse(MouseEventKind::Motion(None), 7, 1));
    assert_eq!(drain(&mut t), [0x1b, b'[', b'M', 32 + 35, 32 + 8, 32 + 2]);
}

#[test]
fn sgr_mouse_reports_with_explicit_release() {
    let mut t = term(300, 100);
    t.feed(b"\x1b[?1000h\x1b[?1006h");
    t.mouse_event(mouse(MouseEventKind::Press(MouseButton::Right), 250, 70));
    assert_eq!(drain(&mut t), b"\x1b[<2;251;71M");
    t.mouse_event(mouse(MouseEventKind::Release(MouseButton::Right), 250, 70));
    assert_eq!(drain(&mut t), b"\x1b[<2;251;71m");
}

#[test]
fn wheel_events_and_modifiers() {
    let mut t = term(80, 24);
    t.feed(b"\x1b[?1000h");
    t.mouse_event(mouse(MouseEventKind::ScrollUp, 0, 0));
    assert_eq!(drain(&mut t), [0x1b, b'[', b'M', 32 + 64, 32 + 1, 32 + 1]);

    let mut ev = mouse(MouseEventKind::Press(MouseButton::Left), 0, 0);
    ev.mods = Mods::CTRL | Mods::SHIFT;
    t.mouse_event(ev);
    assert_eq!(drain(&mut t), [0x1b, b'[', b'M', 32 + 4 + 16, 32 + 1, 32 + 1]);
}

#[test]
fn shift_insert_asks_the_host_to_paste() {
    let (mut t, rec) = term_recorded(20, 5);
    rec.take();
    t.key_event(Key::Insert, Mods::SHIFT);
    assert!(rec.take().contains(&"paste-request".to_string()));
    assert!(drain(&mut t).is_empty(), "the paste itself comes from the host");
}

#[test]
fn kbdlock_drops_key_input() {
    let mut t = term(80, 24);
    t.feed(b"\x1b[2h");
    t.key_event(Key::Ascii(b'a'), Mods::empty());
    assert!(drain(&mut t).is_empty());
    t.feed(b"\x1b[2l");
    t.key_event(Key::Ascii(b'a'), Mods::empty());
    assert_eq!(drain(&mut t), b"a");
}

#[test]
fn appcursor_and_appkeypad_flow_from_sequences_to_keys() {
    let mut t = term(80, 24);
    t.key_event(Key::Up, Mods::empty());
    assert_eq!(drain(&mut t), b"\x1b[A");

    t.feed(b"\x1b[?1h");
    t.key_event(Key::Up, Mods::empty());
    assert_eq!(drain(&mut t), b"\x1bOA");
    t.feed(b"\x1b[?1l");

    t.feed(b"\x1b="); // DECKPAM
    t.key_event(Key::Kp(7), Mods::empty());
    assert_eq!(drain(&mut t), b"\x1bOw");
    t.feed(b"\x1b>"); // DECKPNM
    t.key_event(Key::Kp(7), Mods::empty());
    assert_eq!(drain(&mut t), b"7");
}

#[test]
fn selection_dump_goes_to_the_printer() {
    let (mut t, rec) = term_recorded(20, 5);
    t.feed(b"printme");
    select(&mut t, (0, 0), (6, 0), SelType::Regular);
    rec.take();
    t.feed(b"\x1b[2i");
    let events = rec.take();
    assert!(
        events.iter().any(|e| e.contains("printme")),
        "{events:?}"
    );
}
