//! Resize-and-reflow behavior: text preservation, cursor migration,
//! scrollback interaction.

mod common;

use common::{logical_lines, row_text, term, term_recorded, term_with_history};
use core_cells::GlyphAttr;
use pretty_assertions::assert_eq;

#[test]
fn reflow_preserves_text_across_width_chain() {
    let mut t = term_with_history(12, 6, 200);
    t.feed(b"the quick brown fox jumps over the lazy dog\r\n");
    t.feed(b"pack my box with five dozen liquor jugs\r\n");
    t.feed(b"sphinx of black quartz\r\n");
    let reference = logical_lines(&t);
    assert_eq!(reference[0], "the quick brown fox jumps over the lazy dog");

    for (cols, rows) in [(7, 6), (30, 4), (3, 8), (44, 6), (12, 6)] {
        t.resize(cols, rows).expect("resize");
        assert_eq!(
            logical_lines(&t),
            reference,
            "text changed at {cols}x{rows}"
        );
    }
}

#[test]
fn reflow_rejoins_and_resplits_wrapped_lines() {
    let mut t = term(10, 6);
    t.feed(&[b'x'; 25]);
    // 10 + 10 + 5
    assert!(t.line(t.term2abs(0)).glyph(9).attr.contains(GlyphAttr::WRAP));
    assert!(t.line(t.term2abs(1)).glyph(9).attr.contains(GlyphAttr::WRAP));

    t.resize(25, 6).expect("resize");
    assert_eq!(row_text(&t, 0), "x".repeat(25));
    assert!(!t.line(t.term2abs(0)).glyph(24).attr.contains(GlyphAttr::WRAP));

    t.resize(8, 6).expect("resize");
    assert_eq!(row_text(&t, 0), "xxxxxxxx");
    assert!(t.line(t.term2abs(0)).glyph(7).attr.contains(GlyphAttr::WRAP));
    assert_eq!(logical_lines(&t), vec!["x".repeat(25)]);
}

#[test]
fn cursor_lands_next_to_its_glyph() {
    let mut t = term(80, 24);
    t.feed(b"hello world");
    assert_eq!(t.cursor(), (11, 0));

    t.resize(8, 24).expect("resize");
    // "hello wo" / "rld"; the cursor parks after the final glyph
    assert_eq!(t.cursor(), (3, 1));
    let line = t.line(t.term2abs(1));
    assert_eq!(line.glyph(2).u, 'd');

    t.resize(80, 24).expect("resize");
    assert_eq!(t.cursor(), (11, 0));
}

#[test]
fn wrap_latch_survives_reflow_at_the_edge() {
    let mut t = term(10, 6);
    t.feed(&[b'a'; 10]);
    assert!(t.wrap_next());
    assert_eq!(t.cursor(), (9, 0));

    // still exactly full at the new width: latch stays armed
    t.resize(5, 6).expect("resize");
    assert!(t.wrap_next());
    assert_eq!(t.cursor(), (4, 1));
    assert_eq!(logical_lines(&t), vec!["a".repeat(10)]);
}

#[test]
fn shrinking_rows_moves_top_lines_into_scrollback() {
    let mut t = term_with_history(10, 5, 100);
    for s in ["one", "two", "three", "four", "five"] {
        t.feed(s.as_bytes());
        if s != "five" {
            t.feed(b"\r\n");
        }
    }
    t.resize(10, 3).expect("resize");
    assert_eq!(row_text(&t, 0), "three     ");
    assert_eq!(row_text(&t, 1), "four      ");
    assert_eq!(row_text(&t, 2), "five      ");
    // nothing was lost, it scrolled back
    assert_eq!(t.screen_len(), 5);
    assert_eq!(
        logical_lines(&t),
        vec!["one", "two", "three", "four", "five"]
    );
}

#[test]
fn trimming_only_follows_the_live_cursor() {
    let mut t = term_with_history(10, 5, 100);
    // cursor stays on the first row; shrinking must trim the bottom
    // rather than push the cursor's row off screen
    t.feed(b"top");
    t.resize(10, 2).expect("resize");
    assert_eq!(t.cursor(), (3, 0));
    assert_eq!(row_text(&t, 0), "top       ");
    assert_eq!(t.screen_len(), 2);
}

#[test]
fn saved_cursor_collapses_when_its_line_is_trimmed() {
    let mut t = term_with_history(10, 5, 100);
    t.feed(b"a\r\nb\r\nc\r\nd\r\ne");
    // save a cursor at the bottom, then park the live cursor on row 0
    t.feed(b"\x1b7\x1b[1;1H");
    t.resize(10, 3).expect("resize");
    // the live cursor pins the view to the top, so the bottom rows were
    // trimmed; the saved cursor's line is gone and it collapses
    assert_eq!(t.cursor(), (0, 0));
    assert_eq!(t.screen_len(), 3);
    assert_eq!(row_text(&t, 0), "a         ");
    t.feed(b"\x1b8");
    assert_eq!(t.cursor(), (0, 0));
}

#[test]
fn altscreen_cap_tracks_rows() {
    let mut t = term(10, 5);
    t.feed(b"\x1b[?1049h");
    t.feed(b"alt");
    t.resize(20, 8).expect("resize");
    assert_eq!(t.screen_len(), 8);
    for _ in 0..20 {
        t.feed(b"x\r\n");
    }
    assert_eq!(t.screen_len(), 8, "altscreen must not grow scrollback");
    t.feed(b"\x1b[?1049l");
    assert_eq!(t.screen_len(), 8);
}

#[test]
fn wide_glyphs_reflow_as_units() {
    let mut t = term(4, 6);
    t.feed("界界界".as_bytes());
    // two per... only two cells each: rows are 界界 / 界
    assert_eq!(t.cursor(), (2, 1));

    t.resize(6, 6).expect("resize");
    let line = t.line(t.term2abs(0));
    assert_eq!(line.glyph(0).u, '界');
    assert!(line.glyph(0).attr.contains(GlyphAttr::WIDE));
    assert!(line.glyph(1).attr.contains(GlyphAttr::WDUMMY));
    assert_eq!(line.glyph(2).u, '界');
    assert_eq!(line.glyph(4).u, '界');
}

#[test]
fn tab_stops_extend_on_widening() {
    let mut t = term(20, 4);
    t.resize(40, 4).expect("resize");
    t.feed(b"\t");
    assert_eq!(t.cursor(), (8, 0));
    t.feed(b"\t\t\t");
    assert_eq!(t.cursor(), (32, 0));
}

#[test]
fn resize_notifies_the_host() {
    let (mut t, rec) = term_recorded(20, 5);
    rec.take();
    t.resize(30, 10).expect("resize");
    assert!(rec.take().contains(&"resize:10x30".to_string()));
}

#[test]
fn degenerate_sizes_are_rejected() {
    let mut t = term(20, 5);
    assert!(t.resize(0, 5).is_err());
    assert!(t.resize(5, 0).is_err());
    // still fully functional
    t.feed(b"ok");
    assert_eq!(&row_text(&t, 0)[..2], "ok");
}

#[test]
fn reflow_to_single_column_and_back() {
    let mut t = term(10, 4);
    t.feed(b"abc");
    t.resize(1, 4).expect("resize");
    assert_eq!(logical_lines(&t), vec!["abc"]);
    t.resize(10, 4).expect("resize");
    assert_eq!(logical_lines(&t), vec!["abc"]);
    assert_eq!(row_text(&t, 0), "abc       ");
}
