//! Resize-and-reflow.
//!
//! Resizing re-wraps every logical line (runs of rows sharing a
//! `line_id`) to the new column count on a fresh ring, then migrates up
//! to three cursors: the live cursor plus the saved cursor of each
//! screen. An anchor tracks the old row its cursor sat on and the old
//! column; when that glyph is copied, the anchor learns its new
//! position. The live cursor may trim excess rows from the bottom of the
//! buffer afterwards; the saved cursors never cause trimming and simply
//! collapse to the origin if trimming would have been required.

use core_cells::{GlyphAttr, Rgb};
use core_screen::Screen;
use tracing::{debug, warn};

use crate::term::{ActiveScreen, Cursor, CursorState, Term, TermError};

pub(crate) struct CursorAnchor {
    old: Cursor,
    /// Absolute index of the row the cursor sat on in the old screen.
    old_abs: usize,
    new_abs: usize,
    new: Cursor,
    done: bool,
    invalid: bool,
}

impl CursorAnchor {
    pub(crate) fn new(old: Cursor, old_abs: usize) -> Self {
        let mut new = old;
        new.x = 0;
        new.state.remove(CursorState::WRAPNEXT);
        Self {
            old,
            old_abs,
            new_abs: 0,
            new,
            done: false,
            invalid: false,
        }
    }

    /// A glyph from old row `old_abs` column `old_x` just landed at
    /// `(new_x, new_abs)` on a row `width` cells wide.
    fn on_copyable(&mut self, old_abs: usize, old_x: usize, new_x: usize, width: usize, new_abs: usize) {
        if self.done || old_abs != self.old_abs || old_x != self.old.x {
            return;
        }
        self.new.x = new_x;
        self.new_abs = new_abs;
        if self.old.state.contains(CursorState::WRAPNEXT) {
            if self.new.x + 1 < width {
                // the wrap-pending cursor re-lands mid-line; nudge past
                // the glyph it was about to wrap away from
                self.new.x += 1;
            } else {
                // still on the edge after reflowing: re-arm the latch
                self.new.state.insert(CursorState::WRAPNEXT);
            }
        }
        self.done = true;
    }

    /// The old row finished copying without matching the anchor (the
    /// cursor pointed past the text): park at the end of the output.
    fn on_line_end(&mut self, old_abs: usize, new_x: usize, width: usize, new_abs: usize) {
        if self.done || old_abs != self.old_abs {
            return;
        }
        self.new.x = new_x;
        if self.new.x >= width {
            self.new.x = width - 1;
            self.new.state.insert(CursorState::WRAPNEXT);
        }
        self.new_abs = new_abs;
        self.done = true;
    }

    /// The new ring evicted a line; stored positions slide up.
    fn decrement_y(&mut self) {
        if !self.done {
            return;
        }
        if self.new_abs == 0 {
            self.invalid = true;
            return;
        }
        self.new_abs -= 1;
    }

    /// Rows that would need to go so the cursor stays on screen.
    pub(crate) fn lines_to_trim(&self, screen_len: usize, row: usize) -> usize {
        if self.invalid {
            return 0;
        }
        if screen_len - self.new_abs <= row {
            return 0;
        }
        screen_len - self.new_abs - row
    }

    pub(crate) fn invalidate_if_trimmed(&mut self, screen_len: usize, row: usize) {
        if self.new_abs >= screen_len || self.lines_to_trim(screen_len, row) > 0 {
            self.invalid = true;
        }
    }

    /// Resolve to a terminal-coordinate cursor on the reflowed screen.
    pub(crate) fn finish(&self, screen: &Screen, row: usize) -> Cursor {
        let mut new = self.new;
        if self.invalid || !self.done {
            new.x = 0;
            new.y = 0;
            new.state.remove(CursorState::WRAPNEXT);
        } else {
            new.y = self.new_abs - (screen.len() - row);
        }
        new
    }
}

/// Re-wrap `old` onto a fresh ring of `new_cap` capacity at `col`
/// columns, keeping the anchors in step. Rows that were never written
/// (`line_id == 0`) are dropped; the result is padded back up to `row`
/// blank lines.
pub(crate) fn reflow_screen(
    old: Screen,
    row: usize,
    col: usize,
    new_cap: usize,
    anchors: &mut [&mut CursorAnchor],
    fg: Rgb,
    bg: Rgb,
) -> Screen {
    let new_cap = if new_cap < row {
        warn!(target: "term.reflow", new_cap, row, "overriding undersized cap");
        row
    } else {
        new_cap
    };

    let mut new = Screen::new(new_cap);
    new.set_line_id_counter(old.line_id_counter());

    // the line_id of the logical line currently being copied
    let mut cur_id: u64 = 0;
    let mut glyph_idx: usize = 0;
    let mut started = false;

    for (i, o) in old.into_lines().enumerate() {
        // untouched initial rows carry no content
        if o.line_id() == 0 {
            continue;
        }

        if !started || cur_id != o.line_id() {
            if new.len() == new.cap() {
                for a in anchors.iter_mut() {
                    a.decrement_y();
                }
            }
            let id = new.next_line_id();
            new.push_line(id, col, fg, bg);
            glyph_idx = 0;
            cur_id = o.line_id();
            started = true;
        }

        for (j, g) in o.glyphs().iter().enumerate() {
            if g.attr.contains(GlyphAttr::NORENDER) || g.attr.contains(GlyphAttr::WDUMMY) {
                continue;
            }
            let need = if g.attr.contains(GlyphAttr::WIDE) { 2 } else { 1 }.min(col);

            if glyph_idx + need > col {
                // continuation row: same id, soft-wrap flag on the row
                // we just filled
                let last = new.len() - 1;
                let w = new.line(last).width();
                let line = new.line_mut(last);
                let mut edge = *line.glyph(w - 1);
                edge.attr.insert(GlyphAttr::WRAP);
                line.set(w - 1, edge);

                if new.len() == new.cap() {
                    for a in anchors.iter_mut() {
                        a.decrement_y();
                    }
                }
                let id = new.line(new.len() - 1).line_id();
                new.push_line(id, col, fg, bg);
                glyph_idx = 0;
            }

            let mut copy = *g;
            // wrap flags are re-derived for the new geometry
            copy.attr.remove(GlyphAttr::WRAP);
            if need == 1 {
                copy.attr.remove(GlyphAttr::WIDE);
            }
            let last = new.len() - 1;
            {
                let line = new.line_mut(last);
                line.set(glyph_idx, copy);
                if need == 2 {
                    let mut dummy = copy;
                    dummy.u = ' ';
                    dummy.attr.remove(GlyphAttr::WIDE);
                    dummy.attr.insert(GlyphAttr::WDUMMY);
                    line.set(glyph_idx + 1, dummy);
                }
            }
            let new_abs = new.len() - 1;
            for a in anchors.iter_mut() {
                a.on_copyable(i, j, glyph_idx, col, new_abs);
            }
            glyph_idx += need;
        }

        // anchors whose glyph never got copied park at the line's end
        let new_abs = new.len() - 1;
        for a in anchors.iter_mut() {
            a.on_line_end(i, glyph_idx, col, new_abs);
        }
    }

    // make sure there are at least enough rows to fill the window
    while new.len() < row {
        new.push_line(0, col, fg, bg);
    }

    new
}

impl Term {
    /// Resize the grid, re-wrapping both screens and migrating cursors.
    pub fn resize(&mut self, cols: usize, rows: usize) -> Result<(), TermError> {
        if cols < 1 || rows < 1 {
            return Err(TermError::InvalidDimensions { cols, rows });
        }
        if cols == self.col && rows == self.row {
            return Ok(());
        }
        debug!(target: "term.reflow", cols, rows, "resizing");

        let old_col = self.col;
        let (fg, bg) = (self.c.attr.fg, self.c.attr.bg);

        // the selection is not reflowed; drop it
        self.sel_clear();

        // anchors: the live cursor plus each screen's saved cursor; the
        // saved anchors never force trimming
        let cur_abs = self.term2abs(self.c.y);
        let main_abs = self.saved[0].y + (self.main.len() - self.row);
        let alt_abs = self.saved[1].y + (self.alt.len() - self.row);
        let mut a_cur = CursorAnchor::new(self.c, cur_abs);
        let mut a_main = CursorAnchor::new(self.saved[0], main_abs);
        let mut a_alt = CursorAnchor::new(self.saved[1], alt_abs);

        // main screen first; its cap is unchanged
        let main = std::mem::replace(&mut self.main, Screen::new(0));
        let main_cap = main.cap();
        {
            let mut anchors: Vec<&mut CursorAnchor> = vec![&mut a_main];
            if self.active == ActiveScreen::Main {
                anchors.push(&mut a_cur);
            }
            self.main = reflow_screen(main, rows, cols, main_cap, &mut anchors, fg, bg);
        }

        // then the altscreen, whose cap always equals the row count
        let alt = std::mem::replace(&mut self.alt, Screen::new(0));
        {
            let mut anchors: Vec<&mut CursorAnchor> = vec![&mut a_alt];
            if self.active == ActiveScreen::Alt {
                anchors.push(&mut a_cur);
            }
            self.alt = reflow_screen(alt, rows, cols, rows, &mut anchors, fg, bg);
        }

        self.scroll = 0;

        // live cursor only: drop rows below it that no longer fit; a
        // full-window application repaints after the resize anyway
        let trim = a_cur.lines_to_trim(self.scr().len(), rows);
        for _ in 0..trim {
            self.scr_mut().pop_bottom();
        }
        a_main.invalidate_if_trimmed(self.main.len(), rows);
        a_alt.invalidate_if_trimmed(self.alt.len(), rows);

        // tab stops: keep what survives, extend on growth from the last
        // surviving stop
        self.tabs.resize(cols, false);
        if cols > old_col {
            let interval = self.cfg.tab_interval.max(1);
            let mut b = old_col;
            while b > 0 {
                b -= 1;
                if b == 0 || self.tabs[b] {
                    break;
                }
            }
            let mut i = b + interval;
            while i < cols {
                self.tabs[i] = true;
                i += interval;
            }
        }

        self.col = cols;
        self.row = rows;

        self.c = a_cur.finish(self.scr(), rows);
        self.saved[0] = a_main.finish(&self.main, rows);
        self.saved[1] = a_alt.finish(&self.alt, rows);

        self.set_scroll_region(0, rows as i64 - 1);
        self.hooks.tty_resize(rows, cols);
        Ok(())
    }
}
