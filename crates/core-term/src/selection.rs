//! Selection state and text extraction.
//!
//! Selections live in *absolute* screen coordinates so they stay pinned
//! to their lines while the view scrolls. A selection remembers which
//! screen it was made on and reports nothing while the other screen is
//! active; scrolling inside the scroll region drags it along and clears
//! it once it leaves.

use core_cells::GlyphAttr;

use crate::term::{Term, TermMode};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) enum SelMode {
    #[default]
    Idle,
    Empty,
    Ready,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SelType {
    #[default]
    Regular,
    Rectangular,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SelSnap {
    Word,
    Line,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct Point {
    pub(crate) x: usize,
    /// Absolute line index.
    pub(crate) y: usize,
}

/// `nb`/`ne` are the normalized ends, `ob`/`oe` the original ends as the
/// user dragged them.
#[derive(Debug, Default)]
pub(crate) struct Selection {
    pub(crate) mode: SelMode,
    pub(crate) ty: SelType,
    pub(crate) snap: Option<SelSnap>,
    pub(crate) nb: Point,
    pub(crate) ne: Point,
    pub(crate) ob: Point,
    pub(crate) oe: Point,
    /// The selection was made on the altscreen.
    pub(crate) alt: bool,
    pub(crate) exists: bool,
}

impl Selection {
    pub(crate) fn row_span(&self) -> (usize, usize) {
        (self.ob.y.min(self.oe.y), self.ob.y.max(self.oe.y))
    }

    /// All line indices dropped by `n` (ring eviction). The selection
    /// dies if its top edge would fall off the buffer.
    pub(crate) fn shift_up(&mut self, n: usize) {
        if !self.exists {
            return;
        }
        if self.nb.y < n || self.ob.y < n || self.oe.y < n {
            self.mode = SelMode::Idle;
            self.exists = false;
            return;
        }
        for p in [&mut self.nb, &mut self.ne, &mut self.ob, &mut self.oe] {
            p.y -= n;
        }
    }
}

impl Term {
    /// Begin a selection at view coordinates. `snap` enables word or
    /// line snapping (double / triple click).
    pub fn sel_start(&mut self, x: usize, view_y: usize, snap: Option<SelSnap>) {
        self.sel_clear();
        let y = self.view2abs(view_y.min(self.row - 1));
        let x = x.min(self.col - 1);
        self.sel.mode = SelMode::Empty;
        self.sel.ty = SelType::Regular;
        self.sel.alt = self.mode.contains(TermMode::ALTSCREEN);
        self.sel.snap = snap;
        self.sel.ob = Point { x, y };
        self.sel.oe = Point { x, y };
        self.sel.exists = true;
        self.sel_normalize();

        if snap.is_some() {
            self.sel.mode = SelMode::Ready;
        }
        let (y1, y2) = (self.sel.nb.y, self.sel.ne.y);
        self.set_dirty_abs(y1, y2);
    }

    /// Extend the selection to view coordinates; `done` finalizes it
    /// (button release).
    pub fn sel_extend(&mut self, x: usize, view_y: usize, ty: SelType, done: bool) {
        if self.sel.mode == SelMode::Idle {
            return;
        }
        if done && self.sel.mode == SelMode::Empty {
            self.sel_clear();
            return;
        }

        let old_oe = self.sel.oe;
        let (old_nb_y, old_ne_y) = (self.sel.nb.y, self.sel.ne.y);
        let old_ty = self.sel.ty;

        self.sel.oe = Point {
            x: x.min(self.col - 1),
            y: self.view2abs(view_y.min(self.row - 1)),
        };
        self.sel_normalize();
        self.sel.ty = ty;

        if old_oe != self.sel.oe || old_ty != ty || self.sel.mode == SelMode::Empty {
            let y1 = self.sel.nb.y.min(old_nb_y);
            let y2 = self.sel.ne.y.max(old_ne_y);
            self.set_dirty_abs(y1, y2);
        }

        self.sel.mode = if done { SelMode::Idle } else { SelMode::Ready };
    }

    /// Is the cell at `(x, abs_y)` inside the selection?
    pub fn selected(&self, x: usize, abs_y: usize) -> bool {
        if self.sel.mode == SelMode::Empty
            || !self.sel.exists
            || self.sel.alt != self.mode.contains(TermMode::ALTSCREEN)
        {
            return false;
        }

        if self.sel.ty == SelType::Rectangular {
            return (self.sel.nb.y..=self.sel.ne.y).contains(&abs_y)
                && (self.sel.nb.x..=self.sel.ne.x).contains(&x);
        }

        (self.sel.nb.y..=self.sel.ne.y).contains(&abs_y)
            && (abs_y != self.sel.nb.y || x >= self.sel.nb.x)
            && (abs_y != self.sel.ne.y || x <= self.sel.ne.x)
    }

    pub fn sel_clear(&mut self) {
        if !self.sel.exists {
            return;
        }
        self.sel.mode = SelMode::Idle;
        self.sel.exists = false;
        let (y1, y2) = (self.sel.nb.y, self.sel.ne.y);
        self.set_dirty_abs(y1, y2);
    }

    fn sel_normalize(&mut self) {
        if self.sel.ty == SelType::Regular && self.sel.ob.y != self.sel.oe.y {
            let forwards = self.sel.ob.y < self.sel.oe.y;
            self.sel.nb.x = if forwards { self.sel.ob.x } else { self.sel.oe.x };
            self.sel.ne.x = if forwards { self.sel.oe.x } else { self.sel.ob.x };
        } else {
            self.sel.nb.x = self.sel.ob.x.min(self.sel.oe.x);
            self.sel.ne.x = self.sel.ob.x.max(self.sel.oe.x);
        }
        self.sel.nb.y = self.sel.ob.y.min(self.sel.oe.y);
        self.sel.ne.y = self.sel.ob.y.max(self.sel.oe.y);

        self.sel.nb = self.sel_snap_point(self.sel.nb, -1);
        self.sel.ne = self.sel_snap_point(self.sel.ne, 1);

        // expand over line breaks
        if self.sel.ty == SelType::Rectangular {
            return;
        }
        let len = self.line_len_abs(self.sel.nb.y);
        if len < self.sel.nb.x {
            self.sel.nb.x = len;
        }
        if self.line_len_abs(self.sel.ne.y) <= self.sel.ne.x {
            self.sel.ne.x = self.col - 1;
        }
    }

    fn is_delim(&self, u: char) -> bool {
        u != '\0' && self.cfg.word_delimiters.contains(u)
    }

    fn sel_snap_point(&self, mut p: Point, direction: i64) -> Point {
        match self.sel.snap {
            None => p,
            Some(SelSnap::Word) => {
                // walk until a delimiter boundary, following soft wraps
                // across line edges
                let len = self.scr().len();
                let mut prev = *self.scr().line(p.y).glyph(p.x);
                let mut prev_delim = self.is_delim(prev.u);
                loop {
                    let mut newx = p.x as i64 + direction;
                    let mut newy = p.y as i64;
                    if !(0..self.col as i64).contains(&newx) {
                        newy += direction;
                        newx = (newx + self.col as i64) % self.col as i64;
                        if !(0..len as i64).contains(&newy) {
                            break;
                        }
                        // only continue across a soft-wrapped edge
                        let (wy, wx) = if direction > 0 {
                            (p.y, p.x)
                        } else {
                            (newy as usize, newx as usize)
                        };
                        if !self
                            .scr()
                            .line(wy)
                            .glyph(wx)
                            .attr
                            .contains(GlyphAttr::WRAP)
                        {
                            break;
                        }
                    }
                    let (nx, ny) = (newx as usize, newy as usize);
                    if nx >= self.line_len_abs(ny) {
                        break;
                    }
                    let g = *self.scr().line(ny).glyph(nx);
                    let delim = self.is_delim(g.u);
                    if !g.attr.contains(GlyphAttr::WDUMMY)
                        && (delim != prev_delim || (delim && g.u != prev.u))
                    {
                        break;
                    }
                    p.x = nx;
                    p.y = ny;
                    prev = g;
                    prev_delim = delim;
                }
                p
            }
            Some(SelSnap::Line) => {
                // extend to whole lines, swallowing soft-wrapped
                // neighbors
                let len = self.scr().len();
                p.x = if direction < 0 { 0 } else { self.col - 1 };
                if direction < 0 {
                    while p.y > 0 {
                        let above = self.scr().line(p.y - 1);
                        if !above.glyph(self.col - 1).attr.contains(GlyphAttr::WRAP) {
                            break;
                        }
                        p.y -= 1;
                    }
                } else {
                    while p.y + 1 < len {
                        let here = self.scr().line(p.y);
                        if !here.glyph(self.col - 1).attr.contains(GlyphAttr::WRAP) {
                            break;
                        }
                        p.y += 1;
                    }
                }
                p
            }
        }
    }

    /// The selected text, soft-wrapped lines joined and trailing blanks
    /// trimmed; `None` when there is no selection.
    pub fn selection_text(&self) -> Option<String> {
        if !self.sel.exists {
            return None;
        }

        let mut out = String::new();
        for y in self.sel.nb.y..=self.sel.ne.y {
            let linelen = self.line_len_abs(y);
            if linelen == 0 {
                out.push('\n');
                continue;
            }

            let (start, lastx) = if self.sel.ty == SelType::Rectangular {
                (self.sel.nb.x, self.sel.ne.x)
            } else {
                (
                    if y == self.sel.nb.y { self.sel.nb.x } else { 0 },
                    if y == self.sel.ne.y {
                        self.sel.ne.x
                    } else {
                        self.col - 1
                    },
                )
            };
            let mut last = lastx.min(linelen - 1) as i64;
            let line = self.scr().line(y);
            while last >= start as i64 && line.glyph(last as usize).u == ' ' {
                last -= 1;
            }

            if last >= start as i64 {
                for x in start..=last as usize {
                    let g = line.glyph(x);
                    if g.attr.contains(GlyphAttr::WDUMMY) {
                        continue;
                    }
                    out.push(g.u);
                }
            }

            // hard line endings become newlines; soft wraps join
            let wrapped = last >= 0 && line.glyph(last as usize).attr.contains(GlyphAttr::WRAP);
            if (y < self.sel.ne.y || lastx >= linelen) && !wrapped {
                out.push('\n');
            }
        }
        Some(out)
    }

    /// Drag the selection along a region scroll of `n` lines starting at
    /// terminal row `orig` (positive scrolls content down).
    pub(crate) fn sel_scroll(&mut self, orig: usize, n: i64) {
        if !self.sel.exists {
            return;
        }
        let orig_abs = self.term2abs(orig) as i64;
        let top_abs = self.term2abs(self.top) as i64;
        let bot_abs = self.term2abs(self.bot) as i64;

        let ob_in = (orig_abs..=bot_abs).contains(&(self.sel.ob.y as i64));
        let oe_in = (orig_abs..=bot_abs).contains(&(self.sel.oe.y as i64));
        if !(ob_in || oe_in) {
            return;
        }

        let mut ob_y = self.sel.ob.y as i64 + n;
        let mut oe_y = self.sel.oe.y as i64 + n;
        if ob_y > bot_abs || oe_y < top_abs {
            self.sel_clear();
            return;
        }

        match self.sel.ty {
            SelType::Rectangular => {
                ob_y = ob_y.max(top_abs);
                oe_y = oe_y.min(bot_abs);
            }
            SelType::Regular => {
                if ob_y < top_abs {
                    ob_y = top_abs;
                    self.sel.ob.x = 0;
                }
                if oe_y > bot_abs {
                    oe_y = bot_abs;
                    self.sel.oe.x = self.col - 1;
                }
            }
        }
        self.sel.ob.y = ob_y as usize;
        self.sel.oe.y = oe_y as usize;
        self.sel_normalize();
    }

    pub(crate) fn set_dirty_abs(&mut self, y1: usize, y2: usize) {
        let len = self.scr().len();
        let y2 = y2.min(len.saturating_sub(1));
        for y in y1.min(y2)..=y2 {
            self.scr_mut().line_mut(y).mark_dirty();
        }
    }
}
