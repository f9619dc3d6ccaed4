//! core-screen: a ring buffer of rendered lines.
//!
//! The `Screen` owns every `RLine` it holds. Physical storage has
//! `cap + 1` slots so the ring can distinguish full from empty without a
//! separate flag; logical index `i` lives at physical slot
//! `(start + i) % (cap + 1)`. Appending to a full ring evicts (and drops)
//! the oldest line first, which is exactly how scrollback ages out.
//!
//! The screen also owns the logical-line id counter: every new logical
//! line takes the next id, and rows sharing a non-zero id form one
//! soft-wrapped unit.

use core_cells::{Glyph, RLine, Rgb};
use tracing::trace;

#[derive(Debug)]
pub struct Screen {
    rlines: Vec<Option<RLine>>,
    cap: usize,
    start: usize,
    len: usize,
    line_id: u64,
}

impl Screen {
    /// An empty screen that can hold up to `cap` lines.
    pub fn new(cap: usize) -> Self {
        Self {
            rlines: (0..cap + 1).map(|_| None).collect(),
            cap,
            start: 0,
            len: 0,
            line_id: 0,
        }
    }

    pub fn cap(&self) -> usize {
        self.cap
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The id most recently handed out. A fresh screen starts at 0, which
    /// is never a valid line id.
    pub fn line_id_counter(&self) -> u64 {
        self.line_id
    }

    /// Seed the id counter; used when one screen replaces another so ids
    /// keep increasing monotonically.
    pub fn set_line_id_counter(&mut self, line_id: u64) {
        self.line_id = line_id;
    }

    /// Take the next logical-line id.
    pub fn next_line_id(&mut self) -> u64 {
        self.line_id += 1;
        self.line_id
    }

    #[inline]
    fn phys(&self, idx: usize) -> usize {
        (self.start + idx) % (self.cap + 1)
    }

    pub fn line(&self, idx: usize) -> &RLine {
        assert!(idx < self.len, "screen index {idx} out of range (len {})", self.len);
        self.rlines[self.phys(idx)].as_ref().expect("live slot")
    }

    pub fn line_mut(&mut self, idx: usize) -> &mut RLine {
        assert!(idx < self.len, "screen index {idx} out of range (len {})", self.len);
        let phys = self.phys(idx);
        self.rlines[phys].as_mut().expect("live slot")
    }

    /// Append a fresh blank line of `cols` cells carrying `line_id`,
    /// evicting the oldest line first if the ring is full. Returns the new
    /// line for the caller to fill.
    pub fn push_line(&mut self, line_id: u64, cols: usize, fg: Rgb, bg: Rgb) -> &mut RLine {
        if self.len == self.cap {
            trace!(target: "screen.ring", start = self.start, "evicting oldest line");
            self.rlines[self.start] = None;
            self.start = (self.start + 1) % (self.cap + 1);
            self.len -= 1;
        }
        let phys = self.phys(self.len);
        self.rlines[phys] = Some(RLine::new(cols, line_id, fg, bg));
        self.len += 1;
        self.rlines[phys].as_mut().expect("just stored")
    }

    /// Drop the newest line. Used by resize when the reflowed buffer holds
    /// more rows below the cursor than the new height allows.
    pub fn pop_bottom(&mut self) {
        assert!(self.len > 0, "pop_bottom on empty screen");
        self.len -= 1;
        let phys = self.phys(self.len);
        self.rlines[phys] = None;
    }

    /// Swap two lines in place. The scroll ops rotate rows inside the
    /// scroll region with this rather than copying glyphs.
    pub fn swap_lines(&mut self, a: usize, b: usize) {
        assert!(a < self.len && b < self.len, "swap_lines out of range");
        let (pa, pb) = (self.phys(a), self.phys(b));
        self.rlines.swap(pa, pb);
    }

    /// Consume the screen, yielding its lines oldest-first.
    pub fn into_lines(mut self) -> impl Iterator<Item = RLine> {
        let len = self.len;
        (0..len).map(move |i| {
            let phys = (self.start + i) % (self.cap + 1);
            self.rlines[phys].take().expect("live slot")
        })
    }

    /// Clear every cell of every line to `blank` without touching line
    /// ids or the ring shape.
    pub fn clear_all(&mut self, blank: Glyph) {
        for i in 0..self.len {
            let phys = self.phys(i);
            let line = self.rlines[phys].as_mut().expect("live slot");
            let w = line.width();
            if w > 0 {
                line.clear(0, w - 1, blank);
            }
        }
    }
}
