//! Shared helpers for the end-to-end tests.
#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use core_term::{Config, NoopHooks, SelType, Term, TermHooks, WinMode};

pub fn term(cols: usize, rows: usize) -> Term {
    Term::new(cols, rows, Config::default(), Box::new(NoopHooks)).expect("valid dimensions")
}

pub fn term_with_history(cols: usize, rows: usize, history: usize) -> Term {
    let cfg = Config {
        history_limit: history,
        ..Config::default()
    };
    Term::new(cols, rows, cfg, Box::new(NoopHooks)).expect("valid dimensions")
}

/// Text of terminal row `y` (trailing cells included, wdummies skipped).
pub fn row_text(t: &Term, y: usize) -> String {
    let line = t.line(t.term2abs(y));
    line.glyphs()
        .iter()
        .filter(|g| !g.attr.contains(core_cells::GlyphAttr::WDUMMY))
        .map(|g| g.u)
        .collect()
}

/// Drain everything the terminal queued for the pty.
pub fn drain(t: &mut Term) -> Vec<u8> {
    let q = t.writable();
    let mut out = Vec::new();
    loop {
        let Some(run) = q.peek() else { break };
        let chunk = run.to_vec();
        q.commit(chunk.len());
        out.extend(chunk);
    }
    out
}

/// Reconstruct the logical lines of the active screen: physical rows
/// joined across soft wraps, trailing blanks trimmed.
pub fn logical_lines(t: &Term) -> Vec<String> {
    let mut out = Vec::new();
    let mut cur = String::new();
    let mut joining = false;
    for i in 0..t.screen_len() {
        let line = t.line(i);
        if line.line_id() == 0 {
            continue;
        }
        let glyphs = line.glyphs();
        let wrapped = glyphs
            .last()
            .is_some_and(|g| g.attr.contains(core_cells::GlyphAttr::WRAP));
        let mut text: String = glyphs
            .iter()
            .filter(|g| {
                !g.attr.contains(core_cells::GlyphAttr::WDUMMY)
                    && !g.attr.contains(core_cells::GlyphAttr::NORENDER)
            })
            .map(|g| g.u)
            .collect();
        if !wrapped {
            while text.ends_with(' ') {
                text.pop();
            }
        }
        if !joining {
            cur = String::new();
        }
        cur.push_str(&text);
        if wrapped {
            joining = true;
        } else {
            joining = false;
            out.push(std::mem::take(&mut cur));
        }
    }
    if joining {
        out.push(cur);
    }
    out
}

/// Drag a selection from `from` to `to` (view coordinates) and release.
pub fn select(t: &mut Term, from: (usize, usize), to: (usize, usize), ty: SelType) {
    t.sel_start(from.0, from.1, None);
    t.sel_extend(to.0, to.1, ty, false);
    t.sel_extend(to.0, to.1, ty, true);
}

/// Hook recorder shared with the terminal, for asserting host-visible
/// side effects.
#[derive(Clone, Default)]
pub struct Recorder {
    pub events: Rc<RefCell<Vec<String>>>,
}

impl Recorder {
    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.events.borrow_mut())
    }
}

impl TermHooks for Recorder {
    fn bell(&mut self) {
        self.events.borrow_mut().push("bell".into());
    }
    fn set_title(&mut self, title: Option<&str>) {
        self.events
            .borrow_mut()
            .push(format!("title:{}", title.unwrap_or("<default>")));
    }
    fn set_clipboard(&mut self, data: &[u8]) {
        self.events
            .borrow_mut()
            .push(format!("clipboard:{}", String::from_utf8_lossy(data)));
    }
    fn set_win_mode(&mut self, mode: WinMode, on: bool) {
        self.events
            .borrow_mut()
            .push(format!("winmode:{mode:?}={on}"));
    }
    fn tty_resize(&mut self, rows: usize, cols: usize) {
        self.events
            .borrow_mut()
            .push(format!("resize:{rows}x{cols}"));
    }
    fn printer(&mut self, bytes: &[u8]) {
        self.events
            .borrow_mut()
            .push(format!("print:{}", String::from_utf8_lossy(bytes)));
    }
    fn paste_request(&mut self) {
        self.events.borrow_mut().push("paste-request".into());
    }
}

pub fn term_recorded(cols: usize, rows: usize) -> (Term, Recorder) {
    let rec = Recorder::default();
    let t = Term::new(cols, rows, Config::default(), Box::new(rec.clone()))
        .expect("valid dimensions");
    (t, rec)
}
