//! The terminal state machine.
//!
//! `Term` owns both screens, the cursor, the mode flags, the escape
//! accumulators, and the outbound byte queue. Pty bytes enter through
//! [`Term::feed`]; each decoded codepoint is either captured by an
//! in-flight escape sequence or emitted to the grid at the cursor.
//!
//! Coordinate spaces, because everything here depends on them:
//! * *absolute*: index into the active screen's ring, `0..screen.len()`.
//! * *terminal*: the bottom `row` lines of the ring, `0..row`. The cursor
//!   lives here.
//! * *view*: what the renderer shows, shifted up by `scroll` lines of
//!   scrollback.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use core_cells::{Glyph, GlyphAttr, RLine, Rgb, display_width, rgb_from_index};
use core_keymap::KeyMap;
use core_screen::Screen;
use core_writable::WritableQueue;
use smallvec::SmallVec;
use tracing::{debug, warn};

use crate::charset::{self, Charset};
use crate::config::Config;
use crate::parser::{CsiEscape, Esc, StrEscape};
use crate::selection::Selection;
use crate::utf8::{self, Decoded, REPLACEMENT};

/// Identification reply for DA and DECID: exactly what xterm sends.
///
/// The leading 64 claims VT420 features; the subparameters advertise
/// 132-columns, printer, selective erase, NRCS, technical characters,
/// locator port, terminal state interrogation, user windows, horizontal
/// scrolling, ANSI color, and rectangular editing.
pub const VTIDEN: &[u8] = b"\x1b[?64;1;2;6;9;15;16;17;18;21;22;28c";

bitflags::bitflags! {
    /// Modes owned by the terminal itself.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct TermMode: u16 {
        const WRAP       = 1 << 0;
        const INSERT     = 1 << 1;
        const ALTSCREEN  = 1 << 2;
        const CRLF       = 1 << 3;
        const ECHO       = 1 << 4;
        const PRINT      = 1 << 5;
        const UTF8       = 1 << 6;
        const SIXEL      = 1 << 7;
        const BRCKTPASTE = 1 << 8;
    }
}

bitflags::bitflags! {
    /// Modes the window/renderer cares about. The terminal tracks them
    /// (the key and mouse encoders consult them) and mirrors every
    /// change to the host through [`TermHooks::set_win_mode`].
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct WinMode: u32 {
        const APPKEYPAD   = 1 << 2;
        const MOUSEBTN    = 1 << 3;
        const MOUSEMOTION = 1 << 4;
        const REVERSE     = 1 << 5;
        const KBDLOCK     = 1 << 6;
        const HIDE        = 1 << 7;
        const APPCURSOR   = 1 << 8;
        const MOUSESGR    = 1 << 9;
        const EIGHT_BIT   = 1 << 10;
        const FOCUS       = 1 << 13;
        const MOUSEX10    = 1 << 14;
        const MOUSEMANY   = 1 << 15;
        const NUMLOCK     = 1 << 16;

        const MOUSE = Self::MOUSEBTN.bits()
            | Self::MOUSEMOTION.bits()
            | Self::MOUSEX10.bits()
            | Self::MOUSEMANY.bits();
    }
}

/// DECSCUSR cursor styles.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CursorStyle {
    #[default]
    BlockBlink,
    BlockSolid,
    UnderlineBlink,
    UnderlineSolid,
    BarBlink,
    BarSolid,
}

impl CursorStyle {
    fn from_arg(v: i64) -> Option<Self> {
        match v {
            0 | 1 => Some(Self::BlockBlink),
            2 => Some(Self::BlockSolid),
            3 => Some(Self::UnderlineBlink),
            4 => Some(Self::UnderlineSolid),
            5 => Some(Self::BarBlink),
            6 => Some(Self::BarSolid),
            _ => None,
        }
    }
}

bitflags::bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub(crate) struct CursorState: u8 {
        /// The next glyph wraps to a fresh line before it lands.
        const WRAPNEXT = 1 << 0;
        /// Row addressing is relative to the scroll region top.
        const ORIGIN   = 1 << 1;
    }
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct Cursor {
    pub(crate) x: usize,
    /// Terminal-row index, not absolute.
    pub(crate) y: usize,
    /// The style template stamped onto every written glyph.
    pub(crate) attr: Glyph,
    pub(crate) state: CursorState,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ActiveScreen {
    Main,
    Alt,
}

#[derive(Clone, Copy, Debug)]
enum CursorOp {
    Save,
    Load,
}

/// Host callbacks for the few things the core cannot do itself. All
/// default to no-ops so tests and minimal hosts can opt in piecemeal.
pub trait TermHooks {
    fn bell(&mut self) {}
    /// `None` restores the default title (RIS does this).
    fn set_title(&mut self, _title: Option<&str>) {}
    fn set_clipboard(&mut self, _data: &[u8]) {}
    /// A window mode changed; the renderer may need to react.
    fn set_win_mode(&mut self, _mode: WinMode, _on: bool) {}
    /// The grid was resized; the host should ioctl the pty.
    fn tty_resize(&mut self, _rows: usize, _cols: usize) {}
    /// Media-copy sink (the `CSI i` print pipeline).
    fn printer(&mut self, _bytes: &[u8]) {}
    /// Shift-Insert style paste: the host should fetch the primary
    /// selection and call [`Term::paste`].
    fn paste_request(&mut self) {}
}

/// The do-nothing hooks implementation.
#[derive(Debug, Default)]
pub struct NoopHooks;

impl TermHooks for NoopHooks {}

#[derive(Debug, thiserror::Error)]
pub enum TermError {
    #[error("invalid terminal dimensions {cols}x{rows}")]
    InvalidDimensions { cols: usize, rows: usize },
}

pub struct Term {
    pub(crate) row: usize,
    pub(crate) col: usize,

    pub(crate) main: Screen,
    pub(crate) alt: Screen,
    pub(crate) active: ActiveScreen,

    /// How many lines of scrollback are below the view window.
    pub(crate) scroll: usize,

    pub(crate) c: Cursor,
    /// Saved cursors, one per screen (index 1 is the altscreen's).
    pub(crate) saved: [Cursor; 2],

    /// Scroll region, inclusive terminal rows.
    pub(crate) top: usize,
    pub(crate) bot: usize,

    pub(crate) mode: TermMode,
    pub(crate) win: WinMode,
    /// modifyOtherKeys level, 0..=2.
    pub(crate) mok: u8,

    pub(crate) esc: Esc,
    pub(crate) csi: CsiEscape,
    pub(crate) strseq: StrEscape,

    pub(crate) trantbl: [Charset; 4],
    pub(crate) charset: usize,
    pub(crate) icharset: usize,

    pub(crate) tabs: Vec<bool>,
    pub(crate) cursor_style: CursorStyle,

    pub(crate) sel: Selection,
    pub(crate) writable: WritableQueue,
    pub(crate) keymap: KeyMap,
    pub(crate) hooks: Box<dyn TermHooks>,
    pub(crate) cfg: Config,

    /// Partial UTF-8 tail retained between feeds.
    pub(crate) pending: Vec<u8>,
}

fn is_control(u: char) -> bool {
    let c = u as u32;
    c < 0x20 || c == 0x7f || (0x80..=0x9f).contains(&c)
}

impl Term {
    pub fn new(
        cols: usize,
        rows: usize,
        cfg: Config,
        hooks: Box<dyn TermHooks>,
    ) -> Result<Self, TermError> {
        if cols < 1 || rows < 1 {
            return Err(TermError::InvalidDimensions { cols, rows });
        }

        let (fg, bg) = (cfg.default_fg, cfg.default_bg);
        // primary screen keeps history; the altscreen holds exactly one
        // window of lines
        let mut main = Screen::new(cfg.history_limit.max(rows + 1) - 1);
        let mut alt = Screen::new(rows);
        for _ in 0..rows {
            main.push_line(0, cols, fg, bg);
            alt.push_line(0, cols, fg, bg);
        }
        // the first line needs a real line id, the cursor starts there
        let id = main.next_line_id();
        main.line_mut(0).set_line_id(id);
        let id = alt.next_line_id();
        alt.line_mut(0).set_line_id(id);

        let cursor = Cursor {
            x: 0,
            y: 0,
            attr: Glyph {
                u: ' ',
                attr: GlyphAttr::empty(),
                fg,
                bg,
            },
            state: CursorState::empty(),
        };

        let mut term = Term {
            row: rows,
            col: cols,
            main,
            alt,
            active: ActiveScreen::Main,
            scroll: 0,
            c: cursor,
            saved: [cursor; 2],
            top: 0,
            bot: rows - 1,
            mode: TermMode::WRAP | TermMode::UTF8,
            win: WinMode::empty(),
            mok: 0,
            esc: Esc::empty(),
            csi: CsiEscape::default(),
            strseq: StrEscape::default(),
            trantbl: [Charset::Usa; 4],
            charset: 0,
            icharset: 0,
            tabs: vec![false; cols],
            cursor_style: CursorStyle::default(),
            sel: Selection::default(),
            writable: WritableQueue::new(),
            keymap: KeyMap::xterm(),
            hooks,
            cfg,
            pending: Vec::new(),
        };
        term.reset();
        Ok(term)
    }

    // ---- accessors ---------------------------------------------------

    pub fn rows(&self) -> usize {
        self.row
    }

    pub fn cols(&self) -> usize {
        self.col
    }

    pub fn mode(&self) -> TermMode {
        self.mode
    }

    pub fn win_mode(&self) -> WinMode {
        self.win
    }

    pub fn is_crlf(&self) -> bool {
        self.mode.contains(TermMode::CRLF)
    }

    pub fn is_echo(&self) -> bool {
        self.mode.contains(TermMode::ECHO)
    }

    pub fn cursor_style(&self) -> CursorStyle {
        self.cursor_style
    }

    /// Cursor position in terminal coordinates `(x, y)`.
    pub fn cursor(&self) -> (usize, usize) {
        (self.c.x, self.c.y)
    }

    /// The style template the cursor currently writes with.
    pub fn cursor_attr(&self) -> Glyph {
        self.c.attr
    }

    pub fn wrap_next(&self) -> bool {
        self.c.state.contains(CursorState::WRAPNEXT)
    }

    /// modifyOtherKeys level (0..=2).
    pub fn modify_other_keys(&self) -> u8 {
        self.mok
    }

    /// The outbound byte queue, for the host to drain.
    pub fn writable(&mut self) -> &mut WritableQueue {
        &mut self.writable
    }

    pub(crate) fn scr(&self) -> &Screen {
        match self.active {
            ActiveScreen::Main => &self.main,
            ActiveScreen::Alt => &self.alt,
        }
    }

    pub(crate) fn scr_mut(&mut self) -> &mut Screen {
        match self.active {
            ActiveScreen::Main => &mut self.main,
            ActiveScreen::Alt => &mut self.alt,
        }
    }

    /// Number of lines held by the active screen (scrollback included).
    pub fn screen_len(&self) -> usize {
        self.scr().len()
    }

    /// How far the view is scrolled back.
    pub fn scroll_offset(&self) -> usize {
        self.scroll
    }

    // ---- coordinate conversions --------------------------------------

    pub fn term2abs(&self, y: usize) -> usize {
        y + (self.scr().len() - self.row)
    }

    pub fn abs2term(&self, i: usize) -> usize {
        i - (self.scr().len() - self.row)
    }

    pub fn view2abs(&self, i: usize) -> usize {
        i + (self.scr().len() - self.row - self.scroll)
    }

    /// Line by absolute index on the active screen.
    pub fn line(&self, abs: usize) -> &RLine {
        self.scr().line(abs)
    }

    /// Visible line `i` (0 is the top of the view window).
    pub fn view_line(&self, i: usize) -> &RLine {
        self.scr().line(self.view2abs(i))
    }

    /// Clear the dirty flag on every visible line; the renderer calls
    /// this after painting.
    pub fn mark_view_clean(&mut self) {
        for i in 0..self.row {
            let abs = self.view2abs(i);
            self.scr_mut().line_mut(abs).mark_clean();
        }
    }

    fn cursor_line(&self) -> &RLine {
        self.scr().line(self.term2abs(self.c.y))
    }

    fn blank(&self) -> Glyph {
        Glyph::blank(self.c.attr.fg, self.c.attr.bg)
    }

    // ---- byte ingestion ----------------------------------------------

    /// Feed pty bytes. Partial UTF-8 sequences at the end of the buffer
    /// are retained and resumed on the next call.
    pub fn feed(&mut self, bytes: &[u8]) {
        if self.pending.is_empty() {
            let consumed = self.write_codepoints(bytes, false);
            self.pending = bytes[consumed..].to_vec();
        } else {
            let mut joined = std::mem::take(&mut self.pending);
            joined.extend_from_slice(bytes);
            let consumed = self.write_codepoints(&joined, false);
            joined.drain(..consumed);
            self.pending = joined;
        }
    }

    /// Decode and put codepoints; returns bytes consumed. With
    /// `show_ctrl`, control bytes render visibly (`^X`, `^[`) — the
    /// local-echo path.
    pub(crate) fn write_codepoints(&mut self, buf: &[u8], show_ctrl: bool) -> usize {
        let mut n = 0;
        while n < buf.len() {
            let (u, size) = if self.mode.contains(TermMode::UTF8) && !self.mode.contains(TermMode::SIXEL)
            {
                match utf8::decode(&buf[n..]) {
                    Decoded::Char(u, size) => (u, size),
                    Decoded::Incomplete => break,
                }
            } else {
                (buf[n] as char, 1)
            };
            if show_ctrl && is_control(u) {
                let c = u as u32;
                if c & 0x80 != 0 {
                    self.putc('^');
                    self.putc('[');
                    self.putc(char::from_u32(c & 0x7f).unwrap_or(REPLACEMENT));
                    n += size;
                    continue;
                } else if u != '\n' && u != '\r' && u != '\t' {
                    self.putc('^');
                    self.putc(char::from_u32(c ^ 0x40).unwrap_or(REPLACEMENT));
                    n += size;
                    continue;
                }
            }
            self.putc(u);
            n += size;
        }
        n
    }

    /// Handle one codepoint: capture it into an escape sequence or emit
    /// it at the cursor.
    pub(crate) fn putc(&mut self, u: char) {
        let control = is_control(u);
        let mut u = u;
        let mut width = 1;
        if self.mode.contains(TermMode::UTF8) && !control {
            match display_width(u) {
                Some(w) => width = w,
                None => {
                    u = REPLACEMENT;
                    width = 1;
                }
            }
        }

        let mut enc = [0u8; 4];
        let bytes = u.encode_utf8(&mut enc).as_bytes();

        if self.mode.contains(TermMode::PRINT) {
            self.hooks.printer(bytes);
        }

        // STR sequences capture everything until a terminator; they must
        // be checked before anything else.
        if self.esc.contains(Esc::STR) {
            let code = u as u32;
            let terminates =
                matches!(code, 0x07 | 0x18 | 0x1a | 0x1b) || (0x80..=0x9f).contains(&code);
            if terminates {
                self.esc.remove(Esc::START | Esc::STR | Esc::DCS);
                if self.mode.contains(TermMode::SIXEL) {
                    // sixel payloads are recognized and swallowed whole
                    self.mode.remove(TermMode::SIXEL);
                    return;
                }
                self.esc.insert(Esc::STR_END);
                // fall through: the terminator is itself a control code
            } else {
                if self.mode.contains(TermMode::SIXEL) {
                    return;
                }
                if self.esc.contains(Esc::DCS) && self.strseq.is_empty() && u == 'q' {
                    self.mode.insert(TermMode::SIXEL);
                }
                self.strseq.push(bytes);
                return;
            }
        }

        // control codes act immediately, even mid-sequence
        if control {
            self.control_code(u);
            return;
        }

        if self.esc.contains(Esc::START) {
            if self.esc.contains(Esc::CSI) {
                if self.csi.push(u as u8) {
                    self.esc = Esc::empty();
                    self.csi.parse();
                    self.csi_dispatch();
                }
                return;
            } else if self.esc.contains(Esc::UTF8) {
                self.def_utf8(u);
            } else if self.esc.contains(Esc::ALTCHARSET) {
                charset::designate(&mut self.trantbl[self.icharset], u);
            } else if self.esc.contains(Esc::TEST) {
                self.dec_test(u);
            } else if !self.esc_dispatch(u) {
                return; // sequence still in flight
            }
            self.esc = Esc::empty();
            return;
        }

        // printing over a selection invalidates it
        if self.sel.exists {
            let row = self.term2abs(self.c.y);
            let (lo, hi) = self.sel.row_span();
            if (lo..=hi).contains(&row) {
                self.sel_clear();
            }
        }

        let translated = charset::translate(u, self.trantbl[self.charset]);
        self.emit(translated, width);
    }

    fn def_utf8(&mut self, u: char) {
        if u == 'G' {
            self.mode.insert(TermMode::UTF8);
        } else if u == '@' {
            self.mode.remove(TermMode::UTF8);
        }
    }

    // ---- control codes and escapes -----------------------------------

    fn control_code(&mut self, u: char) {
        match u as u32 {
            0x09 => {
                self.put_tab(1);
                return;
            }
            0x08 => {
                self.move_to(self.c.x as i64 - 1, self.c.y as i64);
                return;
            }
            0x0d => {
                self.move_to(0, self.c.y as i64);
                return;
            }
            // LF, VT, FF
            0x0a | 0x0b | 0x0c => {
                self.newline(self.mode.contains(TermMode::CRLF), false);
                return;
            }
            0x07 => {
                if self.esc.contains(Esc::STR_END) {
                    // BEL as OSC terminator, xterm compatibility
                    self.str_dispatch();
                } else {
                    self.hooks.bell();
                }
            }
            0x1b => {
                self.csi.reset();
                self.esc.remove(Esc::CSI | Esc::ALTCHARSET | Esc::TEST);
                self.esc.insert(Esc::START);
                return;
            }
            // SO/SI select G1/G0
            0x0e => {
                self.charset = 1;
                return;
            }
            0x0f => {
                self.charset = 0;
                return;
            }
            0x1a => {
                // SUB prints a '?' and cancels like CAN
                self.overwrite_glyph_at('?', self.c.x, self.c.y);
                self.csi.reset();
            }
            0x18 => {
                self.csi.reset();
            }
            // NUL, ENQ, XON, XOFF, DEL
            0x00 | 0x05 | 0x11 | 0x13 | 0x7f => return,
            0x85 => {
                // NEL always goes to the first column
                self.newline(true, false);
            }
            0x88 => {
                // HTS
                self.tabs[self.c.x] = true;
            }
            0x9a => {
                // DECID
                self.tty_write(VTIDEN);
            }
            0x90 | 0x9d | 0x9e | 0x9f => {
                // DCS, OSC, PM, APC
                self.str_sequence(u as u32 as u8);
                return;
            }
            _ => {}
        }
        // only CAN, SUB, BEL and C1 bytes interrupt a string sequence
        self.esc.remove(Esc::STR_END | Esc::STR);
    }

    /// Begin a string-bearing sequence of the given introducer.
    fn str_sequence(&mut self, c: u8) {
        let kind = match c {
            0x90 => {
                self.esc.insert(Esc::DCS);
                b'P'
            }
            0x9f => b'_',
            0x9e => b'^',
            0x9d => b']',
            other => {
                if other == b'P' {
                    self.esc.insert(Esc::DCS);
                }
                other
            }
        };
        self.strseq.reset(kind);
        self.esc.insert(Esc::STR);
    }

    /// Returns true when the escape sequence is complete and state
    /// should clear; false when more bytes are expected.
    fn esc_dispatch(&mut self, u: char) -> bool {
        match u {
            '[' => {
                self.esc.insert(Esc::CSI);
                false
            }
            '#' => {
                self.esc.insert(Esc::TEST);
                false
            }
            '%' => {
                self.esc.insert(Esc::UTF8);
                false
            }
            'P' | '_' | '^' | ']' | 'k' => {
                self.str_sequence(u as u32 as u8);
                false
            }
            // LS2, LS3
            'n' | 'o' => {
                self.charset = 2 + (u as usize - 'n' as usize);
                true
            }
            '(' | ')' | '*' | '+' => {
                self.icharset = u as usize - '(' as usize;
                self.esc.insert(Esc::ALTCHARSET);
                false
            }
            'D' => {
                // IND
                self.newline(false, false);
                true
            }
            'E' => {
                // NEL
                self.newline(true, false);
                true
            }
            'H' => {
                // HTS
                self.tabs[self.c.x] = true;
                true
            }
            'M' => {
                // RI
                if self.c.y == self.top {
                    self.scroll_down(self.top, 1);
                } else {
                    self.move_to(self.c.x as i64, self.c.y as i64 - 1);
                }
                true
            }
            'Z' => {
                self.tty_write(VTIDEN);
                true
            }
            'c' => {
                // RIS
                self.reset();
                self.hooks.set_title(None);
                true
            }
            '=' => {
                self.set_win_mode(WinMode::APPKEYPAD, true);
                true
            }
            '>' => {
                self.set_win_mode(WinMode::APPKEYPAD, false);
                true
            }
            '7' => {
                self.cursor_op(CursorOp::Save);
                true
            }
            '8' => {
                self.cursor_op(CursorOp::Load);
                true
            }
            '\\' => {
                // ST
                if self.esc.contains(Esc::STR_END) {
                    self.str_dispatch();
                }
                true
            }
            _ => {
                warn!(
                    target: "term.esc",
                    "unknown sequence ESC {:#04x} '{}'",
                    u as u32,
                    if u.is_ascii_graphic() { u } else { '.' }
                );
                true
            }
        }
    }

    // ---- cursor and region primitives --------------------------------

    /// Move in terminal coordinates, clamped; clears the wrap latch.
    pub(crate) fn move_to(&mut self, x: i64, y: i64) {
        self.c.state.remove(CursorState::WRAPNEXT);
        self.c.x = x.clamp(0, self.col as i64 - 1) as usize;
        self.c.y = y.clamp(0, self.row as i64 - 1) as usize;
    }

    /// Like `move_to`, but rows are region-relative in origin mode.
    fn move_to_origin(&mut self, x: i64, y: i64) {
        let off = if self.c.state.contains(CursorState::ORIGIN) {
            self.top as i64
        } else {
            0
        };
        self.move_to(x, y + off);
    }

    fn cursor_op(&mut self, op: CursorOp) {
        let slot = self.mode.contains(TermMode::ALTSCREEN) as usize;
        match op {
            CursorOp::Save => self.saved[slot] = self.c,
            CursorOp::Load => {
                self.c = self.saved[slot];
                self.move_to(self.saved[slot].x as i64, self.saved[slot].y as i64);
            }
        }
    }

    pub(crate) fn swap_screen(&mut self) {
        self.active = if self.mode.contains(TermMode::ALTSCREEN) {
            ActiveScreen::Main
        } else {
            ActiveScreen::Alt
        };
        self.mode.toggle(TermMode::ALTSCREEN);
    }

    pub(crate) fn set_scroll_region(&mut self, top: i64, bot: i64) {
        let mut top = top.clamp(0, self.row as i64 - 1) as usize;
        let mut bot = bot.clamp(0, self.row as i64 - 1) as usize;
        if top > bot {
            std::mem::swap(&mut top, &mut bot);
        }
        self.top = top;
        self.bot = bot;
    }

    /// Clear an inclusive absolute-coordinate rectangle to blanks.
    pub(crate) fn clear_region_abs(&mut self, x1: usize, y1: usize, x2: usize, y2: usize) {
        let (x1, x2) = if x1 > x2 { (x2, x1) } else { (x1, x2) };
        let (y1, y2) = if y1 > y2 { (y2, y1) } else { (y1, y2) };
        let blank = self.blank();
        for y in y1..=y2 {
            self.scr_mut().line_mut(y).clear(x1, x2, blank);
        }
    }

    /// Clear an inclusive terminal-coordinate rectangle, clamped to the
    /// window.
    pub(crate) fn clear_region_term(&mut self, x1: i64, y1: i64, x2: i64, y2: i64) {
        let x1 = x1.clamp(0, self.col as i64 - 1) as usize;
        let x2 = x2.clamp(0, self.col as i64 - 1) as usize;
        let y1 = y1.clamp(0, self.row as i64 - 1) as usize;
        let y2 = y2.clamp(0, self.row as i64 - 1) as usize;
        let (ay1, ay2) = (self.term2abs(y1), self.term2abs(y2));
        self.clear_region_abs(x1, ay1, x2, ay2);
    }

    /// Append a line for the cursor at the bottom of the ring; shifts
    /// the selection when the ring evicts its oldest line.
    fn push_cursor_line(&mut self, line_id: u64) {
        let (fg, bg) = (self.c.attr.fg, self.c.attr.bg);
        let cols = self.col;
        let evicts = self.scr().len() == self.scr().cap();
        self.scr_mut().push_line(line_id, cols, fg, bg);
        if evicts {
            self.sel.shift_up(1);
        }
    }

    /// Line feed. `first_col` returns the carriage; `continue_line`
    /// keeps the current logical-line id (the soft-wrap path).
    pub(crate) fn newline(&mut self, first_col: bool, continue_line: bool) {
        let cont_id = if continue_line {
            self.cursor_line().line_id()
        } else {
            0
        };

        if self.c.y == self.bot {
            if self.top == 0 && self.bot + 1 == self.row {
                // bottom of a full-screen region: grow the ring so the
                // old top line ages into scrollback
                let id = if continue_line {
                    cont_id
                } else {
                    self.scr_mut().next_line_id()
                };
                self.push_cursor_line(id);
                // hold the scrolled-back view in place if possible
                if self.scroll > 0 {
                    self.scroll = (self.scroll + 1).min(self.scr().len() - self.row);
                }
            } else {
                // bottom of a restricted region: rotate it
                self.scroll_up(self.top, 1);
                let id = if continue_line {
                    cont_id
                } else {
                    self.scr_mut().next_line_id()
                };
                let abs = self.term2abs(self.c.y);
                self.scr_mut().line_mut(abs).set_line_id(id);
            }
        } else if self.c.y + 1 < self.row {
            self.c.y += 1;
            let id = if continue_line {
                cont_id
            } else {
                self.scr_mut().next_line_id()
            };
            let abs = self.term2abs(self.c.y);
            self.scr_mut().line_mut(abs).set_line_id(id);
        }
        // else: at the screen's last row but below the scroll region;
        // nowhere to go

        let x = if first_col { 0 } else { self.c.x as i64 };
        self.move_to(x, self.c.y as i64);
    }

    /// Scroll the region `[orig, bot]` up by `n` lines (content moves
    /// up, blank lines appear at the bottom).
    pub(crate) fn scroll_up(&mut self, orig: usize, n: usize) {
        let n = n.min(self.bot - orig + 1);
        if n == 0 {
            return;
        }
        self.clear_region_term(0, orig as i64, self.col as i64 - 1, (orig + n - 1) as i64);
        if self.bot >= orig + n {
            for y in orig..=self.bot - n {
                let (a, b) = (self.term2abs(y), self.term2abs(y + n));
                self.scr_mut().swap_lines(a, b);
            }
        }
        // the vacated rows start fresh logical lines
        for y in self.bot + 1 - n..=self.bot {
            let id = self.scr_mut().next_line_id();
            let abs = self.term2abs(y);
            self.scr_mut().line_mut(abs).set_line_id(id);
        }
        self.sel_scroll(orig, -(n as i64));
    }

    /// Scroll the region `[orig, bot]` down by `n` lines.
    pub(crate) fn scroll_down(&mut self, orig: usize, n: usize) {
        let n = n.min(self.bot - orig + 1);
        if n == 0 {
            return;
        }
        self.clear_region_term(
            0,
            (self.bot + 1 - n) as i64,
            self.col as i64 - 1,
            self.bot as i64,
        );
        if self.bot >= orig + n {
            for y in (orig + n..=self.bot).rev() {
                let (a, b) = (self.term2abs(y), self.term2abs(y - n));
                self.scr_mut().swap_lines(a, b);
            }
        }
        for y in orig..orig + n {
            let id = self.scr_mut().next_line_id();
            let abs = self.term2abs(y);
            self.scr_mut().line_mut(abs).set_line_id(id);
        }
        self.sel_scroll(orig, n as i64);
    }

    fn insert_blank_lines(&mut self, n: i64) {
        if (self.top..=self.bot).contains(&self.c.y) {
            let n = n.clamp(0, self.row as i64) as usize;
            self.scroll_down(self.c.y, n);
        }
    }

    fn delete_lines(&mut self, n: i64) {
        if (self.top..=self.bot).contains(&self.c.y) {
            let n = n.clamp(0, self.row as i64) as usize;
            self.scroll_up(self.c.y, n);
        }
    }

    fn delete_chars(&mut self, n: i64) {
        let n = n.clamp(0, (self.col - self.c.x) as i64) as usize;
        if n == 0 {
            return;
        }
        let (x, col) = (self.c.x, self.col);
        let abs = self.term2abs(self.c.y);
        self.scr_mut()
            .line_mut(abs)
            .glyphs_mut()
            .copy_within(x + n..col, x);
        self.clear_region_term(
            (col - n) as i64,
            self.c.y as i64,
            col as i64 - 1,
            self.c.y as i64,
        );
    }

    fn insert_blanks(&mut self, n: i64) {
        let n = n.clamp(0, (self.col - self.c.x) as i64) as usize;
        if n == 0 {
            return;
        }
        let (x, col) = (self.c.x, self.col);
        let abs = self.term2abs(self.c.y);
        self.scr_mut()
            .line_mut(abs)
            .glyphs_mut()
            .copy_within(x..col - n, x + n);
        self.clear_region_term(
            x as i64,
            self.c.y as i64,
            (x + n - 1) as i64,
            self.c.y as i64,
        );
    }

    fn put_tab(&mut self, n: i64) {
        let mut x = self.c.x;
        if n > 0 {
            let mut n = n;
            while x < self.col && n > 0 {
                n -= 1;
                x += 1;
                while x < self.col && !self.tabs[x] {
                    x += 1;
                }
            }
        } else if n < 0 {
            let mut n = n;
            while x > 0 && n < 0 {
                n += 1;
                x -= 1;
                while x > 0 && !self.tabs[x] {
                    x -= 1;
                }
            }
        }
        self.c.x = x.min(self.col - 1);
    }

    /// Overwrite one cell in terminal coordinates with the cursor's
    /// current attributes. Writes a single-width glyph and does no
    /// wide-pair bookkeeping; only the DEC alignment test and SUB reach
    /// this.
    fn overwrite_glyph_at(&mut self, u: char, x: usize, y: usize) {
        let mut g = self.c.attr;
        g.u = u;
        let abs = self.term2abs(y);
        if self.scr().line(abs).line_id() == 0 {
            let id = self.scr_mut().next_line_id();
            self.scr_mut().line_mut(abs).set_line_id(id);
        }
        self.scr_mut().line_mut(abs).set(x, g);
    }

    fn dec_test(&mut self, c: char) {
        if c == '8' {
            // DEC screen alignment: fill the window with 'E'
            for x in 0..self.col {
                for y in 0..self.row {
                    self.overwrite_glyph_at('E', x, y);
                }
            }
        }
    }

    /// Full reset (RIS and construction).
    pub fn reset(&mut self) {
        self.c = Cursor {
            x: 0,
            y: 0,
            attr: Glyph {
                u: ' ',
                attr: GlyphAttr::empty(),
                fg: self.cfg.default_fg,
                bg: self.cfg.default_bg,
            },
            state: CursorState::empty(),
        };

        self.tabs = vec![false; self.col];
        let interval = self.cfg.tab_interval.max(1);
        let mut i = interval;
        while i < self.col {
            self.tabs[i] = true;
            i += interval;
        }

        self.top = 0;
        self.bot = self.row - 1;
        self.mode = TermMode::WRAP | TermMode::UTF8;
        self.trantbl = [Charset::Usa; 4];
        self.charset = 0;
        self.mok = 0;
        self.sel_clear();

        for _ in 0..2 {
            self.move_to(0, 0);
            self.cursor_op(CursorOp::Save);
            let blank = self.blank();
            self.scr_mut().clear_all(blank);
            self.swap_screen();
        }
    }

    // ---- glyph emission ----------------------------------------------

    fn flag_wrap_at_cursor(&mut self) {
        let x = self.c.x;
        let abs = self.term2abs(self.c.y);
        let line = self.scr_mut().line_mut(abs);
        let mut cell = *line.glyph(x);
        cell.attr.insert(GlyphAttr::WRAP);
        line.set(x, cell);
    }

    /// Writes establish line identity: a row that has never held content
    /// gets its logical-line id on first touch.
    fn ensure_cursor_line_id(&mut self) {
        let abs = self.term2abs(self.c.y);
        if self.scr().line(abs).line_id() == 0 {
            let id = self.scr_mut().next_line_id();
            self.scr_mut().line_mut(abs).set_line_id(id);
        }
    }

    /// Place one glyph at the cursor and advance.
    fn emit(&mut self, u: char, width: usize) {
        let mut g = self.c.attr;
        g.u = u;
        let width = width.min(2).min(self.col);
        self.ensure_cursor_line_id();

        if self.c.state.contains(CursorState::WRAPNEXT) && self.mode.contains(TermMode::WRAP) {
            self.flag_wrap_at_cursor();
            self.newline(true, true);
        }
        // a wide glyph with one cell left wraps early
        if width == 2
            && self.c.x + 2 > self.col
            && self.mode.contains(TermMode::WRAP)
        {
            self.flag_wrap_at_cursor();
            self.newline(true, true);
        }

        let x = self.c.x;
        let col = self.col;
        let insert = self.mode.contains(TermMode::INSERT);
        let abs = self.term2abs(self.c.y);
        {
            let line = self.scr_mut().line_mut(abs);
            let mut first = g;
            if width == 2 {
                first.attr.insert(GlyphAttr::WIDE);
            }
            if insert {
                line.insert(x, first);
            } else {
                line.set(x, first);
            }
            if width == 2 && x + 1 < col {
                let mut dummy = g;
                dummy.u = ' ';
                dummy.attr.insert(GlyphAttr::WDUMMY);
                if insert {
                    line.insert(x + 1, dummy);
                } else {
                    line.set(x + 1, dummy);
                }
            }
        }

        if self.c.x + width < self.col {
            self.move_to((self.c.x + width) as i64, self.c.y as i64);
        } else if self.mode.contains(TermMode::WRAP) {
            self.c.state.insert(CursorState::WRAPNEXT);
        }
    }

    // ---- responses ----------------------------------------------------

    pub(crate) fn tty_write(&mut self, bytes: &[u8]) {
        self.writable.append(bytes);
    }

    // ---- mode plumbing -----------------------------------------------

    pub(crate) fn set_win_mode(&mut self, m: WinMode, on: bool) {
        self.win.set(m, on);
        self.hooks.set_win_mode(m, on);
    }

    fn set_modes(&mut self, private: bool, set: bool, args: &[i64]) {
        for &a in args {
            if private {
                match a {
                    1 => self.set_win_mode(WinMode::APPCURSOR, set), // DECCKM
                    5 => self.set_win_mode(WinMode::REVERSE, set),   // DECSCNM
                    6 => {
                        // DECOM
                        self.c.state.set(CursorState::ORIGIN, set);
                        self.move_to_origin(0, 0);
                    }
                    7 => self.mode.set(TermMode::WRAP, set), // DECAWM
                    // errors and modes we recognize but ignore
                    0 | 2 | 3 | 4 | 8 | 12 | 18 | 19 | 42 => {
                        debug!(target: "term.mode", mode = a, "ignored private mode");
                    }
                    25 => self.set_win_mode(WinMode::HIDE, !set), // DECTCEM
                    9 => {
                        self.set_win_mode(WinMode::MOUSE, false);
                        self.set_win_mode(WinMode::MOUSEX10, set);
                    }
                    1000 => {
                        self.set_win_mode(WinMode::MOUSE, false);
                        self.set_win_mode(WinMode::MOUSEBTN, set);
                    }
                    1002 => {
                        self.set_win_mode(WinMode::MOUSE, false);
                        self.set_win_mode(WinMode::MOUSEMOTION, set);
                    }
                    1003 => {
                        self.set_win_mode(WinMode::MOUSE, false);
                        self.set_win_mode(WinMode::MOUSEMANY, set);
                    }
                    1004 => self.set_win_mode(WinMode::FOCUS, set),
                    1006 => self.set_win_mode(WinMode::MOUSESGR, set),
                    1034 => self.set_win_mode(WinMode::EIGHT_BIT, set),
                    47 | 1047 | 1049 => {
                        // altscreen switch; 1049 additionally saves or
                        // restores the cursor around it
                        if a == 1049 {
                            self.cursor_op(if set { CursorOp::Save } else { CursorOp::Load });
                        }
                        let alt = self.mode.contains(TermMode::ALTSCREEN);
                        if alt {
                            let blank = self.blank();
                            self.scr_mut().clear_all(blank);
                        }
                        if (set != alt) && self.cfg.allow_altscreen {
                            self.swap_screen();
                        }
                        if a == 1049 {
                            self.cursor_op(if set { CursorOp::Save } else { CursorOp::Load });
                        }
                    }
                    1048 => {
                        self.cursor_op(if set { CursorOp::Save } else { CursorOp::Load });
                    }
                    2004 => self.mode.set(TermMode::BRCKTPASTE, set),
                    // not implemented: highlight mode can hang the
                    // terminal by design, 1005/1015 confuse modern apps
                    1001 | 1005 | 1015 => {}
                    _ => {
                        warn!(target: "term.mode", mode = a, "unknown private set/reset mode");
                    }
                }
            } else {
                match a {
                    0 => {}
                    2 => self.set_win_mode(WinMode::KBDLOCK, set), // KAM
                    4 => self.mode.set(TermMode::INSERT, set),     // IRM
                    12 => self.mode.set(TermMode::ECHO, !set),     // SRM, inverse
                    20 => self.mode.set(TermMode::CRLF, set),      // LNM
                    _ => {
                        warn!(target: "term.mode", mode = a, "unknown set/reset mode");
                    }
                }
            }
        }
    }

    // ---- SGR ----------------------------------------------------------

    fn def_color(&self, attr: &[i64], i: &mut usize, fallback: Rgb) -> Rgb {
        match attr.get(*i + 1).copied() {
            Some(2) => {
                // direct RGB
                if *i + 4 >= attr.len() {
                    warn!(target: "term.csi", "sgr 38/48;2 with too few parameters");
                    return fallback;
                }
                let (r, g, b) = (attr[*i + 2], attr[*i + 3], attr[*i + 4]);
                *i += 4;
                if !(0..=255).contains(&r) || !(0..=255).contains(&g) || !(0..=255).contains(&b) {
                    warn!(target: "term.csi", r, g, b, "bad rgb color");
                    fallback
                } else {
                    Rgb::new(r as u8, g as u8, b as u8)
                }
            }
            Some(5) => {
                // indexed
                if *i + 2 >= attr.len() {
                    warn!(target: "term.csi", "sgr 38/48;5 with too few parameters");
                    return fallback;
                }
                *i += 2;
                let v = attr[*i];
                if (0..=255).contains(&v) {
                    rgb_from_index(v as u8)
                } else {
                    warn!(target: "term.csi", index = v, "bad color index");
                    fallback
                }
            }
            other => {
                warn!(target: "term.csi", kind = ?other, "unknown color space in sgr");
                fallback
            }
        }
    }

    fn set_attrs(&mut self, attr: &[i64]) {
        let mut i = 0;
        while i < attr.len() {
            match attr[i] {
                0 => {
                    self.c.attr.attr.remove(
                        GlyphAttr::BOLD
                            | GlyphAttr::FAINT
                            | GlyphAttr::ITALIC
                            | GlyphAttr::UNDERLINE
                            | GlyphAttr::BLINK
                            | GlyphAttr::REVERSE
                            | GlyphAttr::INVISIBLE
                            | GlyphAttr::STRUCK,
                    );
                    self.c.attr.fg = self.cfg.default_fg;
                    self.c.attr.bg = self.cfg.default_bg;
                }
                1 => self.c.attr.attr.insert(GlyphAttr::BOLD),
                2 => self.c.attr.attr.insert(GlyphAttr::FAINT),
                3 => self.c.attr.attr.insert(GlyphAttr::ITALIC),
                4 => self.c.attr.attr.insert(GlyphAttr::UNDERLINE),
                // slow and rapid blink collapse
                5 | 6 => self.c.attr.attr.insert(GlyphAttr::BLINK),
                7 => self.c.attr.attr.insert(GlyphAttr::REVERSE),
                8 => self.c.attr.attr.insert(GlyphAttr::INVISIBLE),
                9 => self.c.attr.attr.insert(GlyphAttr::STRUCK),
                22 => self.c.attr.attr.remove(GlyphAttr::BOLD_FAINT),
                23 => self.c.attr.attr.remove(GlyphAttr::ITALIC),
                24 => self.c.attr.attr.remove(GlyphAttr::UNDERLINE),
                25 => self.c.attr.attr.remove(GlyphAttr::BLINK),
                27 => self.c.attr.attr.remove(GlyphAttr::REVERSE),
                28 => self.c.attr.attr.remove(GlyphAttr::INVISIBLE),
                29 => self.c.attr.attr.remove(GlyphAttr::STRUCK),
                38 => self.c.attr.fg = self.def_color(attr, &mut i, self.c.attr.fg),
                39 => self.c.attr.fg = self.cfg.default_fg,
                48 => self.c.attr.bg = self.def_color(attr, &mut i, self.c.attr.bg),
                49 => self.c.attr.bg = self.cfg.default_bg,
                v @ 30..=37 => self.c.attr.fg = rgb_from_index((v - 30) as u8),
                v @ 40..=47 => self.c.attr.bg = rgb_from_index((v - 40) as u8),
                v @ 90..=97 => self.c.attr.fg = rgb_from_index((v - 90 + 8) as u8),
                v @ 100..=107 => self.c.attr.bg = rgb_from_index((v - 100 + 8) as u8),
                v => {
                    warn!(target: "term.csi", attr = v, seq = %self.csi.dump(), "unknown sgr attribute");
                }
            }
            i += 1;
        }
    }

    // ---- CSI dispatch -------------------------------------------------

    fn unknown_csi(&self) {
        warn!(target: "term.csi", "unknown csi {}", self.csi.dump());
    }

    fn set_cursor_style(&mut self, v: i64) -> bool {
        match CursorStyle::from_arg(v) {
            Some(style) => {
                self.cursor_style = style;
                true
            }
            None => false,
        }
    }

    fn csi_dispatch(&mut self) {
        let prefix = self.csi.prefix;
        let submode = self.csi.submode;
        let mode = self.csi.mode;
        // most commands accept neither a private prefix nor an
        // intermediate; the exceptions check for themselves
        let plain = prefix == 0 && submode == 0;

        match mode {
            b'@' => {
                // ICH
                if !plain {
                    return self.unknown_csi();
                }
                let n = self.csi.arg(0, 1);
                self.insert_blanks(n);
            }
            b'A' => {
                // CUU
                if !plain {
                    return self.unknown_csi();
                }
                let n = self.csi.arg(0, 1);
                self.move_to(self.c.x as i64, self.c.y as i64 - n);
            }
            b'B' | b'e' => {
                // CUD / VPR
                if !plain {
                    return self.unknown_csi();
                }
                let n = self.csi.arg(0, 1);
                self.move_to(self.c.x as i64, self.c.y as i64 + n);
            }
            b'i' => {
                // MC
                if !plain {
                    return self.unknown_csi();
                }
                match self.csi.arg_raw(0) {
                    0 => self.dump_screen(),
                    1 => self.dump_line(self.c.y),
                    2 => self.dump_selection(),
                    4 => self.mode.remove(TermMode::PRINT),
                    5 => self.mode.insert(TermMode::PRINT),
                    _ => {}
                }
            }
            b'c' => {
                // DA
                if !plain {
                    return self.unknown_csi();
                }
                if self.csi.arg_raw(0) == 0 {
                    self.tty_write(VTIDEN);
                }
            }
            b'C' | b'a' => {
                // CUF / HPR
                if !plain {
                    return self.unknown_csi();
                }
                let n = self.csi.arg(0, 1);
                self.move_to(self.c.x as i64 + n, self.c.y as i64);
            }
            b'D' => {
                // CUB
                if !plain {
                    return self.unknown_csi();
                }
                let n = self.csi.arg(0, 1);
                self.move_to(self.c.x as i64 - n, self.c.y as i64);
            }
            b'E' => {
                // CNL
                if !plain {
                    return self.unknown_csi();
                }
                let n = self.csi.arg(0, 1);
                self.move_to(0, self.c.y as i64 + n);
            }
            b'F' => {
                // CPL
                if !plain {
                    return self.unknown_csi();
                }
                let n = self.csi.arg(0, 1);
                self.move_to(0, self.c.y as i64 - n);
            }
            b'g' => {
                // TBC
                if !plain {
                    return self.unknown_csi();
                }
                match self.csi.arg_raw(0) {
                    0 => self.tabs[self.c.x] = false,
                    3 => self.tabs.fill(false),
                    _ => self.unknown_csi(),
                }
            }
            b'G' | b'`' => {
                // CHA / HPA
                if !plain {
                    return self.unknown_csi();
                }
                let n = self.csi.arg(0, 1);
                self.move_to(n - 1, self.c.y as i64);
            }
            b'H' | b'f' => {
                // CUP / HVP
                if !plain {
                    return self.unknown_csi();
                }
                let row = self.csi.arg(0, 1);
                let col = self.csi.arg(1, 1);
                self.move_to_origin(col - 1, row - 1);
            }
            b'I' => {
                // CHT
                if !plain {
                    return self.unknown_csi();
                }
                let n = self.csi.arg(0, 1);
                self.put_tab(n);
            }
            b'J' => {
                // ED
                if !plain {
                    return self.unknown_csi();
                }
                let (x, y) = (self.c.x as i64, self.c.y as i64);
                match self.csi.arg_raw(0) {
                    0 => {
                        self.clear_region_term(x, y, self.col as i64 - 1, y);
                        if self.c.y < self.row - 1 {
                            self.clear_region_term(
                                0,
                                y + 1,
                                self.col as i64 - 1,
                                self.row as i64 - 1,
                            );
                        }
                    }
                    1 => {
                        if self.c.y > 0 {
                            self.clear_region_term(0, 0, self.col as i64 - 1, y - 1);
                        }
                        self.clear_region_term(0, y, x, y);
                    }
                    2 => {
                        self.clear_region_term(0, 0, self.col as i64 - 1, self.row as i64 - 1);
                    }
                    3 => {
                        // xterm extension: also wipe the scrollback
                        let len = self.scr().len();
                        self.clear_region_abs(0, 0, self.col - 1, len - 1);
                    }
                    _ => self.unknown_csi(),
                }
            }
            b'K' => {
                // EL
                if !plain {
                    return self.unknown_csi();
                }
                let (x, y) = (self.c.x as i64, self.c.y as i64);
                match self.csi.arg_raw(0) {
                    0 => self.clear_region_term(x, y, self.col as i64 - 1, y),
                    1 => self.clear_region_term(0, y, x, y),
                    2 => self.clear_region_term(0, y, self.col as i64 - 1, y),
                    _ => {}
                }
            }
            b'S' => {
                // SU
                if !plain {
                    return self.unknown_csi();
                }
                let n = self.csi.arg(0, 1).clamp(0, self.row as i64) as usize;
                self.scroll_up(self.top, n);
            }
            b'T' => {
                // SD
                if !plain {
                    return self.unknown_csi();
                }
                let n = self.csi.arg(0, 1).clamp(0, self.row as i64) as usize;
                self.scroll_down(self.top, n);
            }
            b'L' => {
                // IL
                if !plain {
                    return self.unknown_csi();
                }
                let n = self.csi.arg(0, 1);
                self.insert_blank_lines(n);
            }
            b'l' => {
                // RM
                if prefix == b'>' || submode != 0 {
                    return self.unknown_csi();
                }
                let args: SmallVec<[i64; 16]> = self.csi.args.clone();
                self.set_modes(prefix == b'?', false, &args);
            }
            b'M' => {
                // DL
                if !plain {
                    return self.unknown_csi();
                }
                let n = self.csi.arg(0, 1);
                self.delete_lines(n);
            }
            b'X' => {
                // ECH
                if !plain {
                    return self.unknown_csi();
                }
                let n = self.csi.arg(0, 1);
                self.clear_region_term(
                    self.c.x as i64,
                    self.c.y as i64,
                    self.c.x as i64 + n - 1,
                    self.c.y as i64,
                );
            }
            b'P' => {
                // DCH
                if !plain {
                    return self.unknown_csi();
                }
                let n = self.csi.arg(0, 1);
                self.delete_chars(n);
            }
            b'Z' => {
                // CBT
                if !plain {
                    return self.unknown_csi();
                }
                let n = self.csi.arg(0, 1);
                self.put_tab(-n);
            }
            b'd' => {
                // VPA
                if !plain {
                    return self.unknown_csi();
                }
                let n = self.csi.arg(0, 1);
                self.move_to_origin(self.c.x as i64, n - 1);
            }
            b'h' => {
                // SM
                if prefix == b'>' || submode != 0 {
                    return self.unknown_csi();
                }
                let args: SmallVec<[i64; 16]> = self.csi.args.clone();
                self.set_modes(prefix == b'?', true, &args);
            }
            b'm' => {
                if prefix == b'>' {
                    // XTMODKEYS
                    if submode != 0 {
                        return self.unknown_csi();
                    }
                    if self.csi.arg_raw(0) == 4 {
                        let level = self.csi.arg_raw(1);
                        if (0..=2).contains(&level) {
                            self.mok = level as u8;
                            debug!(target: "term.mode", level, "modifyOtherKeys");
                        } else {
                            self.unknown_csi();
                        }
                    } else {
                        debug!(target: "term.mode", "ignored XTMODKEYS resource");
                    }
                } else if !plain {
                    self.unknown_csi();
                } else {
                    // SGR
                    let args: SmallVec<[i64; 16]> = self.csi.args.clone();
                    self.set_attrs(&args);
                }
            }
            b'n' => {
                // DSR
                if !plain {
                    return self.unknown_csi();
                }
                if self.csi.arg_raw(0) == 6 {
                    let reply = format!("\x1b[{};{}R", self.c.y + 1, self.c.x + 1);
                    self.tty_write(reply.as_bytes());
                }
            }
            b'r' => {
                // DECSTBM
                if !plain {
                    return self.unknown_csi();
                }
                let top = self.csi.arg(0, 1);
                let bot = self.csi.arg(1, self.row as i64);
                self.set_scroll_region(top - 1, bot - 1);
                self.move_to_origin(0, 0);
            }
            b's' => {
                // DECSC (ANSI.SYS)
                if !plain {
                    return self.unknown_csi();
                }
                self.cursor_op(CursorOp::Save);
            }
            b'u' => {
                // DECRC (ANSI.SYS)
                if !plain {
                    return self.unknown_csi();
                }
                self.cursor_op(CursorOp::Load);
            }
            b't' => {
                // XTWINOPS
                if !plain {
                    return self.unknown_csi();
                }
                if self.csi.args.is_empty() {
                    return self.unknown_csi();
                }
                match self.csi.arg_raw(0) {
                    // title stack save/restore: don't care
                    22 | 23 => {}
                    // DECSLPP: xterm resizes its window, we don't
                    v if v >= 24 => {}
                    // window manipulation we might respect if needed
                    _ => self.unknown_csi(),
                }
            }
            b'q' => {
                // DECSCUSR via the SP intermediate
                if prefix != 0 {
                    return self.unknown_csi();
                }
                match submode {
                    b' ' => {
                        let v = self.csi.arg_raw(0);
                        if !self.set_cursor_style(v) {
                            self.unknown_csi();
                        }
                    }
                    _ => self.unknown_csi(),
                }
            }
            _ => self.unknown_csi(),
        }
    }

    // ---- STR dispatch -------------------------------------------------

    fn str_dispatch(&mut self) {
        self.esc.remove(Esc::STR_END | Esc::STR);
        let kind = self.strseq.kind;
        let args: Vec<Vec<u8>> = self.strseq.args().iter().map(|a| a.to_vec()).collect();
        let par = args.first().map(|a| atoi(a)).unwrap_or(0);

        match kind {
            b']' => match par {
                0 | 1 | 2 => {
                    if args.len() > 1 {
                        let title = String::from_utf8_lossy(&args[1]).into_owned();
                        self.hooks.set_title(Some(&title));
                    }
                }
                52 => {
                    if args.len() > 2 {
                        match BASE64.decode(&args[2]) {
                            Ok(data) => self.hooks.set_clipboard(&data),
                            Err(_) => {
                                warn!(target: "term.str", "invalid base64 in osc 52");
                            }
                        }
                    }
                }
                _ => {
                    warn!(target: "term.str", "unknown str {}", self.strseq.dump());
                }
            },
            b'k' => {
                // old title-set compatibility
                if let Some(arg0) = args.first() {
                    let title = String::from_utf8_lossy(arg0).into_owned();
                    self.hooks.set_title(Some(&title));
                }
            }
            // DCS, APC, PM: recognized, swallowed
            b'P' | b'_' | b'^' => {}
            _ => {
                warn!(target: "term.str", "unknown str {}", self.strseq.dump());
            }
        }
    }

    // ---- media copy ---------------------------------------------------

    /// Length of a terminal row for printing/selection: trailing blanks
    /// trimmed, full width when the row soft-wraps.
    pub(crate) fn line_len_abs(&self, abs: usize) -> usize {
        let line = self.scr().line(abs);
        let w = line.width();
        if w == 0 {
            return 0;
        }
        if line.glyph(w - 1).attr.contains(GlyphAttr::WRAP) {
            return w;
        }
        let mut i = w;
        while i > 0 && line.glyph(i - 1).u == ' ' {
            i -= 1;
        }
        i
    }

    fn dump_line(&mut self, y: usize) {
        let abs = self.term2abs(y);
        let len = self.line_len_abs(abs);
        let mut out = String::new();
        for i in 0..len {
            let g = self.scr().line(abs).glyph(i);
            if g.attr.contains(GlyphAttr::WDUMMY) {
                continue;
            }
            out.push(g.u);
        }
        out.push('\n');
        self.hooks.printer(out.as_bytes());
    }

    fn dump_screen(&mut self) {
        for y in 0..self.row {
            self.dump_line(y);
        }
    }

    fn dump_selection(&mut self) {
        if let Some(text) = self.selection_text() {
            self.hooks.printer(text.as_bytes());
        }
    }
}

pub(crate) fn atoi(bytes: &[u8]) -> i64 {
    let mut v: i64 = 0;
    for &b in bytes {
        if !b.is_ascii_digit() {
            break;
        }
        v = v.saturating_mul(10).saturating_add((b - b'0') as i64);
    }
    v
}
