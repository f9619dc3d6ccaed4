//! The single-cell glyph and its attribute flags.

use serde::{Deserialize, Serialize};
use unicode_width::UnicodeWidthChar;

bitflags::bitflags! {
    /// Per-cell attribute flags.
    ///
    /// `WRAP` marks the last cell of a row that soft-wrapped into the next
    /// row of the same logical line. `WIDE`/`WDUMMY` mark the two cells of
    /// a double-width glyph. `NORENDER` marks a cell that has been cleared
    /// and carries no content of its own (the codepoint is a space so a
    /// cursor parked on it still draws something).
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct GlyphAttr: u16 {
        const BOLD      = 1 << 0;
        const FAINT     = 1 << 1;
        const ITALIC    = 1 << 2;
        const UNDERLINE = 1 << 3;
        const BLINK     = 1 << 4;
        const REVERSE   = 1 << 5;
        const INVISIBLE = 1 << 6;
        const STRUCK    = 1 << 7;
        const WRAP      = 1 << 8;
        const WIDE      = 1 << 9;
        const WDUMMY    = 1 << 10;
        const NORENDER  = 1 << 11;

        const BOLD_FAINT = Self::BOLD.bits() | Self::FAINT.bits();
    }
}

/// 24-bit color, the only color representation the grid stores. Palette
/// and SGR indexes are resolved to `Rgb` at write time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// One terminal cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Glyph {
    /// The codepoint shown in this cell.
    pub u: char,
    pub attr: GlyphAttr,
    pub fg: Rgb,
    pub bg: Rgb,
}

impl Glyph {
    /// A freshly cleared cell: a space carrying `NORENDER` and the colors
    /// the cursor held when the clear happened.
    pub fn blank(fg: Rgb, bg: Rgb) -> Self {
        Self {
            u: ' ',
            attr: GlyphAttr::NORENDER,
            fg,
            bg,
        }
    }
}

/// Display width of a codepoint in cells, or `None` for codepoints with
/// no defined width (controls, unassigned). Callers substitute U+FFFD at
/// width 1 for the `None` case; nothing else in the workspace consults
/// `unicode-width` directly.
pub fn display_width(u: char) -> Option<usize> {
    UnicodeWidthChar::width(u)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn blank_cell_is_norender_space() {
        let g = Glyph::blank(Rgb::new(229, 229, 229), Rgb::new(0, 0, 0));
        assert_eq!(g.u, ' ');
        assert!(g.attr.contains(GlyphAttr::NORENDER));
        assert_eq!(g.bg, Rgb::new(0, 0, 0));
    }

    #[test]
    fn bold_faint_is_the_pair() {
        let mut a = GlyphAttr::BOLD | GlyphAttr::FAINT | GlyphAttr::ITALIC;
        a &= !GlyphAttr::BOLD_FAINT;
        assert_eq!(a, GlyphAttr::ITALIC);
    }

    #[test]
    fn widths() {
        assert_eq!(display_width('a'), Some(1));
        assert_eq!(display_width('界'), Some(2));
        assert_eq!(display_width('\u{1b}'), None);
    }
}
