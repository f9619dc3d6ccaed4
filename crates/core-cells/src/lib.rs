//! core-cells: the styled character cell and the rendered line.
//!
//! A `Glyph` is one terminal cell: a codepoint, an attribute bitset, and
//! 24-bit foreground/background colors. An `RLine` is one physical row of
//! glyphs plus a `line_id` tying consecutive soft-wrapped rows into a
//! logical line. Everything above (ring buffer, cursor, parser) is built
//! out of these two types, so they stay dependency-light and allocation
//! behavior stays obvious: an `RLine`'s width is fixed at allocation time
//! and never changes (resizing allocates new lines).

mod color;
mod glyph;
mod rline;

pub use color::rgb_from_index;
pub use glyph::{Glyph, GlyphAttr, Rgb, display_width};
pub use rline::RLine;
