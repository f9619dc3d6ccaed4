//! Charset designation and the DEC line-drawing translation.

use tracing::warn;

/// The charsets an application can install into the G0..G3 slots. Only
/// US-ASCII and the DEC special graphics set are supported; other
/// designators are logged and ignored.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Charset {
    Usa,
    Graphic0,
}

/// Install a charset by its designator byte (`ESC ( 0`, `ESC ( B`, ...).
pub(crate) fn designate(slot: &mut Charset, designator: char) {
    match designator {
        '0' => *slot = Charset::Graphic0,
        'B' => *slot = Charset::Usa,
        _ => warn!(target: "term.esc", %designator, "unhandled charset designator"),
    }
}

// The xterm rendering of the DEC special graphics set for 0x60..=0x7E.
// infocmp claims b-e are unsupported, but xterm honors them anyway and so
// do we.
const ACSC: [char; 31] = [
    '◆', '▒', '␉', '␌', '␍', '␊', '°', '±', '␤', '␋', '┘', '┐', '┌', '└', '┼',
    '⎺', '⎻', '─', '⎼', '⎽', '├', '┤', '┴', '┬', '│', '≤', '≥', 'π', '≠', '£',
    '·',
];

/// Translate a codepoint through the active charset.
pub(crate) fn translate(u: char, charset: Charset) -> char {
    if charset != Charset::Graphic0 {
        return u;
    }
    let code = u as u32;
    if !(0x60..=0x7e).contains(&code) {
        return u;
    }
    ACSC[(code - 0x60) as usize]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn graphic0_maps_line_drawing() {
        assert_eq!(translate('q', Charset::Graphic0), '─');
        assert_eq!(translate('x', Charset::Graphic0), '│');
        assert_eq!(translate('`', Charset::Graphic0), '◆');
        assert_eq!(translate('~', Charset::Graphic0), '·');
    }

    #[test]
    fn usa_is_identity() {
        assert_eq!(translate('q', Charset::Usa), 'q');
    }

    #[test]
    fn outside_range_is_identity() {
        assert_eq!(translate('A', Charset::Graphic0), 'A');
        assert_eq!(translate(' ', Charset::Graphic0), ' ');
    }

    #[test]
    fn designators() {
        let mut slot = Charset::Usa;
        designate(&mut slot, '0');
        assert_eq!(slot, Charset::Graphic0);
        designate(&mut slot, 'B');
        assert_eq!(slot, Charset::Usa);
        designate(&mut slot, 'Z'); // unknown: ignored
        assert_eq!(slot, Charset::Usa);
    }
}
