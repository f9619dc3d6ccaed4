//! Incremental UTF-8 ingestion.
//!
//! The pty delivers arbitrary byte boundaries, so a multi-byte sequence
//! can be split across reads. `decode` pulls one codepoint off the front
//! of a buffer: an incomplete tail is reported so the caller can retain
//! it for the next read, and invalid bytes resynchronize one byte at a
//! time as U+FFFD.

pub(crate) const REPLACEMENT: char = '\u{FFFD}';

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Decoded {
    /// A codepoint and the number of bytes it consumed.
    Char(char, usize),
    /// A valid prefix of a multi-byte sequence ends the buffer.
    Incomplete,
}

fn sequence_len(first: u8) -> Option<usize> {
    match first {
        0x00..=0x7f => Some(1),
        0xc0..=0xdf => Some(2),
        0xe0..=0xef => Some(3),
        0xf0..=0xf7 => Some(4),
        _ => None,
    }
}

pub(crate) fn decode(buf: &[u8]) -> Decoded {
    debug_assert!(!buf.is_empty());
    let Some(len) = sequence_len(buf[0]) else {
        return Decoded::Char(REPLACEMENT, 1);
    };
    if buf.len() < len {
        // only an end-of-buffer prefix counts as incomplete; a broken
        // continuation inside the available bytes falls through below
        return match std::str::from_utf8(buf) {
            Err(e) if e.error_len().is_none() => Decoded::Incomplete,
            _ => Decoded::Char(REPLACEMENT, 1),
        };
    }
    match std::str::from_utf8(&buf[..len]) {
        Ok(s) => Decoded::Char(s.chars().next().expect("nonempty"), len),
        // overlong, surrogate, or broken continuation
        Err(_) => Decoded::Char(REPLACEMENT, 1),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn ascii() {
        assert_eq!(decode(b"abc"), Decoded::Char('a', 1));
    }

    #[test]
    fn multibyte() {
        assert_eq!(decode("é".as_bytes()), Decoded::Char('é', 2));
        assert_eq!(decode("界x".as_bytes()), Decoded::Char('界', 3));
        assert_eq!(decode("🙂".as_bytes()), Decoded::Char('🙂', 4));
    }

    #[test]
    fn split_sequence_is_incomplete() {
        let bytes = "界".as_bytes();
        assert_eq!(decode(&bytes[..1]), Decoded::Incomplete);
        assert_eq!(decode(&bytes[..2]), Decoded::Incomplete);
    }

    #[test]
    fn stray_continuation_resyncs_per_byte() {
        assert_eq!(decode(&[0x80, b'a']), Decoded::Char(REPLACEMENT, 1));
        assert_eq!(decode(&[0xff]), Decoded::Char(REPLACEMENT, 1));
    }

    #[test]
    fn overlong_is_replaced() {
        // 0xC0 0xAF would decode to '/' if overlong forms were allowed
        assert_eq!(decode(&[0xc0, 0xaf]), Decoded::Char(REPLACEMENT, 1));
    }
}
