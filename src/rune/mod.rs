//! UTF-8 decoding on top of byte peeks.
//!
//! The lead byte alone decides the sequence length; continuation bytes are
//! masked and folded in without validation. Malformed input decodes to
//! something rather than failing, and a code point that is not a valid
//! `char` (surrogates, values past U+10FFFF) becomes U+FFFD.

/// Encoded length implied by a lead byte.
///
/// Bytes below `0xC0`, including stray continuation bytes, count as
/// single-byte sequences.
///
/// ```
/// assert_eq!(lexbuf::utf8_len(b'a'), 1);
/// assert_eq!(lexbuf::utf8_len(0xC3), 2);
/// assert_eq!(lexbuf::utf8_len(0xE2), 3);
/// assert_eq!(lexbuf::utf8_len(0xF4), 4);
/// ```
pub fn utf8_len(lead: u8) -> usize {
    match lead {
        0x00..0xC0 => 1,
        0xC0..0xE0 => 2,
        0xE0..0xF0 => 3,
        _ => 4,
    }
}

/// Decodes the code point starting at relative index `i`.
pub(crate) fn decode(mut peek: impl FnMut(usize) -> u8, i: usize) -> (char, usize) {
    let c = peek(i);
    let n = utf8_len(c);
    let lead = match n {
        1 => return (char::from(c), 1),
        2 => c & 0x1F,
        3 => c & 0x0F,
        _ => c & 0x07,
    };

    let mut cp = u32::from(lead);
    for k in 1..n {
        cp = cp << 6 | u32::from(peek(i.saturating_add(k)) & 0x3F);
    }
    (char::from_u32(cp).unwrap_or(char::REPLACEMENT_CHARACTER), n)
}
