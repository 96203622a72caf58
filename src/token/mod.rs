//! The Token type - an owned copy of a shifted selection.

use bytes::Bytes;
use std::fmt;

/// Bytes of one shifted selection plus where they started in the stream.
///
/// Views returned by [`Lexer::shift`](crate::Lexer::shift) are invalidated by
/// the next relocating peek; a `Token` owns its bytes and outlives that.
///
/// # Example
///
/// ```
/// use lexbuf::Lexer;
///
/// let mut lexer = Lexer::from_reader(&b"let x"[..]);
/// lexer.move_by(3);
/// let token = lexer.shift_token();
///
/// assert_eq!(token.data, &b"let"[..]);
/// assert_eq!(token.offset, 0);
/// assert_eq!(token.end(), 3);
/// ```
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Token {
    /// The token bytes.
    pub data: Bytes,

    /// Stream offset of the first byte.
    pub offset: u64,
}

impl Token {
    /// Creates a token from its bytes and start offset.
    pub fn new(data: impl Into<Bytes>, offset: u64) -> Self {
        Self {
            data: data.into(),
            offset,
        }
    }

    /// Returns the length of the token data.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the token has no data.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns the end offset (exclusive).
    pub fn end(&self) -> u64 {
        self.offset + self.data.len() as u64
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token")
            .field("data", &self.data)
            .field("span", &(self.offset..self.end()))
            .finish()
    }
}
