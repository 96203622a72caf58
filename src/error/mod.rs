//! Error types for lexbuf.

use std::fmt;
use std::io;

/// Errors reported by a [`Lexer`](crate::Lexer) or its configuration.
///
/// Only [`LexerError::Exhausted`] is a normal condition: it marks the end of
/// input and already-buffered bytes may still be scanned. Every other
/// variant observed by a lexer is sticky for the rest of its lifetime.
#[derive(Debug)]
pub enum LexerError {
    /// The source has no more bytes.
    Exhausted,

    /// The source failed with an I/O error.
    Io(io::Error),

    /// A single token needed a larger window than the configured maximum.
    BufferExceeded {
        /// Window size the token would have needed.
        requested: usize,
        /// The configured maximum capacity.
        limit: usize,
    },

    /// Invalid configuration parameter.
    InvalidConfig {
        /// Description of what was invalid.
        message: &'static str,
    },
}

impl LexerError {
    /// Returns true for the end-of-input condition.
    pub fn is_exhausted(&self) -> bool {
        matches!(self, LexerError::Exhausted)
    }
}

impl fmt::Display for LexerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LexerError::Exhausted => write!(f, "end of input"),
            LexerError::Io(e) => write!(f, "io error: {}", e),
            LexerError::BufferExceeded { requested, limit } => {
                write!(f, "buffer exceeded: {} bytes (max {})", requested, limit)
            }
            LexerError::InvalidConfig { message } => {
                write!(f, "invalid config: {}", message)
            }
        }
    }
}

impl std::error::Error for LexerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LexerError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for LexerError {
    fn from(e: io::Error) -> Self {
        LexerError::Io(e)
    }
}

/// Where the source stands. Both non-active states are terminal.
#[derive(Debug)]
pub(crate) enum SourceState {
    /// The source may still produce bytes.
    Active,
    /// The source reported end of input, or the lexer was built over memory.
    Exhausted,
    /// The source or the growth policy failed.
    Failed(LexerError),
}

impl SourceState {
    pub(crate) fn is_active(&self) -> bool {
        matches!(self, SourceState::Active)
    }

    /// Moves an active state into its terminal form. Terminal states stay put.
    pub(crate) fn finish(&mut self, outcome: Option<LexerError>) {
        if !self.is_active() {
            return;
        }
        *self = match outcome {
            None | Some(LexerError::Exhausted) => SourceState::Exhausted,
            Some(e) => SourceState::Failed(e),
        };
    }
}
