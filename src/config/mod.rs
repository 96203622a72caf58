//! Configuration for lexer buffering.
//!
//! - [`LexerConfig`] - Initial window capacity and optional growth limit
//!
//! # Example
//!
//! ```
//! use lexbuf::LexerConfig;
//!
//! // Small initial window, never grow past 1 MiB
//! let config = LexerConfig::new(1024)?.with_max_capacity(Some(1024 * 1024));
//! config.validate()?;
//! # Ok::<(), lexbuf::LexerError>(())
//! ```

use crate::error::LexerError;

/// Default initial capacity of a streaming lexer's backing buffer (4 KiB).
pub const DEFAULT_BUFFER_SIZE: usize = 4 * 1024;

/// Configuration for a streaming [`Lexer`](crate::Lexer).
///
/// The initial capacity is an estimate of the longest token plus look-ahead;
/// the window grows past it when a token does not fit. The maximum capacity,
/// when set, bounds that growth: a token whose window would exceed it fails
/// the stream with [`LexerError::BufferExceeded`].
///
/// In-memory lexers ignore the configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LexerConfig {
    /// Capacity of the first backing buffer in bytes.
    initial_capacity: usize,

    /// Upper bound on the window size, if any.
    max_capacity: Option<usize>,
}

impl LexerConfig {
    /// Creates a configuration with the given initial capacity and no limit.
    ///
    /// # Errors
    ///
    /// Returns [`LexerError::InvalidConfig`] if `initial_capacity` is zero.
    ///
    /// # Example
    ///
    /// ```
    /// use lexbuf::LexerConfig;
    ///
    /// let config = LexerConfig::new(64)?;
    /// assert_eq!(config.initial_capacity(), 64);
    /// assert_eq!(config.max_capacity(), None);
    /// # Ok::<(), lexbuf::LexerError>(())
    /// ```
    pub fn new(initial_capacity: usize) -> Result<Self, LexerError> {
        let config = Self {
            initial_capacity,
            max_capacity: None,
        };
        config.validate()?;
        Ok(config)
    }

    /// Sets the initial capacity.
    ///
    /// Note: This does not validate the configuration. Use
    /// [`LexerConfig::validate`] to check it.
    pub fn with_initial_capacity(mut self, size: usize) -> Self {
        self.initial_capacity = size;
        self
    }

    /// Sets the maximum capacity. `None` lets the window grow without bound.
    ///
    /// Note: This does not validate the configuration.
    pub fn with_max_capacity(mut self, size: Option<usize>) -> Self {
        self.max_capacity = size;
        self
    }

    /// Returns the initial capacity.
    pub fn initial_capacity(&self) -> usize {
        self.initial_capacity
    }

    /// Returns the maximum capacity, if set.
    pub fn max_capacity(&self) -> Option<usize> {
        self.max_capacity
    }

    /// Validates the current configuration.
    ///
    /// # Errors
    ///
    /// Returns [`LexerError::InvalidConfig`] if the initial capacity is zero
    /// or the maximum capacity is below it.
    pub fn validate(&self) -> Result<(), LexerError> {
        if self.initial_capacity == 0 {
            return Err(LexerError::InvalidConfig {
                message: "initial capacity must be non-zero",
            });
        }

        if let Some(max) = self.max_capacity {
            if max < self.initial_capacity {
                return Err(LexerError::InvalidConfig {
                    message: "max capacity cannot be smaller than initial capacity",
                });
            }
        }

        Ok(())
    }
}

impl Default for LexerConfig {
    fn default() -> Self {
        Self {
            initial_capacity: DEFAULT_BUFFER_SIZE,
            max_capacity: None,
        }
    }
}
