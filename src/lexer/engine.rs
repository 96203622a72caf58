//! Core lexer engine.
//!
//! The lexer keeps three positions into its backing buffer:
//!
//! - `consumed` - first byte the caller has not freed yet
//! - `start` - first byte of the token being scanned
//! - `end` - the scan frontier, one past the last inspected byte
//!
//! with `consumed <= start <= end`. The backing is always initialized up to
//! its capacity; `filled` marks how much of it holds stream bytes. Peeking
//! past `filled` reads into the spare room. When the backing is full, the
//! unfinished token (`start..`) moves to a new or recycled buffer from the
//! pool, and the shifted-but-unfreed prefix stays parked in the pool until
//! [`Lexer::free`] releases it.
//!
//! # Example
//!
//! ```
//! use lexbuf::Lexer;
//!
//! let mut lexer = Lexer::from_reader(&b"Lorem ipsum"[..]);
//! while lexer.peek(0) != b' ' {
//!     lexer.move_by(1);
//! }
//! assert_eq!(lexer.shift(), b"Lorem");
//! ```

use std::borrow::Cow;
use std::io::{self, Read};
use std::ops::Range;

use bytes::Bytes;
use tracing::{debug, trace};

use crate::buffer::BufferPool;
use crate::config::LexerConfig;
use crate::error::{LexerError, SourceState};
use crate::rune;
use crate::token::Token;

static EXHAUSTED: LexerError = LexerError::Exhausted;

/// A buffered byte window for hand-written tokenizers.
///
/// The driving tokenizer classifies bytes with [`peek`](Lexer::peek),
/// advances or rewinds the frontier with [`move_by`](Lexer::move_by) and
/// [`move_to`](Lexer::move_to), and extracts a recognized token with
/// [`shift`](Lexer::shift) (or drops it with [`skip`](Lexer::skip)).
///
/// # Construction
///
/// - [`Lexer::from_reader`] streams from any [`Read`]. Slices returned by
///   [`bytes`](Lexer::bytes) and [`shift`](Lexer::shift) borrow the lexer and
///   must be copied (see [`shift_bytes`](Lexer::shift_bytes)) to survive the
///   next peek, which may relocate the window.
/// - [`Lexer::from_bytes`] works directly on a slice already in memory. It
///   never refills, and [`shift_stable`](Lexer::shift_stable) hands out
///   slices that live as long as the input.
///
/// # Freeing
///
/// Shifted bytes stay in memory until [`free`](Lexer::free) certifies them
/// as never revisited. A tokenizer that does not hold on to token positions
/// can free each token right after shifting it.
///
/// # Errors
///
/// `peek` never fails; past the end of input, or after a source error, it
/// returns `0`. [`err`](Lexer::err) tells the two apart.
#[derive(Debug)]
pub struct Lexer<'a, R = io::Empty> {
    reader: R,
    state: SourceState,
    pool: BufferPool,
    config: LexerConfig,
    buf: Cow<'a, [u8]>,
    /// Bytes of `buf` holding stream data.
    filled: usize,
    /// Stream offset of `buf[0]`.
    base: u64,
    consumed: usize,
    start: usize,
    end: usize,
}

impl<'a> Lexer<'a, io::Empty> {
    /// Creates a lexer over bytes that are already in memory.
    ///
    /// No buffering or pooling takes place and [`is_eof`](Lexer::is_eof) is
    /// true from the start.
    ///
    /// # Example
    ///
    /// ```
    /// use lexbuf::Lexer;
    ///
    /// let source = String::from("key = value");
    /// let key = {
    ///     let mut lexer = Lexer::from_bytes(source.as_bytes());
    ///     lexer.move_to(3);
    ///     lexer.shift_stable().unwrap()
    /// };
    /// assert_eq!(key, b"key");
    /// ```
    pub fn from_bytes(data: &'a [u8]) -> Self {
        Self {
            reader: io::empty(),
            state: SourceState::Exhausted,
            pool: BufferPool::new(),
            config: LexerConfig::default(),
            buf: Cow::Borrowed(data),
            filled: data.len(),
            base: 0,
            consumed: 0,
            start: 0,
            end: 0,
        }
    }
}

impl<R: Read> Lexer<'static, R> {
    /// Creates a streaming lexer with the default configuration.
    pub fn from_reader(reader: R) -> Self {
        Self::build(reader, LexerConfig::default())
    }

    /// Creates a streaming lexer with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns [`LexerError::InvalidConfig`] if the configuration does not
    /// validate.
    ///
    /// # Example
    ///
    /// ```
    /// use lexbuf::{Lexer, LexerConfig};
    ///
    /// let config = LexerConfig::new(4)?;
    /// let mut lexer = Lexer::with_config(&b"abcdefghi"[..], config)?;
    /// assert_eq!(lexer.peek(8), b'i');
    /// # Ok::<(), lexbuf::LexerError>(())
    /// ```
    pub fn with_config(reader: R, config: LexerConfig) -> Result<Self, LexerError> {
        config.validate()?;
        Ok(Self::build(reader, config))
    }

    fn build(reader: R, config: LexerConfig) -> Self {
        let mut lexer = Self {
            reader,
            state: SourceState::Active,
            pool: BufferPool::new(),
            config,
            buf: Cow::Owned(vec![0; config.initial_capacity()]),
            filled: 0,
            base: 0,
            consumed: 0,
            start: 0,
            end: 0,
        };
        lexer.peek(0);
        lexer
    }
}

impl<'a, R: Read> Lexer<'a, R> {
    /// Returns the byte `offset` positions past the frontier.
    ///
    /// Returns `0` when that byte does not exist because the input ended or
    /// the source failed. May relocate the window, invalidating slices
    /// obtained earlier unless [`is_eof`](Lexer::is_eof) is true.
    #[inline]
    pub fn peek(&mut self, offset: usize) -> u8 {
        let Some(at) = self.end.checked_add(offset) else {
            return 0;
        };
        if at < self.filled {
            return self.buf[at];
        }
        self.read(offset)
    }

    /// Decodes the UTF-8 code point `offset` bytes past the frontier.
    ///
    /// Returns the character and its encoded length in bytes. Decoding is
    /// best effort: the length follows from the lead byte, continuation
    /// bytes are not checked, and an impossible code point comes back as
    /// U+FFFD.
    ///
    /// ```
    /// use lexbuf::Lexer;
    ///
    /// let mut lexer = Lexer::from_reader("† dagger".as_bytes());
    /// assert_eq!(lexer.peek_rune(0), ('†', 3));
    /// ```
    pub fn peek_rune(&mut self, offset: usize) -> (char, usize) {
        rune::decode(|i| self.peek(i), offset)
    }

    /// Moves the frontier by `delta` bytes, backwards if negative.
    ///
    /// The frontier never moves before the token start; doing so is a bug
    /// in the caller and panics in debug builds.
    pub fn move_by(&mut self, delta: isize) {
        let end = self.end.saturating_add_signed(delta);
        debug_assert!(end >= self.start, "frontier moved before token start");
        self.end = end.max(self.start);
    }

    /// Sets the frontier to `n` bytes past the token start.
    pub fn move_to(&mut self, n: usize) {
        self.end = self.start.saturating_add(n);
    }

    /// Returns the frontier relative to the token start, for use with
    /// [`move_to`](Lexer::move_to).
    pub fn pos(&self) -> usize {
        self.end - self.start
    }

    /// Returns the current selection.
    pub fn bytes(&self) -> &[u8] {
        &self.buf[self.selection()]
    }

    /// Returns the current selection and starts the next token at the
    /// frontier.
    pub fn shift(&mut self) -> &[u8] {
        let range = self.selection();
        self.start = self.end;
        &self.buf[range]
    }

    /// Starts the next token at the frontier, dropping the selection.
    pub fn skip(&mut self) {
        self.start = self.end;
    }

    /// Shifts the selection out as an owned buffer.
    pub fn shift_bytes(&mut self) -> Bytes {
        Bytes::copy_from_slice(self.shift())
    }

    /// Shifts the selection out together with its stream offset.
    pub fn shift_token(&mut self) -> Token {
        let offset = self.offset();
        Token::new(self.shift_bytes(), offset)
    }

    /// Releases `n` more shifted bytes, oldest first.
    ///
    /// Pool blocks whose bytes are all released become available for reuse.
    /// The running total must not exceed the bytes shifted or skipped so
    /// far; in debug builds exceeding it panics, in release builds the
    /// excess is ignored.
    pub fn free(&mut self, n: usize) {
        let spill = self.pool.free(n);
        debug_assert!(spill == 0 || self.pool.is_drained());
        let consumed = self.consumed + spill;
        debug_assert!(
            consumed <= self.start,
            "freed {} bytes past the shifted boundary",
            consumed - self.start
        );
        self.consumed = consumed.min(self.start);
    }

    /// Returns the condition that ended the input, if any.
    ///
    /// End of input is only reported once the frontier has reached the last
    /// buffered byte, so trailing bytes can still be scanned after the
    /// source ran dry. Source errors are reported on every call.
    pub fn err(&self) -> Option<&LexerError> {
        match &self.state {
            SourceState::Active => None,
            SourceState::Exhausted if self.end < self.filled => None,
            SourceState::Exhausted => Some(&EXHAUSTED),
            SourceState::Failed(e) => Some(e),
        }
    }

    /// True once all input is in memory (or the source failed). From then
    /// on no peek relocates the window, so earlier slices stay valid.
    pub fn is_eof(&self) -> bool {
        !self.state.is_active()
    }

    /// Stream offset of the token start.
    pub fn offset(&self) -> u64 {
        self.base + self.start as u64
    }

    /// Returns the selection with the lifetime of the input, if the lexer
    /// was built with [`Lexer::from_bytes`].
    pub fn bytes_stable(&self) -> Option<&'a [u8]> {
        match &self.buf {
            Cow::Borrowed(data) => {
                let data: &'a [u8] = *data;
                Some(&data[self.selection()])
            }
            Cow::Owned(_) => None,
        }
    }

    /// Like [`shift`](Lexer::shift), with the lifetime of the input.
    ///
    /// Returns `None`, and leaves the selection in place, for streaming
    /// lexers.
    pub fn shift_stable(&mut self) -> Option<&'a [u8]> {
        let token = self.bytes_stable()?;
        self.start = self.end;
        Some(token)
    }

    fn selection(&self) -> Range<usize> {
        let end = self.end.min(self.filled);
        self.start.min(end)..end
    }

    /// Reads until byte `offset` past the frontier is buffered or the source
    /// stops. Relocation rebases `end`, so the index is recomputed per pass.
    fn read(&mut self, offset: usize) -> u8 {
        while self.state.is_active() {
            // `peek` checked this sum, and relocation only lowers `end`.
            let target = self.end + offset;
            self.refill(target);
            let at = self.end + offset;
            if at < self.filled {
                return self.buf[at];
            }
        }
        0
    }

    /// Pulls one read's worth of bytes into the spare room of the backing,
    /// relocating first if there is none left.
    fn refill(&mut self, target: usize) {
        if self.filled == self.buf.len() && !self.relocate(target) {
            return;
        }

        let filled = self.filled;
        let buf = self.buf.to_mut();
        let outcome = loop {
            match self.reader.read(&mut buf[filled..]) {
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                other => break other,
            }
        };

        match outcome {
            Ok(n) => {
                self.filled += n;
                trace!(read = n, buffered = self.filled, "refill");
                if n == 0 {
                    debug!(
                        offset = self.base + filled as u64,
                        allocations = self.pool.allocations(),
                        "source exhausted"
                    );
                    self.state.finish(None);
                }
            }
            Err(e) => {
                debug!(error = %e, "source failed");
                self.state.finish(Some(LexerError::Io(e)));
            }
        }
    }

    /// Moves the unfinished token to the front of a backing buffer with room
    /// to read more. The new size follows the growth policy rather than
    /// `target`, so a source that runs dry stops the growth early. Returns
    /// false if the growth limit leaves no room, which fails the stream.
    fn relocate(&mut self, target: usize) -> bool {
        let capacity = self.buf.len();
        let retain = self.start.min(self.filled);
        let residual = self.filled - retain;

        let mut size = if 2 * residual > capacity {
            2 * capacity + residual
        } else {
            capacity
        };

        if let Some(limit) = self.config.max_capacity() {
            size = size.min(limit);
            if size <= residual {
                let needed = (target - retain).saturating_add(1);
                debug!(requested = needed, limit, "token exceeds buffer limit");
                self.state.finish(Some(LexerError::BufferExceeded {
                    requested: needed,
                    limit,
                }));
                return false;
            }
        }

        let mut old = std::mem::take(&mut self.buf).into_owned();
        old.truncate(self.filled);

        trace!(
            residual,
            capacity,
            size,
            parked = self.pool.outstanding(),
            "relocating window"
        );
        let freed = self.consumed.min(retain);
        let mut new = self.pool.swap(old, retain, freed, size);
        self.filled = new.len();
        new.resize(size, 0);

        self.base += retain as u64;
        self.start -= retain;
        self.end -= retain;
        self.consumed -= freed;
        self.buf = Cow::Owned(new);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Hands out at most `step` bytes per read.
    struct Trickle<'a> {
        data: &'a [u8],
        step: usize,
    }

    impl Read for Trickle<'_> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = self.step.min(buf.len()).min(self.data.len());
            buf[..n].copy_from_slice(&self.data[..n]);
            self.data = &self.data[n..];
            Ok(n)
        }
    }

    fn trickle(data: &[u8], step: usize, capacity: usize) -> Lexer<'static, Trickle<'_>> {
        let config = LexerConfig::new(capacity).unwrap();
        Lexer::build(Trickle { data, step }, config)
    }

    fn assert_positions<R: Read>(lexer: &Lexer<'_, R>) {
        assert!(lexer.consumed <= lexer.start);
        assert!(lexer.start <= lexer.end);
    }

    #[test]
    fn test_small_capacity_grows() {
        let mut lexer = trickle(b"abcdefghi", 3, 4);
        assert_eq!(lexer.peek(8), b'i');
        assert_eq!(lexer.peek(0), b'a');
        assert_positions(&lexer);
    }

    #[test]
    fn test_token_survives_relocation() {
        let data = b"alpha beta gamma delta";
        let mut lexer = trickle(data, 2, 4);

        assert_eq!(lexer.peek(4), b'a');
        lexer.move_to(5);
        assert_eq!(lexer.shift(), b"alpha");
        lexer.move_by(1);
        lexer.skip();

        // Scan "beta gamma" as one selection, forcing relocations.
        for _ in 0..10 {
            lexer.peek(0);
            lexer.move_by(1);
        }
        assert_eq!(lexer.bytes(), b"beta gamma");
        assert_eq!(lexer.offset(), 6);
        assert_positions(&lexer);
    }

    #[test]
    fn test_relocation_rebases_offset() {
        let mut lexer = trickle(b"0123456789", 1, 2);
        lexer.move_to(7);
        lexer.skip();
        lexer.free(7);

        assert_eq!(lexer.peek(2), b'9');
        assert_eq!(lexer.offset(), 7);
        assert_eq!(lexer.peek(0), b'7');
    }

    #[test]
    fn test_freed_blocks_are_recycled() {
        let data: Vec<u8> = (0..4096u32).map(|i| b'a' + (i % 26) as u8).collect();
        let mut lexer = trickle(&data, 64, 64);

        // Shift 8-byte tokens and free them immediately.
        let mut seen = Vec::new();
        loop {
            if lexer.peek(7) == 0 {
                break;
            }
            lexer.move_by(8);
            seen.extend_from_slice(lexer.shift());
            lexer.free(8);
        }

        assert_eq!(seen, data);
        // Fully freed windows slide in place: nothing beyond the first buffer.
        assert_eq!(lexer.pool.allocations(), 0);
    }

    #[test]
    fn test_drained_block_backs_next_relocation() {
        let data: Vec<u8> = (0..64u32).map(|i| b'a' + (i % 26) as u8).collect();
        let mut lexer = trickle(&data, 8, 8);

        // An unfreed token forces the full window into the pool.
        lexer.move_to(8);
        lexer.skip();
        assert_eq!(lexer.peek(0), data[8]);
        assert_eq!(lexer.pool.allocations(), 1);

        lexer.free(8);
        assert!(lexer.pool.is_drained());

        // The next relocation parks another token and reuses the drained block.
        lexer.move_to(8);
        lexer.skip();
        assert_eq!(lexer.peek(0), data[16]);
        assert_eq!(lexer.pool.allocations(), 1);
        assert!(!lexer.pool.is_drained());
        assert_eq!(lexer.offset(), 16);
    }

    #[test]
    fn test_far_peek_past_short_input_stays_small() {
        let mut lexer = Lexer::from_reader(&b"tiny"[..]);
        assert_eq!(lexer.peek(1 << 30), 0);
        assert!(lexer.err().is_none(), "bytes remain before the frontier");
        assert_eq!(lexer.buf.len(), crate::DEFAULT_BUFFER_SIZE);
        assert_eq!(lexer.pool.allocations(), 0);

        // Growth follows the data, not the requested index.
        let mut lexer = trickle(b"abcdefghi", 3, 4);
        assert_eq!(lexer.peek(1 << 30), 0);
        assert_eq!(lexer.buf.len(), 12);
        assert_eq!(lexer.pool.allocations(), 1);
        assert_eq!(lexer.peek(8), b'i');
    }

    #[test]
    fn test_short_reads_reuse_spare_room() {
        /// Hands out one byte per read and marks the rest of the region.
        struct Marking<'a> {
            data: &'a [u8],
            marked: usize,
            reads: usize,
        }

        impl Read for Marking<'_> {
            fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
                self.reads += 1;
                if buf.first() == Some(&0xAA) {
                    self.marked += 1;
                }
                let n = buf.len().min(1).min(self.data.len());
                buf[..n].copy_from_slice(&self.data[..n]);
                self.data = &self.data[n..];
                buf[n..].fill(0xAA);
                Ok(n)
            }
        }

        let data = [b'q'; 32];
        let reader = Marking {
            data: &data,
            marked: 0,
            reads: 0,
        };
        let mut lexer = Lexer::build(reader, LexerConfig::new(64).unwrap());
        assert_eq!(lexer.peek(40), 0);
        assert_eq!(lexer.peek(31), b'q');

        // Every read after the first lands in room the previous one marked:
        // the spare region is not cleared between reads.
        assert_eq!(lexer.reader.reads, 33);
        assert_eq!(lexer.reader.marked, 32);
    }

    #[test]
    fn test_unfreed_tokens_are_parked() {
        let data: Vec<u8> = (0..256u32).map(|i| i as u8 | 1).collect();
        let mut lexer = trickle(&data, 16, 16);

        let mut tokens = 0;
        while lexer.peek(3) != 0 {
            lexer.move_by(4);
            lexer.skip();
            tokens += 1;
        }
        assert_eq!(tokens, 64);
        assert!(!lexer.pool.is_drained());

        lexer.free(256);
        assert!(lexer.pool.is_drained());
        assert_eq!(lexer.consumed, lexer.start);
        assert_positions(&lexer);
    }

    #[test]
    fn test_max_capacity_fails_long_token() {
        let config = LexerConfig::new(4)
            .unwrap()
            .with_max_capacity(Some(8));
        let mut lexer = Lexer::with_config(&b"0123456789abcdef"[..], config).unwrap();

        assert_eq!(lexer.peek(7), b'7');
        assert_eq!(lexer.peek(8), 0);
        assert!(matches!(
            lexer.err(),
            Some(LexerError::BufferExceeded {
                requested: 9,
                limit: 8
            })
        ));
        assert!(lexer.is_eof());
    }

    #[test]
    fn test_interrupted_reads_are_retried() {
        struct Flaky {
            interrupted: bool,
        }

        impl Read for Flaky {
            fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
                if !self.interrupted {
                    self.interrupted = true;
                    return Err(io::ErrorKind::Interrupted.into());
                }
                buf[0] = b'x';
                Ok(1)
            }
        }

        let mut lexer = Lexer::from_reader(Flaky { interrupted: false });
        assert_eq!(lexer.peek(0), b'x');
        assert!(lexer.err().is_none());
    }

    #[test]
    fn test_source_error_is_sticky() {
        struct Broken {
            reads: usize,
        }

        impl Read for Broken {
            fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
                self.reads += 1;
                if self.reads == 1 {
                    buf[..2].copy_from_slice(b"ok");
                    return Ok(2);
                }
                Err(io::Error::other("disk on fire"))
            }
        }

        let mut lexer = Lexer::from_reader(Broken { reads: 0 });
        assert_eq!(lexer.peek(1), b'k');
        assert_eq!(lexer.peek(2), 0);
        assert!(matches!(lexer.err(), Some(LexerError::Io(_))));

        // Still failed, and the source is not asked again.
        assert_eq!(lexer.peek(5), 0);
        assert_eq!(lexer.reader.reads, 2);
        assert!(matches!(lexer.err(), Some(LexerError::Io(_))));
        assert_eq!(lexer.peek(0), b'o');
    }
}
