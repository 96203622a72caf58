//! lexbuf
//!
//! Streaming byte buffer for hand-written tokenizers.
//!
//! `lexbuf` lets a lexer peek arbitrarily far ahead into a byte stream, mark
//! the bytes of the token being scanned, shift that selection out, and hand
//! memory back once shifted tokens are no longer needed. It is designed as a
//! small substrate for:
//!
//! - programming language lexers
//! - markup and data format tokenizers
//! - protocol scanners reading from sockets or files
//!
//! The crate intentionally:
//! - does NOT classify tokens or know any grammar
//! - does NOT manage concurrency
//! - does NOT validate UTF-8
//!
//! It only does one thing: **Read bytes → peek, move, shift**
//!
//! # Streaming
//!
//! ```
//! use lexbuf::Lexer;
//!
//! let mut lexer = Lexer::from_reader(&b"let answer = 42;"[..]);
//! let mut words = Vec::new();
//!
//! loop {
//!     let c = lexer.peek(0);
//!     if c == 0 {
//!         break;
//!     }
//!     if c.is_ascii_alphanumeric() {
//!         while lexer.peek(0).is_ascii_alphanumeric() {
//!             lexer.move_by(1);
//!         }
//!         let len = lexer.pos();
//!         words.push(lexer.shift_bytes());
//!         lexer.free(len);
//!     } else {
//!         lexer.move_by(1);
//!         lexer.skip();
//!         lexer.free(1);
//!     }
//! }
//!
//! assert_eq!(words, ["let", "answer", "42"]);
//! ```
//!
//! # In memory
//!
//! ```
//! use lexbuf::Lexer;
//!
//! let input = b"Lorem ipsum";
//! let mut lexer = Lexer::from_bytes(input);
//! lexer.move_to(5);
//! let lorem: &[u8] = lexer.shift_stable().unwrap();
//!
//! // Peeking never relocates an in-memory lexer.
//! lexer.peek(100);
//! assert_eq!(lorem, b"Lorem");
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
mod lexer;
mod rune;
mod token;

mod buffer; // internal block pool

//
// Public surface (intentionally tiny)
//

pub use config::{DEFAULT_BUFFER_SIZE, LexerConfig};
pub use error::LexerError;
pub use lexer::Lexer;
pub use rune::utf8_len;
pub use token::Token;
