//! Windowed lexer buffer.
//!
//! - [`Lexer`] - Peek/move/shift/free engine over a reader or a byte slice

mod engine;

pub use engine::Lexer;
