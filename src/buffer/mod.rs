//! Internal buffer management for the streaming lexer.
//!
//! This module provides the block pool that lets retired backing buffers be
//! recycled once every shifted byte in them has been freed. It is an
//! implementation detail and not part of the public API.

mod pool;

pub(crate) use pool::BufferPool;
