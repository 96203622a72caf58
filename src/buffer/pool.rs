//! Block pool backing a streaming lexer.
//!
//! When the window relocates, the old backing buffer still holds bytes that
//! were shifted out as tokens but not yet freed by the caller. Those buffers
//! are parked in an arena of blocks and linked oldest-to-newest. `free` walks
//! that chain from the tail; a block whose bytes are all freed goes inactive
//! and its storage is handed out again by a later `swap`.

use tracing::{debug, trace};

/// One allocation unit of the pool.
#[derive(Debug, Default)]
struct Block {
    data: Vec<u8>,
    /// Index of the next (newer) block in the chain.
    next: Option<usize>,
    /// Still holds bytes that may be referenced.
    active: bool,
}

/// Arena of retired backing buffers.
#[derive(Debug, Default)]
pub(crate) struct BufferPool {
    blocks: Vec<Block>,
    /// Most recently parked block.
    head: Option<usize>,
    /// Oldest block with unfreed bytes.
    tail: Option<usize>,
    /// Bytes freed within the tail block.
    offset: usize,
    allocations: usize,
}

impl BufferPool {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Exchanges the live backing for one with capacity for at least `size`
    /// bytes.
    ///
    /// `old[..retain]` are shifted bytes, of which the first `freed` were
    /// already freed by the caller; `old[retain..]` is the unfinished token
    /// and is carried to the front of the returned buffer. The retained
    /// prefix stays behind in the pool until [`BufferPool::free`] drains it.
    pub(crate) fn swap(&mut self, mut old: Vec<u8>, retain: usize, freed: usize, size: usize) -> Vec<u8> {
        debug_assert!(freed <= retain && retain <= old.len());
        debug_assert!(freed == 0 || self.tail.is_none(), "live bytes freed before the chain drained");
        let outstanding = retain - freed;

        // Nothing in the old buffer can be revisited: slide the token down in place.
        if outstanding == 0 && size <= old.capacity() {
            old.drain(..retain);
            return old;
        }

        let slot = self.find_reusable(size);
        let mut new = match slot {
            Some(index) => {
                let mut data = std::mem::take(&mut self.blocks[index].data);
                data.clear();
                trace!(index, capacity = data.capacity(), "reusing pooled block");
                data
            }
            None => {
                self.allocations += 1;
                debug!(size, blocks = self.blocks.len(), "allocating backing buffer");
                Vec::with_capacity(size)
            }
        };
        new.extend_from_slice(&old[retain..]);
        old.truncate(retain);

        let block = Block {
            data: old,
            next: None,
            active: outstanding > 0,
        };
        let index = match slot {
            Some(index) => {
                self.blocks[index] = block;
                index
            }
            None => {
                self.blocks.push(block);
                self.blocks.len() - 1
            }
        };

        if outstanding > 0 {
            if let Some(head) = self.head {
                self.blocks[head].next = Some(index);
            }
            self.head = Some(index);
            if self.tail.is_none() {
                self.tail = Some(index);
                self.offset = freed;
            }
        }

        new
    }

    /// Frees `n` bytes, oldest first. Returns the part of `n` that ran past
    /// the end of the chain and therefore applies to the live backing.
    pub(crate) fn free(&mut self, mut n: usize) -> usize {
        while let Some(tail) = self.tail {
            let block = &mut self.blocks[tail];
            let left = block.data.len() - self.offset;
            if n < left {
                self.offset += n;
                return 0;
            }

            n -= left;
            self.offset = 0;
            block.active = false;
            self.tail = block.next.take();
            trace!(index = tail, len = block.data.len(), "block drained");
        }
        self.head = None;
        n
    }

    /// Bytes parked in the chain that have not been freed yet.
    pub(crate) fn outstanding(&self) -> usize {
        let mut total = 0;
        let mut cursor = self.tail;
        while let Some(index) = cursor {
            total += self.blocks[index].data.len();
            cursor = self.blocks[index].next;
        }
        total - self.offset.min(total)
    }

    /// True when no block holds unfreed bytes.
    pub(crate) fn is_drained(&self) -> bool {
        self.tail.is_none()
    }

    /// Number of backing buffers this pool has allocated.
    pub(crate) fn allocations(&self) -> usize {
        self.allocations
    }

    fn find_reusable(&self, size: usize) -> Option<usize> {
        self.blocks
            .iter()
            .position(|block| !block.active && block.data.capacity() >= size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backing(bytes: &[u8], capacity: usize) -> Vec<u8> {
        let mut data = Vec::with_capacity(capacity);
        data.extend_from_slice(bytes);
        data
    }

    #[test]
    fn test_swap_carries_unfinished_token() {
        let mut pool = BufferPool::new();
        let new = pool.swap(backing(b"abcdef", 8), 4, 0, 16);

        assert_eq!(new, b"ef");
        assert!(new.capacity() >= 16);
        assert_eq!(pool.outstanding(), 4);
        assert_eq!(pool.allocations(), 1);
    }

    #[test]
    fn test_swap_in_place_when_everything_freed() {
        let mut pool = BufferPool::new();
        let old = backing(b"abcdef", 8);
        let ptr = old.as_ptr();

        let new = pool.swap(old, 4, 4, 8);

        assert_eq!(new, b"ef");
        assert_eq!(new.as_ptr(), ptr);
        assert_eq!(pool.allocations(), 0);
        assert!(pool.is_drained());
    }

    #[test]
    fn test_free_drains_blocks_in_order() {
        let mut pool = BufferPool::new();
        let live = pool.swap(backing(b"abcd", 4), 3, 0, 8);
        let _live = pool.swap(backing(&live, 8), live.len(), 0, 16);
        assert_eq!(pool.outstanding(), 4);

        assert_eq!(pool.free(2), 0);
        assert_eq!(pool.outstanding(), 2);
        assert!(!pool.is_drained());

        // One byte left in the first block, one in the second, two spill over.
        assert_eq!(pool.free(4), 2);
        assert!(pool.is_drained());
        assert_eq!(pool.outstanding(), 0);
    }

    #[test]
    fn test_drained_block_is_reused() {
        let mut pool = BufferPool::new();
        let _ = pool.swap(backing(b"abcd", 32), 4, 0, 64);
        assert_eq!(pool.allocations(), 1);

        assert_eq!(pool.free(4), 0);
        assert!(pool.is_drained());

        // The drained 32-byte block satisfies an equal-sized request.
        let live = pool.swap(backing(b"xy", 16), 1, 0, 32);
        assert_eq!(live, b"y");
        assert!(live.capacity() >= 32);
        assert_eq!(pool.allocations(), 1);
        assert_eq!(pool.outstanding(), 1);
    }

    #[test]
    fn test_partially_freed_old_buffer_keeps_offset() {
        let mut pool = BufferPool::new();
        let _ = pool.swap(backing(b"abcdef", 6), 4, 1, 12);

        assert_eq!(pool.outstanding(), 3);
        assert_eq!(pool.free(3), 0);
        assert!(pool.is_drained());
    }
}
