//! Reply block pool
//!
//! Every reply is built in its own [`BlockBuf`]: dispatch acquires a
//! recycled block on entry and returns it on every exit path, so concurrent
//! calls never share bytes and steady-state dispatch allocates nothing. A
//! single process-wide scratch buffer would corrupt under concurrency.

use crate::wire::BlockBuf;
use std::sync::Mutex;

/// Default number of blocks kept for reuse
pub const DEFAULT_POOL_SIZE: usize = 8;

/// Shared free list of reply blocks
#[derive(Debug)]
pub struct BlockPool {
    free: Mutex<Vec<BlockBuf>>,
    max_pooled: usize,
}

impl BlockPool {
    /// Pool keeping at most `max_pooled` blocks for reuse
    pub fn new(max_pooled: usize) -> Self {
        BlockPool {
            free: Mutex::new(Vec::with_capacity(max_pooled)),
            max_pooled,
        }
    }

    /// Take a block, recycled to empty with the given capacity cap
    ///
    /// Falls back to a fresh allocation when the free list is empty, so
    /// acquisition never blocks on pool exhaustion.
    pub fn acquire(&self, len_alloc: usize) -> BlockBuf {
        let reused = self.free.lock().unwrap().pop();
        match reused {
            Some(mut block) => {
                block.recycle(len_alloc);
                block
            }
            None => BlockBuf::with_limit(len_alloc),
        }
    }

    /// Return a block for reuse
    ///
    /// Blocks beyond `max_pooled` are simply dropped.
    pub fn release(&self, block: BlockBuf) {
        let mut free = self.free.lock().unwrap();
        if free.len() < self.max_pooled {
            free.push(block);
        }
    }

    /// Number of blocks currently waiting for reuse
    pub fn pooled(&self) -> usize {
        self.free.lock().unwrap().len()
    }
}

impl Default for BlockPool {
    fn default() -> Self {
        BlockPool::new(DEFAULT_POOL_SIZE)
    }
}
