//! Buffer Pool
//!
//! Recycles buffer allocations between operations.

use std::sync::OnceLock;

use bytes::BytesMut;
use crossbeam::queue::ArrayQueue;

use super::BufferStream;

/// Number of idle buffers the global pool keeps
const GLOBAL_POOL_SLOTS: usize = 64;

/// Initial capacity of a freshly allocated pooled buffer
const DEFAULT_BUFFER_CAPACITY: usize = 4 * 1024;

/// Buffers that grew past this are dropped instead of pooled
const MAX_RETAINED_CAPACITY: usize = 1024 * 1024;

/// Lock-free pool of reusable buffers
///
/// ## Concurrency:
/// - Backed by a bounded `ArrayQueue`; acquire/release never block
/// - When the pool is empty a new buffer is allocated; when full the
///   released buffer is simply dropped
pub struct BufferPool {
    idle: ArrayQueue<BytesMut>,
    buffer_capacity: usize,
}

impl BufferPool {
    /// Create a pool keeping at most `slots` idle buffers
    pub fn new(slots: usize, buffer_capacity: usize) -> Self {
        Self {
            idle: ArrayQueue::new(slots.max(1)),
            buffer_capacity,
        }
    }

    /// The process-wide pool used by `BufferStream::pooled`
    pub fn global() -> &'static BufferPool {
        static POOL: OnceLock<BufferPool> = OnceLock::new();
        POOL.get_or_init(|| BufferPool::new(GLOBAL_POOL_SLOTS, DEFAULT_BUFFER_CAPACITY))
    }

    /// Take a cleared buffer from the pool (or allocate one)
    pub fn acquire(&'static self) -> BufferStream {
        let buf = self
            .idle
            .pop()
            .unwrap_or_else(|| BytesMut::with_capacity(self.buffer_capacity));
        BufferStream::from_parts(buf, self)
    }

    /// Hand a buffer back to the pool
    pub fn release(&self, mut buf: BytesMut) {
        if buf.capacity() == 0 || buf.capacity() > MAX_RETAINED_CAPACITY {
            return;
        }
        buf.clear();
        // A full pool just drops the buffer
        let _ = self.idle.push(buf);
    }

    /// Number of idle buffers currently held
    pub fn idle_count(&self) -> usize {
        self.idle.len()
    }
}
