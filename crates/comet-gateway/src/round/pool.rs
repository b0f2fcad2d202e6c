//! Bounded byte buffer pool
//!
//! Buffers are handed out for the lifetime of one connection and returned on drop.

use parking_lot::Mutex;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

/// A free-list of pre-allocated byte buffers
#[derive(Debug)]
pub struct BufferPool {
    free: Mutex<Vec<Vec<u8>>>,
    /// Free-list bound; buffers returned beyond it are dropped
    num: usize,
    /// Capacity of each buffer
    size: usize,
}

impl BufferPool {
    /// Create a pool holding `num` buffers of `size` bytes
    #[must_use]
    pub fn new(num: usize, size: usize) -> Arc<Self> {
        let free = (0..num).map(|_| Vec::with_capacity(size)).collect();
        Arc::new(Self {
            free: Mutex::new(free),
            num,
            size,
        })
    }

    /// Take a buffer, allocating a fresh one when the free-list is empty
    ///
    /// The buffer is empty with at least [`BufferPool::buffer_size`] capacity.
    pub fn acquire(self: &Arc<Self>) -> PooledBuffer {
        let buf = self
            .free
            .lock()
            .pop()
            .unwrap_or_else(|| Vec::with_capacity(self.size));
        PooledBuffer {
            buf,
            pool: Arc::clone(self),
        }
    }

    fn release(&self, mut buf: Vec<u8>) {
        buf.clear();
        if buf.capacity() > self.size {
            buf.shrink_to(self.size);
        }
        let mut free = self.free.lock();
        if free.len() < self.num {
            free.push(buf);
        }
    }

    /// Buffers currently on the free-list
    pub fn available(&self) -> usize {
        self.free.lock().len()
    }

    /// Capacity of each buffer
    pub fn buffer_size(&self) -> usize {
        self.size
    }
}

/// A buffer on loan from a [`BufferPool`]
#[derive(Debug)]
pub struct PooledBuffer {
    buf: Vec<u8>,
    pool: Arc<BufferPool>,
}

impl Deref for PooledBuffer {
    type Target = Vec<u8>;

    fn deref(&self) -> &Self::Target {
        &self.buf
    }
}

impl DerefMut for PooledBuffer {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.buf
    }
}

impl Drop for PooledBuffer {
    fn drop(&mut self) {
        self.pool.release(std::mem::take(&mut self.buf));
    }
}
