//! Per-connection pipelining ring
//!
//! Fixed-capacity single-producer/single-consumer buffer of protocol units.
//! The read loop owns the [`RingProducer`], the dispatch loop owns the
//! [`RingConsumer`]. Each index is advanced only by its owner and published
//! with release ordering; the opposite side reads it with acquire ordering.
//!
//! Slot contents are exchanged by swapping with a caller-owned scratch unit, so
//! body buffers are recycled and no lock is held across an await point.

use crate::protocol::Proto;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Ring errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RingError {
    /// The producer would overwrite a slot the consumer has not released
    #[error("Ring buffer full")]
    Full,

    /// Nothing committed since the last read
    #[error("Ring buffer empty")]
    Empty,
}

#[derive(Debug)]
struct Inner {
    // Uncontended by construction; the mutex only makes slot access safe code.
    slots: Box<[Mutex<Proto>]>,
    /// Total slots committed by the producer
    write: AtomicUsize,
    /// Total slots released by the consumer
    read: AtomicUsize,
}

impl Inner {
    fn capacity(&self) -> usize {
        self.slots.len()
    }

    fn slot(&self, counter: usize) -> &Mutex<Proto> {
        &self.slots[counter % self.slots.len()]
    }
}

/// Create a ring with `capacity` slots (at least one)
#[must_use]
pub fn ring(capacity: usize) -> (RingProducer, RingConsumer) {
    let slots = (0..capacity.max(1)).map(|_| Mutex::new(Proto::default())).collect();
    let inner = Arc::new(Inner {
        slots,
        write: AtomicUsize::new(0),
        read: AtomicUsize::new(0),
    });
    (
        RingProducer {
            inner: Arc::clone(&inner),
        },
        RingConsumer { inner },
    )
}

/// Write half, owned by the read loop
#[derive(Debug)]
pub struct RingProducer {
    inner: Arc<Inner>,
}

impl RingProducer {
    /// Reserve the next slot to parse a request into
    pub fn reserve_write(&mut self) -> Result<WriteSlot<'_>, RingError> {
        let write = self.inner.write.load(Ordering::Relaxed);
        let read = self.inner.read.load(Ordering::Acquire);
        if write.wrapping_sub(read) >= self.inner.capacity() {
            return Err(RingError::Full);
        }
        Ok(WriteSlot {
            inner: &self.inner,
            counter: write,
        })
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.inner.capacity()
    }

    /// Number of committed, unreleased slots
    #[must_use]
    pub fn len(&self) -> usize {
        occupied(&self.inner)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Read half, owned by the dispatch loop
#[derive(Debug)]
pub struct RingConsumer {
    inner: Arc<Inner>,
}

impl RingConsumer {
    /// Reserve the oldest committed slot; never blocks
    pub fn reserve_read(&mut self) -> Result<ReadSlot<'_>, RingError> {
        let read = self.inner.read.load(Ordering::Relaxed);
        let write = self.inner.write.load(Ordering::Acquire);
        if read == write {
            return Err(RingError::Empty);
        }
        Ok(ReadSlot {
            inner: &self.inner,
            counter: read,
        })
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.inner.capacity()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        occupied(&self.inner)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn occupied(inner: &Inner) -> usize {
    let write = inner.write.load(Ordering::Acquire);
    let read = inner.read.load(Ordering::Acquire);
    write.wrapping_sub(read)
}

/// A reserved, not yet visible producer slot
///
/// Dropping it without [`WriteSlot::commit`] leaves the ring unchanged.
#[derive(Debug)]
pub struct WriteSlot<'a> {
    inner: &'a Inner,
    counter: usize,
}

impl WriteSlot<'_> {
    /// Exchange the slot's unit with `proto`
    pub fn swap(&mut self, proto: &mut Proto) {
        std::mem::swap(&mut *self.inner.slot(self.counter).lock(), proto);
    }

    /// Publish the slot to the consumer
    pub fn commit(self) {
        self.inner
            .write
            .store(self.counter.wrapping_add(1), Ordering::Release);
    }
}

/// A reserved consumer slot
///
/// The slot stays owned by the consumer until [`ReadSlot::commit`].
#[derive(Debug)]
pub struct ReadSlot<'a> {
    inner: &'a Inner,
    counter: usize,
}

impl ReadSlot<'_> {
    /// Exchange the slot's unit with `proto`
    pub fn swap(&mut self, proto: &mut Proto) {
        std::mem::swap(&mut *self.inner.slot(self.counter).lock(), proto);
    }

    /// Release the slot for reuse by the producer
    pub fn commit(self) {
        self.inner
            .read
            .store(self.counter.wrapping_add(1), Ordering::Release);
    }
}
