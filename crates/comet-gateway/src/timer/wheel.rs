//! Heap-based expiry scheduler
//!
//! One binary min-heap per wheel, ordered by absolute expiry, guarded by a
//! single mutex. A background task sleeps until the root expires, then fires
//! every due callback with the lock released.
//!
//! Entries live in an arena and are addressed by [`TimerHandle`]s carrying a
//! generation, so a handle that outlived its entry can never touch the slot's
//! next occupant.

use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Callback run once when an entry expires
pub type TimerCallback = Box<dyn FnOnce() + Send + 'static>;

/// Stable reference to a timer entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle {
    slot: u32,
    generation: u32,
}

struct Entry {
    generation: u32,
    allocated: bool,
    /// Opaque owner key, the routing id once the handshake completes
    key: u64,
    expire: Instant,
    callback: Option<TimerCallback>,
    /// Position in the heap, `None` when not scheduled
    heap_index: Option<usize>,
}

impl Entry {
    fn vacant(now: Instant) -> Self {
        Self {
            generation: 0,
            allocated: false,
            key: 0,
            expire: now,
            callback: None,
            heap_index: None,
        }
    }
}

#[derive(Default)]
struct Heap {
    entries: Vec<Entry>,
    free: Vec<u32>,
    /// Slots ordered as a binary min-heap on `expire`
    heap: Vec<u32>,
}

impl Heap {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            free: Vec::with_capacity(capacity),
            heap: Vec::with_capacity(capacity),
        }
    }

    fn alloc(&mut self) -> u32 {
        if let Some(slot) = self.free.pop() {
            return slot;
        }
        let slot = u32::try_from(self.entries.len()).unwrap_or(u32::MAX);
        self.entries.push(Entry::vacant(Instant::now()));
        slot
    }

    fn release(&mut self, slot: u32) {
        let entry = &mut self.entries[slot as usize];
        entry.generation = entry.generation.wrapping_add(1);
        entry.allocated = false;
        entry.callback = None;
        entry.key = 0;
        self.free.push(slot);
    }

    /// Resolve a handle to its slot if it still refers to a live entry
    fn resolve(&self, handle: TimerHandle) -> Option<usize> {
        let slot = handle.slot as usize;
        let entry = self.entries.get(slot)?;
        (entry.allocated && entry.generation == handle.generation).then_some(slot)
    }

    /// Insert a slot into the heap; returns true when it became the root
    fn push(&mut self, slot: u32) -> bool {
        let index = self.heap.len();
        self.heap.push(slot);
        self.entries[slot as usize].heap_index = Some(index);
        self.up(index);
        self.entries[slot as usize].heap_index == Some(0)
    }

    /// Remove a slot from the heap; a slot not in the heap is left alone
    fn remove(&mut self, slot: usize) {
        let Some(index) = self.entries[slot].heap_index else {
            return;
        };
        let last = self.heap.len() - 1;
        if index != last {
            self.swap(index, last);
        }
        self.heap.pop();
        self.entries[slot].heap_index = None;
        if index != last {
            self.down(index);
            self.up(index);
        }
    }

    fn less(&self, i: usize, j: usize) -> bool {
        self.entries[self.heap[i] as usize].expire < self.entries[self.heap[j] as usize].expire
    }

    fn swap(&mut self, i: usize, j: usize) {
        self.heap.swap(i, j);
        self.entries[self.heap[i] as usize].heap_index = Some(i);
        self.entries[self.heap[j] as usize].heap_index = Some(j);
    }

    fn up(&mut self, mut j: usize) {
        while j > 0 {
            let parent = (j - 1) / 2;
            if !self.less(j, parent) {
                break;
            }
            self.swap(parent, j);
            j = parent;
        }
    }

    fn down(&mut self, mut i: usize) {
        let n = self.heap.len();
        loop {
            let left = 2 * i + 1;
            if left >= n {
                break;
            }
            let mut child = left;
            let right = left + 1;
            if right < n && self.less(right, left) {
                child = right;
            }
            if !self.less(child, i) {
                break;
            }
            self.swap(i, child);
            i = child;
        }
    }
}

struct Shared {
    heap: Mutex<Heap>,
    wake: Notify,
}

impl Shared {
    /// Fire every due entry; returns the next expiry, if any
    fn expire(&self) -> Option<Instant> {
        loop {
            let mut heap = self.heap.lock();
            let root = *heap.heap.first()? as usize;
            let expire = heap.entries[root].expire;
            if expire > Instant::now() {
                return Some(expire);
            }

            // The owner still holds the handle and releases the slot via `cancel`.
            heap.remove(root);
            let key = heap.entries[root].key;
            let callback = heap.entries[root].callback.take();
            drop(heap);

            tracing::debug!(key, "timer expired");
            if let Some(callback) = callback {
                callback();
            }
        }
    }

    async fn run(self: Arc<Self>) {
        loop {
            match self.expire() {
                Some(at) => {
                    tokio::select! {
                        () = tokio::time::sleep_until(at) => {}
                        () = self.wake.notified() => {}
                    }
                }
                None => self.wake.notified().await,
            }
        }
    }
}

/// A timer wheel instance with its own background task
///
/// Must be created inside a Tokio runtime. Dropping the wheel stops the task;
/// pending callbacks are discarded.
pub struct TimerWheel {
    shared: Arc<Shared>,
    task: JoinHandle<()>,
}

impl TimerWheel {
    /// Create a wheel with room for `capacity` entries before growing
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let shared = Arc::new(Shared {
            heap: Mutex::new(Heap::with_capacity(capacity)),
            wake: Notify::new(),
        });
        let task = tokio::spawn(Arc::clone(&shared).run());
        Self { shared, task }
    }

    /// Schedule `callback` to run after `delay`
    pub fn add<F>(&self, delay: Duration, callback: F) -> TimerHandle
    where
        F: FnOnce() + Send + 'static,
    {
        let mut heap = self.shared.heap.lock();
        let slot = heap.alloc();
        let entry = &mut heap.entries[slot as usize];
        entry.allocated = true;
        entry.expire = Instant::now() + delay;
        entry.callback = Some(Box::new(callback));
        let handle = TimerHandle {
            slot,
            generation: entry.generation,
        };

        if heap.push(slot) {
            self.shared.wake.notify_one();
        }
        handle
    }

    /// Remove an entry and recycle its slot
    ///
    /// Safe on entries that already fired; returns false for stale handles.
    pub fn cancel(&self, handle: TimerHandle) -> bool {
        let mut heap = self.shared.heap.lock();
        let Some(slot) = heap.resolve(handle) else {
            return false;
        };
        heap.remove(slot);
        heap.release(handle.slot);
        true
    }

    /// Push an entry's expiry to `now + delay` under one lock acquisition
    ///
    /// No-op (returns false) when the entry already fired or the handle is stale.
    pub fn reschedule(&self, handle: TimerHandle, delay: Duration) -> bool {
        let mut heap = self.shared.heap.lock();
        let Some(slot) = heap.resolve(handle) else {
            return false;
        };
        if heap.entries[slot].heap_index.is_none() {
            return false;
        }
        heap.remove(slot);
        heap.entries[slot].expire = Instant::now() + delay;
        if heap.push(handle.slot) {
            self.shared.wake.notify_one();
        }
        true
    }

    /// Attach the owner key to an entry
    pub fn set_key(&self, handle: TimerHandle, key: u64) -> bool {
        let mut heap = self.shared.heap.lock();
        match heap.resolve(handle) {
            Some(slot) => {
                heap.entries[slot].key = key;
                true
            }
            None => false,
        }
    }

    /// Whether the entry is still waiting to fire
    pub fn is_pending(&self, handle: TimerHandle) -> bool {
        let heap = self.shared.heap.lock();
        heap.resolve(handle)
            .is_some_and(|slot| heap.entries[slot].heap_index.is_some())
    }

    /// Time left before the entry fires
    pub fn remaining(&self, handle: TimerHandle) -> Option<Duration> {
        let heap = self.shared.heap.lock();
        let slot = heap.resolve(handle)?;
        let entry = &heap.entries[slot];
        entry
            .heap_index
            .map(|_| entry.expire.saturating_duration_since(Instant::now()))
    }

    /// Number of scheduled entries
    pub fn len(&self) -> usize {
        self.shared.heap.lock().heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Drop for TimerWheel {
    fn drop(&mut self) {
        self.task.abort();
    }
}

impl fmt::Debug for TimerWheel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerWheel")
            .field("scheduled", &self.len())
            .finish_non_exhaustive()
    }
}
