//! Timer entry owned by one connection

use super::{TimerHandle, TimerWheel};
use std::sync::Arc;
use std::time::Duration;

/// An armed entry that is cancelled when dropped
#[derive(Debug)]
pub struct TimerGuard {
    wheel: Arc<TimerWheel>,
    handle: TimerHandle,
}

impl TimerGuard {
    pub fn arm<F>(wheel: Arc<TimerWheel>, delay: Duration, callback: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        let handle = wheel.add(delay, callback);
        Self { wheel, handle }
    }

    /// Move the deadline to `now + delay`; false once the entry has fired
    pub fn reschedule(&self, delay: Duration) -> bool {
        self.wheel.reschedule(self.handle, delay)
    }

    pub fn set_key(&self, key: u64) -> bool {
        self.wheel.set_key(self.handle, key)
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.wheel.is_pending(self.handle)
    }

    #[must_use]
    pub fn remaining(&self) -> Option<Duration> {
        self.wheel.remaining(self.handle)
    }
}

impl Drop for TimerGuard {
    fn drop(&mut self) {
        self.wheel.cancel(self.handle);
    }
}
