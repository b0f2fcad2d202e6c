//! Process counters reported by the stat endpoint

use serde::Serialize;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::time::Instant;

/// Push counters and task gauges
#[derive(Debug)]
pub struct Stats {
    started_at: Instant,
    started: chrono::DateTime<chrono::Utc>,
    push_succeed: AtomicU64,
    push_failed: AtomicU64,
    read_routines: AtomicI64,
    write_routines: AtomicI64,
}

impl Default for Stats {
    fn default() -> Self {
        Self::new()
    }
}

impl Stats {
    #[must_use]
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            started: chrono::Utc::now(),
            push_succeed: AtomicU64::new(0),
            push_failed: AtomicU64::new(0),
            read_routines: AtomicI64::new(0),
            write_routines: AtomicI64::new(0),
        }
    }

    pub fn push_succeed(&self) {
        self.push_succeed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn push_failed(&self) {
        self.push_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Track a running read loop until the guard drops
    #[must_use]
    pub fn read_routine(&self) -> RoutineGuard<'_> {
        RoutineGuard::enter(&self.read_routines)
    }

    /// Track a running dispatch loop until the guard drops
    #[must_use]
    pub fn write_routine(&self) -> RoutineGuard<'_> {
        RoutineGuard::enter(&self.write_routines)
    }

    #[must_use]
    pub fn message(&self) -> MessageStats {
        MessageStats {
            succeed: self.push_succeed.load(Ordering::Relaxed),
            failed: self.push_failed.load(Ordering::Relaxed),
        }
    }

    #[must_use]
    pub fn routine(&self) -> RoutineStats {
        RoutineStats {
            read: self.read_routines.load(Ordering::Relaxed),
            write: self.write_routines.load(Ordering::Relaxed),
        }
    }

    #[must_use]
    pub fn server(&self) -> ServerStats {
        ServerStats {
            started: self.started.to_rfc3339(),
            uptime_secs: self.started_at.elapsed().as_secs(),
            pid: std::process::id(),
            version: env!("CARGO_PKG_VERSION"),
        }
    }
}

/// Decrements its gauge on drop
#[derive(Debug)]
pub struct RoutineGuard<'a> {
    gauge: &'a AtomicI64,
}

impl<'a> RoutineGuard<'a> {
    fn enter(gauge: &'a AtomicI64) -> Self {
        gauge.fetch_add(1, Ordering::Relaxed);
        Self { gauge }
    }
}

impl Drop for RoutineGuard<'_> {
    fn drop(&mut self) {
        self.gauge.fetch_sub(1, Ordering::Relaxed);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MessageStats {
    pub succeed: u64,
    pub failed: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RoutineStats {
    pub read: i64,
    pub write: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ServerStats {
    pub started: String,
    pub uptime_secs: u64,
    pub pid: u32,
    pub version: &'static str,
}
