//! Connection close signal
//!
//! Stands in for closing the socket: the timer wheel, the zone and either
//! connection loop can close it, and every pending `closed()` wakes up. The
//! first reason recorded wins.

use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;

/// Why a connection was closed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// A handshake or heartbeat deadline passed
    Expired,
    /// Another connection registered the same routing id
    Evicted,
    /// Process shutdown
    Shutdown,
    /// One of the connection's own loops ended
    Local,
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            Self::Expired => "deadline expired",
            Self::Evicted => "evicted by a newer connection",
            Self::Shutdown => "server shutdown",
            Self::Local => "closed locally",
        };
        f.write_str(reason)
    }
}

/// Shared, idempotent close handle
#[derive(Debug, Clone)]
pub struct Closer {
    tx: Arc<watch::Sender<Option<CloseReason>>>,
}

impl Default for Closer {
    fn default() -> Self {
        Self::new()
    }
}

impl Closer {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    /// Close with `reason`; returns false if already closed
    pub fn close(&self, reason: CloseReason) -> bool {
        self.tx.send_if_modified(|current| {
            if current.is_some() {
                return false;
            }
            *current = Some(reason);
            true
        })
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.tx.borrow().is_some()
    }

    #[must_use]
    pub fn reason(&self) -> Option<CloseReason> {
        *self.tx.borrow()
    }

    /// Wait until the connection is closed
    pub async fn closed(&self) -> CloseReason {
        let mut rx = self.tx.subscribe();
        // The sender lives in `self`, so the channel cannot close under us.
        let reason = rx.wait_for(Option::is_some).await.map(|reason| *reason);
        reason.ok().flatten().unwrap_or(CloseReason::Local)
    }
}
