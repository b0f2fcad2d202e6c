//! Registered connection state

use super::closer::{CloseReason, Closer};
use crate::protocol::Proto;
use crate::zone::RoutingId;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Messages consumed by the dispatch loop
#[derive(Debug)]
pub enum Signal {
    /// Server-initiated unit, written as is
    Push(Proto),
    /// The ring has new responses to flush
    Ready,
    /// The connection is closing; stop after this
    Finish,
}

/// Why a push was not queued
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PushError {
    /// The outbound channel is full; the unit is dropped
    #[error("Session signal channel full")]
    SessionCacheFull,

    /// The dispatch loop already exited
    #[error("Session closed")]
    Closed,
}

/// An established connection as seen by the registry
#[derive(Debug)]
pub struct Session {
    id: RoutingId,
    signal: mpsc::Sender<Signal>,
    closer: Closer,
}

impl Session {
    #[must_use]
    pub fn new(id: RoutingId, signal: mpsc::Sender<Signal>, closer: Closer) -> Arc<Self> {
        Arc::new(Self {
            id,
            signal,
            closer,
        })
    }

    #[must_use]
    pub fn id(&self) -> RoutingId {
        self.id
    }

    /// Queue a server push without waiting
    pub fn push(&self, proto: Proto) -> Result<(), PushError> {
        self.signal
            .try_send(Signal::Push(proto))
            .map_err(|e| match e {
                mpsc::error::TrySendError::Full(_) => PushError::SessionCacheFull,
                mpsc::error::TrySendError::Closed(_) => PushError::Closed,
            })
    }

    /// Queue a control signal, waiting for room
    pub(crate) async fn signal(&self, signal: Signal) -> Result<(), PushError> {
        self.signal
            .send(signal)
            .await
            .map_err(|_| PushError::Closed)
    }

    /// Close the connection; both loops observe it and tear down
    pub fn close(&self, reason: CloseReason) -> bool {
        self.closer.close(reason)
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closer.is_closed()
    }
}
