//! Connection-fatal errors

use super::closer::CloseReason;
use super::ring::RingError;
use crate::auth::AuthError;
use crate::handlers::HandlerError;
use crate::protocol::ProtocolError;
use thiserror::Error;

/// Why a connection ended
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The first frame was not an auth frame
    #[error("Expected auth frame, got op {0}")]
    NotAuth(i16),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Handler(#[from] HandlerError),

    /// The client outran the dispatch loop by more than the pipelining window
    #[error("Pipelining window exhausted: {0}")]
    Ring(#[from] RingError),

    #[error("Handshake timed out")]
    HandshakeTimeout,

    #[error("Heartbeat timed out")]
    HeartbeatTimeout,

    /// The dispatch loop is gone
    #[error("Dispatch loop exited")]
    DispatchClosed,

    #[error("Connection closed: {0}")]
    Closed(CloseReason),
}

impl ConnectionError {
    /// Map an observed close to the error for the current stage
    #[must_use]
    pub fn from_close(reason: CloseReason, established: bool) -> Self {
        match (reason, established) {
            (CloseReason::Expired, false) => Self::HandshakeTimeout,
            (CloseReason::Expired, true) => Self::HeartbeatTimeout,
            (reason, _) => Self::Closed(reason),
        }
    }

    /// Peer hung up, or the server closed the connection on purpose
    #[must_use]
    pub fn is_orderly(&self) -> bool {
        match self {
            Self::Protocol(e) => e.is_closed(),
            Self::Closed(_) | Self::DispatchClosed => true,
            _ => false,
        }
    }

    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::HandshakeTimeout | Self::HeartbeatTimeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expiry_depends_on_stage() {
        assert!(matches!(
            ConnectionError::from_close(CloseReason::Expired, false),
            ConnectionError::HandshakeTimeout
        ));
        assert!(matches!(
            ConnectionError::from_close(CloseReason::Expired, true),
            ConnectionError::HeartbeatTimeout
        ));
        assert!(matches!(
            ConnectionError::from_close(CloseReason::Evicted, true),
            ConnectionError::Closed(CloseReason::Evicted)
        ));
    }

    #[test]
    fn test_classification() {
        assert!(ConnectionError::Protocol(ProtocolError::Closed).is_orderly());
        assert!(!ConnectionError::Ring(RingError::Full).is_orderly());
        assert!(!ConnectionError::Handler(HandlerError::UnknownOperation(9)).is_orderly());
        assert!(ConnectionError::HeartbeatTimeout.is_timeout());
    }

    #[test]
    fn test_messages_read_as_sentences() {
        assert_eq!(
            ConnectionError::Ring(RingError::Full).to_string(),
            "Pipelining window exhausted: Ring buffer full"
        );
        assert_eq!(
            ConnectionError::Protocol(ProtocolError::Closed).to_string(),
            "Connection closed"
        );
        assert_eq!(
            crate::connection::PushError::SessionCacheFull.to_string(),
            "Session signal channel full"
        );
    }
}
