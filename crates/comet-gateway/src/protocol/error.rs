//! Protocol error types

use thiserror::Error;
use tokio_tungstenite::tungstenite;

/// Errors raised while reading or writing frames
///
/// Every variant except [`ProtocolError::Json`] on an outbound push is fatal to the connection.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Declared length exceeds the configured cap; the body is never read
    #[error("Frame too large: declared {declared} bytes, max {max}")]
    FrameTooLarge { declared: usize, max: usize },

    /// Short read, truncated header or inconsistent length field
    #[error("Malformed frame: {0}")]
    MalformedFrame(&'static str),

    /// WebSocket frame is not a valid JSON unit
    #[error("Invalid JSON frame: {0}")]
    Json(#[from] serde_json::Error),

    /// Peer closed the connection, or the connection was closed locally
    #[error("Connection closed")]
    Closed,

    /// Any socket I/O failure
    #[error("Socket error: {0}")]
    Socket(#[from] std::io::Error),

    /// WebSocket transport failure
    #[error("WebSocket error: {0}")]
    WebSocket(Box<tungstenite::Error>),
}

impl From<tungstenite::Error> for ProtocolError {
    fn from(err: tungstenite::Error) -> Self {
        match err {
            tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed => {
                Self::Closed
            }
            tungstenite::Error::Io(e) => Self::Socket(e),
            other => Self::WebSocket(Box::new(other)),
        }
    }
}

impl ProtocolError {
    /// Whether this is an orderly close rather than a fault
    #[must_use]
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }
}

/// Protocol result type
pub type ProtocolResult<T> = Result<T, ProtocolError>;
