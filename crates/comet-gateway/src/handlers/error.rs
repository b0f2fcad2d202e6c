//! Handler error types

use thiserror::Error;

/// Errors returned by operation handlers; all are fatal to the connection
#[derive(Debug, Error)]
pub enum HandlerError {
    /// Op code outside the table or with no handler registered
    #[error("Unknown operation: {0}")]
    UnknownOperation(i16),

    /// Body does not match the operation's payload
    #[error("Invalid payload: {0}")]
    InvalidPayload(#[from] serde_json::Error),
}

/// Handler result type
pub type HandlerResult<T> = Result<T, HandlerError>;
