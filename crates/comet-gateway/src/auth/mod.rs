//! Handshake authorization
//!
//! The gateway only owns the handshake slot; deciding who may connect is
//! delegated to an [`Authorizer`].

mod static_auth;

pub use static_auth::StaticAuthorizer;

use crate::protocol::AuthPayload;
use crate::zone::RoutingId;
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// What a successful handshake grants
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Grant {
    pub routing_id: RoutingId,
    /// Shard the session is stored in; must match the id's zone bits
    pub zone: u8,
    pub heartbeat: Duration,
}

/// Authorization errors; all close the connection before registration
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Authorization rejected: {0}")]
    Rejected(String),

    #[error("Invalid credentials: {0}")]
    InvalidCredentials(#[from] serde_json::Error),

    #[error("Zone {zone} does not match routing id {id}")]
    ZoneMismatch { id: RoutingId, zone: u8 },
}

/// Credential check consulted on every handshake
#[async_trait]
pub trait Authorizer: Send + Sync {
    async fn authorize(&self, credentials: &AuthPayload) -> Result<Grant, AuthError>;
}
