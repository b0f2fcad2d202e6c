//! Demonstration authorizer

use super::{AuthError, Authorizer, Grant};
use crate::protocol::AuthPayload;
use crate::zone::RoutingId;
use async_trait::async_trait;
use comet_common::AppConfig;
use std::time::Duration;

/// Accepts any non-empty code and derives the routing id from the uid
#[derive(Debug, Clone)]
pub struct StaticAuthorizer {
    node: u8,
    zone_num: usize,
    heartbeat: Duration,
}

impl StaticAuthorizer {
    #[must_use]
    pub fn new(node: u8, zone_num: usize, heartbeat: Duration) -> Self {
        Self {
            node,
            zone_num: zone_num.clamp(1, usize::from(u8::MAX) + 1),
            heartbeat,
        }
    }

    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.node.id, config.zone.zone_num, config.proto.heartbeat())
    }
}

#[async_trait]
impl Authorizer for StaticAuthorizer {
    async fn authorize(&self, credentials: &AuthPayload) -> Result<Grant, AuthError> {
        if credentials.code.is_empty() {
            return Err(AuthError::Rejected(format!(
                "empty code for uid {}",
                credentials.uid
            )));
        }

        let zone = (credentials.uid as usize % self.zone_num) as u8;
        let routing_id = RoutingId::new(self.node, zone, u64::from(credentials.uid));
        Ok(Grant {
            routing_id,
            zone,
            heartbeat: self.heartbeat,
        })
    }
}
