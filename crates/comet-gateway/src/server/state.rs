//! Server context
//!
//! Everything a connection needs, constructed once and shared by the accept
//! loops, the connections and the stat endpoint.

use crate::auth::Authorizer;
use crate::handlers::HandlerTable;
use crate::round::{Round, RoundOptions};
use crate::stats::Stats;
use crate::zone::Zones;
use comet_common::AppConfig;
use std::sync::Arc;
use std::time::Duration;

/// Per-connection settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerOptions {
    pub handshake_timeout: Duration,
    /// Ring capacity
    pub cli_proto: usize,
    /// Outbound signal channel capacity
    pub svr_proto: usize,
    pub max_body_size: usize,
    /// Request path accepted for WebSocket upgrades
    pub ws_path: String,
}

impl From<&AppConfig> for ServerOptions {
    fn from(config: &AppConfig) -> Self {
        Self {
            handshake_timeout: config.proto.handshake_timeout(),
            cli_proto: config.proto.cli_proto.max(1),
            svr_proto: config.proto.svr_proto.max(1),
            max_body_size: config.proto.max_body_size,
            ws_path: config.websocket.path.clone(),
        }
    }
}

/// Gateway context
pub struct Server {
    options: ServerOptions,
    round: Round,
    zones: Zones,
    handlers: HandlerTable,
    authorizer: Arc<dyn Authorizer>,
    stats: Arc<Stats>,
}

impl Server {
    /// Build the context with the default handler table
    ///
    /// Creates the timer wheels, so it must run inside a Tokio runtime.
    pub fn new(config: &AppConfig, authorizer: Arc<dyn Authorizer>) -> Self {
        let stats = Arc::new(Stats::new());
        Self {
            options: ServerOptions::from(config),
            round: Round::new(RoundOptions::from(config)),
            zones: Zones::new(config.zone.zone_num, config.zone.cache_size, Arc::clone(&stats)),
            handlers: HandlerTable::default(),
            authorizer,
            stats,
        }
    }

    /// Replace the operation handler table
    pub fn with_handlers(mut self, handlers: HandlerTable) -> Self {
        self.handlers = handlers;
        self
    }

    pub fn options(&self) -> &ServerOptions {
        &self.options
    }

    pub fn round(&self) -> &Round {
        &self.round
    }

    pub fn zones(&self) -> &Zones {
        &self.zones
    }

    pub fn handlers(&self) -> &HandlerTable {
        &self.handlers
    }

    pub fn authorizer(&self) -> &dyn Authorizer {
        self.authorizer.as_ref()
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("options", &self.options)
            .field("zones", &self.zones.len())
            .field("handlers", &self.handlers)
            .finish_non_exhaustive()
    }
}
