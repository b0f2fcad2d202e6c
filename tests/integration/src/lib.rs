//! Integration test utilities for the comet gateway
//!
//! Boots a gateway on ephemeral loopback ports and drives it over raw TCP,
//! WebSocket and the stat endpoint.

pub mod fixtures;
pub mod helpers;

pub use fixtures::*;
pub use helpers::*;
