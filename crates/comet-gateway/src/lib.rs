//! # comet-gateway
//!
//! Connection gateway: accepts long-lived client connections over raw TCP and
//! WebSocket, authenticates them, keeps them alive with heartbeats and routes
//! server pushes to them by routing id.

pub mod auth;
pub mod connection;
pub mod handlers;
pub mod protocol;
pub mod round;
pub mod server;
pub mod stats;
pub mod timer;
pub mod transport;
pub mod zone;

pub use server::{shutdown_signal, Gateway, Server};
