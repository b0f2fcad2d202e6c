//! Comet protocol definitions
//!
//! Defines the protocol unit, op codes, the raw-socket binary codec and the
//! WebSocket JSON representation.

pub mod codec;
mod error;
mod frame;
pub mod json;
mod opcodes;
mod payloads;

pub use error::{ProtocolError, ProtocolResult};
pub use frame::{Proto, DEFAULT_MAX_BODY_SIZE, HEADER_SIZE};
pub use opcodes::{OpCode, C2S_MAX, S2C_BASE};
pub use payloads::{
    AuthAckPayload, AuthPayload, HeartbeatAckPayload, HeartbeatPayload, RouteChangePayload,
};
