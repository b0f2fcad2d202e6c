//! Protocol unit
//!
//! One request or response. On raw sockets it travels as a 12-byte header
//! followed by the body:
//!
//! ```text
//! |--len--|--x--|--ver--|--type--|--seq--|--body--|
//!     4      1      1        2       4        n
//! ```
//!
//! `len` is big-endian and counts the header itself.

use super::OpCode;
use std::fmt;

/// Total length field
pub const PACK_SIZE: usize = 4;
/// Reserved byte, always written as zero
pub const RESERVED_SIZE: usize = 1;
pub const VER_SIZE: usize = 1;
pub const TYPE_SIZE: usize = 2;
pub const SEQ_SIZE: usize = 4;
/// Raw header size in bytes
pub const HEADER_SIZE: usize = PACK_SIZE + RESERVED_SIZE + VER_SIZE + TYPE_SIZE + SEQ_SIZE;

pub const PACK_OFFSET: usize = 0;
pub const RESERVED_OFFSET: usize = PACK_OFFSET + PACK_SIZE;
pub const VER_OFFSET: usize = RESERVED_OFFSET + RESERVED_SIZE;
pub const TYPE_OFFSET: usize = VER_OFFSET + VER_SIZE;
pub const SEQ_OFFSET: usize = TYPE_OFFSET + TYPE_SIZE;

/// Default body cap for raw sockets
pub const DEFAULT_MAX_BODY_SIZE: usize = 1 << 10;

/// A protocol unit
///
/// Ring slots keep their `Proto` between requests so the body allocation is reused.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Proto {
    /// Protocol version
    pub ver: i8,
    /// Operation code (raw, may be unknown)
    pub op: i16,
    /// Client-chosen sequence id, echoed in the reply
    pub seq: i32,
    /// Opaque payload, JSON on the WebSocket transport
    pub body: Vec<u8>,
}

impl Proto {
    /// Create a unit with the given operation and body
    #[must_use]
    pub fn new(op: impl Into<i16>, body: impl Into<Vec<u8>>) -> Self {
        Self {
            ver: 1,
            op: op.into(),
            seq: 0,
            body: body.into(),
        }
    }

    /// Set the sequence id
    #[must_use]
    pub fn with_seq(mut self, seq: i32) -> Self {
        self.seq = seq;
        self
    }

    /// Typed view of the operation code
    #[must_use]
    pub fn op_code(&self) -> Option<OpCode> {
        OpCode::from_i16(self.op)
    }

    /// Turn this request into its reply in place, keeping `ver` and `seq`
    pub fn set_reply(&mut self, op: OpCode, body: &[u8]) {
        self.op = op.as_i16();
        self.body.clear();
        self.body.extend_from_slice(body);
    }

    /// Total encoded length on a raw socket
    #[must_use]
    pub fn packed_len(&self) -> usize {
        HEADER_SIZE + self.body.len()
    }
}

impl fmt::Display for Proto {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (ver, seq, len) = (self.ver, self.seq, self.body.len());
        match self.op_code() {
            Some(op) => write!(f, "Proto(ver={ver}, op={op}, seq={seq}, body={len}B)"),
            None => write!(f, "Proto(ver={ver}, op={}, seq={seq}, body={len}B)", self.op),
        }
    }
}
