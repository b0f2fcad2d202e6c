//! Comet operation codes
//!
//! Client-to-server codes are small sequential integers starting at 0.
//! Server-to-client codes mirror them at an offset of [`S2C_BASE`], so a request
//! and its reply never share a code.

/// Offset between a request code and its reply code
pub const S2C_BASE: i16 = 1024;

/// One past the highest client-to-server code
pub const C2S_MAX: i16 = 3;

/// Operation codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i16)]
pub enum OpCode {
    /// Routing change request (client only)
    RouteChange = 0,
    /// Heartbeat - keep connection alive (client only)
    Heartbeat = 1,
    /// Auth - first frame of every connection (client only)
    Auth = 2,
    /// Routing change acknowledgment (server only)
    RouteChangeReply = S2C_BASE,
    /// Heartbeat acknowledgment (server only)
    HeartbeatReply = S2C_BASE + 1,
    /// Auth acknowledgment carrying the routing id (server only)
    AuthReply = S2C_BASE + 2,
}

impl OpCode {
    /// Create an `OpCode` from a raw wire value
    #[must_use]
    pub fn from_i16(value: i16) -> Option<Self> {
        match value {
            0 => Some(Self::RouteChange),
            1 => Some(Self::Heartbeat),
            2 => Some(Self::Auth),
            v if v == S2C_BASE => Some(Self::RouteChangeReply),
            v if v == S2C_BASE + 1 => Some(Self::HeartbeatReply),
            v if v == S2C_BASE + 2 => Some(Self::AuthReply),
            _ => None,
        }
    }

    /// Get the raw wire value
    #[must_use]
    pub const fn as_i16(self) -> i16 {
        self as i16
    }

    /// Check if this op code can be sent by the client
    #[must_use]
    pub const fn is_client_op(self) -> bool {
        (self as i16) < C2S_MAX
    }

    /// Check if this op code can be sent by the server
    #[must_use]
    pub const fn is_server_op(self) -> bool {
        (self as i16) >= S2C_BASE
    }

    /// The server-to-client code answering this request
    #[must_use]
    pub const fn reply(self) -> Option<Self> {
        match self {
            Self::RouteChange => Some(Self::RouteChangeReply),
            Self::Heartbeat => Some(Self::HeartbeatReply),
            Self::Auth => Some(Self::AuthReply),
            _ => None,
        }
    }

    /// Get the name of this op code
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::RouteChange => "RouteChange",
            Self::Heartbeat => "Heartbeat",
            Self::Auth => "Auth",
            Self::RouteChangeReply => "RouteChangeReply",
            Self::HeartbeatReply => "HeartbeatReply",
            Self::AuthReply => "AuthReply",
        }
    }
}

impl From<OpCode> for i16 {
    fn from(op: OpCode) -> Self {
        op.as_i16()
    }
}

impl std::fmt::Display for OpCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name(), self.as_i16())
    }
}
