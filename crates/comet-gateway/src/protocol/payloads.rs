//! Body payload definitions
//!
//! JSON bodies carried by the built-in operations.

use serde::{Deserialize, Serialize};

/// Body of the auth frame (op 2)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthPayload {
    pub uid: u32,
    /// Credential checked by the authorizer
    #[serde(default)]
    pub code: String,
}

/// Body of the auth acknowledgment (op 1026)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthAckPayload {
    /// Routing id assigned to this connection
    pub id: u64,
    /// Registry shard holding the session
    pub zone: u8,
    /// Heartbeat deadline in milliseconds
    pub heartbeat_ms: u64,
}

/// Optional body of the heartbeat frame (op 1)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeartbeatPayload {
    pub uid: u32,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
}

/// Body of the heartbeat acknowledgment (op 1025)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeartbeatAckPayload {
    /// Server time, RFC 3339
    pub time: String,
}

/// Body of the routing change request (op 0)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteChangePayload {
    pub uid: u32,
    pub mid: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_payload_code_defaults() {
        let auth: AuthPayload = serde_json::from_str(r#"{"uid":42}"#).unwrap();
        assert_eq!(auth.uid, 42);
        assert!(auth.code.is_empty());
    }

    #[test]
    fn test_auth_ack_serialization() {
        let ack = AuthAckPayload {
            id: 0x0001_0000_0000_002a,
            zone: 1,
            heartbeat_ms: 90_000,
        };
        let json = serde_json::to_string(&ack).unwrap();
        assert_eq!(json, r#"{"id":281474976710698,"zone":1,"heartbeat_ms":90000}"#);
    }

    #[test]
    fn test_heartbeat_coordinates_optional() {
        let hb: HeartbeatPayload = serde_json::from_str(r#"{"uid":3}"#).unwrap();
        assert_eq!(hb.uid, 3);
        assert!(hb.x.abs() < f64::EPSILON);
    }
}
