//! Test fixtures and data generators

use comet_gateway::protocol::{AuthPayload, HeartbeatPayload, OpCode, Proto};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU32, Ordering};

/// Counter for unique uids across tests in one binary
static UID_COUNTER: AtomicU32 = AtomicU32::new(1000);

/// Get a uid no other test in this binary uses
pub fn unique_uid() -> u32 {
    UID_COUNTER.fetch_add(1, Ordering::SeqCst)
}

/// Auth frame accepted by the built-in authorizer
pub fn auth_frame(uid: u32, seq: i32) -> Proto {
    auth_frame_with_code(uid, "test", seq)
}

pub fn auth_frame_with_code(uid: u32, code: &str, seq: i32) -> Proto {
    let body = serde_json::to_vec(&AuthPayload {
        uid,
        code: code.to_string(),
    })
    .expect("auth payload serializes");
    Proto::new(OpCode::Auth, body).with_seq(seq)
}

pub fn heartbeat_frame(uid: u32, seq: i32) -> Proto {
    let body = serde_json::to_vec(&HeartbeatPayload { uid, x: 1.0, y: 2.0 })
        .expect("heartbeat payload serializes");
    Proto::new(OpCode::Heartbeat, body).with_seq(seq)
}

/// Body of `POST /push`
#[derive(Debug, Serialize)]
pub struct PushRequest {
    pub id: u64,
    #[serde(rename = "type")]
    pub op: i16,
    pub seq: i32,
    pub body: serde_json::Value,
}

#[derive(Debug, Deserialize)]
pub struct PushResponse {
    pub result: String,
}

#[derive(Debug, Deserialize)]
pub struct ConnectionStats {
    pub sessions: usize,
    pub timers: usize,
}

#[derive(Debug, Deserialize)]
pub struct ZoneStats {
    pub id: u8,
    pub add: u64,
    pub remove: u64,
    pub current: u64,
}
