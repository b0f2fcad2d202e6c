//! WebSocket JSON representation
//!
//! Outbound messages are JSON arrays of units:
//! `[{"ver":1,"type":1025,"seq":3,"body":{...}}]`. The body is embedded as raw
//! JSON, never re-encoded. Inbound messages may be a bare object or an array
//! holding exactly one object.

use super::codec;
use super::frame::{Proto, HEADER_SIZE};
use super::{ProtocolError, ProtocolResult};
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;

/// Body written for units that carry none
const EMPTY_JSON_BODY: &str = "{}";

#[derive(Serialize)]
struct JsonFrameRef<'a> {
    ver: i8,
    #[serde(rename = "type")]
    op: i16,
    seq: i32,
    body: &'a RawValue,
}

#[derive(Deserialize)]
struct JsonFrame<'a> {
    #[serde(default)]
    ver: i8,
    #[serde(rename = "type")]
    op: i16,
    #[serde(default)]
    seq: i32,
    #[serde(borrow, default)]
    body: Option<&'a RawValue>,
}

fn frame_ref(proto: &Proto) -> ProtocolResult<JsonFrameRef<'_>> {
    let body = if proto.body.is_empty() {
        EMPTY_JSON_BODY
    } else {
        std::str::from_utf8(&proto.body)
            .map_err(|_| ProtocolError::MalformedFrame("body is not UTF-8 JSON"))?
    };
    let body: &RawValue = serde_json::from_str(body)?;
    Ok(JsonFrameRef {
        ver: proto.ver,
        op: proto.op,
        seq: proto.seq,
        body,
    })
}

/// Encode one unit as a single-element JSON array
pub fn encode_json(proto: &Proto) -> ProtocolResult<String> {
    Ok(serde_json::to_string(&[frame_ref(proto)?])?)
}

/// Encode several units into one JSON array message
pub fn encode_json_batch(protos: &[Proto]) -> ProtocolResult<String> {
    let frames = protos.iter().map(frame_ref).collect::<ProtocolResult<Vec<_>>>()?;
    Ok(serde_json::to_string(&frames)?)
}

/// Decode an inbound WebSocket message into `proto`
///
/// Accepts a bare object or a one-element array; a `null` or missing body decodes as empty.
pub fn decode_json(src: &[u8], proto: &mut Proto) -> ProtocolResult<()> {
    let first = src
        .iter()
        .find(|b| !b.is_ascii_whitespace())
        .ok_or(ProtocolError::MalformedFrame("empty message"))?;

    let frame: JsonFrame<'_> = if *first == b'[' {
        let mut frames: Vec<JsonFrame<'_>> = serde_json::from_slice(src)?;
        if frames.len() != 1 {
            return Err(ProtocolError::MalformedFrame("expected exactly one unit per message"));
        }
        frames.remove(0)
    } else {
        serde_json::from_slice(src)?
    };

    proto.ver = frame.ver;
    proto.op = frame.op;
    proto.seq = frame.seq;
    proto.body.clear();
    if let Some(body) = frame.body {
        proto.body.extend_from_slice(body.get().as_bytes());
    }
    Ok(())
}

/// Convert a buffer of concatenated raw frames into one JSON array message
///
/// Trailing bytes shorter than a header are ignored.
pub fn raw_batch_to_json(buf: &[u8]) -> ProtocolResult<String> {
    let mut protos = Vec::new();
    let mut offset = 0;
    while buf.len() - offset >= HEADER_SIZE {
        let mut proto = Proto::default();
        offset += codec::decode_into(&buf[offset..], usize::MAX - HEADER_SIZE, &mut proto)?;
        protos.push(proto);
    }
    encode_json_batch(&protos)
}
