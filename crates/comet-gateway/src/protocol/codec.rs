//! Raw-socket binary codec
//!
//! Stateless header/body encoding. The buffered socket readers and writers in
//! `transport::tcp` are built on these functions.

use super::frame::{
    Proto, HEADER_SIZE, PACK_OFFSET, RESERVED_OFFSET, SEQ_OFFSET, TYPE_OFFSET, VER_OFFSET,
};
use super::{ProtocolError, ProtocolResult};

/// Decoded header fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Total frame length including the header
    pub len: usize,
    pub ver: i8,
    pub op: i16,
    pub seq: i32,
}

impl Header {
    /// Body length implied by the total length
    #[must_use]
    pub const fn body_len(&self) -> usize {
        self.len - HEADER_SIZE
    }
}

/// Write the header for `proto` into `buf`
pub fn encode_header(proto: &Proto, buf: &mut [u8; HEADER_SIZE]) {
    let len = u32::try_from(proto.packed_len()).unwrap_or(u32::MAX);
    buf[PACK_OFFSET..RESERVED_OFFSET].copy_from_slice(&len.to_be_bytes());
    buf[RESERVED_OFFSET] = 0;
    buf[VER_OFFSET] = proto.ver.to_be_bytes()[0];
    buf[TYPE_OFFSET..SEQ_OFFSET].copy_from_slice(&proto.op.to_be_bytes());
    buf[SEQ_OFFSET..HEADER_SIZE].copy_from_slice(&proto.seq.to_be_bytes());
}

/// Append the encoded frame to `dst`
///
/// A body-less unit encodes as exactly [`HEADER_SIZE`] bytes.
pub fn encode(proto: &Proto, dst: &mut Vec<u8>) {
    let mut header = [0u8; HEADER_SIZE];
    encode_header(proto, &mut header);
    dst.reserve(proto.packed_len());
    dst.extend_from_slice(&header);
    dst.extend_from_slice(&proto.body);
}

/// Decode a header, enforcing the body cap before anything else is read
pub fn decode_header(buf: &[u8; HEADER_SIZE], max_body: usize) -> ProtocolResult<Header> {
    let declared = i32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]);
    let len = usize::try_from(declared)
        .map_err(|_| ProtocolError::MalformedFrame("negative frame length"))?;

    let max = HEADER_SIZE + max_body;
    if len > max {
        return Err(ProtocolError::FrameTooLarge { declared: len, max });
    }
    if len < HEADER_SIZE {
        return Err(ProtocolError::MalformedFrame("frame length shorter than header"));
    }

    Ok(Header {
        len,
        ver: i8::from_be_bytes([buf[VER_OFFSET]]),
        op: i16::from_be_bytes([buf[TYPE_OFFSET], buf[TYPE_OFFSET + 1]]),
        seq: i32::from_be_bytes([
            buf[SEQ_OFFSET],
            buf[SEQ_OFFSET + 1],
            buf[SEQ_OFFSET + 2],
            buf[SEQ_OFFSET + 3],
        ]),
    })
}

/// Decode one frame from the front of `src` into `proto`
///
/// Returns the number of bytes consumed.
pub fn decode_into(src: &[u8], max_body: usize, proto: &mut Proto) -> ProtocolResult<usize> {
    let header: &[u8; HEADER_SIZE] = src
        .get(..HEADER_SIZE)
        .and_then(|h| h.try_into().ok())
        .ok_or(ProtocolError::MalformedFrame("truncated header"))?;
    let header = decode_header(header, max_body)?;

    let body = src
        .get(HEADER_SIZE..header.len)
        .ok_or(ProtocolError::MalformedFrame("truncated body"))?;

    proto.ver = header.ver;
    proto.op = header.op;
    proto.seq = header.seq;
    proto.body.clear();
    proto.body.extend_from_slice(body);
    Ok(header.len)
}

/// Decode one frame from the front of `src`
pub fn decode(src: &[u8], max_body: usize) -> ProtocolResult<Proto> {
    let mut proto = Proto::default();
    decode_into(src, max_body, &mut proto)?;
    Ok(proto)
}
