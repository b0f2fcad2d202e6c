//! Raw-socket transport
//!
//! Buffered over pooled byte buffers. The declared length is checked against
//! the body cap before any of the body is read.

use super::{FrameReader, FrameWriter};
use crate::protocol::{codec, Proto, ProtocolError, ProtocolResult, HEADER_SIZE};
use crate::round::PooledBuffer;
use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};

/// Reads length-prefixed frames
#[derive(Debug)]
pub struct TcpFrameReader<R = OwnedReadHalf> {
    io: R,
    buf: PooledBuffer,
    /// Start of unconsumed bytes in `buf`
    pos: usize,
    max_body: usize,
}

impl<R> TcpFrameReader<R>
where
    R: AsyncRead + Unpin + Send,
{
    #[must_use]
    pub fn new(io: R, mut buf: PooledBuffer, max_body: usize) -> Self {
        buf.clear();
        Self {
            io,
            buf,
            pos: 0,
            max_body,
        }
    }

    fn buffered(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Make at least `n` unconsumed bytes available
    async fn fill(&mut self, n: usize, at_boundary: bool) -> ProtocolResult<()> {
        while self.buffered() < n {
            if self.pos > 0 {
                let len = self.buffered();
                self.buf.copy_within(self.pos.., 0);
                self.buf.truncate(len);
                self.pos = 0;
            }
            let missing = n - self.buf.len();
            self.buf.reserve(missing);

            if self.io.read_buf(&mut *self.buf).await? == 0 {
                return Err(if at_boundary && self.buf.is_empty() {
                    ProtocolError::Closed
                } else {
                    ProtocolError::MalformedFrame("connection closed mid-frame")
                });
            }
        }
        Ok(())
    }
}

#[async_trait]
impl<R> FrameReader for TcpFrameReader<R>
where
    R: AsyncRead + Unpin + Send,
{
    async fn read_frame(&mut self, proto: &mut Proto) -> ProtocolResult<()> {
        self.fill(HEADER_SIZE, true).await?;
        let header: &[u8; HEADER_SIZE] = self.buf[self.pos..self.pos + HEADER_SIZE]
            .try_into()
            .map_err(|_| ProtocolError::MalformedFrame("truncated header"))?;
        let header = codec::decode_header(header, self.max_body)?;

        self.fill(header.len, false).await?;
        let body = &self.buf[self.pos + HEADER_SIZE..self.pos + header.len];
        proto.ver = header.ver;
        proto.op = header.op;
        proto.seq = header.seq;
        proto.body.clear();
        proto.body.extend_from_slice(body);
        self.pos += header.len;
        Ok(())
    }
}

/// Coalesces encoded frames until the buffer fills or a flush
#[derive(Debug)]
pub struct TcpFrameWriter<W = OwnedWriteHalf> {
    io: W,
    buf: PooledBuffer,
    limit: usize,
}

impl<W> TcpFrameWriter<W>
where
    W: AsyncWrite + Unpin + Send,
{
    #[must_use]
    pub fn new(io: W, mut buf: PooledBuffer) -> Self {
        buf.clear();
        let limit = buf.capacity().max(HEADER_SIZE);
        Self { io, buf, limit }
    }

    async fn write_out(&mut self) -> ProtocolResult<()> {
        if !self.buf.is_empty() {
            self.io.write_all(&self.buf).await?;
            self.buf.clear();
        }
        Ok(())
    }
}

#[async_trait]
impl<W> FrameWriter for TcpFrameWriter<W>
where
    W: AsyncWrite + Unpin + Send,
{
    async fn write_frame(&mut self, proto: &Proto) -> ProtocolResult<()> {
        if self.buf.len() + proto.packed_len() > self.limit {
            self.write_out().await?;
        }
        codec::encode(proto, &mut self.buf);
        if self.buf.len() >= self.limit {
            self.write_out().await?;
        }
        Ok(())
    }

    async fn flush(&mut self) -> ProtocolResult<()> {
        self.write_out().await?;
        self.io.flush().await?;
        Ok(())
    }

    async fn close(&mut self) -> ProtocolResult<()> {
        self.write_out().await?;
        self.io.shutdown().await?;
        Ok(())
    }
}
