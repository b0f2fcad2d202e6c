//! Frame transports
//!
//! The connection state machine is written once against [`FrameReader`] and
//! [`FrameWriter`]; raw TCP and WebSocket plug in their own codec.

mod tcp;
mod ws;

pub use tcp::{TcpFrameReader, TcpFrameWriter};
pub use ws::{
    config as websocket_config, split as split_websocket, WsFrameReader, WsFrameWriter,
};

use crate::protocol::{Proto, ProtocolResult};
use async_trait::async_trait;

/// Inbound half of a connection
#[async_trait]
pub trait FrameReader: Send {
    /// Read the next unit into `proto`, reusing its body allocation
    ///
    /// An orderly close by the peer is [`ProtocolError::Closed`](crate::protocol::ProtocolError::Closed).
    async fn read_frame(&mut self, proto: &mut Proto) -> ProtocolResult<()>;
}

/// Outbound half of a connection
#[async_trait]
pub trait FrameWriter: Send {
    /// Queue `proto`; it may stay buffered until [`FrameWriter::flush`]
    async fn write_frame(&mut self, proto: &Proto) -> ProtocolResult<()>;

    async fn flush(&mut self) -> ProtocolResult<()>;

    /// Flush what is buffered and close the outbound direction
    async fn close(&mut self) -> ProtocolResult<()> {
        self.flush().await
    }
}
