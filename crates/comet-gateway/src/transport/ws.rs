//! WebSocket transport
//!
//! One JSON unit per inbound message, one single-unit JSON array per outbound
//! unit. Ping/pong is answered by tungstenite itself.

use super::{FrameReader, FrameWriter};
use crate::protocol::{json, Proto, ProtocolError, ProtocolResult};
use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

/// Room for the JSON envelope around a body of the maximum size
pub const ENVELOPE_ALLOWANCE: usize = 256;

/// Upgrade settings that cap one message at `max_body_size` plus the envelope
#[must_use]
pub fn config(max_body_size: usize) -> WebSocketConfig {
    let limit = max_body_size.saturating_add(ENVELOPE_ALLOWANCE);
    let mut config = WebSocketConfig::default();
    config.max_message_size = Some(limit);
    config.max_frame_size = Some(limit);
    config
}

/// Split an upgraded stream into frame reader and writer
pub fn split<S>(stream: WebSocketStream<S>) -> (WsFrameReader<S>, WsFrameWriter<S>)
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    let (sink, stream) = stream.split();
    (WsFrameReader { stream }, WsFrameWriter { sink })
}

#[derive(Debug)]
pub struct WsFrameReader<S> {
    stream: SplitStream<WebSocketStream<S>>,
}

#[async_trait]
impl<S> FrameReader for WsFrameReader<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn read_frame(&mut self, proto: &mut Proto) -> ProtocolResult<()> {
        loop {
            let message = self.stream.next().await.ok_or(ProtocolError::Closed)??;
            match message {
                Message::Text(text) => return json::decode_json(text.as_bytes(), proto),
                Message::Binary(data) => return json::decode_json(&data, proto),
                Message::Close(_) => return Err(ProtocolError::Closed),
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => {}
            }
        }
    }
}

#[derive(Debug)]
pub struct WsFrameWriter<S> {
    sink: SplitSink<WebSocketStream<S>, Message>,
}

#[async_trait]
impl<S> FrameWriter for WsFrameWriter<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn write_frame(&mut self, proto: &Proto) -> ProtocolResult<()> {
        let text = json::encode_json(proto)?;
        self.sink.feed(Message::text(text)).await?;
        Ok(())
    }

    async fn flush(&mut self) -> ProtocolResult<()> {
        self.sink.flush().await?;
        Ok(())
    }

    async fn close(&mut self) -> ProtocolResult<()> {
        self.sink.close().await?;
        Ok(())
    }
}
