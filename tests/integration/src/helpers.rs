//! Test helpers for integration tests
//!
//! Provides a gateway bound to loopback ephemeral ports plus raw TCP and
//! WebSocket clients speaking the wire protocol.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use comet_common::AppConfig;
use comet_gateway::auth::StaticAuthorizer;
use comet_gateway::protocol::{json, AuthAckPayload, OpCode, Proto, ProtocolError};
use comet_gateway::round::BufferPool;
use comet_gateway::transport::{FrameReader, FrameWriter, TcpFrameReader, TcpFrameWriter};
use comet_gateway::{Gateway, Server};
use futures_util::{SinkExt, StreamExt};
use reqwest::{Client, Response};
use serde::Serialize;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

/// Upper bound on any single wait for the gateway
pub const WAIT: Duration = Duration::from_secs(5);

/// Configuration with every listener on an ephemeral loopback port
pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.tcp.bind = vec!["127.0.0.1:0".to_string()];
    config.tcp.accept = 2;
    config.tcp.reader_num = 2;
    config.tcp.writer_num = 2;
    config.tcp.readbuf_num = 8;
    config.tcp.writebuf_num = 8;
    config.websocket.bind = vec!["127.0.0.1:0".to_string()];
    config.stat.bind = vec!["127.0.0.1:0".to_string()];
    config.timer.timer_num = 2;
    config.zone.zone_num = 16;
    config
}

/// Gateway instance that manages its own lifecycle
pub struct TestGateway {
    pub gateway: Gateway,
    pub client: Client,
}

impl TestGateway {
    /// Start a gateway with the default test configuration
    pub async fn start() -> Result<Self> {
        Self::start_with_config(test_config()).await
    }

    /// Start a gateway with a custom configuration
    pub async fn start_with_config(config: AppConfig) -> Result<Self> {
        let authorizer = Arc::new(StaticAuthorizer::from_config(&config));
        let gateway = Gateway::bind(&config, authorizer).await?;
        let client = Client::builder().timeout(WAIT).build()?;
        Ok(Self { gateway, client })
    }

    pub fn server(&self) -> &Arc<Server> {
        self.gateway.server()
    }

    pub fn tcp_addr(&self) -> SocketAddr {
        self.gateway.tcp_addrs()[0]
    }

    pub fn ws_url(&self, path: &str) -> String {
        format!("ws://{}{}", self.gateway.ws_addrs()[0], path)
    }

    /// Get base URL for the stat endpoint
    pub fn stat_url(&self) -> String {
        format!("http://{}", self.gateway.stat_addrs()[0])
    }

    /// Make a GET request against the stat endpoint
    pub async fn get(&self, path: &str) -> Result<Response> {
        let url = format!("{}{}", self.stat_url(), path);
        Ok(self.client.get(&url).send().await?)
    }

    /// Make a POST request with JSON body against the stat endpoint
    pub async fn post<T: Serialize>(&self, path: &str, body: &T) -> Result<Response> {
        let url = format!("{}{}", self.stat_url(), path);
        Ok(self.client.post(&url).json(body).send().await?)
    }

    /// Connect a raw TCP client
    pub async fn tcp_client(&self) -> Result<TcpClient> {
        TcpClient::connect(self.tcp_addr()).await
    }

    /// Connect a WebSocket client on the configured path
    pub async fn ws_client(&self) -> Result<WsClient> {
        WsClient::connect(&self.ws_url("/sub")).await
    }

    /// Poll until `check` holds or the wait bound passes
    pub async fn eventually(&self, check: impl Fn(&Server) -> bool) -> bool {
        let deadline = tokio::time::Instant::now() + WAIT;
        while tokio::time::Instant::now() < deadline {
            if check(&**self.server()) {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        check(&**self.server())
    }
}

/// Raw TCP client built on the gateway's own frame codec
pub struct TcpClient {
    reader: TcpFrameReader,
    writer: TcpFrameWriter,
}

impl TcpClient {
    pub async fn connect(addr: SocketAddr) -> Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        let pool = BufferPool::new(2, 1024);
        let (read_half, write_half) = stream.into_split();
        Ok(Self {
            reader: TcpFrameReader::new(read_half, pool.acquire(), 64 * 1024),
            writer: TcpFrameWriter::new(write_half, pool.acquire()),
        })
    }

    pub async fn send(&mut self, proto: &Proto) -> Result<()> {
        self.writer.write_frame(proto).await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// Next frame, or the read error
    pub async fn recv(&mut self) -> Result<Result<Proto, ProtocolError>> {
        let mut proto = Proto::default();
        let read = tokio::time::timeout(WAIT, self.reader.read_frame(&mut proto)).await?;
        Ok(read.map(|()| proto))
    }

    /// Next frame, failing on any read error
    pub async fn expect_frame(&mut self) -> Result<Proto> {
        Ok(self.recv().await??)
    }

    /// Wait until the gateway ends the connection
    pub async fn expect_closed(&mut self) -> Result<()> {
        match self.recv().await? {
            Ok(proto) => bail!("expected close, got op {}", proto.op),
            Err(_) => Ok(()),
        }
    }

    /// Authenticate and return the acknowledgment
    pub async fn auth(&mut self, uid: u32) -> Result<AuthAckPayload> {
        self.send(&crate::auth_frame(uid, 1)).await?;
        let reply = self.expect_frame().await?;
        if reply.op_code() != Some(OpCode::AuthReply) {
            bail!("expected auth reply, got op {}", reply.op);
        }
        Ok(serde_json::from_slice(&reply.body)?)
    }
}

/// WebSocket client sending JSON units
pub struct WsClient {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl WsClient {
    pub async fn connect(url: &str) -> Result<Self> {
        let (stream, _response) = tokio_tungstenite::connect_async(url).await?;
        Ok(Self { stream })
    }

    pub async fn send(&mut self, proto: &Proto) -> Result<()> {
        let text = json::encode_json(proto)?;
        self.stream.send(Message::text(text)).await?;
        Ok(())
    }

    pub async fn send_text(&mut self, text: &str) -> Result<()> {
        self.stream.send(Message::text(text.to_string())).await?;
        Ok(())
    }

    /// Next unit the gateway sent
    pub async fn expect_frame(&mut self) -> Result<Proto> {
        loop {
            let message = tokio::time::timeout(WAIT, self.stream.next()).await?;
            let Some(message) = message else {
                bail!("websocket closed");
            };
            match message? {
                Message::Text(text) => {
                    let mut proto = Proto::default();
                    json::decode_json(text.as_bytes(), &mut proto)?;
                    return Ok(proto);
                }
                Message::Close(_) => bail!("websocket closed"),
                _ => {}
            }
        }
    }

    /// Wait until the gateway ends the connection
    pub async fn expect_closed(&mut self) -> Result<()> {
        loop {
            match tokio::time::timeout(WAIT, self.stream.next()).await? {
                None | Some(Err(_) | Ok(Message::Close(_))) => return Ok(()),
                Some(Ok(Message::Text(text))) => bail!("expected close, got {}", text.as_str()),
                Some(Ok(_)) => {}
            }
        }
    }

    pub async fn auth(&mut self, uid: u32) -> Result<AuthAckPayload> {
        self.send(&crate::auth_frame(uid, 1)).await?;
        let reply = self.expect_frame().await?;
        if reply.op_code() != Some(OpCode::AuthReply) {
            bail!("expected auth reply, got op {}", reply.op);
        }
        Ok(serde_json::from_slice(&reply.body)?)
    }
}
